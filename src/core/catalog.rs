//! Hardcoded inventory shown next to the simulated fleet: storage pools,
//! network topology, resource distribution and a sample log excerpt.

use crate::core::ent::*;
use lazy_static::lazy_static;

pub const SAMPLE_LOGS: &str = "\
[2023-10-27 14:23:45] ERROR [ConnectionPool] Timeout waiting for connection from pool
[2023-10-27 14:23:46] WARN  [RetryPolicy] Retrying operation request-ID: 9982
[2023-10-27 14:23:50] FATAL [Database] Transaction rollback failed due to deadlock detected in table 'orders'
[2023-10-27 14:23:51] INFO  [HealthCheck] Service 'OrderProcessing' is UNHEALTHY
[2023-10-27 14:24:00] ERROR [AppServer] OutOfMemoryError: Java heap space";

#[allow(clippy::too_many_arguments)]
fn pool(
    id: &str,
    name: &str,
    kind: DiskKind,
    capacity: u32,
    used: u32,
    iops: u32,
    status: PoolStatus,
    raid_level: &str,
) -> StoragePool {
    StoragePool {
        id: id.to_string(),
        name: name.to_string(),
        kind,
        capacity,
        used,
        iops,
        status,
        raid_level: raid_level.to_string(),
    }
}

fn node(id: &str, kind: NodeKind, label: &str, x: u32, y: u32) -> NetworkNode {
    NetworkNode {
        id: id.to_string(),
        kind,
        label: label.to_string(),
        status: "active".to_string(),
        x,
        y,
    }
}

fn link(from: &str, to: &str) -> NetworkLink {
    NetworkLink {
        from: from.to_string(),
        to: to.to_string(),
    }
}

lazy_static! {
    pub static ref STORAGE_POOLS: Vec<StoragePool> = vec![
        pool("sp-1", "Primary-Block-NVMe", DiskKind::Nvme, 500, 342, 125_000, PoolStatus::Healthy, "RAID 10"),
        pool("sp-2", "Archive-HDD-Array", DiskKind::Hdd, 2500, 1890, 4_500, PoolStatus::Healthy, "RAID 5"),
        pool("sp-3", "Object-Store-SSD", DiskKind::Ssd, 1000, 850, 45_000, PoolStatus::Degraded, "RAID 5"),
    ];
    pub static ref TOPOLOGY_NODES: Vec<NetworkNode> = vec![
        node("internet", NodeKind::Internet, "Internet", 400, 50),
        node("lb1", NodeKind::Lb, "LB-External-01", 400, 200),
        node("app1", NodeKind::App, "App-Cluster-A", 200, 400),
        node("app2", NodeKind::App, "App-Cluster-B", 600, 400),
        node("db1", NodeKind::Db, "Primary-DB", 300, 600),
        node("db2", NodeKind::Db, "Replica-DB", 500, 600),
    ];
    pub static ref TOPOLOGY_LINKS: Vec<NetworkLink> = vec![
        link("internet", "lb1"),
        link("lb1", "app1"),
        link("lb1", "app2"),
        link("app1", "db1"),
        link("app1", "db2"),
        link("app2", "db1"),
        link("app2", "db2"),
    ];
    pub static ref RESOURCE_DISTRIBUTION: Vec<ResourceUsage> = [
        ("Databases", 85),
        ("Compute", 62),
        ("Storage", 78),
        ("Network", 45),
    ]
    .iter()
    .map(|(name, usage)| ResourceUsage {
        name: name.to_string(),
        usage: *usage,
    })
    .collect();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn links_reference_known_nodes() {
        let ids: HashSet<&str> = TOPOLOGY_NODES.iter().map(|n| n.id.as_str()).collect();
        for l in TOPOLOGY_LINKS.iter() {
            assert!(ids.contains(l.from.as_str()), "unknown node {}", l.from);
            assert!(ids.contains(l.to.as_str()), "unknown node {}", l.to);
        }
    }

    #[test]
    fn pools_fit_their_capacity() {
        assert!(STORAGE_POOLS.iter().all(|p| p.used <= p.capacity));
        assert_eq!(STORAGE_POOLS[2].utilization(), 85);
    }
}
