use crate::core::ent::*;
use serde::Serialize;
use std::collections::BTreeMap;

// pools above this share of capacity are flagged red
const POOL_RED_RATIO: f64 = 0.9;

/// Aggregate figures of the overview page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetSummary {
    pub total: usize,
    pub status_counts: BTreeMap<String, usize>,
    pub active_alerts: usize,
    pub average_cpu: f64,
    pub average_memory: f64,
}

#[derive(Debug, Clone, Default)]
pub struct Doctor {}

impl Doctor {
    pub fn new() -> Doctor {
        Doctor {}
    }

    pub fn check_server(&self, server: &ServerRecord) -> (HealthStatus, String) {
        match server.status {
            ServerStatus::Critical => (HealthStatus::Red, "server reports critical".to_string()),
            ServerStatus::Offline => (HealthStatus::Red, "server offline".to_string()),
            ServerStatus::Warning => (HealthStatus::Yellow, "server reports warning".to_string()),
            ServerStatus::Maintenance => {
                (HealthStatus::Yellow, "server in maintenance".to_string())
            }
            ServerStatus::Online => (HealthStatus::Green, "".to_string()),
        }
    }

    pub fn check_pool(&self, pool: &StoragePool) -> (HealthStatus, String) {
        let ratio = if pool.capacity == 0 {
            1.0
        } else {
            f64::from(pool.used) / f64::from(pool.capacity)
        };
        if ratio > POOL_RED_RATIO {
            return (HealthStatus::Red, "pool nearly full".to_string());
        }
        if pool.status == PoolStatus::Degraded {
            return (HealthStatus::Yellow, "pool degraded".to_string());
        }
        (HealthStatus::Green, "".to_string())
    }

    /// Status counts, alert count and mean load of `fleet`. Alerts are
    /// servers in WARNING or CRITICAL.
    pub fn summarize(&self, fleet: &[ServerRecord]) -> FleetSummary {
        let mut status_counts: BTreeMap<String, usize> = BTreeMap::new();
        for server in fleet {
            *status_counts
                .entry(server.status.as_str().to_string())
                .or_default() += 1;
        }
        let active_alerts = fleet
            .iter()
            .filter(|s| matches!(s.status, ServerStatus::Warning | ServerStatus::Critical))
            .count();
        let mean = |f: fn(&ServerRecord) -> f64| {
            if fleet.is_empty() {
                0.0
            } else {
                fleet.iter().map(f).sum::<f64>() / fleet.len() as f64
            }
        };
        FleetSummary {
            total: fleet.len(),
            status_counts,
            active_alerts,
            average_cpu: mean(|s| s.cpu_usage.value()),
            average_memory: mean(|s| s.memory_usage.value()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server(status: ServerStatus, cpu: f64) -> ServerRecord {
        ServerRecord {
            id: "srv".to_string(),
            name: "NEXUS".to_string(),
            ip: "10.0.0.1".to_string(),
            region: "US-EAST-1".to_string(),
            role: ServerRole::Storage,
            status,
            cpu_usage: Gauge::new(cpu),
            memory_usage: Gauge::new(cpu / 2.0),
            disk_usage: Gauge::new(0.0),
            uptime: "0d 1h".to_string(),
        }
    }

    #[test]
    fn summary_counts_alerts() {
        let dc = Doctor::new();
        let fleet = vec![
            server(ServerStatus::Online, 20.0),
            server(ServerStatus::Warning, 40.0),
            server(ServerStatus::Critical, 60.0),
            server(ServerStatus::Offline, 80.0),
        ];
        let summary = dc.summarize(&fleet);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.active_alerts, 2);
        assert_eq!(summary.status_counts["OFFLINE"], 1);
        assert!(!summary.status_counts.contains_key("MAINTENANCE"));
        assert_eq!(summary.average_cpu, 50.0);
        assert_eq!(summary.average_memory, 25.0);
    }

    #[test]
    fn empty_fleet_summary() {
        let summary = Doctor::new().summarize(&[]);
        assert_eq!(summary.total, 0);
        assert_eq!(summary.average_cpu, 0.0);
    }

    #[test]
    fn server_health_follows_status() {
        let dc = Doctor::new();
        assert_eq!(dc.check_server(&server(ServerStatus::Online, 99.0)).0, HealthStatus::Green);
        assert_eq!(dc.check_server(&server(ServerStatus::Maintenance, 1.0)).0, HealthStatus::Yellow);
        assert_eq!(dc.check_server(&server(ServerStatus::Offline, 1.0)).0, HealthStatus::Red);
    }

    #[test]
    fn pool_health() {
        let dc = Doctor::new();
        let mut pool = StoragePool {
            id: "sp".to_string(),
            name: "pool".to_string(),
            kind: DiskKind::Hdd,
            capacity: 100,
            used: 95,
            iops: 10,
            status: PoolStatus::Healthy,
            raid_level: "RAID 5".to_string(),
        };
        assert_eq!(dc.check_pool(&pool).0, HealthStatus::Red);
        pool.used = 50;
        pool.status = PoolStatus::Degraded;
        assert_eq!(dc.check_pool(&pool).0, HealthStatus::Yellow);
        pool.status = PoolStatus::Healthy;
        assert_eq!(dc.check_pool(&pool).0, HealthStatus::Green);
    }
}
