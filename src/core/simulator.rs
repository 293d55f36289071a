use crate::core::ent::*;
use chrono::{Local, NaiveTime, Timelike};
use rand::Rng;
use serde::Deserialize;
use std::collections::VecDeque;
use std::time::Duration;

/// Period between two simulator ticks.
pub const TICK_PERIOD: Duration = Duration::from_millis(2000);
/// Maximum number of samples kept in the traffic series.
pub const TRAFFIC_CAPACITY: usize = 20;

const CPU_JITTER: f64 = 5.0;
const MEMORY_JITTER: f64 = 2.5;
const TRAFFIC_MIN: u32 = 20;
const TRAFFIC_MAX: u32 = 70;

const REGIONS: [&str; 4] = ["US-EAST-1", "US-WEST-2", "EU-CENTRAL-1", "AP-SOUTH-1"];
// three out of five seeded servers start healthy
const SEED_STATUSES: [ServerStatus; 5] = [
    ServerStatus::Online,
    ServerStatus::Online,
    ServerStatus::Online,
    ServerStatus::Warning,
    ServerStatus::Critical,
];

/// Fixed-capacity traffic history, oldest sample first.
#[derive(Debug, Clone)]
pub struct TrafficSeries {
    samples: VecDeque<TrafficSample>,
    capacity: usize,
}

impl TrafficSeries {
    pub fn new() -> TrafficSeries {
        TrafficSeries::with_capacity(TRAFFIC_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> TrafficSeries {
        TrafficSeries {
            samples: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    pub fn push(&mut self, sample: TrafficSample) {
        self.samples.push_back(sample);
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrafficSample> {
        self.samples.iter()
    }

    pub fn to_vec(&self) -> Vec<TrafficSample> {
        self.samples.iter().cloned().collect()
    }
}

impl Default for TrafficSeries {
    fn default() -> Self {
        TrafficSeries::new()
    }
}

/// In-memory fleet and traffic history mutated on every tick.
#[derive(Debug, Clone, Default)]
pub struct Simulator {
    fleet: Vec<ServerRecord>,
    traffic: TrafficSeries,
}

impl Simulator {
    pub fn new(fleet: Vec<ServerRecord>) -> Simulator {
        Simulator {
            fleet,
            traffic: TrafficSeries::new(),
        }
    }

    pub fn fleet(&self) -> &[ServerRecord] {
        &self.fleet
    }

    pub fn traffic(&self) -> &TrafficSeries {
        &self.traffic
    }

    /// Run one step with the thread RNG and the local wall clock.
    pub fn tick(&mut self) {
        self.tick_at(&mut rand::thread_rng(), Local::now().time());
    }

    /// Perturb cpu and memory of every server and append one traffic sample
    /// labelled with `at`.
    pub fn tick_at<R: Rng + ?Sized>(&mut self, rng: &mut R, at: NaiveTime) {
        for server in self.fleet.iter_mut() {
            server.cpu_usage = server
                .cpu_usage
                .shift(rng.gen_range(-CPU_JITTER..CPU_JITTER));
            server.memory_usage = server
                .memory_usage
                .shift(rng.gen_range(-MEMORY_JITTER..MEMORY_JITTER));
        }
        self.traffic.push(TrafficSample {
            time: time_label(at),
            value: rng.gen_range(TRAFFIC_MIN..TRAFFIC_MAX),
        });
    }

    pub fn add_server(&mut self, record: ServerRecord) {
        self.fleet.insert(0, record);
    }

    pub fn query(&self, query: &FleetQuery) -> Vec<ServerRecord> {
        self.fleet
            .iter()
            .filter(|s| query.matches(s))
            .skip(query.offset.unwrap_or(0))
            .take(query.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }
}

/// Zero-padded 24-hour `HH:MM`.
pub fn time_label(at: NaiveTime) -> String {
    format!("{:02}:{:02}", at.hour(), at.minute())
}

/// Filter and paging parameters for fleet listings.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct FleetQuery {
    /// A status name, or `ALL`/absent for every status.
    pub status: Option<String>,
    /// Matched case-insensitively against the name, verbatim against the ip.
    pub search: Option<String>,
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

impl FleetQuery {
    fn matches(&self, server: &ServerRecord) -> bool {
        let status_ok = match self.status.as_deref() {
            None => true,
            Some(s) if s.eq_ignore_ascii_case("ALL") => true,
            Some(s) => ServerStatus::parse(s) == Some(server.status),
        };
        let search_ok = match self.search.as_deref() {
            None | Some("") => true,
            Some(term) => {
                server.name.to_lowercase().contains(&term.to_lowercase())
                    || server.ip.contains(term)
            }
        };
        status_ok && search_ok
    }
}

/// Operator-supplied overrides for a newly connected node.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct ConnectNode {
    pub name: Option<String>,
    pub ip: Option<String>,
    pub region: Option<String>,
    pub role: Option<ServerRole>,
}

fn random_ip<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!("10.0.{}.{}", rng.gen_range(0..20), rng.gen_range(0..255))
}

/// Generate the initial fleet of `size` servers.
pub fn seed_fleet<R: Rng + ?Sized>(rng: &mut R, size: usize) -> Vec<ServerRecord> {
    (0..size)
        .map(|i| {
            let role = ServerRole::ALL[i % ServerRole::ALL.len()];
            ServerRecord {
                id: format!("srv-{}", i + 1),
                name: format!("NEXUS-{}-{:02}", role.code(), i + 1),
                ip: random_ip(rng),
                region: REGIONS[i % REGIONS.len()].to_string(),
                role,
                status: SEED_STATUSES[rng.gen_range(0..SEED_STATUSES.len())],
                cpu_usage: Gauge::new(f64::from(rng.gen_range(20..80u32))),
                memory_usage: Gauge::new(f64::from(rng.gen_range(20..90u32))),
                disk_usage: Gauge::new(f64::from(rng.gen_range(0..90u32))),
                uptime: format!("{}d {}h", rng.gen_range(0..30), rng.gen_range(0..24)),
            }
        })
        .collect()
}

/// Build the record of a freshly connected node.
pub fn connect_node<R: Rng + ?Sized>(rng: &mut R, overrides: ConnectNode) -> ServerRecord {
    ServerRecord {
        id: format!("srv-{}", rng.gen_range(0..10000)),
        name: overrides
            .name
            .unwrap_or_else(|| format!("NEXUS-NEW-{}", rng.gen_range(0..99))),
        ip: overrides.ip.unwrap_or_else(|| random_ip(rng)),
        region: overrides.region.unwrap_or_else(|| REGIONS[0].to_string()),
        role: overrides.role.unwrap_or(ServerRole::AppServer),
        status: ServerStatus::Online,
        cpu_usage: Gauge::new(f64::from(rng.gen_range(0..30u32))),
        memory_usage: Gauge::new(f64::from(rng.gen_range(0..40u32))),
        disk_usage: Gauge::new(10.0),
        uptime: "0d 0h 1m".to_string(),
    }
}
