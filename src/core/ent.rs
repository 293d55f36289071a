use chrono::{DateTime, Local};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A load gauge in percent. Always within `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct Gauge(f64);

impl Gauge {
    pub const MIN: f64 = 0.0;
    pub const MAX: f64 = 100.0;

    pub fn new(value: f64) -> Gauge {
        if value.is_nan() {
            return Gauge(Self::MIN);
        }
        Gauge(value.clamp(Self::MIN, Self::MAX))
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// Shift by `delta`, clamping the result back into range.
    pub fn shift(self, delta: f64) -> Gauge {
        Gauge::new(self.0 + delta)
    }
}

impl From<f64> for Gauge {
    fn from(value: f64) -> Self {
        Gauge::new(value)
    }
}

impl From<Gauge> for f64 {
    fn from(gauge: Gauge) -> Self {
        gauge.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerStatus {
    Online,
    Warning,
    Critical,
    Offline,
    Maintenance,
}

impl ServerStatus {
    pub const ALL: [ServerStatus; 5] = [
        ServerStatus::Online,
        ServerStatus::Warning,
        ServerStatus::Critical,
        ServerStatus::Offline,
        ServerStatus::Maintenance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServerStatus::Online => "ONLINE",
            ServerStatus::Warning => "WARNING",
            ServerStatus::Critical => "CRITICAL",
            ServerStatus::Offline => "OFFLINE",
            ServerStatus::Maintenance => "MAINTENANCE",
        }
    }

    pub fn parse(s: &str) -> Option<ServerStatus> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
    }
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServerRole {
    Database,
    #[serde(rename = "App Server")]
    AppServer,
    #[serde(rename = "Load Balancer")]
    LoadBalancer,
    Storage,
    #[serde(rename = "AI Compute")]
    AiCompute,
}

impl ServerRole {
    pub const ALL: [ServerRole; 5] = [
        ServerRole::Database,
        ServerRole::AppServer,
        ServerRole::LoadBalancer,
        ServerRole::Storage,
        ServerRole::AiCompute,
    ];

    /// Short tag used in generated host names.
    pub fn code(&self) -> &'static str {
        match self {
            ServerRole::Database => "DAT",
            ServerRole::AppServer => "APP",
            ServerRole::LoadBalancer => "LOA",
            ServerRole::Storage => "STO",
            ServerRole::AiCompute => "AIC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerRecord {
    pub id: String,
    pub name: String,
    pub ip: String,
    pub region: String,
    pub role: ServerRole,
    pub status: ServerStatus,
    pub cpu_usage: Gauge,
    pub memory_usage: Gauge,
    pub disk_usage: Gauge,
    pub uptime: String,
}

/// One traffic reading of the dashboard chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficSample {
    pub time: String,
    pub value: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Low,
        Severity::Medium,
        Severity::High,
        Severity::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }
}

/// Structured answer of the log analysis model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LogAnalysisResult {
    /// A concise summary of what the logs indicate.
    pub summary: String,
    /// The overall severity of the identified issues.
    pub severity: Severity,
    /// The likely technical root cause of the issue.
    pub root_cause: String,
    /// List of actionable steps to resolve the issue.
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiskKind {
    #[serde(rename = "NVMe")]
    Nvme,
    #[serde(rename = "SSD")]
    Ssd,
    #[serde(rename = "HDD")]
    Hdd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PoolStatus {
    Healthy,
    Degraded,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoragePool {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: DiskKind,
    /// Capacity in TB.
    pub capacity: u32,
    /// Used space in TB.
    pub used: u32,
    pub iops: u32,
    pub status: PoolStatus,
    pub raid_level: String,
}

impl StoragePool {
    /// Used share of capacity as a rounded percentage.
    pub fn utilization(&self) -> u32 {
        if self.capacity == 0 {
            return 0;
        }
        (f64::from(self.used) / f64::from(self.capacity) * 100.0).round() as u32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NodeKind {
    Internet,
    Lb,
    App,
    Db,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkNode {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub label: String,
    pub status: String,
    pub x: u32,
    pub y: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkLink {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceUsage {
    pub name: String,
    pub usage: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HealthStatus {
    Red,
    Yellow,
    Green,
}

#[derive(Debug)]
pub enum Event {
    /// The scheduler fired; carries the wall-clock time of the tick.
    Tick(DateTime<Local>),
    /// An operator connected a node; the record is already in the fleet.
    Connected(ServerRecord),
    Analyzed {
        request_id: Uuid,
        severity: Severity,
    },
    AnalysisFailed {
        request_id: Uuid,
        reason: String,
    },
}
