use crate::core::api::{pool_reports, topology, AppState};
use crate::core::catalog;
use crate::core::simulator::{TICK_PERIOD, TRAFFIC_CAPACITY};
use serde::Serialize;
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Pages of the operations dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    Dashboard,
    Servers,
    Logs,
    Network,
    Storage,
    Settings,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown view `{0}`")]
pub struct UnknownView(pub String);

impl View {
    pub const ALL: [View; 6] = [
        View::Dashboard,
        View::Servers,
        View::Logs,
        View::Network,
        View::Storage,
        View::Settings,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            View::Dashboard => "dashboard",
            View::Servers => "servers",
            View::Logs => "logs",
            View::Network => "network",
            View::Storage => "storage",
            View::Settings => "settings",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            View::Dashboard => "Overview",
            View::Servers => "Infrastructure",
            View::Logs => "AI Log Sentinel",
            View::Network => "Network Topology",
            View::Storage => "Storage Pools",
            View::Settings => "Settings",
        }
    }

    pub fn render(&self, state: &AppState) -> Value {
        match self {
            View::Dashboard => dashboard(state),
            View::Servers => servers(state),
            View::Logs => logs(state),
            View::Network => json!(topology()),
            View::Storage => json!(pool_reports(&state.dc)),
            View::Settings => settings(state),
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for View {
    type Err = UnknownView;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        View::ALL
            .into_iter()
            .find(|v| v.id().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownView(s.to_string()))
    }
}

fn dashboard(state: &AppState) -> Value {
    let sim = state.read_simulator();
    json!({
        "summary": state.dc.summarize(sim.fleet()),
        "traffic": sim.traffic().to_vec(),
        "resources": catalog::RESOURCE_DISTRIBUTION.as_slice(),
    })
}

fn servers(state: &AppState) -> Value {
    let sim = state.read_simulator();
    json!({
        "nodes": sim.fleet().len(),
        "servers": sim.fleet(),
    })
}

fn logs(state: &AppState) -> Value {
    json!({
        "model": state.analyzer.model(),
        "sample": catalog::SAMPLE_LOGS,
    })
}

fn settings(state: &AppState) -> Value {
    json!({
        "addr": state.settings.server.addr,
        "model": state.analyzer.model(),
        "baseUrl": state.analyzer.base_url(),
        "apiKeyConfigured": state.analyzer.has_credential(),
        "tickPeriodMs": TICK_PERIOD.as_millis() as u64,
        "trafficCapacity": TRAFFIC_CAPACITY,
        "fleetSize": state.settings.fleet.size,
    })
}
