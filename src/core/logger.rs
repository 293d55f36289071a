use crate::core::api::AppState;
use crate::core::ent::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;

// one fleet report every 15 ticks, i.e. every 30 seconds
const REPORT_EVERY: u64 = 15;

/// Single consumer of the event channel: applies ticks to the simulator and
/// records fleet and analysis activity.
pub struct Logger {
    state: Arc<AppState>,
    rng: StdRng,
    ticks: u64,
}

impl Logger {
    pub fn new(state: Arc<AppState>) -> Logger {
        Logger::with_rng(state, StdRng::from_entropy())
    }

    pub fn with_rng(state: Arc<AppState>, rng: StdRng) -> Logger {
        Logger {
            state,
            rng,
            ticks: 0,
        }
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn log(&mut self, event: Event) {
        match event {
            Event::Tick(at) => self.tick(at.time()),
            Event::Connected(server) => {
                let (health, msg) = self.state.dc.check_server(&server);
                tracing::info!(
                    id = %server.id,
                    name = %server.name,
                    ip = %server.ip,
                    ?health,
                    "node connected {}",
                    msg
                );
            }
            Event::Analyzed {
                request_id,
                severity,
            } => {
                tracing::info!(%request_id, severity = severity.as_str(), "log analysis finished");
            }
            Event::AnalysisFailed { request_id, reason } => {
                tracing::warn!(%request_id, "log analysis failed: {}", reason);
            }
        };
    }

    fn tick(&mut self, at: chrono::NaiveTime) {
        let mut sim = self.state.write_simulator();
        sim.tick_at(&mut self.rng, at);
        self.ticks += 1;
        tracing::trace!(tick = self.ticks, traffic = sim.traffic().len(), "simulator tick");
        if self.ticks % REPORT_EVERY == 0 {
            self.report(sim.fleet());
        }
    }

    fn report(&self, fleet: &[ServerRecord]) {
        let summary = self.state.dc.summarize(fleet);
        tracing::info!(
            total = summary.total,
            alerts = summary.active_alerts,
            avg_cpu = format!("{:.1}", summary.average_cpu),
            avg_memory = format!("{:.1}", summary.average_memory),
            "fleet report"
        );
        for server in fleet {
            let (health, msg) = self.state.dc.check_server(server);
            if health == HealthStatus::Red {
                tracing::warn!(id = %server.id, name = %server.name, "{}", msg);
            }
        }
    }
}
