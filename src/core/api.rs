use crate::config::model::Bootstrap;
use crate::core::analyzer::*;
use crate::core::catalog;
use crate::core::doctor::*;
use crate::core::ent::*;
use crate::core::simulator::*;
use crate::core::view::View;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::mpsc;
use uuid::Uuid;

pub struct AppState {
    pub simulator: RwLock<Simulator>,
    pub analyzer: LogAnalyzer,
    pub tx: mpsc::Sender<Event>,
    pub dc: Doctor,
    pub settings: Bootstrap,
}

impl AppState {
    /// Seed a fleet of the configured size and wire the analyzer from config.
    pub fn new(settings: Bootstrap, tx: mpsc::Sender<Event>) -> AppState {
        let fleet = seed_fleet(&mut StdRng::from_entropy(), settings.fleet.size);
        let analyzer = LogAnalyzer::from_config(&settings.analyzer);
        AppState::with_parts(Simulator::new(fleet), analyzer, settings, tx)
    }

    pub fn with_parts(
        simulator: Simulator,
        analyzer: LogAnalyzer,
        settings: Bootstrap,
        tx: mpsc::Sender<Event>,
    ) -> AppState {
        AppState {
            simulator: RwLock::new(simulator),
            analyzer,
            tx,
            dc: Doctor::new(),
            settings,
        }
    }

    pub fn read_simulator(&self) -> RwLockReadGuard<'_, Simulator> {
        self.simulator.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn write_simulator(&self) -> RwLockWriteGuard<'_, Simulator> {
        self.simulator.write().unwrap_or_else(PoisonError::into_inner)
    }

    async fn notify(&self, event: Event) {
        if let Err(e) = self.tx.send(event).await {
            tracing::warn!("event channel closed, dropping {:?}", e.0);
        }
    }
}

pub async fn servers_index(
    query: Option<Query<FleetQuery>>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let Query(query) = query.unwrap_or_default();
    let servers = state.read_simulator().query(&query);
    Json(servers)
}

/// An empty body without a JSON content type connects a node with defaults.
/// Any other body must parse as `ConnectNode`.
pub async fn server_connect(
    State(state): State<Arc<AppState>>,
    input: Result<Json<ConnectNode>, JsonRejection>,
) -> Result<impl IntoResponse, JsonRejection> {
    let overrides = match input {
        Ok(Json(overrides)) => overrides,
        Err(JsonRejection::MissingJsonContentType(_)) => ConnectNode::default(),
        Err(rejection) => {
            tracing::debug!("rejected connect body: {}", rejection);
            return Err(rejection);
        }
    };
    let record = connect_node(&mut rand::thread_rng(), overrides);
    state.write_simulator().add_server(record.clone());
    state.notify(Event::Connected(record.clone())).await;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn traffic_index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let samples = state.read_simulator().traffic().to_vec();
    Json(samples)
}

pub async fn fleet_summary(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let summary = state.dc.summarize(state.read_simulator().fleet());
    Json(summary)
}

#[derive(Debug, Serialize)]
pub struct PoolReport {
    #[serde(flatten)]
    pub pool: StoragePool,
    pub utilization: u32,
    pub health: HealthStatus,
}

pub fn pool_reports(dc: &Doctor) -> Vec<PoolReport> {
    catalog::STORAGE_POOLS
        .iter()
        .map(|pool| PoolReport {
            pool: pool.clone(),
            utilization: pool.utilization(),
            health: dc.check_pool(pool).0,
        })
        .collect()
}

pub async fn storage_index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(pool_reports(&state.dc))
}

#[derive(Debug, Serialize)]
pub struct Topology {
    pub nodes: &'static [NetworkNode],
    pub links: &'static [NetworkLink],
}

pub fn topology() -> Topology {
    Topology {
        nodes: &catalog::TOPOLOGY_NODES,
        links: &catalog::TOPOLOGY_LINKS,
    }
}

pub async fn topology_index() -> impl IntoResponse {
    Json(topology())
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub logs: String,
}

impl IntoResponse for AnalyzeError {
    fn into_response(self) -> Response {
        let status = match &self {
            AnalyzeError::Configuration(_) => StatusCode::SERVICE_UNAVAILABLE,
            AnalyzeError::Analysis(failure) => match failure {
                AnalysisFailure::EmptyInput => StatusCode::BAD_REQUEST,
                AnalysisFailure::InFlight | AnalysisFailure::Superseded => StatusCode::CONFLICT,
                AnalysisFailure::Transport(_)
                | AnalysisFailure::Status { .. }
                | AnalysisFailure::EmptyResponse
                | AnalysisFailure::Malformed(_) => StatusCode::BAD_GATEWAY,
            },
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub async fn analyze_logs(
    State(state): State<Arc<AppState>>,
    Json(input): Json<AnalyzeRequest>,
) -> Result<Json<LogAnalysisResult>, AnalyzeError> {
    let request_id = Uuid::new_v4();
    tracing::info!(%request_id, "log analysis requested");
    match state.analyzer.analyze(&input.logs).await {
        Ok(result) => {
            state
                .notify(Event::Analyzed {
                    request_id,
                    severity: result.severity,
                })
                .await;
            Ok(Json(result))
        }
        Err(e) => {
            state
                .notify(Event::AnalysisFailed {
                    request_id,
                    reason: e.to_string(),
                })
                .await;
            Err(e)
        }
    }
}

pub async fn analyze_schema() -> impl IntoResponse {
    Json(result_json_schema())
}

pub async fn view_show(
    Path(name): Path<String>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    match name.parse::<View>() {
        Ok(view) => (StatusCode::OK, Json(view.render(&state))),
        Err(e) => (StatusCode::NOT_FOUND, Json(json!({ "error": e.to_string() }))),
    }
}

pub async fn views_index() -> impl IntoResponse {
    let views: Vec<_> = View::ALL
        .iter()
        .map(|v| json!({ "id": v.id(), "label": v.label() }))
        .collect();
    Json(views)
}
