pub mod analyzer;
pub mod api;
pub mod catalog;
pub mod collector;
pub mod doctor;
pub mod ent;
pub mod logger;
pub mod scheduler;
pub mod simulator;
pub mod view;
pub use analyzer::{AnalysisFailure, AnalyzeError, ApiKey, LogAnalyzer};
pub use api::AppState;
pub use collector::{listen, router};
pub use doctor::*;
pub use ent::*;
pub use logger::*;
pub use scheduler::Scheduler;
pub use simulator::*;
