use std::sync::Arc;

use crate::config::AppConfig;
use crate::pipeline::Coordinator;
use crate::storage::SourceStore;

pub mod ai;
pub mod config;
pub mod pipeline;
pub mod routes;
pub mod services;
pub mod storage;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn SourceStore>,
    pub coordinator: Arc<Coordinator>,
}
