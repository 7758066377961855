pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::http::{router, AppState};
pub use config::{AppConfig, CliConfig};
pub use crate::core::{
    artifact::{ArtifactLoader, ModelHandle},
    predict::PredictionService,
    weather::WeatherTable,
};
pub use utils::error::{AppError, PredictionError, Result};
