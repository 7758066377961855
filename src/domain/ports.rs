use crate::domain::model::StrategyKind;
use crate::utils::error::{ArtifactError, ModelError};
use std::path::Path;
use std::sync::Arc;

/// A ready-to-invoke regression model. Implementations are immutable once built.
pub trait Predictor: Send + Sync + std::fmt::Debug {
    fn kind(&self) -> &'static str;
    fn n_features(&self) -> usize;
    fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>, ModelError>;
}

/// One attempt at turning an artifact file into a [`Predictor`].
pub trait DecodeStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;
    fn decode(&self, path: &Path) -> Result<Arc<dyn Predictor>, ArtifactError>;
}
