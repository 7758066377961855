pub mod artifact;
pub mod predict;
pub mod regression;
pub mod weather;

pub use crate::domain::model::{FeatureVector, StrategyKind, WeatherRecord};
pub use crate::domain::ports::{DecodeStrategy, Predictor};
pub use crate::utils::error::Result;
