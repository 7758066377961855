use crate::core::artifact::ModelHandle;
use crate::domain::model::FeatureVector;
use crate::utils::error::{ModelError, PredictionError};
use std::sync::Arc;

/// Value used for a form field that was not submitted or left blank.
pub const DEFAULT_FIELD: &str = "0";

#[derive(Debug, Clone)]
pub struct PredictionService {
    handle: Arc<ModelHandle>,
}

impl PredictionService {
    pub fn new(handle: Arc<ModelHandle>) -> Self {
        Self { handle }
    }

    pub fn handle(&self) -> &Arc<ModelHandle> {
        &self.handle
    }

    /// 解析兩個原始輸入並執行預測，結果四捨五入到小數點後兩位
    pub fn predict(&self, raw_theo: &str, raw_wind: &str) -> Result<f64, PredictionError> {
        // 先驗證輸入，再檢查模型是否存在
        let features = FeatureVector::new(parse_feature(raw_theo)?, parse_feature(raw_wind)?);

        let predictor = self
            .handle
            .predictor()
            .ok_or_else(|| PredictionError::ModelUnavailable {
                artifact: self.handle.artifact_name(),
            })?;

        let output = predictor.predict(&[features.to_row()])?;
        let value = *output.first().ok_or(ModelError::EmptyOutput)?;
        if !value.is_finite() {
            return Err(ModelError::NonFinite(value).into());
        }

        tracing::debug!(
            "predicted {} for theoretical_power={} windspeed={}",
            value,
            features.theoretical_power,
            features.windspeed
        );
        Ok(round2(value))
    }
}

pub fn parse_feature(raw: &str) -> Result<f64, PredictionError> {
    let trimmed = raw.trim();
    let text = if trimmed.is_empty() { DEFAULT_FIELD } else { trimmed };
    text.parse::<f64>().map_err(|_| {
        PredictionError::InvalidInput(format!("could not convert string to float: '{}'", raw))
    })
}

/// Rounds the stored binary value to two decimals, ties to even.
///
/// A tie at two decimals is only representable when `value` is a multiple of
/// 1/8; those are scaled exactly. Everything else goes through the exact
/// decimal expansion `{:.2}` prints, so `0.015` (stored slightly below) gives `0.01`.
pub fn round2(value: f64) -> f64 {
    let scaled = value * 100.0;
    if (value * 8.0).fract() == 0.0 && scaled.fract().abs() == 0.5 {
        return scaled.round_ties_even() / 100.0;
    }
    format!("{:.2}", value).parse().unwrap_or(value)
}
