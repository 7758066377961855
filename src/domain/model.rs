use serde::Serialize;

/// 單次請求的輸入特徵，順序固定為 (theoretical_power, windspeed)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector {
    pub theoretical_power: f64,
    pub windspeed: f64,
}

impl FeatureVector {
    pub fn new(theoretical_power: f64, windspeed: f64) -> Self {
        Self {
            theoretical_power,
            windspeed,
        }
    }

    pub fn to_row(self) -> Vec<f64> {
        vec![self.theoretical_power, self.windspeed]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeatherRecord {
    pub temp_c: f64,
    pub humidity: u32,
    pub pressure_mm: u32,
    pub wind_mps: f64,
}

/// Which decode strategy produced a loaded model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    Safetensors,
    Bincode,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Safetensors => "safetensors",
            StrategyKind::Bincode => "bincode",
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
