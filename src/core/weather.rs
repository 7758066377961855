use crate::domain::model::WeatherRecord;
use std::collections::BTreeMap;

/// 模擬的城市天氣資料，啟動時建立後唯讀
#[derive(Debug, Clone, Default)]
pub struct WeatherTable {
    records: BTreeMap<String, WeatherRecord>,
}

impl WeatherTable {
    pub fn new(records: impl IntoIterator<Item = (String, WeatherRecord)>) -> Self {
        Self {
            records: records.into_iter().collect(),
        }
    }

    /// The fixed sample readings shown on the prediction page.
    pub fn sample() -> Self {
        let record = |temp_c, humidity, pressure_mm, wind_mps| WeatherRecord {
            temp_c,
            humidity,
            pressure_mm,
            wind_mps,
        };

        Self::new([
            ("Agartala".to_string(), record(28.22, 78, 1008, 2.6)),
            ("Delhi".to_string(), record(30.1, 45, 1005, 3.2)),
            ("Mumbai".to_string(), record(30.8, 70, 1007, 4.1)),
            ("Kolkata".to_string(), record(29.5, 82, 1006, 3.5)),
            ("Chennai".to_string(), record(31.0, 73, 1009, 4.0)),
        ])
    }

    pub fn get(&self, city: &str) -> Option<&WeatherRecord> {
        self.records.get(city)
    }

    /// City names in ascending order.
    pub fn cities(&self) -> Vec<&str> {
        self.records.keys().map(String::as_str).collect()
    }
}
