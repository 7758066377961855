pub mod toml_config;

use crate::core::artifact::{resolve_artifact_path, DEFAULT_ARTIFACT_NAME};
use crate::utils::error::Result;
use crate::utils::validation::{
    validate_non_empty_string, validate_one_of, validate_path, validate_range, Validate,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use toml_config::TomlConfig;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 5000;
pub const LOG_FORMATS: [&str; 2] = ["compact", "json"];

#[derive(Debug, Clone, Default, Serialize, Deserialize, Parser)]
#[command(name = "wind-power-web")]
#[command(about = "Wind turbine power prediction web front end")]
pub struct CliConfig {
    /// Application root; static files and relative model paths resolve against it
    #[arg(long)]
    pub root: Option<String>,

    /// Model artifact path
    #[arg(long)]
    pub model_path: Option<String>,

    #[arg(long)]
    pub host: Option<String>,

    #[arg(long)]
    pub port: Option<u16>,

    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub json_logs: bool,
}

/// 合併命令列與設定檔之後的最終配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub root: PathBuf,
    pub model_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub verbose: bool,
    pub log_format: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            model_path: PathBuf::from(DEFAULT_ARTIFACT_NAME),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            verbose: false,
            log_format: LOG_FORMATS[0].to_string(),
        }
    }
}

impl AppConfig {
    /// Loads the TOML file named by `--config` (if any) and layers the CLI flags on top.
    pub fn from_cli(cli: &CliConfig) -> Result<Self> {
        let file = match &cli.config {
            Some(path) => TomlConfig::from_file(path)?,
            None => TomlConfig::default(),
        };
        Ok(Self::merge(cli, &file))
    }

    /// 優先順序：命令列 > 設定檔 > 預設值
    pub fn merge(cli: &CliConfig, file: &TomlConfig) -> Self {
        let defaults = Self::default();

        let root = cli
            .root
            .as_deref()
            .or(file.root())
            .map(PathBuf::from)
            .unwrap_or(defaults.root);
        let model_path = cli
            .model_path
            .as_deref()
            .or(file.model_path())
            .map(PathBuf::from)
            .unwrap_or(defaults.model_path);
        let host = cli
            .host
            .as_deref()
            .or(file.host())
            .map(str::to_string)
            .unwrap_or(defaults.host);
        let port = cli.port.or(file.port()).unwrap_or(defaults.port);
        let verbose = cli.verbose || file.verbose().unwrap_or(defaults.verbose);
        let log_format = if cli.json_logs {
            "json".to_string()
        } else {
            file.log_format()
                .map(str::to_string)
                .unwrap_or(defaults.log_format)
        };

        Self {
            root,
            model_path,
            host,
            port,
            verbose,
            log_format,
        }
    }

    pub fn artifact_path(&self) -> PathBuf {
        resolve_artifact_path(&self.root, &self.model_path)
    }

    pub fn static_dir(&self) -> PathBuf {
        self.root.join("static")
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn json_logs(&self) -> bool {
        self.log_format == "json"
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        validate_path("app.root", &self.root.to_string_lossy())?;
        validate_path("model.path", &self.model_path.to_string_lossy())?;
        validate_non_empty_string("server.host", &self.host)?;
        validate_range("server.port", self.port, 1, u16::MAX)?;
        validate_one_of("logging.format", &self.log_format, &LOG_FORMATS)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::merge(&CliConfig::default(), &TomlConfig::default());
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.bind_address(), "127.0.0.1:5000");
        assert_eq!(config.artifact_path(), PathBuf::from("./power_prediction.sav"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_cli_overrides_file() {
        let file = TomlConfig::from_toml_str(
            r#"
[app]
root = "/srv/wind"

[server]
host = "0.0.0.0"
port = 8080

[logging]
format = "json"
"#,
        )
        .unwrap();
        let cli = CliConfig {
            port: Some(9090),
            model_path: Some("/models/m.sav".to_string()),
            ..CliConfig::default()
        };

        let config = AppConfig::merge(&cli, &file);
        assert_eq!(config.root, PathBuf::from("/srv/wind"));
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 9090);
        assert_eq!(config.artifact_path(), PathBuf::from("/models/m.sav"));
        assert!(config.json_logs());
    }

    #[test]
    fn test_parse_cli_flags() {
        let cli = CliConfig::parse_from([
            "wind-power-web",
            "--root",
            "/srv/wind",
            "--port",
            "8000",
            "--json-logs",
            "-v",
        ]);
        let config = AppConfig::merge(&cli, &TomlConfig::default());
        assert_eq!(config.static_dir(), PathBuf::from("/srv/wind/static"));
        assert_eq!(config.port, 8000);
        assert!(config.verbose);
        assert_eq!(config.log_format, "json");
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let config = AppConfig {
            port: 0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());

        let config = AppConfig {
            model_path: PathBuf::new(),
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());

        let config = AppConfig {
            log_format: "pretty".to_string(),
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
