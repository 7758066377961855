use clap::Parser;
use wind_power_web::utils::error::ErrorSeverity;
use wind_power_web::utils::{logger, validation::Validate};
use wind_power_web::{router, AppConfig, AppError, AppState, ArtifactLoader, CliConfig, WeatherTable};

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    let config = match AppConfig::from_cli(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    // 初始化日誌
    if config.json_logs() {
        logger::init_json_logger(config.verbose);
    } else {
        logger::init_cli_logger(config.verbose);
    }

    tracing::info!("🚀 Starting wind-power-web");
    tracing::debug!("Resolved config: {:?}", config);

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    if let Err(e) = serve(config).await {
        tracing::error!(
            "❌ Server stopped: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());

        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };
        std::process::exit(exit_code);
    }
}

async fn serve(config: AppConfig) -> Result<(), AppError> {
    // 模型只在啟動時載入一次；載入失敗不影響其他路由
    let handle = ArtifactLoader::default().load(&config.artifact_path());
    if !handle.is_available() {
        tracing::warn!("⚠️ Serving without a model; /y_predict will report it as unavailable");
    }

    let state = AppState::new(handle, WeatherTable::sample(), config.static_dir());
    let app = router(state);

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .map_err(|e| AppError::ServerError {
            message: format!("could not bind {}: {}", address, e),
        })?;
    tracing::info!("🌐 Listening on http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::ServerError {
            message: e.to_string(),
        })?;

    tracing::info!("👋 Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("could not install Ctrl+C handler: {}", e);
        std::future::pending::<()>().await;
    }
}
