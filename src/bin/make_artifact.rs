use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use wind_power_web::core::artifact::{
    encode_bincode, encode_safetensors, ArtifactLoader, DEFAULT_ARTIFACT_NAME,
};
use wind_power_web::core::regression::{LinearRegression, RegressionModel};
use wind_power_web::utils::logger;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Safetensors,
    Bincode,
}

#[derive(Parser)]
#[command(name = "make-artifact")]
#[command(about = "Write a hand-specified linear model artifact for smoke testing")]
struct Args {
    /// Coefficients for (theoretical_power, windspeed)
    #[arg(long, value_delimiter = ',', default_value = "1.0,0.0", allow_hyphen_values = true)]
    coef: Vec<f64>,

    #[arg(long, default_value = "0.0", allow_hyphen_values = true)]
    intercept: f64,

    #[arg(long, value_enum, default_value = "safetensors")]
    format: Format,

    #[arg(short, long, default_value = DEFAULT_ARTIFACT_NAME)]
    output: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    logger::init_cli_logger(args.verbose);

    if args.coef.len() != 2 {
        bail!(
            "expected 2 coefficients (theoretical_power, windspeed), got {}",
            args.coef.len()
        );
    }

    let model = RegressionModel::Linear(LinearRegression::new(args.coef, args.intercept));
    model.validate()?;

    let bytes = match args.format {
        Format::Safetensors => encode_safetensors(&model)?,
        Format::Bincode => encode_bincode(&model)?,
    };
    std::fs::write(&args.output, &bytes)
        .with_context(|| format!("could not write {}", args.output))?;
    tracing::info!("📁 Wrote {} bytes to {}", bytes.len(), args.output);

    // 寫完立即用伺服器的載入流程驗證一次
    let handle = ArtifactLoader::default().load(std::path::Path::new(&args.output));
    if !handle.is_available() {
        bail!("{} was written but the loader could not read it back", args.output);
    }

    println!("✅ Artifact saved to: {}", args.output);
    Ok(())
}
