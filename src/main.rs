use clap::Parser;
use denoise_sweep::config::{Args, Config};
use denoise_sweep::sweep::Sweep;
use rand::{rngs::StdRng, SeedableRng};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::try_from(args)?;

    tracing::info!("Starting denoise-sweep v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Input directory: {}", config.input_dir.display());
    tracing::info!("Output directory: {}", config.output_dir.display());
    tracing::info!("Report: {}", config.report_path.display());

    if !config.input_dir.exists() {
        std::fs::create_dir_all(&config.input_dir)?;
        tracing::info!("Created empty input directory {}", config.input_dir.display());
    }

    let rng = match config.seed {
        Some(seed) => {
            tracing::info!("Using fixed noise seed {}", seed);
            StdRng::seed_from_u64(seed)
        }
        None => StdRng::from_entropy(),
    };

    let summary = Sweep::new(&config, rng).run().inspect_err(|e| {
        tracing::error!("Sweep aborted [{}]: {}", e.code(), e);
    })?;

    tracing::info!(
        "Done: {} image(s) processed, {} skipped, {} row(s) written to {} in {}ms{}",
        summary.images_processed,
        summary.skipped.len(),
        summary.rows_written,
        summary.report.display(),
        summary.total_time_ms,
        if summary.fallback { " (fallback test pattern)" } else { "" }
    );

    if let Some(path) = &config.summary_path {
        let json = serde_json::to_string_pretty(&summary)?;
        std::fs::write(path, json)?;
        tracing::info!("Summary written to {}", path.display());
    }

    Ok(())
}
