use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use phrase_capture::sensor::synthetic::{
    synthetic_body_frame, synthetic_color_frame, synthetic_depth_frame,
};
use phrase_capture::sensor::{MultiSourceFrame, SensorSourceFactory};
use phrase_capture::{
    create_router, AppState, CapturePipeline, Config, FileJointWriter, HealthMonitor,
    SessionRecorder,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Parser)]
#[command(name = "phrase-capture")]
#[command(version)]
#[command(about = "Gesture-delimited color, depth and skeletal capture", long_about = None)]
struct Cli {
    /// Config file (extension optional)
    #[arg(long, short, default_value = "config/phrase-capture")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the sensor and the HTTP control surface
    Serve,

    /// Record one synthetic session headlessly and print its outcome
    Record {
        /// Phrase to record (overrides the config)
        #[arg(long)]
        phrase: Option<String>,

        /// Body ticks to hold recording for
        #[arg(long, default_value = "30")]
        ticks: u64,

        /// Tracked bodies per tick
        #[arg(long, default_value = "1")]
        bodies: usize,
    },

    /// Print the readiness report for the configured data root
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));
    info!("Data root: {}", cfg.capture.data_root.display());

    match cli.command {
        Commands::Serve => serve(cfg).await,
        Commands::Record {
            phrase,
            ticks,
            bodies,
        } => record(cfg, phrase, ticks, bodies),
        Commands::Health => {
            let monitor = HealthMonitor::new(&cfg.capture.data_root, cfg.health.min_free_mb);
            let report = monitor.check(false, 0);
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
    }
}

async fn serve(cfg: Config) -> Result<()> {
    let recorder = SessionRecorder::new(&cfg.capture, Box::new(FileJointWriter::new()))
        .context("Invalid capture configuration")?;
    let pipeline = Arc::new(CapturePipeline::new(recorder));

    let sensor = SensorSourceFactory::create(
        &cfg.sensor,
        (cfg.capture.color_width, cfg.capture.color_height),
        (cfg.capture.depth_width, cfg.capture.depth_height),
    )?;
    pipeline.start_sensor(sensor).await?;

    if let Some(mut outcomes) = pipeline.take_outcomes().await {
        tokio::spawn(async move {
            while let Some(outcome) = outcomes.recv().await {
                info!("Session {} finished: {:?}", outcome.session_id(), outcome);
            }
        });
    }

    let health = Arc::new(HealthMonitor::new(
        &cfg.capture.data_root,
        cfg.health.min_free_mb,
    ));
    let app = create_router(AppState::new(Arc::clone(&pipeline), health));

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("HTTP server failed")?;

    pipeline.shutdown().await
}

/// Drive one session tick by tick with synthetic frames
fn record(cfg: Config, phrase: Option<String>, ticks: u64, bodies: usize) -> Result<()> {
    let mut recorder = SessionRecorder::new(&cfg.capture, Box::new(FileJointWriter::new()))
        .context("Invalid capture configuration")?;
    if let Some(phrase) = phrase {
        recorder.set_phrase(&phrase)?;
    }
    recorder.check_ready()?;

    let period = Duration::from_millis(33);
    let (color_w, color_h) = (cfg.capture.color_width, cfg.capture.color_height);
    let (depth_w, depth_h) = (cfg.capture.depth_width, cfg.capture.depth_height);

    for tick in 0..ticks {
        recorder.on_body_frame(true, &synthetic_body_frame(tick, bodies, period))?;
        recorder.on_multi_frame(MultiSourceFrame {
            color: Some(synthetic_color_frame(tick, color_w, color_h)),
            depth: Some(synthetic_depth_frame(tick, depth_w, depth_h)),
        });
    }

    let outcome = recorder.on_body_frame(false, &synthetic_body_frame(ticks, bodies, period))?;
    recorder.poll_write_complete();

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}
