use anyhow::Result;
use clap::Parser;
use lensly::{
    CameraCoordinator, CoordinatorEvent, CoordinatorHandle, CoordinatorServices,
    DirectoryPhotoStore, EventBus, EventFilter, FlashMode, KeyboardInputHandler, LenslyConfig,
    PhotoFormat, SimulatedCamera, TracingHaptics,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;

#[derive(Parser, Debug)]
#[command(name = "lensly")]
#[command(about = "Camera control coordinator with auto/manual arbitration and timed capture")]
#[command(version)]
#[command(long_about = "Runs the camera control coordinator against simulated hardware: \
lens discovery and switching, auto/manual exposure, ISO, shutter, focus and white balance, \
and countdown still capture written to the configured photo directory.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "lensly.toml", help = "Path to TOML configuration file")]
    config: String,

    /// Enable debug logging (most verbose)
    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    /// Enable verbose logging (info level)
    #[arg(short, long, help = "Enable verbose info level logging")]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration file and exit")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,

    /// Write logs to a file instead of stderr
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Number of photos to take before exiting
    #[arg(long, default_value_t = 1)]
    shots: u32,

    /// Countdown length, overriding the configured delay
    #[arg(long, value_name = "TICKS")]
    delay: Option<i32>,

    /// Photo format: heif, jpeg, raw or raw+
    #[arg(long)]
    format: Option<PhotoFormat>,

    /// Flash mode: auto, off, on or torch
    #[arg(long)]
    flash: Option<FlashMode>,

    /// Control the camera from the keyboard until q is pressed
    #[arg(short, long)]
    interactive: bool,

    /// Print the coordinator state as JSON before exiting
    #[arg(long)]
    print_state: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        print_default_config()?;
        return Ok(());
    }

    let _log_guard = init_logging(&args)?;

    info!("Starting lensly v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    let mut config = match LenslyConfig::load_from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if args.validate_config {
        match config.validate() {
            Ok(()) => {
                info!("Configuration validation successful");
                println!("✓ Configuration is valid");
                return Ok(());
            }
            Err(e) => {
                error!("Configuration validation failed: {}", e);
                eprintln!("✗ Configuration validation failed: {}", e);
                std::process::exit(1);
            }
        }
    }

    if let Some(delay) = args.delay {
        config.capture.delay_seconds = delay;
    }
    if let Some(format) = args.format {
        config.capture.format = format;
    }
    if let Some(flash) = args.flash {
        config.capture.flash = flash;
    }

    let exposure_step = config.controls.exposure_bias_step;
    let event_bus = Arc::new(if args.debug {
        EventBus::with_debug_logging(config.system.event_bus_capacity)
    } else {
        EventBus::new(config.system.event_bus_capacity)
    });
    let camera = Arc::new(SimulatedCamera::default_rig());
    let services = CoordinatorServices {
        discovery: camera.clone(),
        backend: camera.clone(),
        delegate: camera.clone(),
        store: Arc::new(DirectoryPhotoStore::new(&config.storage.path)),
        haptics: Arc::new(TracingHaptics),
    };

    let mut captures = event_bus.subscribe_filtered(
        EventFilter::EventTypes(vec!["capture_completed", "capture_failed"]),
        "main",
    );

    let coordinator = CameraCoordinator::spawn(config, services, Arc::clone(&event_bus))
        .await
        .map_err(|e| {
            error!("Failed to start coordinator: {}", e);
            e
        })?;

    let drift_token = CancellationToken::new();
    let drift = camera.spawn_drift(Duration::from_millis(500), drift_token.clone());

    if args.interactive {
        run_interactive(&coordinator, exposure_step).await?;
    } else {
        for shot in 1..=args.shots {
            coordinator.start_capture(None).await?;
            match captures.recv().await? {
                CoordinatorEvent::CaptureCompleted { path, .. } => {
                    println!("Photo {}/{}: {}", shot, args.shots, path.display());
                }
                CoordinatorEvent::CaptureFailed { error, .. } => {
                    eprintln!("Photo {}/{} failed: {}", shot, args.shots, error);
                }
                _ => {}
            }
        }
    }

    if args.print_state && coordinator.is_running() {
        let snapshot = coordinator.snapshot().await?;
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    }

    if coordinator.is_running() {
        coordinator.shutdown("finished").await?;
    }
    drift_token.cancel();
    if let Err(e) = drift.await {
        warn!("Drift task ended abnormally: {}", e);
    }

    info!("lensly exited");
    Ok(())
}

async fn run_interactive(coordinator: &CoordinatorHandle, exposure_step: f32) -> Result<()> {
    let keyboard = KeyboardInputHandler::new(coordinator.clone(), exposure_step);
    keyboard.start().await?;
    println!("space: capture  a: all auto  l: next lens  f: flip  +/-: exposure");
    println!("r: format  h: flash  c: cancel countdown  q: quit");

    tokio::select! {
        _ = coordinator.stopped() => {
            info!("Coordinator stopped");
        }
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                warn!("Failed to listen for Ctrl+C: {}", e);
            }
            info!("Received SIGINT signal (Ctrl+C)");
        }
    }

    keyboard.stop().await?;
    Ok(())
}

fn init_logging(args: &Args) -> Result<Option<WorkerGuard>> {
    use tracing_subscriber::fmt::writer::BoxMakeWriter;
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    // Determine log level based on flags
    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else if args.quiet {
        "error"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("lensly={}", log_level)));

    let (writer, guard) = match &args.log_file {
        Some(path) => {
            let directory = path
                .parent()
                .filter(|parent| !parent.as_os_str().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("."));
            let file_name = path
                .file_name()
                .ok_or_else(|| anyhow::anyhow!("Invalid log file path: {}", path.display()))?;
            let appender = tracing_appender::rolling::never(directory, file_name);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            (BoxMakeWriter::new(non_blocking), Some(guard))
        }
        None => (BoxMakeWriter::new(std::io::stderr), None),
    };
    let ansi = args.log_file.is_none();

    let fmt_layer = match args.log_format.as_deref() {
        Some("json") => fmt::layer()
            .json()
            .with_writer(writer)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        Some("compact") => fmt::layer()
            .compact()
            .with_writer(writer)
            .with_ansi(ansi)
            .with_target(false)
            .boxed(),
        Some("pretty") | None => fmt::layer()
            .pretty()
            .with_writer(writer)
            .with_ansi(ansi)
            .with_target(true)
            .with_thread_ids(args.debug)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer()
                .with_writer(writer)
                .with_ansi(ansi)
                .with_target(true)
                .boxed()
        }
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .init();

    Ok(guard)
}

/// Print default configuration in TOML format
fn print_default_config() -> Result<()> {
    println!("# Lensly Configuration File");
    println!("# This is the default configuration with all available options");
    println!("# Environment overrides use LENSLY_<SECTION>__<KEY>, e.g. LENSLY_CAPTURE__DELAY_SECONDS=3");
    println!();
    println!("{}", toml::to_string_pretty(&LenslyConfig::default())?);
    Ok(())
}
