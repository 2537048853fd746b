use anyhow::Result;
use clap::Parser;
use parking_lot::Mutex;
use simplecam::{
    CameraSessionController, FrameCounter, HeadlessView, HostView, MockBackend, Rect,
    SimplecamConfig, UiContext,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "simplecam")]
#[command(about = "Open the first camera and render its live feed into a preview surface")]
#[command(version)]
#[command(long_about = "Requests camera access, opens the first video capable device and \
wires it to a preview surface and a frame hook. This build drives a simulated capture \
backend configured from the [mock] section, so it runs without a window or hardware.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "simplecam.toml", help = "Path to TOML configuration file")]
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
    #[arg(long, help = "Validate configuration file and exit without opening the camera")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,

    /// Stop after this many seconds (0 runs until Ctrl-C)
    #[arg(long, default_value_t = 0, help = "Run for N seconds, 0 to run until interrupted")]
    run_seconds: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        println!("# Simplecam Configuration File");
        println!();
        println!("{}", SimplecamConfig::default().to_toml()?);
        return Ok(());
    }

    init_logging(&args)?;

    info!("Starting simplecam v{}", env!("CARGO_PKG_VERSION"));

    let config = match SimplecamConfig::load_from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        eprintln!("✗ Configuration validation failed: {}", e);
        std::process::exit(1);
    }

    if args.validate_config {
        println!("✓ Configuration is valid");
        return Ok(());
    }

    let (ui, ui_loop) = UiContext::new();
    let view = Arc::new(Mutex::new(HeadlessView::new(Rect::from_size(
        config.view.width,
        config.view.height,
    ))));
    let host: Arc<Mutex<dyn HostView>> = view.clone();
    let frames = Arc::new(FrameCounter::new());

    let mut controller = CameraSessionController::builder()
        .backend(Arc::new(MockBackend::from_config(&config.mock)))
        .ui_context(ui)
        .view(host)
        .frame_handler(frames.clone())
        .camera_config(config.camera.clone())
        .delivery_config(config.delivery.clone())
        .build()?;

    controller.activate();

    let cancel = CancellationToken::new();
    spawn_shutdown_trigger(cancel.clone(), args.run_seconds);

    let mut controller = ui_loop.run(controller, cancel).await;

    info!(
        "Shutting down: state {:?}, {} frames delivered, {} dropped, surface mounted: {}",
        controller.state(),
        controller.frames_delivered(),
        controller.frames_dropped(),
        view.lock().layer().is_some()
    );
    controller.teardown();

    info!("Frame hook saw {} frames", frames.frames());
    Ok(())
}

/// Cancel the UI context on Ctrl-C or once the run time elapses
fn spawn_shutdown_trigger(cancel: CancellationToken, run_seconds: u64) {
    tokio::spawn(async move {
        let deadline = async {
            if run_seconds == 0 {
                std::future::pending::<()>().await
            } else {
                tokio::time::sleep(Duration::from_secs(run_seconds)).await
            }
        };

        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    error!("Failed to listen for Ctrl-C: {}", e);
                }
                info!("Received Ctrl-C");
            }
            _ = deadline => {
                info!("Run time of {}s elapsed", run_seconds);
            }
        }

        cancel.cancel();
    });
}

fn init_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

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
        .unwrap_or_else(|_| EnvFilter::new(format!("simplecam={}", log_level)));

    let fmt_layer = match args.log_format.as_deref() {
        Some("json") => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        Some("compact") => fmt::layer()
            .compact()
            .with_target(false)
            .with_thread_ids(false)
            .boxed(),
        Some("pretty") | None => fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_ids(args.debug)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer().with_target(true).boxed()
        }
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .init();

    Ok(())
}
