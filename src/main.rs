//! memchart - periodic per-process memory snapshots.
//!
//! Entry point: resolves configuration, sets up tracing, then either dumps a
//! single snapshot (`--exit`) or runs the sampler alongside the HTTP server.

mod cli;
mod commands;
mod config;
mod handlers;
mod metrics;
mod state;

use axum::{routing::get, Router};
use axum_server::tls_rustls::RustlsConfig;
use clap::Parser;
use prometheus::Registry;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::{net::TcpListener, signal, sync::watch};
use tracing::level_filters::LevelFilter;
use tracing::{debug, error, info};

use memchart::error::display_chain;
use memchart::health_stats::HealthStats;
use memchart::{ExportFormat, Sampler, SnapshotTable};

use cli::{Args, Commands, DumpFormat};
use commands::command_check;
use config::{
    render_config, resolve_config, validate_effective_config, Config, DEFAULT_BIND_ADDR,
    DEFAULT_PORT,
};
use handlers::{csv_handler, health_handler, metrics_handler, root_handler};
use metrics::ProcessMetrics;
use state::{AppState, SharedState};

type ServeError = Box<dyn std::error::Error + Send + Sync>;

/// Initializes tracing with the configured level. Logs go to stderr so that
/// stdout stays clean for CSV/JSON dumps.
fn setup_logging(config: &Config) {
    let level = config
        .log_level
        .as_deref()
        .unwrap_or("info")
        .to_ascii_lowercase();
    let log_level = match level.as_str() {
        "off" => LevelFilter::OFF,
        "error" => LevelFilter::ERROR,
        "warn" => LevelFilter::WARN,
        "debug" => LevelFilter::DEBUG,
        "trace" => LevelFilter::TRACE,
        _ => LevelFilter::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return;
    }

    debug!("Logging initialized with level: {}", log_level);
}

/// Resolves and validates configuration, exiting with code 1 when invalid.
fn load_validated_config(args: &Args) -> Config {
    let config = match resolve_config(args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load configuration: {}", display_chain(&e));
            std::process::exit(1);
        }
    };
    if let Err(e) = validate_effective_config(&config) {
        eprintln!("❌ Configuration invalid: {}", e);
        std::process::exit(1);
    }
    config
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C), shutting down gracefully...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully...");
        }
    }
}

/// Serves the router over plain HTTP or, when enabled, HTTPS.
async fn serve(app: Router, addr: SocketAddr, config: &Config) -> Result<(), ServeError> {
    let tls_paths = config
        .tls_cert_path
        .as_deref()
        .zip(config.tls_key_path.as_deref());

    match tls_paths {
        Some((cert_path, key_path)) if config.enable_tls.unwrap_or(false) => {
            info!("Loading TLS certificate from: {}", cert_path);
            info!("Loading TLS private key from: {}", key_path);
            let tls_config = RustlsConfig::from_pem_file(cert_path, key_path).await?;

            info!("Listening at https://{}", addr);
            axum_server::bind_rustls(addr, tls_config)
                .serve(app.into_make_service())
                .await?;
        }
        _ => {
            let listener = TcpListener::bind(addr).await?;
            info!("Listening at http://{}", addr);
            axum::serve(listener, app).await?;
        }
    }
    Ok(())
}

fn build_router(state: SharedState) -> Router {
    let mut app = Router::new()
        .route("/", get(root_handler))
        .route("/csv", get(csv_handler));

    if state.config.enable_health.unwrap_or(true) {
        app = app.route("/health", get(health_handler));
    }
    if state.config.enable_metrics.unwrap_or(true) {
        app = app.route("/metrics", get(metrics_handler));
    }

    app.with_state(state)
}

/// Main application entry point.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    if args.show_config || args.check_config {
        let config = load_validated_config(&args);
        if args.check_config {
            println!("✅ Configuration is valid");
        } else {
            match render_config(&config, args.config_format) {
                Ok(rendered) => println!("{}", rendered),
                Err(e) => {
                    eprintln!("❌ Failed to render configuration: {}", display_chain(&e));
                    std::process::exit(1);
                }
            }
        }
        return Ok(());
    }

    if let Some(Commands::Check { all }) = &args.command {
        let config = match resolve_config(&args) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("❌ Failed to load configuration: {}", display_chain(&e));
                std::process::exit(1);
            }
        };
        if !command_check(*all, &config) {
            std::process::exit(1);
        }
        return Ok(());
    }

    let config = load_validated_config(&args);
    setup_logging(&config);

    let table = Arc::new(SnapshotTable::new());
    let health_stats = Arc::new(HealthStats::new());
    let settings = config.sampler_settings(args.pids.clone());
    let sampler = Arc::new(Sampler::with_stats(
        Arc::clone(&table),
        settings,
        Arc::clone(&health_stats),
    ));

    // One-shot mode: a single cycle, one dump to stdout, exit.
    if args.exit {
        let format = match args.format {
            DumpFormat::Csv => ExportFormat::Csv,
            DumpFormat::Json => ExportFormat::Json,
        };
        let sampler = Arc::clone(&sampler);
        let result = tokio::task::spawn_blocking(move || {
            sampler.run_once(format, &mut std::io::stdout().lock())
        })
        .await?;
        if let Err(e) = result {
            error!("{}", display_chain(&e));
            std::process::exit(1);
        }
        return Ok(());
    }

    info!("Starting memchart");

    let registry = Registry::new();
    let metrics = ProcessMetrics::new(&registry)?;
    debug!("Prometheus registry initialized");

    let state = Arc::new(AppState {
        table,
        config: Arc::new(config.clone()),
        registry,
        metrics,
        health_stats,
        start_time: Instant::now(),
    });

    let (stop_tx, mut stop_rx) = watch::channel(false);
    let mut sampler_task = tokio::spawn(Arc::clone(&sampler).run_continuous(async move {
        let _ = stop_rx.changed().await;
    }));

    let bind_ip = config.bind.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
    let port = config.port.unwrap_or(DEFAULT_PORT);
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;
    let app = build_router(state);

    tokio::select! {
        result = serve(app, addr, &config) => {
            if let Err(e) = result {
                error!("Server error: {}", e);
                let _ = stop_tx.send(true);
                let e: Box<dyn std::error::Error> = e;
                return Err(e);
            }
        }
        joined = &mut sampler_task => {
            // The sampler only returns early on a fatal error.
            match joined {
                Ok(Ok(())) => info!("Sampler stopped"),
                Ok(Err(e)) => {
                    error!("Fatal sampling error: {}", display_chain(&e));
                    std::process::exit(1);
                }
                Err(e) => {
                    error!("Sampler task failed: {}", e);
                    std::process::exit(1);
                }
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received, exiting...");
        }
    }

    let _ = stop_tx.send(true);
    info!("memchart stopped gracefully");
    Ok(())
}
