//! SPA gateway
//!
//! Serves a single-page application and its API namespace behind a fixed
//! chain of guards.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ HeaderGuard ─▶ OriginGate ─▶ RateLimiter ─▶ CSRF ─▶ SiteRouter
//!                          │                                            │        │
//!                          │                                        /api/*   anything else
//!                          │                                            ▼        ▼
//!                          │                                      upstream   assets / entry doc
//!     Client Response      ▼
//!     ◀────────────── hardening headers on every response
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tokio::net::TcpListener;

use spa_gateway::config::{load_config, GatewayConfig, Overrides};
use spa_gateway::http::HttpServer;
use spa_gateway::lifecycle::{signals, Shutdown};
use spa_gateway::net::load_tls_config;
use spa_gateway::observability::{init_logging, metrics};
use spa_gateway::routing::{unconfigured_api, UpstreamApi};
use spa_gateway::security::Secret;

#[derive(Parser)]
#[command(name = "spa-gateway")]
#[command(about = "Hardened static-site and API gateway for single-page applications", long_about = None)]
struct Cli {
    /// TOML configuration file. Environment variables and flags override it.
    #[arg(short, long, env = "GATEWAY_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the gateway (default)
    Serve,
    /// Load and validate the configuration, then exit
    CheckConfig,
    /// Print a fresh random value suitable for CSRF_SECRET
    GenerateSecret,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let command = cli.command.unwrap_or(Commands::Serve);
    if let Commands::GenerateSecret = command {
        println!("{}", Secret::generate().to_base64());
        return ExitCode::SUCCESS;
    }

    let config = match load_config(cli.config.as_deref(), &cli.overrides) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Commands::CheckConfig = command {
        print_summary(&config);
        return ExitCode::SUCCESS;
    }

    init_logging(&config.observability);
    match serve(config).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Gateway failed");
            ExitCode::FAILURE
        }
    }
}

fn print_summary(config: &GatewayConfig) {
    println!("Configuration OK");
    println!("  listen:          {}", config.listener.bind_address());
    println!("  tls:             {}", config.listener.tls.is_some());
    println!("  allowed origins: {}", config.cors.origins().join(", "));
    println!(
        "  rate limit:      {} per {} ms (enabled: {})",
        config.rate_limit.max_requests, config.rate_limit.window_ms, config.rate_limit.enabled
    );
    println!("  secure cookies:  {}", config.csrf.secure_cookies);
    println!("  assets:          {}", config.assets.root.display());
    println!(
        "  api:             {} -> {}",
        config.api.prefix,
        config.api.upstream.as_deref().unwrap_or("(unconfigured)")
    );
}

async fn serve(config: GatewayConfig) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        bind_address = %config.listener.bind_address(),
        tls = config.listener.tls.is_some(),
        rate_limit_window_ms = config.rate_limit.window_ms,
        rate_limit_max = config.rate_limit.max_requests,
        asset_root = ?config.assets.root,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let api = match &config.api.upstream {
        Some(upstream) => {
            tracing::info!(upstream = %upstream, prefix = %config.api.prefix, "Forwarding API requests");
            UpstreamApi::new(upstream, Duration::from_secs(config.api.timeout_secs))?.into_router()
        }
        None => {
            tracing::warn!(prefix = %config.api.prefix, "No API upstream configured, API requests will get 503");
            unconfigured_api()
        }
    };

    let tls = config.listener.tls.clone();
    let addr = config.listener.socket_addr()?;
    let server = HttpServer::new(config, api)?;

    let shutdown = Shutdown::new();
    signals::spawn_signal_listener(shutdown.clone());

    match tls {
        Some(tls) => {
            let tls = load_tls_config(&tls).await?;
            server.run_tls(addr, tls, &shutdown).await?;
        }
        None => {
            let listener = TcpListener::bind(addr).await?;
            server.run(listener, &shutdown).await?;
        }
    }
    Ok(())
}
