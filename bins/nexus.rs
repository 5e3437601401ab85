use std::sync::Arc;

use clap::{Parser, Subcommand};
use client::{LocatorConfig, ServiceKind, ServiceLocator};
use common::diagnostics::TracingDiagnostics;
use dotenvy::dotenv;
use tracing::{error, info};
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "nexus", version, about = "Unified backend client")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the resolved service endpoints as JSON
    Endpoints,
    /// Call a serverless function and print its JSON response
    Call {
        name: String,
        #[arg(long, default_value = "{}")]
        body: String,
    },
}

fn init_logging(json: bool) {
    if json {
        common::utils::logging::init_logging_json();
    } else {
        common::utils::logging::init_logging_default();
    }
    info!(service = "nexus", event = "logger_init", "tracing subscriber initialized");
}

fn main() -> std::process::ExitCode {
    // .env first so RUST_LOG / CONFIG_PATH / NEXUS_* take effect
    dotenv().ok();
    let cli = Cli::parse();

    let cfg = match configs::ClientConfig::load_and_validate() {
        Ok(cfg) => cfg,
        Err(e) => {
            init_logging(false);
            error!(service = "nexus", event = "config_invalid", error = %e, "failed to load configuration");
            return std::process::ExitCode::FAILURE;
        }
    };
    init_logging(cfg.logging.json);

    let run_id = Uuid::new_v4();
    std::panic::set_hook(Box::new(move |info| {
        error!(service = "nexus", event = "panic", %run_id, message = %info, "unhandled panic occurred");
    }));

    let mut locator_cfg = LocatorConfig::from_client_config(&cfg);
    locator_cfg.options = locator_cfg.options.with_diagnostics(Arc::new(TracingDiagnostics));
    let locator = match ServiceLocator::create(locator_cfg) {
        Ok(locator) => locator,
        Err(e) => {
            error!(service = "nexus", event = "configuration_error", error = %e, "cannot build client");
            return std::process::ExitCode::FAILURE;
        }
    };

    let outcome = match cli.command {
        Command::Endpoints => print_endpoints(&locator),
        Command::Call { name, body } => call_function(&locator, &name, &body, cfg.auth.auto_refresh),
    };
    locator.close();

    match outcome {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            error!(service = "nexus", event = "command_failed", %run_id, error = %e, "command failed");
            std::process::ExitCode::FAILURE
        }
    }
}

fn print_endpoints(locator: &ServiceLocator) -> anyhow::Result<()> {
    let mut endpoints = serde_json::Map::new();
    for kind in ServiceKind::ALL {
        endpoints.insert(kind.to_string(), serde_json::Value::String(locator.endpoint(kind)));
    }
    println!("{}", serde_json::to_string_pretty(&endpoints)?);
    Ok(())
}

fn call_function(locator: &ServiceLocator, name: &str, body: &str, auto_refresh: bool) -> anyhow::Result<()> {
    let body: serde_json::Value = serde_json::from_str(body)?;
    let rt = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    rt.block_on(async {
        let auth = locator.auth()?;
        if auth.restore_session()? && auto_refresh {
            auth.start_auto_refresh()?;
        }
        let functions = locator.functions()?;
        info!(service = "nexus", event = "call", function = name, endpoint = functions.endpoint(), "calling function");
        let response: serde_json::Value = functions.call(name, &body).await?;
        println!("{}", serde_json::to_string_pretty(&response)?);
        Ok::<(), anyhow::Error>(())
    })
}
