//! overseed: foreground supervisor daemon
//! Loads an ecosystem file, starts every declared unit, and supervises
//! them until SIGINT/SIGTERM, then stops each unit gracefully.

use oversee_engine::application::UseCaseRegistry;
use oversee_engine::domain::use_cases::LoadConfigCommand;
use oversee_engine::infrastructure::{
    InMemoryUnitRepository, ProcfsMemoryReader, UnixProcessExecutor,
};
use std::env;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    let config_path = match args.get(1) {
        Some(path) => path.clone(),
        None => {
            print_usage();
            std::process::exit(2);
        }
    };

    let repository = Arc::new(InMemoryUnitRepository::new());
    let executor = Arc::new(UnixProcessExecutor::new());
    let memory_reader = Arc::new(ProcfsMemoryReader::new());
    let (registry, exit_rx) = UseCaseRegistry::new(repository, executor, memory_reader);

    let shutdown = CancellationToken::new();
    let supervisor_task = tokio::spawn(registry.supervisor().run(exit_rx, shutdown.clone()));

    let response = registry
        .load_config()
        .execute(LoadConfigCommand {
            path: config_path.clone(),
            start_all: true,
        })
        .await?;

    for (name, message) in &response.failed {
        error!(unit = %name, error = %message, "Unit was not brought up");
    }
    if response.loaded.is_empty() {
        error!(path = %config_path, "No units could be loaded");
        shutdown.cancel();
        let _ = supervisor_task.await;
        std::process::exit(1);
    }

    info!(
        path = %config_path,
        units = response.loaded.len(),
        "Supervising units (Ctrl-C to stop)"
    );

    shutdown_signal().await;
    info!("Shutdown requested, stopping units");

    match registry.unit_status().list().await {
        Ok(views) => {
            for view in views {
                if let Err(e) = registry.stop_unit().execute(&view.name).await {
                    error!(unit = %view.name, error = %e, "Failed to stop unit");
                }
            }
        }
        Err(e) => error!(error = %e, "Failed to list units for shutdown"),
    }

    shutdown.cancel();
    let _ = supervisor_task.await;

    info!("Supervisor shut down");
    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        Err(_) => {
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

fn print_usage() {
    eprintln!("overseed - single-host process supervisor");
    eprintln!();
    eprintln!("Usage: overseed <ecosystem.yaml>");
    eprintln!();
    eprintln!("Loads the given ecosystem file, starts every declared unit,");
    eprintln!("and supervises them in the foreground until SIGINT/SIGTERM.");
    eprintln!();
    eprintln!("Environment Variables:");
    eprintln!("  RUST_LOG    Log filter (default: info)");
}
