mod classifier;
mod cli;
mod events;
mod kubernetes;
mod remediation;
mod server;
mod types;
mod watcher;

use clap::Parser;
use kube::Client;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info, warn};

use cli::{Cli, Config};
use events::EventLog;
use kubernetes::{KubePodActions, KubePodSource};
use remediation::{GeneratedSuggester, RemediationEngine, Suggester, TemplateSuggester};
use server::build_status_router;
use watcher::PodWatcher;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from(&cli);
    let log = Arc::new(EventLog::new(config.events_max));
    info!(
        "Namespace: {} | auto-apply: {} | generated suggestions: {} | keeping {} events",
        config.namespace,
        config.auto_apply,
        config.use_generated_suggestions,
        log.capacity()
    );

    // The status endpoint stays up even if the watcher never starts.
    tokio::spawn(run_watcher(config.clone(), log.clone(), kubernetes::connect()));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.status_port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Serving status on http://{}/status", addr);
    axum::serve(listener, build_status_router(log))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Connect, then watch forever. A failed connect is recorded and ends the task.
async fn run_watcher<F>(config: Config, log: Arc<EventLog>, connect: F)
where
    F: Future<Output = anyhow::Result<Client>>,
{
    let client = match connect.await {
        Ok(client) => client,
        Err(e) => {
            error!("Pod watcher disabled: {:#}", e);
            log.append(format!("Failed to initialise cluster access: {:#}", e));
            return;
        }
    };

    let suggester: Box<dyn Suggester> = if config.use_generated_suggestions {
        if config.suggestion_endpoint.is_none() {
            warn!("Generated suggestions enabled without an endpoint; using the template");
        }
        Box::new(GeneratedSuggester::new(config.suggestion_endpoint.clone()))
    } else {
        Box::new(TemplateSuggester)
    };

    let engine = RemediationEngine::new(
        suggester,
        Arc::new(KubePodActions::new(client.clone())),
        config.auto_apply,
        log.clone(),
    );
    let source = KubePodSource::new(client, &config.namespace);

    PodWatcher::new(source, engine, log, config.namespace)
        .run()
        .await;
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Could not listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
