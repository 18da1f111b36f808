use std::{net::SocketAddr, sync::Arc, time::Duration};

use caramella::{
    common::{logger, types::AnyResult},
    configs::Config,
    jobs,
    ledger::{MemoryStore, ScoreStore},
    server::{AppState, run_event_loop},
    transport::http_server,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> AnyResult<()> {
    let config = Config::load()?;
    logger::init(config.logging.as_ref());

    let store: Arc<dyn ScoreStore> = match &config.ledger.snapshot_path {
        Some(path) => Arc::new(MemoryStore::open(path.clone()).await?),
        None => {
            warn!("No ledger.snapshot_path configured; scores will not survive a restart");
            Arc::new(MemoryStore::new())
        }
    };
    let address: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;

    let (state, events) = AppState::new(config, store);
    let event_loop = tokio::spawn(run_event_loop(
        state.controller.clone(),
        state.bridge.clone(),
        events,
    ));

    let cancel = CancellationToken::new();
    let job_handles = spawn_jobs(&state, &cancel);

    let listener = tokio::net::TcpListener::bind(address).await?;
    info!("caramella listening on {}", address);
    axum::serve(listener, http_server::router(state.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    cancel.cancel();
    for handle in job_handles {
        if let Err(e) = handle.await {
            error!("Job panicked: {}", e);
        }
    }
    event_loop.abort();

    jobs::flush_scores(&state.registry, &state.ledger).await;
    info!("Final flush done");
    Ok(())
}

fn every(secs: u64) -> Duration {
    Duration::from_secs(secs.max(1))
}

fn spawn_jobs(state: &Arc<AppState>, cancel: &CancellationToken) -> Vec<JoinHandle<()>> {
    let periods = &state.config.jobs;
    let mut handles = Vec::with_capacity(3);

    let s = state.clone();
    handles.push(jobs::spawn_every(
        "flush",
        every(periods.flush_secs),
        cancel.clone(),
        move || {
            let s = s.clone();
            async move { jobs::flush_scores(&s.registry, &s.ledger).await }
        },
    ));

    let s = state.clone();
    handles.push(jobs::spawn_every(
        "presence",
        every(periods.presence_secs),
        cancel.clone(),
        move || {
            let s = s.clone();
            async move { jobs::update_presence(&s.controller, s.bridge.as_ref()).await }
        },
    ));

    if state.config.badges.is_some() {
        let s = state.clone();
        handles.push(jobs::spawn_every(
            "badges",
            every(periods.badges_secs),
            cancel.clone(),
            move || {
                let s = s.clone();
                async move {
                    let Some(badges) = &s.config.badges else {
                        return;
                    };
                    if let Err(e) = jobs::sync_badges(&s.ledger, badges, s.bridge.as_ref()).await {
                        warn!("Badge sync skipped: {}", e);
                    }
                }
            },
        ));
    }

    handles
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for ctrl-c: {}", e);
    }
    info!("Shutting down...");
}
