//! oerhub-preproc - Material Preprocessing Pipeline service
//!
//! Wires the preprocessing topology against the real external services and
//! runs it alongside the health endpoint until interrupted.

use anyhow::Result;
use oerhub_common::config::ServiceConfig;
use oerhub_common::events::EventBus;
use oerhub_preproc::broker::InMemoryBus;
use oerhub_preproc::spout::Spout;
use oerhub_preproc::store::SqlProcessStore;
use oerhub_preproc::ttp::TtpClient;
use oerhub_preproc::wikifier::WikifierClient;
use oerhub_preproc::{build_router, build_topology, AppState, PipelineDeps};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting oerhub-preproc (Material Preprocessing Pipeline)");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::var("OERHUB_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("oerhub.toml"));
    let config = ServiceConfig::load(Some(&config_path))?;

    let db_path = config.database_path();
    info!("Database: {}", db_path.display());
    let db_pool = oerhub_common::db::init_database_pool(&db_path).await?;
    info!("Database connection established");

    let events = EventBus::new(100);
    let bus = Arc::new(InMemoryBus::new());
    let deps = PipelineDeps {
        bus: bus.clone(),
        transcription: Arc::new(TtpClient::new(
            config.ttp.url.clone(),
            config.ttp.user.clone(),
            config.ttp.token.clone(),
        )?),
        annotator: Arc::new(WikifierClient::new(&config.wikifier)?),
        store: Arc::new(SqlProcessStore::new(db_pool)),
        events: events.clone(),
    };

    let topology = build_topology(&config, deps)?;
    info!("Topology started");

    let cancel = CancellationToken::new();
    let spout = Spout::new(
        &config.broker.input_topic,
        &config.broker.group_id,
        bus,
        events,
    );
    let spout_handle = spout.run(topology.input(), cancel.clone()).await;

    let state = AppState {
        health: topology.health(),
    };
    let app = build_router(state);
    let addr = format!("127.0.0.1:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    tokio::select! {
        result = axum::serve(listener, app) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupt received; shutting down");
        }
    }

    cancel.cancel();
    let _ = spout_handle.await;
    topology.shutdown().await;
    info!("Pipeline drained; goodbye");

    Ok(())
}
