//! Topology router: wires stages into a directed graph and runs them.
//!
//! Each stage declares which upstream stage's named stream it consumes.
//! The router is purely structural: every emission from a stage fans out to
//! all subscribers of that (stage, stream) pair. Stages run as independent
//! tokio tasks with bounded inbound queues; a stage with parallelism above
//! one keeps several records in flight, which is how the transcription
//! stage's poll-waits avoid blocking the whole stage. No ordering holds
//! across distinct records.

use crate::bolt::{Bolt, Emission, Stream};
use chrono::{DateTime, Utc};
use oerhub_common::events::{EventBus, PipelineEvent};
use oerhub_common::models::MaterialRecord;
use oerhub_common::{Error, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

const STAGE_QUEUE_CAPACITY: usize = 64;
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(2);

/// Liveness snapshot of one stage, kept current by its heartbeat tick.
#[derive(Debug, Clone, serde::Serialize)]
pub struct StageStatus {
    pub alive: bool,
    pub last_heartbeat: DateTime<Utc>,
}

/// Shared registry the health endpoint reads.
#[derive(Debug, Default)]
pub struct HealthRegistry {
    stages: Mutex<HashMap<String, StageStatus>>,
}

impl HealthRegistry {
    fn touch(&self, stage: &str) {
        let mut stages = self.stages.lock().expect("health registry poisoned");
        stages.insert(
            stage.to_string(),
            StageStatus {
                alive: true,
                last_heartbeat: Utc::now(),
            },
        );
    }

    fn mark_stopped(&self, stage: &str) {
        let mut stages = self.stages.lock().expect("health registry poisoned");
        if let Some(status) = stages.get_mut(stage) {
            status.alive = false;
        }
    }

    pub fn snapshot(&self) -> HashMap<String, StageStatus> {
        self.stages.lock().expect("health registry poisoned").clone()
    }

    /// True while every registered stage still reports alive.
    pub fn all_alive(&self) -> bool {
        self.stages
            .lock()
            .expect("health registry poisoned")
            .values()
            .all(|s| s.alive)
    }
}

struct StageDef {
    name: String,
    bolt: Arc<dyn Bolt>,
    parallelism: usize,
}

struct Subscription {
    source: String,
    stream: Stream,
    target: String,
}

/// Declarative builder for the stage graph. All structural validation
/// happens in [`TopologyBuilder::build`]; a topology that constructs is
/// safe to run.
pub struct TopologyBuilder {
    stages: Vec<StageDef>,
    subscriptions: Vec<Subscription>,
    entry: Option<String>,
    events: EventBus,
}

impl TopologyBuilder {
    pub fn new(events: EventBus) -> Self {
        Self {
            stages: Vec::new(),
            subscriptions: Vec::new(),
            entry: None,
            events,
        }
    }

    /// Add a stage processing one record at a time.
    pub fn add_stage(self, name: &str, bolt: Arc<dyn Bolt>) -> Self {
        self.add_stage_with_parallelism(name, bolt, 1)
    }

    /// Add a stage allowed to keep `parallelism` records in flight.
    pub fn add_stage_with_parallelism(
        mut self,
        name: &str,
        bolt: Arc<dyn Bolt>,
        parallelism: usize,
    ) -> Self {
        self.stages.push(StageDef {
            name: name.to_string(),
            bolt,
            parallelism: parallelism.max(1),
        });
        self
    }

    /// Subscribe `target` to the given stream of `source`.
    pub fn subscribe(mut self, target: &str, source: &str, stream: Stream) -> Self {
        self.subscriptions.push(Subscription {
            source: source.to_string(),
            stream,
            target: target.to_string(),
        });
        self
    }

    /// The stage that receives records injected from the spout.
    pub fn entry(mut self, name: &str) -> Self {
        self.entry = Some(name.to_string());
        self
    }

    /// Validate the graph and start every stage task.
    pub fn build(self) -> Result<Topology> {
        let mut names: Vec<&str> = Vec::new();
        for stage in &self.stages {
            if names.contains(&stage.name.as_str()) {
                return Err(Error::Config(format!(
                    "duplicate stage name '{}' in topology",
                    stage.name
                )));
            }
            names.push(&stage.name);
        }

        let entry = self
            .entry
            .ok_or_else(|| Error::Config("topology has no entry stage".into()))?;
        if !names.contains(&entry.as_str()) {
            return Err(Error::Config(format!(
                "entry stage '{}' is not defined",
                entry
            )));
        }

        for sub in &self.subscriptions {
            if !names.contains(&sub.source.as_str()) {
                return Err(Error::Config(format!(
                    "subscription references unknown source stage '{}'",
                    sub.source
                )));
            }
            if !names.contains(&sub.target.as_str()) {
                return Err(Error::Config(format!(
                    "subscription references unknown target stage '{}'",
                    sub.target
                )));
            }
            if sub.source == sub.target {
                return Err(Error::Config(format!(
                    "stage '{}' cannot subscribe to itself",
                    sub.source
                )));
            }
        }

        // One bounded queue per stage.
        let mut senders: HashMap<String, mpsc::Sender<MaterialRecord>> = HashMap::new();
        let mut receivers: HashMap<String, mpsc::Receiver<MaterialRecord>> = HashMap::new();
        for stage in &self.stages {
            let (tx, rx) = mpsc::channel(STAGE_QUEUE_CAPACITY);
            senders.insert(stage.name.clone(), tx);
            receivers.insert(stage.name.clone(), rx);
        }

        // (source, stream) -> downstream queues.
        let mut routes: HashMap<(String, Stream), Vec<mpsc::Sender<MaterialRecord>>> =
            HashMap::new();
        for sub in &self.subscriptions {
            let sender = senders
                .get(&sub.target)
                .expect("validated above")
                .clone();
            routes
                .entry((sub.source.clone(), sub.stream))
                .or_default()
                .push(sender);
        }

        let health = Arc::new(HealthRegistry::default());
        let cancel = CancellationToken::new();
        let mut handles = Vec::with_capacity(self.stages.len());

        for stage in self.stages {
            let rx = receivers.remove(&stage.name).expect("receiver exists");
            let stage_routes: HashMap<Stream, Vec<mpsc::Sender<MaterialRecord>>> =
                [Stream::Main, Stream::Partial]
                    .into_iter()
                    .filter_map(|stream| {
                        routes
                            .get(&(stage.name.clone(), stream))
                            .map(|targets| (stream, targets.clone()))
                    })
                    .collect();

            health.touch(&stage.name);
            handles.push(tokio::spawn(run_stage(
                stage,
                rx,
                stage_routes,
                self.events.clone(),
                health.clone(),
                cancel.clone(),
            )));
        }
        // Tasks hold the only senders for non-entry stages; drop ours so
        // queues close when upstream stages finish.
        let input = senders
            .remove(&entry)
            .expect("entry sender exists");
        drop(senders);

        Ok(Topology {
            input,
            handles,
            cancel,
            health,
        })
    }
}

/// A running topology.
pub struct Topology {
    input: mpsc::Sender<MaterialRecord>,
    handles: Vec<JoinHandle<()>>,
    cancel: CancellationToken,
    health: Arc<HealthRegistry>,
}

impl Topology {
    /// Queue handle for injecting records at the entry stage.
    pub fn input(&self) -> mpsc::Sender<MaterialRecord> {
        self.input.clone()
    }

    pub fn health(&self) -> Arc<HealthRegistry> {
        self.health.clone()
    }

    /// Close the entry queue and wait for every stage to drain and stop.
    pub async fn drain(self) {
        drop(self.input);
        for handle in self.handles {
            let _ = handle.await;
        }
    }

    /// Cancel all stages, letting in-flight records finish, then wait.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        drop(self.input);
        for handle in self.handles {
            let _ = handle.await;
        }
    }
}

async fn run_stage(
    stage: StageDef,
    mut rx: mpsc::Receiver<MaterialRecord>,
    routes: HashMap<Stream, Vec<mpsc::Sender<MaterialRecord>>>,
    events: EventBus,
    health: Arc<HealthRegistry>,
    cancel: CancellationToken,
) {
    let StageDef {
        name,
        bolt,
        parallelism,
    } = stage;

    let mut inflight: JoinSet<Emission> = JoinSet::new();
    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut accepting = true;

    tracing::info!(stage = %name, parallelism, "stage started");

    loop {
        if !accepting && inflight.is_empty() {
            break;
        }

        tokio::select! {
            _ = cancel.cancelled(), if accepting => {
                tracing::info!(stage = %name, "stage cancelled; draining in-flight records");
                accepting = false;
                rx.close();
            }
            maybe = rx.recv(), if accepting && inflight.len() < parallelism => {
                match maybe {
                    Some(record) => {
                        let bolt = bolt.clone();
                        inflight.spawn(async move { bolt.process(record).await });
                    }
                    None => accepting = false,
                }
            }
            Some(joined) = inflight.join_next(), if !inflight.is_empty() => {
                match joined {
                    Ok(emission) => {
                        dispatch(&name, emission, &routes, &events).await;
                    }
                    Err(e) => {
                        // A panicking bolt loses its record; this is the one
                        // path that must never be silent.
                        tracing::error!(stage = %name, "bolt task failed, record lost: {}", e);
                    }
                }
            }
            _ = heartbeat.tick() => {
                if bolt.heartbeat() {
                    health.touch(&name);
                }
            }
        }
    }

    bolt.shutdown().await;
    health.mark_stopped(&name);
    tracing::info!(stage = %name, "stage drained and stopped");
}

async fn dispatch(
    stage: &str,
    emission: Emission,
    routes: &HashMap<Stream, Vec<mpsc::Sender<MaterialRecord>>>,
    events: &EventBus,
) {
    events.emit(PipelineEvent::StageCompleted {
        stage: stage.to_string(),
        material_url: emission.record.url().map(String::from),
        stream: emission.stream.as_str().to_string(),
        timestamp: Utc::now(),
    });

    match routes.get(&emission.stream) {
        Some(targets) => {
            for target in targets {
                if target.send(emission.record.clone()).await.is_err() {
                    tracing::debug!(
                        stage,
                        stream = emission.stream.as_str(),
                        "downstream queue closed during shutdown"
                    );
                }
            }
        }
        None => {
            // Terminal stage: the record leaves the pipeline here.
            tracing::trace!(stage, stream = emission.stream.as_str(), "terminal emission");
        }
    }
}
