//! oerhub-preproc - Material Preprocessing Pipeline
//!
//! Ingests harvested educational-material records from the broker,
//! validates and enriches them (text extraction, transcription,
//! concept-tagging), and routes each record to the complete or partial
//! output topic depending on how far processing succeeded.

pub mod api;
pub mod bolt;
pub mod bolts;
pub mod broker;
pub mod pipeline;
pub mod schema;
pub mod spout;
pub mod store;
pub mod topology;
pub mod ttp;
pub mod wikifier;

pub use api::{build_router, AppState};
pub use pipeline::{build_topology, PipelineDeps};
