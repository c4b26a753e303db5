//! The stage execution contract.
//!
//! Every pipeline stage implements [`Bolt`]. A stage receives one record,
//! does its work, and resolves to exactly one [`Emission`] — either onward
//! on the main stream with an enriched record, or onto the partial stream
//! with a failure message attached. Returning the emission (rather than
//! invoking a passed-in callback) makes the exactly-once property a
//! type-level guarantee.

use async_trait::async_trait;
use oerhub_common::models::MaterialRecord;

/// Named output stream of a stage. Routing only; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stream {
    Main,
    Partial,
}

impl Stream {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stream::Main => "main",
            Stream::Partial => "partial",
        }
    }
}

/// The single result of processing one record.
#[derive(Debug, Clone)]
pub struct Emission {
    pub stream: Stream,
    pub record: MaterialRecord,
}

impl Emission {
    /// Forward the record to downstream subscribers.
    pub fn main(record: MaterialRecord) -> Self {
        Self {
            stream: Stream::Main,
            record,
        }
    }

    /// Divert the record to the partial sink.
    pub fn partial(record: MaterialRecord) -> Self {
        Self {
            stream: Stream::Partial,
            record,
        }
    }
}

/// A single transformation stage.
///
/// `process` must resolve for every record it accepts; failure paths divert
/// the record to the partial stream instead of raising. Side effects must be
/// safe to retry: the upstream transport delivers at least once, so a
/// redelivered record may be reprocessed in full.
#[async_trait]
pub trait Bolt: Send + Sync {
    /// Stage instance name, used in failure-message prefixes and logs.
    fn name(&self) -> &str;

    /// Process one record to exactly one emission.
    async fn process(&self, record: MaterialRecord) -> Emission;

    /// Non-blocking liveness check; used for health reporting only.
    fn heartbeat(&self) -> bool {
        true
    }

    /// Release resources. In-flight emissions complete before the stage
    /// reports itself drained.
    async fn shutdown(&self) {}
}

/// Attach a stage-prefixed failure message and divert to the partial stream.
pub fn divert(mut record: MaterialRecord, prefix: &str, why: impl AsRef<str>) -> Emission {
    record.message = Some(format!("{} {}", prefix, why.as_ref()));
    Emission::partial(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn divert_sets_prefixed_message() {
        let record = MaterialRecord::default();
        let emission = divert(record, "[TestBolt t-1]", "no raw text");
        assert_eq!(emission.stream, Stream::Partial);
        assert_eq!(
            emission.record.message.as_deref(),
            Some("[TestBolt t-1] no raw text")
        );
    }
}
