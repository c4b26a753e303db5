//! Pipeline stage implementations.

pub mod broker_sink;
pub mod material_format;
pub mod material_type;
pub mod material_validator;
pub mod text_extraction;
pub mod ttp_transcription;
pub mod wikification;

pub use broker_sink::BrokerSinkBolt;
pub use material_format::MaterialFormatBolt;
pub use material_type::MaterialTypeBolt;
pub use material_validator::MaterialValidatorBolt;
pub use text_extraction::TextExtractionBolt;
pub use ttp_transcription::{TranscriptionSettings, TtpTranscriptionBolt};
pub use wikification::WikificationBolt;
