//! Flow step implementations.

mod analyze;
mod export;

pub use analyze::{EstimateOffset, ExtractVideoAudio, IngestBoth, LoadExternalAudio};
pub use export::{ApplyOffset, Encode};
