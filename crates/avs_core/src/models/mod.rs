//! Data models for AV Sync.
//!
//! This module contains the core data structures used throughout the crate:
//! - Enums for template source, container format, confidence level
//! - The canonical PCM buffer
//! - Analysis results (SyncResult)
//! - Export settings (ExportProfile, MixPolicy) and the JobDescriptor

mod audio;
mod enums;
mod export;
mod jobs;
mod sync;

pub use audio::{ModelError, PcmBuffer, CANONICAL_SAMPLE_RATE};
pub use enums::{ConfidenceLevel, ContainerFormat, CorrelationMethodTag, OverTrimPolicy, TemplateSource};
pub use export::{ExportProfile, MixPolicy, Resolution, ResolutionParseError, PRESETS};
pub use jobs::{is_supported_audio, is_supported_video, JobDescriptor, AUDIO_EXTENSIONS, VIDEO_EXTENSIONS};
pub use sync::{MaxOffset, SyncResult};
