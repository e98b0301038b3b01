//! AV Sync core: align an external audio recording to a video.
//!
//! The audio track of the video and the external file are decoded to mono
//! PCM at a common rate ([`ingest`]), cross-correlated to find their offset
//! ([`analysis`]), and the external audio is padded or trimmed by that
//! offset ([`correction`]). An ffmpeg invocation then muxes it back with the
//! video ([`mux`]). [`orchestrator`] runs these stages as analyze and export
//! flows with progress, logs and scratch cleanup. No presentation code lives
//! here.

pub mod analysis;
pub mod config;
pub mod correction;
pub mod ingest;
pub mod logging;
pub mod models;
pub mod mux;
pub mod orchestrator;
