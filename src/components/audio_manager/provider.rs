//! Capability interface for the platform audio engine.
//!
//! The session manager only ever talks to these traits, so any engine that can
//! load a stream, report status and seek is substitutable.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AudioError {
    #[error("failed to load stream {url}: {reason}")]
    Load { url: String, reason: String },
    #[error("audio resource was already unloaded")]
    Unloaded,
    #[error("audio engine error: {0}")]
    Engine(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    pub autoplay: bool,
    pub status_interval_ms: u64,
}

/// One status report from a live resource.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AudioStatus {
    pub is_loaded: bool,
    pub is_playing: bool,
    pub position_millis: u64,
    pub duration_millis: Option<u64>,
    pub did_just_finish: bool,
    /// Set when the engine hit an unrecoverable fault.
    pub error: Option<String>,
}

pub type StatusCallback = Arc<dyn Fn(AudioStatus) + Send + Sync>;

#[async_trait]
pub trait AudioHandle: Send + Sync {
    async fn play(&self) -> Result<(), AudioError>;
    async fn pause(&self) -> Result<(), AudioError>;
    async fn seek(&self, position_millis: u64) -> Result<(), AudioError>;
    async fn status(&self) -> Result<AudioStatus, AudioError>;
    async fn stop(&self) -> Result<(), AudioError>;
    async fn unload(&self) -> Result<(), AudioError>;
}

#[async_trait]
pub trait AudioProvider: Send + Sync {
    /// Create a resource bound to `stream_url`. `on_status` is invoked on the
    /// requested cadence until the handle is unloaded.
    async fn create(
        &self,
        stream_url: &str,
        options: LoadOptions,
        on_status: StatusCallback,
    ) -> Result<Box<dyn AudioHandle>, AudioError>;
}
