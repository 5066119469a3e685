//! Scripted audio provider for session tests.

use super::provider::{
    AudioError, AudioHandle, AudioProvider, AudioStatus, LoadOptions, StatusCallback,
};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

#[derive(Default)]
struct Ledger {
    created: Vec<String>,
    callbacks: Vec<StatusCallback>,
    live: usize,
    max_live: usize,
    unloaded: usize,
}

#[derive(Default)]
struct Switches {
    failing_urls: HashSet<String>,
    fail_pause: bool,
    fail_stop: bool,
    hold_loads: bool,
}

#[derive(Clone, Default)]
pub(crate) struct FakeProvider {
    ledger: Arc<Mutex<Ledger>>,
    switches: Arc<Mutex<Switches>>,
    position: Arc<AtomicU64>,
    release: Arc<Notify>,
}

impl FakeProvider {
    pub(crate) fn created(&self) -> Vec<String> {
        self.ledger.lock().expect("ledger").created.clone()
    }

    pub(crate) fn live(&self) -> usize {
        self.ledger.lock().expect("ledger").live
    }

    pub(crate) fn max_live(&self) -> usize {
        self.ledger.lock().expect("ledger").max_live
    }

    pub(crate) fn unloaded(&self) -> usize {
        self.ledger.lock().expect("ledger").unloaded
    }

    /// Status callback registered by the `index`-th created resource.
    pub(crate) fn callback(&self, index: usize) -> StatusCallback {
        Arc::clone(&self.ledger.lock().expect("ledger").callbacks[index])
    }

    pub(crate) fn position(&self) -> u64 {
        self.position.load(Ordering::SeqCst)
    }

    pub(crate) fn set_position(&self, millis: u64) {
        self.position.store(millis, Ordering::SeqCst);
    }

    pub(crate) fn fail_url(&self, url: &str) {
        self.switches
            .lock()
            .expect("switches")
            .failing_urls
            .insert(url.to_string());
    }

    pub(crate) fn fail_pause(&self, fail: bool) {
        self.switches.lock().expect("switches").fail_pause = fail;
    }

    pub(crate) fn fail_stop(&self, fail: bool) {
        self.switches.lock().expect("switches").fail_stop = fail;
    }

    /// Park every `create` until `release_load` is called.
    pub(crate) fn hold_loads(&self, hold: bool) {
        self.switches.lock().expect("switches").hold_loads = hold;
    }

    pub(crate) fn release_load(&self) {
        self.release.notify_one();
    }
}

#[async_trait]
impl AudioProvider for FakeProvider {
    async fn create(
        &self,
        stream_url: &str,
        _options: LoadOptions,
        on_status: StatusCallback,
    ) -> Result<Box<dyn AudioHandle>, AudioError> {
        // Loading is a real suspension point for the caller.
        tokio::task::yield_now().await;
        let hold = self.switches.lock().expect("switches").hold_loads;
        if hold {
            self.release.notified().await;
        }

        let failing = self
            .switches
            .lock()
            .expect("switches")
            .failing_urls
            .contains(stream_url);
        if failing {
            return Err(AudioError::Load {
                url: stream_url.to_string(),
                reason: "404".to_string(),
            });
        }

        let mut ledger = self.ledger.lock().expect("ledger");
        ledger.created.push(stream_url.to_string());
        ledger.callbacks.push(on_status);
        ledger.live += 1;
        ledger.max_live = ledger.max_live.max(ledger.live);

        Ok(Box::new(FakeHandle {
            ledger: Arc::clone(&self.ledger),
            switches: Arc::clone(&self.switches),
            position: Arc::clone(&self.position),
            unloaded: AtomicBool::new(false),
        }))
    }
}

struct FakeHandle {
    ledger: Arc<Mutex<Ledger>>,
    switches: Arc<Mutex<Switches>>,
    position: Arc<AtomicU64>,
    unloaded: AtomicBool,
}

#[async_trait]
impl AudioHandle for FakeHandle {
    async fn play(&self) -> Result<(), AudioError> {
        Ok(())
    }

    async fn pause(&self) -> Result<(), AudioError> {
        if self.switches.lock().expect("switches").fail_pause {
            return Err(AudioError::Engine("pause rejected".into()));
        }
        Ok(())
    }

    async fn seek(&self, position_millis: u64) -> Result<(), AudioError> {
        self.position.store(position_millis, Ordering::SeqCst);
        Ok(())
    }

    async fn status(&self) -> Result<AudioStatus, AudioError> {
        Ok(AudioStatus {
            is_loaded: true,
            is_playing: true,
            position_millis: self.position.load(Ordering::SeqCst),
            duration_millis: None,
            did_just_finish: false,
            error: None,
        })
    }

    async fn stop(&self) -> Result<(), AudioError> {
        if self.switches.lock().expect("switches").fail_stop {
            return Err(AudioError::Engine("stop rejected".into()));
        }
        Ok(())
    }

    async fn unload(&self) -> Result<(), AudioError> {
        if !self.unloaded.swap(true, Ordering::SeqCst) {
            let mut ledger = self.ledger.lock().expect("ledger");
            ledger.live -= 1;
            ledger.unloaded += 1;
        }
        Ok(())
    }
}
