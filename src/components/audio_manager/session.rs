//! Playback session: one owned audio resource, serialized transport, and
//! per-field observable state.

use super::gate::TransportGate;
use super::provider::{AudioError, AudioHandle, AudioProvider, AudioStatus, LoadOptions, StatusCallback};
use crate::api::{Episode, EpisodeCatalog};
use crate::config::PlaybackConfig;
use crate::diagnostics::log_perf;
use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use thiserror::Error;
use tokio::sync::{mpsc, watch, Mutex};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlaybackStatus {
    #[default]
    Idle,
    Loading,
    Playing,
    Paused,
    Closed,
    Failed,
}

impl PlaybackStatus {
    pub fn is_playing(self) -> bool {
        self == PlaybackStatus::Playing
    }

    pub fn is_loading(self) -> bool {
        self == PlaybackStatus::Loading
    }

    /// Statuses in which the session owns a live resource.
    pub fn holds_resource(self) -> bool {
        matches!(
            self,
            PlaybackStatus::Loading | PlaybackStatus::Playing | PlaybackStatus::Paused
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaybackSession {
    pub status: PlaybackStatus,
    pub current_episode: Option<Episode>,
    pub position_millis: u64,
    pub duration_millis: u64,
}

/// What a transport call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportOutcome {
    Applied,
    /// The session was already in the requested state.
    Unchanged,
    /// Another transport operation held the gate.
    Dropped,
    NoSession,
}

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("could not start {url}")]
    ResourceCreation {
        url: String,
        #[source]
        source: AudioError,
    },
    #[error("{operation} had no effect")]
    TransientControl {
        operation: &'static str,
        #[source]
        source: AudioError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceId(pub u64);

struct ActiveResource {
    id: ResourceId,
    handle: Box<dyn AudioHandle>,
}

#[derive(Debug)]
struct StatusEvent {
    resource: ResourceId,
    status: AudioStatus,
}

fn replace_if_changed<T: PartialEq>(sender: &watch::Sender<T>, value: T) {
    sender.send_if_modified(|current| {
        if *current == value {
            false
        } else {
            *current = value;
            true
        }
    });
}

struct SessionState {
    status: watch::Sender<PlaybackStatus>,
    episode: watch::Sender<Option<Episode>>,
    position: watch::Sender<u64>,
    duration: watch::Sender<u64>,
}

impl SessionState {
    fn new() -> Self {
        Self {
            status: watch::channel(PlaybackStatus::Idle).0,
            episode: watch::channel(None).0,
            position: watch::channel(0).0,
            duration: watch::channel(0).0,
        }
    }

    fn set_status(&self, status: PlaybackStatus) {
        replace_if_changed(&self.status, status);
    }

    fn set_position(&self, millis: u64) {
        replace_if_changed(&self.position, millis);
    }

    fn set_duration(&self, millis: u64) {
        replace_if_changed(&self.duration, millis);
    }

    fn begin(&self, episode: &Episode, status: PlaybackStatus) {
        self.set_duration(episode.duration_millis);
        self.set_position(0);
        replace_if_changed(&self.episode, Some(episode.clone()));
        self.set_status(status);
    }

    fn reset(&self, status: PlaybackStatus) {
        replace_if_changed(&self.episode, None);
        self.set_position(0);
        self.set_duration(0);
        self.set_status(status);
    }
}

struct SessionInner {
    provider: Arc<dyn AudioProvider>,
    catalog: Arc<dyn EpisodeCatalog>,
    config: PlaybackConfig,
    gate: TransportGate,
    slot: Mutex<Option<ActiveResource>>,
    next_resource: AtomicU64,
    state: SessionState,
    status_events: mpsc::UnboundedSender<StatusEvent>,
}

impl SessionInner {
    async fn teardown_locked(&self, slot: &mut Option<ActiveResource>, status: PlaybackStatus) {
        if let Some(resource) = slot.take() {
            release(resource).await;
        }
        self.state.reset(status);
    }
}

async fn release(resource: ActiveResource) {
    let id = resource.id.0;
    if let Err(err) = resource.handle.stop().await {
        tracing::warn!(resource = id, error = %err, "stop failed during teardown");
    }
    if let Err(err) = resource.handle.unload().await {
        tracing::warn!(resource = id, error = %err, "unload failed during teardown");
    }
}

fn transient(operation: &'static str, source: AudioError) -> PlaybackError {
    tracing::warn!(operation, error = %source, "transport control failed");
    PlaybackError::TransientControl { operation, source }
}

/// New position after skipping `delta_seconds` from `position_millis`.
/// A zero duration means the length is not known yet and only the lower
/// bound applies.
pub fn clamp_seek_target(position_millis: u64, delta_seconds: f64, duration_millis: u64) -> u64 {
    let target = position_millis as f64 + delta_seconds * 1000.0;
    let upper = if duration_millis == 0 {
        u64::MAX as f64
    } else {
        duration_millis as f64
    };
    target.clamp(0.0, upper).round() as u64
}

/// Cheap handle to the single playback session.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<SessionInner>,
}

/// Applies resource status ticks to the session. Stops once the session is
/// dropped.
pub struct StatusPump {
    session: Weak<SessionInner>,
    events: mpsc::UnboundedReceiver<StatusEvent>,
}

impl StatusPump {
    pub async fn run(mut self) {
        while self.next().await {}
        tracing::debug!("status pump stopped");
    }

    /// Apply one pending event. Returns `false` when the session is gone.
    pub async fn next(&mut self) -> bool {
        let Some(event) = self.events.recv().await else {
            return false;
        };
        let Some(inner) = self.session.upgrade() else {
            return false;
        };
        SessionManager { inner }.on_status(event).await;
        true
    }
}

impl SessionManager {
    pub fn new(
        provider: Arc<dyn AudioProvider>,
        catalog: Arc<dyn EpisodeCatalog>,
        config: PlaybackConfig,
    ) -> (Self, StatusPump) {
        let (status_events, events) = mpsc::unbounded_channel();
        let inner = Arc::new(SessionInner {
            provider,
            catalog,
            config,
            gate: TransportGate::new(),
            slot: Mutex::new(None),
            next_resource: AtomicU64::new(0),
            state: SessionState::new(),
            status_events,
        });
        let pump = StatusPump {
            session: Arc::downgrade(&inner),
            events,
        };
        (Self { inner }, pump)
    }

    pub fn snapshot(&self) -> PlaybackSession {
        let state = &self.inner.state;
        PlaybackSession {
            status: *state.status.borrow(),
            current_episode: state.episode.borrow().clone(),
            position_millis: *state.position.borrow(),
            duration_millis: *state.duration.borrow(),
        }
    }

    pub fn status(&self) -> PlaybackStatus {
        *self.inner.state.status.borrow()
    }

    pub fn current_episode(&self) -> Option<Episode> {
        self.inner.state.episode.borrow().clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<PlaybackStatus> {
        self.inner.state.status.subscribe()
    }

    pub fn subscribe_episode(&self) -> watch::Receiver<Option<Episode>> {
        self.inner.state.episode.subscribe()
    }

    pub fn subscribe_position(&self) -> watch::Receiver<u64> {
        self.inner.state.position.subscribe()
    }

    pub fn subscribe_duration(&self) -> watch::Receiver<u64> {
        self.inner.state.duration.subscribe()
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.inner.config
    }

    pub fn catalog(&self) -> Arc<dyn EpisodeCatalog> {
        Arc::clone(&self.inner.catalog)
    }

    #[cfg(test)]
    pub fn is_busy(&self) -> bool {
        self.inner.gate.is_busy()
    }

    #[cfg(test)]
    pub fn dropped_calls(&self) -> u64 {
        self.inner.gate.rejected()
    }

    #[cfg(test)]
    pub async fn has_resource(&self) -> bool {
        self.inner.slot.lock().await.is_some()
    }

    pub async fn play_episode(&self, episode: Episode) -> Result<TransportOutcome, PlaybackError> {
        let Some(_permit) = self.inner.gate.try_enter("play_episode") else {
            return Ok(TransportOutcome::Dropped);
        };
        self.load(episode).await
    }

    async fn load(&self, episode: Episode) -> Result<TransportOutcome, PlaybackError> {
        let inner = &self.inner;
        let started = Utc::now();
        let mut slot = inner.slot.lock().await;

        inner.state.set_status(PlaybackStatus::Loading);
        if let Some(previous) = slot.take() {
            release(previous).await;
        }

        let id = ResourceId(inner.next_resource.fetch_add(1, Ordering::Relaxed) + 1);
        let options = LoadOptions {
            autoplay: inner.config.autoplay,
            status_interval_ms: inner.config.status_interval_ms,
        };
        match inner
            .provider
            .create(&episode.stream_url, options, self.status_callback(id))
            .await
        {
            Ok(handle) => {
                *slot = Some(ActiveResource { id, handle });
                let status = if inner.config.autoplay {
                    PlaybackStatus::Playing
                } else {
                    PlaybackStatus::Paused
                };
                inner.state.begin(&episode, status);
                tracing::info!(episode = %episode.id, resource = id.0, "episode loaded");
                log_perf("load_episode", started, &episode.id);
                Ok(TransportOutcome::Applied)
            }
            Err(source) => {
                tracing::warn!(episode = %episode.id, error = %source, "could not create audio resource");
                inner.teardown_locked(&mut slot, PlaybackStatus::Failed).await;
                Err(PlaybackError::ResourceCreation {
                    url: episode.stream_url,
                    source,
                })
            }
        }
    }

    fn status_callback(&self, resource: ResourceId) -> StatusCallback {
        let events = self.inner.status_events.clone();
        Arc::new(move |status| {
            // The pump is gone once the session is dropped.
            let _ = events.send(StatusEvent { resource, status });
        })
    }

    pub async fn play_next(&self) -> Result<TransportOutcome, PlaybackError> {
        let Some(current) = self.current_episode() else {
            return Ok(TransportOutcome::NoSession);
        };
        match self.inner.catalog.next_after(&current) {
            Some(next) => self.play_episode(next).await,
            None => Ok(TransportOutcome::NoSession),
        }
    }

    pub async fn play_previous(&self) -> Result<TransportOutcome, PlaybackError> {
        let Some(current) = self.current_episode() else {
            return Ok(TransportOutcome::NoSession);
        };
        match self.inner.catalog.previous_before(&current) {
            Some(previous) => self.play_episode(previous).await,
            None => Ok(TransportOutcome::NoSession),
        }
    }

    pub async fn toggle_play_pause(&self) -> Result<TransportOutcome, PlaybackError> {
        self.switch_play_state("toggle_play_pause", |status| match status {
            PlaybackStatus::Playing => Some(PlaybackStatus::Paused),
            PlaybackStatus::Paused => Some(PlaybackStatus::Playing),
            _ => None,
        })
        .await
    }

    #[allow(dead_code)]
    pub async fn pause(&self) -> Result<TransportOutcome, PlaybackError> {
        self.switch_play_state("pause", |status| {
            status.is_playing().then_some(PlaybackStatus::Paused)
        })
        .await
    }

    #[allow(dead_code)]
    pub async fn resume(&self) -> Result<TransportOutcome, PlaybackError> {
        self.switch_play_state("resume", |status| {
            (status == PlaybackStatus::Paused).then_some(PlaybackStatus::Playing)
        })
        .await
    }

    async fn switch_play_state<F>(
        &self,
        operation: &'static str,
        next: F,
    ) -> Result<TransportOutcome, PlaybackError>
    where
        F: FnOnce(PlaybackStatus) -> Option<PlaybackStatus>,
    {
        if self.inner.state.episode.borrow().is_none() {
            return Ok(TransportOutcome::NoSession);
        }
        let Some(_permit) = self.inner.gate.try_enter(operation) else {
            return Ok(TransportOutcome::Dropped);
        };
        let slot = self.inner.slot.lock().await;
        let Some(active) = slot.as_ref() else {
            return Ok(TransportOutcome::NoSession);
        };

        let previous = self.status();
        let Some(target) = next(previous) else {
            return Ok(TransportOutcome::Unchanged);
        };

        // Optimistic; reverted below if the engine refuses.
        self.inner.state.set_status(target);
        let result = if target.is_playing() {
            active.handle.play().await
        } else {
            active.handle.pause().await
        };
        match result {
            Ok(()) => Ok(TransportOutcome::Applied),
            Err(source) => {
                self.inner.state.set_status(previous);
                Err(transient(operation, source))
            }
        }
    }

    /// Skip by `delta_seconds` relative to the resource's live position.
    pub async fn seek(&self, delta_seconds: f64) -> Result<TransportOutcome, PlaybackError> {
        let Some(_permit) = self.inner.gate.try_enter("seek") else {
            return Ok(TransportOutcome::Dropped);
        };
        let slot = self.inner.slot.lock().await;
        let Some(active) = slot.as_ref() else {
            return Ok(TransportOutcome::NoSession);
        };

        let live = active
            .handle
            .status()
            .await
            .map_err(|e| transient("seek", e))?;
        let duration = live
            .duration_millis
            .filter(|millis| *millis > 0)
            .unwrap_or_else(|| *self.inner.state.duration.borrow());
        let target = clamp_seek_target(live.position_millis, delta_seconds, duration);

        active
            .handle
            .seek(target)
            .await
            .map_err(|e| transient("seek", e))?;
        self.inner.state.set_position(target);
        Ok(TransportOutcome::Applied)
    }

    pub async fn close(&self) -> TransportOutcome {
        let Some(_permit) = self.inner.gate.try_enter("close") else {
            return TransportOutcome::Dropped;
        };
        let mut slot = self.inner.slot.lock().await;
        self.inner
            .teardown_locked(&mut slot, PlaybackStatus::Closed)
            .await;
        tracing::info!("playback session closed");
        TransportOutcome::Applied
    }

    async fn on_status(&self, event: StatusEvent) {
        let finished = {
            let mut slot = self.inner.slot.lock().await;
            let current = slot.as_ref().map(|active| active.id);
            if current != Some(event.resource) {
                tracing::trace!(resource = event.resource.0, "ignoring stale status tick");
                return;
            }
            if let Some(message) = event.status.error.as_deref() {
                tracing::warn!(resource = event.resource.0, error = message, "playback fault, closing session");
                self.inner
                    .teardown_locked(&mut slot, PlaybackStatus::Failed)
                    .await;
                return;
            }

            self.inner.state.set_position(event.status.position_millis);
            if let Some(duration) = event.status.duration_millis.filter(|d| *d > 0) {
                self.inner.state.set_duration(duration);
            }
            if event.status.did_just_finish {
                self.inner.state.set_status(PlaybackStatus::Paused);
            }
            event.status.did_just_finish
        };

        if finished {
            match self.play_next().await {
                Ok(outcome) => tracing::debug!(?outcome, "advanced after episode finished"),
                Err(err) => tracing::warn!(error = %err, "could not advance after episode finished"),
            }
        }
    }
}
