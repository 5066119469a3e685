//! Software audio engine.
//!
//! Tracks advance on a virtual clock and report status like a platform player
//! would. Used when no native audio module is linked in.

use super::provider::{
    AudioError, AudioHandle, AudioProvider, AudioStatus, LoadOptions, StatusCallback,
};
use crate::api::StaticCatalog;
use crate::utils::sleep_ms;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

const CLOCK_STEP_MS: u64 = 250;

#[derive(Debug, Default)]
struct TrackState {
    position_millis: u64,
    playing: bool,
    unloaded: bool,
    since_report_ms: u64,
}

struct SimulatedTrack {
    duration_millis: u64,
    interval_ms: u64,
    on_status: StatusCallback,
    state: Mutex<TrackState>,
}

impl SimulatedTrack {
    fn lock(&self) -> MutexGuard<'_, TrackState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn snapshot(&self, state: &TrackState, did_just_finish: bool) -> AudioStatus {
        AudioStatus {
            is_loaded: !state.unloaded,
            is_playing: state.playing,
            position_millis: state.position_millis,
            duration_millis: Some(self.duration_millis),
            did_just_finish,
            error: None,
        }
    }

    /// Advance the track; returns a status report when one is due.
    fn advance(&self, elapsed_ms: u64) -> Option<AudioStatus> {
        let mut state = self.lock();
        if state.unloaded {
            return None;
        }
        let mut finished = false;
        if state.playing {
            state.position_millis = (state.position_millis + elapsed_ms).min(self.duration_millis);
            if state.position_millis >= self.duration_millis {
                state.playing = false;
                finished = true;
            }
        }
        state.since_report_ms += elapsed_ms;
        if finished || state.since_report_ms >= self.interval_ms {
            state.since_report_ms = 0;
            Some(self.snapshot(&state, finished))
        } else {
            None
        }
    }
}

type TrackList = Mutex<Vec<Weak<SimulatedTrack>>>;

#[derive(Clone)]
pub struct SimulatedAudioProvider {
    durations: Arc<HashMap<String, u64>>,
    tracks: Arc<TrackList>,
}

impl SimulatedAudioProvider {
    pub fn new(durations: HashMap<String, u64>) -> Self {
        Self {
            durations: Arc::new(durations),
            tracks: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn for_catalog(catalog: &StaticCatalog) -> Self {
        Self::new(
            catalog
                .episodes()
                .iter()
                .map(|e| (e.stream_url.clone(), e.duration_millis))
                .collect(),
        )
    }

    pub fn clock(&self) -> SimulatedClock {
        SimulatedClock {
            tracks: Arc::downgrade(&self.tracks),
        }
    }
}

/// Drives every live track; runs until the provider is dropped.
pub struct SimulatedClock {
    tracks: Weak<TrackList>,
}

impl SimulatedClock {
    pub async fn run(self) {
        loop {
            sleep_ms(CLOCK_STEP_MS).await;
            if !self.advance(CLOCK_STEP_MS) {
                break;
            }
        }
    }

    /// Returns `false` once the provider is gone.
    pub fn advance(&self, elapsed_ms: u64) -> bool {
        let Some(tracks) = self.tracks.upgrade() else {
            return false;
        };
        let live: Vec<Arc<SimulatedTrack>> = {
            let mut tracks = tracks.lock().unwrap_or_else(|e| e.into_inner());
            tracks.retain(|track| track.strong_count() > 0);
            tracks.iter().filter_map(Weak::upgrade).collect()
        };
        // Callbacks run outside the list lock.
        for track in live {
            if let Some(status) = track.advance(elapsed_ms) {
                (track.on_status)(status);
            }
        }
        true
    }
}

#[async_trait]
impl AudioProvider for SimulatedAudioProvider {
    async fn create(
        &self,
        stream_url: &str,
        options: LoadOptions,
        on_status: StatusCallback,
    ) -> Result<Box<dyn AudioHandle>, AudioError> {
        let Some(duration_millis) = self.durations.get(stream_url).copied() else {
            return Err(AudioError::Load {
                url: stream_url.to_string(),
                reason: "stream not found".to_string(),
            });
        };
        if duration_millis == 0 {
            return Err(AudioError::Engine(format!("{stream_url} has no audio frames")));
        }
        let track = Arc::new(SimulatedTrack {
            duration_millis,
            interval_ms: options.status_interval_ms.max(1),
            on_status,
            state: Mutex::new(TrackState {
                playing: options.autoplay,
                ..Default::default()
            }),
        });
        self.tracks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Arc::downgrade(&track));
        tracing::debug!(stream_url, duration_millis, "simulated track created");
        Ok(Box::new(SimulatedHandle { track }))
    }
}

struct SimulatedHandle {
    track: Arc<SimulatedTrack>,
}

impl SimulatedHandle {
    fn live(&self) -> Result<MutexGuard<'_, TrackState>, AudioError> {
        let state = self.track.lock();
        if state.unloaded {
            Err(AudioError::Unloaded)
        } else {
            Ok(state)
        }
    }
}

#[async_trait]
impl AudioHandle for SimulatedHandle {
    async fn play(&self) -> Result<(), AudioError> {
        let mut state = self.live()?;
        if state.position_millis >= self.track.duration_millis {
            state.position_millis = 0;
        }
        state.playing = true;
        Ok(())
    }

    async fn pause(&self) -> Result<(), AudioError> {
        self.live()?.playing = false;
        Ok(())
    }

    async fn seek(&self, position_millis: u64) -> Result<(), AudioError> {
        self.live()?.position_millis = position_millis.min(self.track.duration_millis);
        Ok(())
    }

    async fn status(&self) -> Result<AudioStatus, AudioError> {
        let state = self.live()?;
        Ok(self.track.snapshot(&state, false))
    }

    async fn stop(&self) -> Result<(), AudioError> {
        let mut state = self.live()?;
        state.playing = false;
        state.position_millis = 0;
        Ok(())
    }

    async fn unload(&self) -> Result<(), AudioError> {
        let mut state = self.track.lock();
        state.unloaded = true;
        state.playing = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (StatusCallback, Arc<Mutex<Vec<AudioStatus>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let callback: StatusCallback = Arc::new(move |status| {
            sink.lock().expect("sink").push(status);
        });
        (callback, seen)
    }

    fn provider() -> SimulatedAudioProvider {
        SimulatedAudioProvider::new(HashMap::from([("https://a.mp3".to_string(), 2_000)]))
    }

    const OPTIONS: LoadOptions = LoadOptions {
        autoplay: true,
        status_interval_ms: 1_000,
    };

    #[tokio::test]
    async fn unknown_stream_fails_to_load() {
        let (callback, _) = recorder();
        let result = provider().create("https://missing.mp3", OPTIONS, callback).await;
        assert!(matches!(result, Err(AudioError::Load { .. })));
    }

    #[tokio::test]
    async fn empty_stream_is_an_engine_error() {
        let provider =
            SimulatedAudioProvider::new(HashMap::from([("https://empty.mp3".to_string(), 0)]));
        let (callback, _) = recorder();
        let result = provider.create("https://empty.mp3", OPTIONS, callback).await;
        assert!(matches!(result, Err(AudioError::Engine(_))));
    }

    #[tokio::test]
    async fn reports_on_the_requested_cadence_and_finishes() {
        let provider = provider();
        let clock = provider.clock();
        let (callback, seen) = recorder();
        let _handle = provider.create("https://a.mp3", OPTIONS, callback).await.expect("handle");

        for _ in 0..8 {
            clock.advance(250);
        }

        let seen = seen.lock().expect("seen");
        let positions: Vec<u64> = seen.iter().map(|s| s.position_millis).collect();
        assert_eq!(positions, vec![1_000, 2_000]);
        assert!(seen.last().expect("last").did_just_finish);
    }

    #[tokio::test]
    async fn paused_track_holds_its_position() {
        let provider = provider();
        let clock = provider.clock();
        let (callback, _) = recorder();
        let handle = provider.create("https://a.mp3", OPTIONS, callback).await.expect("handle");

        clock.advance(500);
        handle.pause().await.expect("pause");
        clock.advance(1_000);

        let status = handle.status().await.expect("status");
        assert_eq!(status.position_millis, 500);
        assert!(!status.is_playing);
    }

    #[tokio::test]
    async fn unloaded_track_stops_reporting() {
        let provider = provider();
        let clock = provider.clock();
        let (callback, seen) = recorder();
        let handle = provider.create("https://a.mp3", OPTIONS, callback).await.expect("handle");

        handle.unload().await.expect("unload");
        clock.advance(1_000);

        assert!(seen.lock().expect("seen").is_empty());
        assert!(matches!(handle.status().await, Err(AudioError::Unloaded)));
    }

    #[test]
    fn clock_stops_when_provider_is_dropped() {
        let provider = provider();
        let clock = provider.clock();
        drop(provider);
        assert!(!clock.advance(250));
    }
}
