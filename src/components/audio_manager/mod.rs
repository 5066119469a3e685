mod gate;
mod provider;
mod session;
mod simulated;

#[cfg(test)]
pub(crate) mod testing;

pub use session::{PlaybackError, PlaybackSession, PlaybackStatus, SessionManager, TransportOutcome};
pub use simulated::SimulatedAudioProvider;

#[cfg(test)]
pub(crate) use provider::AudioStatus;
