use dioxus::prelude::*;
use tokio::sync::watch;

use crate::api::Episode;
use crate::components::app_view::AppView;
use crate::components::audio_manager::{
    PlaybackError, PlaybackStatus, SessionManager, TransportOutcome,
};
use crate::components::navigation::Navigation;
use crate::components::Icon;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlayGlyph {
    Spinner,
    #[default]
    Play,
    Pause,
}

impl PlayGlyph {
    pub fn icon_name(self) -> &'static str {
        match self {
            PlayGlyph::Spinner => "loader",
            PlayGlyph::Play => "play",
            PlayGlyph::Pause => "pause",
        }
    }
}

/// Spinner only on the very first load; afterwards a reload keeps the static
/// play glyph so the control does not flicker between episodes.
pub fn play_glyph(is_playing: bool, is_loading: bool, has_played: bool) -> PlayGlyph {
    match (is_loading, has_played, is_playing) {
        (true, false, _) => PlayGlyph::Spinner,
        (true, true, _) => PlayGlyph::Play,
        (false, _, true) => PlayGlyph::Pause,
        (false, _, false) => PlayGlyph::Play,
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MiniPlayerView {
    pub glyph: PlayGlyph,
    pub visible: bool,
    pub title: String,
    pub show_title: String,
    pub artwork_url: Option<String>,
}

/// Watches only the session's status and episode; position ticks never reach
/// the mini player.
#[derive(Clone)]
pub struct MiniPlayerPresenter {
    session: SessionManager,
    status: watch::Receiver<PlaybackStatus>,
    episode: watch::Receiver<Option<Episode>>,
    has_played: bool,
}

impl MiniPlayerPresenter {
    pub fn new(session: SessionManager) -> Self {
        let status = session.subscribe_status();
        let episode = session.subscribe_episode();
        Self {
            session,
            status,
            episode,
            has_played: false,
        }
    }

    pub fn view(&mut self) -> MiniPlayerView {
        let status = *self.status.borrow_and_update();
        if matches!(status, PlaybackStatus::Playing | PlaybackStatus::Paused) {
            self.has_played = true;
        }
        let glyph = play_glyph(status.is_playing(), status.is_loading(), self.has_played);

        let episode = self.episode.borrow_and_update();
        match episode.as_ref() {
            Some(episode) => MiniPlayerView {
                glyph,
                visible: true,
                title: episode.title.clone(),
                show_title: episode.show_title.clone(),
                artwork_url: episode.artwork_url().map(str::to_string),
            },
            None => MiniPlayerView {
                glyph,
                ..MiniPlayerView::default()
            },
        }
    }

    /// Resolves when the status or the episode changes. `false` once the
    /// session is gone.
    pub async fn changed(&mut self) -> bool {
        tokio::select! {
            changed = self.status.changed() => changed.is_ok(),
            changed = self.episode.changed() => changed.is_ok(),
        }
    }

    pub async fn on_play_pause(&self) -> Result<TransportOutcome, PlaybackError> {
        self.session.toggle_play_pause().await
    }

    pub async fn on_skip_back(&self) -> Result<TransportOutcome, PlaybackError> {
        let seconds = self.session.config().skip_back_seconds;
        self.session.seek(-seconds).await
    }

    pub async fn on_close(&self) -> TransportOutcome {
        self.session.close().await
    }
}

fn report(action: &'static str, result: Result<TransportOutcome, PlaybackError>) {
    match result {
        Ok(outcome) => tracing::debug!(action, ?outcome, "mini player action"),
        Err(err) => tracing::warn!(action, error = %err, "mini player action failed"),
    }
}

#[component]
pub fn MiniPlayer() -> Element {
    let session = use_context::<SessionManager>();
    let navigation = use_context::<Navigation>();
    let presenter = use_hook(|| MiniPlayerPresenter::new(session.clone()));
    let mut view = use_signal(MiniPlayerView::default);

    {
        let presenter = presenter.clone();
        use_future(move || {
            let mut presenter = presenter.clone();
            async move {
                loop {
                    view.set(presenter.view());
                    if !presenter.changed().await {
                        break;
                    }
                }
            }
        });
    }

    let current = view();
    let class = if current.visible {
        "mini-player mini-player--visible"
    } else {
        "mini-player"
    };
    let hidden = if current.visible { "false" } else { "true" };
    let glyph_class = if current.glyph == PlayGlyph::Spinner {
        "icon icon--spin"
    } else {
        "icon"
    };

    let on_play_pause = {
        let presenter = presenter.clone();
        move |evt: MouseEvent| {
            evt.stop_propagation();
            let presenter = presenter.clone();
            spawn(async move { report("play_pause", presenter.on_play_pause().await) });
        }
    };
    let on_skip_back = {
        let presenter = presenter.clone();
        move |evt: MouseEvent| {
            evt.stop_propagation();
            let presenter = presenter.clone();
            spawn(async move { report("skip_back", presenter.on_skip_back().await) });
        }
    };
    let on_close = {
        let presenter = presenter.clone();
        move |evt: MouseEvent| {
            evt.stop_propagation();
            let presenter = presenter.clone();
            spawn(async move { report("close", Ok(presenter.on_close().await)) });
        }
    };

    rsx! {
        div {
            class: "{class}",
            aria_hidden: "{hidden}",
            onclick: move |_| {
                if view().visible {
                    navigation.push_modal(AppView::NowPlaying);
                }
            },
            if let Some(url) = current.artwork_url.clone() {
                img { class: "mini-player__art", src: "{url}", alt: "" }
            } else {
                div { class: "mini-player__art mini-player__art--empty",
                    Icon { name: "music".to_string(), class: "icon".to_string() }
                }
            }
            div { class: "mini-player__meta",
                span { class: "mini-player__title", {current.title.clone()} }
                span { class: "mini-player__show", {current.show_title.clone()} }
            }
            button {
                class: "mini-player__btn",
                aria_label: "Skip back",
                onclick: on_skip_back,
                Icon { name: "rewind".to_string(), class: "icon".to_string() }
            }
            button {
                class: "mini-player__btn mini-player__btn--primary",
                aria_label: "Play or pause",
                onclick: on_play_pause,
                Icon {
                    name: current.glyph.icon_name().to_string(),
                    class: glyph_class.to_string(),
                }
            }
            button {
                class: "mini-player__btn",
                aria_label: "Close player",
                onclick: on_close,
                Icon { name: "x".to_string(), class: "icon".to_string() }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fixtures::catalog;
    use crate::api::EpisodeCatalog;
    use crate::components::audio_manager::testing::FakeProvider;
    use crate::config::PlaybackConfig;
    use std::sync::Arc;

    fn session(provider: &FakeProvider, ids: &[&str]) -> SessionManager {
        let (session, _pump) = SessionManager::new(
            Arc::new(provider.clone()),
            Arc::new(catalog(ids)),
            PlaybackConfig::default(),
        );
        session
    }

    #[test]
    fn glyph_table() {
        assert_eq!(play_glyph(false, true, false), PlayGlyph::Spinner);
        assert_eq!(play_glyph(false, true, true), PlayGlyph::Play);
        assert_eq!(play_glyph(true, false, false), PlayGlyph::Pause);
        assert_eq!(play_glyph(true, false, true), PlayGlyph::Pause);
        assert_eq!(play_glyph(false, false, false), PlayGlyph::Play);
        assert_eq!(play_glyph(false, false, true), PlayGlyph::Play);
    }

    #[tokio::test]
    async fn hidden_until_an_episode_is_loaded() {
        let provider = FakeProvider::default();
        let session = session(&provider, &["a"]);
        let mut presenter = MiniPlayerPresenter::new(session.clone());

        assert!(!presenter.view().visible);

        let a = session.catalog().by_id("a").expect("a");
        session.play_episode(a).await.expect("play");
        let view = presenter.view();

        assert!(view.visible);
        assert_eq!(view.title, "Episode a");
        assert_eq!(view.show_title, "Morning Desk");
        assert_eq!(view.glyph, PlayGlyph::Pause);
    }

    #[tokio::test]
    async fn delegates_transport_actions() {
        let provider = FakeProvider::default();
        let session = session(&provider, &["a"]);
        let mut presenter = MiniPlayerPresenter::new(session.clone());
        let a = session.catalog().by_id("a").expect("a");
        session.play_episode(a).await.expect("play");

        presenter.on_play_pause().await.expect("toggle");
        assert_eq!(presenter.view().glyph, PlayGlyph::Play);

        provider.set_position(40_000);
        presenter.on_skip_back().await.expect("skip back");
        assert_eq!(provider.position(), 25_000);

        assert_eq!(presenter.on_close().await, TransportOutcome::Applied);
        assert!(!presenter.view().visible);
    }

    #[tokio::test]
    async fn position_ticks_do_not_wake_the_presenter() {
        let provider = FakeProvider::default();
        let (session, mut pump) = SessionManager::new(
            Arc::new(provider.clone()),
            Arc::new(catalog(&["a"])),
            PlaybackConfig::default(),
        );
        let a = session.catalog().by_id("a").expect("a");
        session.play_episode(a).await.expect("play");
        let mut presenter = MiniPlayerPresenter::new(session.clone());
        presenter.view();

        (provider.callback(0))(crate::components::audio_manager::AudioStatus {
            is_loaded: true,
            is_playing: true,
            position_millis: 2_000,
            ..Default::default()
        });
        assert!(pump.next().await);

        let woke = tokio::time::timeout(std::time::Duration::from_millis(20), presenter.changed()).await;
        assert!(woke.is_err());

        session.close().await;
        assert!(presenter.changed().await);
    }
}
