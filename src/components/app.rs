use std::sync::Arc;

use crate::api::StaticCatalog;
use crate::components::audio_manager::{SessionManager, SimulatedAudioProvider};
use crate::components::presentation_scale::{ScaleCoordinator, ScaleSender, StackTransform};
use crate::components::views::Home;
use crate::components::{view_label, AppView, ExpandedPlayer, MiniPlayer, Navigation};
use crate::config::PlayerConfig;
use dioxus::prelude::*;

const PLAYER_CONFIG: &str = include_str!("../../assets/player.json");
const EPISODES: &str = include_str!("../../assets/episodes.json");

#[derive(Clone)]
struct AppServices {
    session: SessionManager,
    scale: ScaleSender,
    config: PlayerConfig,
}

fn load_config() -> PlayerConfig {
    PlayerConfig::from_json(PLAYER_CONFIG).unwrap_or_else(|err| {
        tracing::warn!(error = %err, "invalid player config, using defaults");
        PlayerConfig::default()
    })
}

fn load_catalog() -> StaticCatalog {
    StaticCatalog::from_json(EPISODES).unwrap_or_else(|err| {
        tracing::error!(error = %err, "bundled episode catalog is unreadable");
        StaticCatalog::default()
    })
}

#[component]
pub fn AppShell() -> Element {
    let current_view = use_signal(|| AppView::Home);
    let history = use_signal(Vec::<AppView>::new);
    let navigation = Navigation::new(current_view, history);
    let mut stack_transform = use_signal(StackTransform::default);

    let services = use_hook(|| {
        let config = load_config();
        let catalog = load_catalog();
        tracing::info!(episodes = catalog.episodes().len(), "catalog loaded");

        let provider = SimulatedAudioProvider::for_catalog(&catalog);
        let clock = provider.clock();
        let (session, pump) =
            SessionManager::new(Arc::new(provider), Arc::new(catalog), config.playback.clone());
        let coordinator = ScaleCoordinator::new(&config.scale);
        let scale = coordinator.sender();

        spawn(pump.run());
        spawn(clock.run());
        spawn(coordinator.run(move |frame| stack_transform.set(frame)));

        AppServices {
            session,
            scale,
            config,
        }
    });

    use_context_provider(|| services.session.clone());
    use_context_provider(|| services.scale.clone());
    use_context_provider(|| services.config.clone());
    use_context_provider(|| navigation.clone());

    let transform = stack_transform();
    let stack_class = if transform.scale < 1.0 {
        "root-stack root-stack--receded"
    } else {
        "root-stack"
    };
    let stack_style = transform.style();
    let presenting = current_view().is_modal();

    rsx! {
        div { class: "app-container",
            div { class: "{stack_class}", style: "{stack_style}",
                header { class: "app-header mobile-safe-top",
                    span { class: "app-header__brand", "Newscast" }
                    span { class: "app-header__title", {view_label(&AppView::Home)} }
                }
                main { class: "main-scroll",
                    div { class: "page-shell", Home {} }
                }
            }

            MiniPlayer {}

            if presenting {
                ExpandedPlayer {}
            }
        }
    }
}
