use crate::api::models::format_duration;
use crate::api::Episode;
use crate::components::audio_manager::SessionManager;
use crate::components::Icon;
use dioxus::prelude::*;

#[component]
pub fn Home() -> Element {
    let session = use_context::<SessionManager>();
    let mut current_id = use_signal(|| None::<String>);

    let episodes: Vec<Episode> = use_hook(|| {
        let catalog = session.catalog();
        (0..catalog.len()).filter_map(|index| catalog.at(index)).collect()
    });

    {
        let session = session.clone();
        use_future(move || {
            let session = session.clone();
            async move {
                let mut episode = session.subscribe_episode();
                loop {
                    let id = episode.borrow_and_update().as_ref().map(|e| e.id.clone());
                    current_id.set(id);
                    if episode.changed().await.is_err() {
                        break;
                    }
                }
            }
        });
    }

    rsx! {
        section { class: "episode-list",
            if episodes.is_empty() {
                p { class: "episode-list__empty", "No episodes yet." }
            }
            for (index , episode) in episodes.iter().cloned().enumerate() {
                EpisodeRow {
                    key: "{episode.id}",
                    is_current: current_id().as_deref() == Some(episode.id.as_str()),
                    index,
                    onclick: {
                        let session = session.clone();
                        let episode = episode.clone();
                        move |_| {
                            let session = session.clone();
                            let episode = episode.clone();
                            spawn(async move {
                                match session.play_episode(episode).await {
                                    Ok(outcome) => tracing::debug!(?outcome, "play requested from list"),
                                    Err(err) => tracing::warn!(error = %err, "could not start episode"),
                                }
                            });
                        }
                    },
                    episode,
                }
            }
        }
    }
}

#[component]
pub fn EpisodeRow(
    episode: Episode,
    index: usize,
    onclick: EventHandler<MouseEvent>,
    #[props(default)] is_current: bool,
) -> Element {
    let class = if is_current {
        "episode-row episode-row--current"
    } else {
        "episode-row"
    };
    let label = format!("Play {}", episode.title);
    let details = format!(
        "{} · {}",
        episode.release_date.format("%b %-d"),
        format_duration(episode.duration_millis)
    );

    rsx! {
        button {
            class: "{class}",
            aria_label: "{label}",
            "data-index": "{index}",
            onclick: move |evt| onclick.call(evt),
            if let Some(url) = episode.artwork_url() {
                img { class: "episode-row__art", src: "{url}", alt: "" }
            } else {
                div { class: "episode-row__art episode-row__art--empty",
                    Icon { name: "music".to_string(), class: "icon".to_string() }
                }
            }
            div { class: "episode-row__meta",
                span { class: "episode-row__show", {episode.show_title.clone()} }
                span { class: "episode-row__title", {episode.title.clone()} }
                span { class: "episode-row__details", "{details}" }
            }
            if is_current {
                Icon { name: "play".to_string(), class: "icon episode-row__playing".to_string() }
            }
        }
    }
}
