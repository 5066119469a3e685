use std::cell::RefCell;
use std::rc::Rc;

use crate::api::models::format_duration;
use crate::components::audio_manager::{PlaybackError, PlaybackSession, SessionManager, TransportOutcome};
use crate::components::dismiss_gesture::{
    DismissGestureController, Haptics, ModalMotion, Point, Viewport,
};
use crate::components::presentation_scale::ScaleSender;
use crate::components::{Icon, Navigation};
use crate::config::PlayerConfig;
use dioxus::prelude::*;

const SKIP_FORWARD_SECONDS: f64 = 30.0;
const SPRING_BACK_MS: u32 = 420;
const SCROLL_AREA_ID: &str = "now-playing-scroll";
const FALLBACK_VIEWPORT: Viewport = Viewport {
    width: 390.0,
    height: 844.0,
};

/// Vibration through the webview, where the platform exposes it.
#[derive(Clone, Copy, Default)]
pub struct EvalHaptics;

impl Haptics for EvalHaptics {
    fn impact(&self) -> Result<(), String> {
        let _ = document::eval("if (navigator.vibrate) { navigator.vibrate(10); }");
        Ok(())
    }
}

type PlayerGesture = DismissGestureController<Navigation, EvalHaptics>;

/// Inline style for the modal sheet.
pub fn modal_style(motion: ModalMotion) -> Option<String> {
    match motion {
        ModalMotion::Follow { translation } => Some(format!(
            "transform: translate({:.1}px, {:.1}px); transition: none;",
            translation.x, translation.y
        )),
        ModalMotion::SpringBack => Some(format!(
            "transform: translate(0px, 0px); transition: transform {SPRING_BACK_MS}ms cubic-bezier(0.2, 0.9, 0.3, 1.15);"
        )),
        ModalMotion::TimedExit {
            translation,
            duration_ms,
        } => Some(format!(
            "transform: translate({:.1}px, {:.1}px); transition: transform {duration_ms}ms ease-in;",
            translation.x, translation.y
        )),
        ModalMotion::ScrollContent { .. } | ModalMotion::Still => None,
    }
}

/// At the top the scroll area takes no native pans, so upward pulls arrive
/// here and are replayed onto the element.
fn scroll_content(delta_y: f32) {
    let script = format!(
        r#"(function() {{
            const area = document.getElementById("{SCROLL_AREA_ID}");
            if (area) area.scrollBy({{ top: {delta_y:.1}, behavior: "auto" }});
        }})();"#
    );
    let _ = document::eval(&script);
}

fn report(action: &'static str, result: Result<TransportOutcome, PlaybackError>) {
    match result {
        Ok(outcome) => tracing::debug!(action, ?outcome, "player action"),
        Err(err) => tracing::warn!(action, error = %err, "player action failed"),
    }
}

fn pointer(evt: &PointerEvent) -> Point {
    let coords = evt.client_coordinates();
    Point::new(coords.x as f32, coords.y as f32)
}

#[component]
pub fn ExpandedPlayer() -> Element {
    let session = use_context::<SessionManager>();
    let scale = use_context::<ScaleSender>();
    let config = use_context::<PlayerConfig>();
    let navigation = use_context::<Navigation>();

    let mut sheet_style = use_signal(|| None::<String>);
    let mut entered = use_signal(|| false);
    let mut scroll_area = use_signal(|| None::<Rc<MountedData>>);
    let mut scroll_at_top = use_signal(|| true);
    let mut snapshot = use_signal(|| session.snapshot());

    let controller: Rc<RefCell<PlayerGesture>> = use_hook(|| {
        Rc::new(RefCell::new(DismissGestureController::new(
            config.gesture.clone(),
            config.scale.scale_factor,
            scale.clone(),
            navigation.clone(),
            EvalHaptics,
            FALLBACK_VIEWPORT,
        )))
    });
    {
        let controller = controller.clone();
        use_drop(move || controller.borrow_mut().teardown());
    }

    let mut apply = move |motion: ModalMotion| {
        if let ModalMotion::ScrollContent { delta_y } = motion {
            scroll_content(delta_y);
        } else if let Some(style) = modal_style(motion) {
            sheet_style.set(Some(style));
        }
    };

    {
        let session = session.clone();
        use_future(move || {
            let session = session.clone();
            async move {
                let mut status = session.subscribe_status();
                let mut episode = session.subscribe_episode();
                let mut position = session.subscribe_position();
                let mut duration = session.subscribe_duration();
                loop {
                    snapshot.set(session.snapshot());
                    let open = tokio::select! {
                        changed = status.changed() => changed.is_ok(),
                        changed = episode.changed() => changed.is_ok(),
                        changed = position.changed() => changed.is_ok(),
                        changed = duration.changed() => changed.is_ok(),
                    };
                    if !open {
                        break;
                    }
                }
            }
        });
    }

    // A session closed from elsewhere takes the sheet down with it.
    {
        let controller = controller.clone();
        use_effect(move || {
            if snapshot().current_episode.is_none() && !controller.borrow().is_dismissed() {
                let motion = controller.borrow_mut().dismiss();
                apply(motion);
            }
        });
    }

    let on_mounted_sheet = {
        let controller = controller.clone();
        move |evt: MountedEvent| {
            let controller = controller.clone();
            entered.set(true);
            spawn(async move {
                match evt.data().get_client_rect().await {
                    Ok(rect) => controller.borrow_mut().set_viewport(Viewport {
                        width: rect.size.width as f32,
                        height: rect.size.height as f32,
                    }),
                    Err(err) => tracing::debug!(error = ?err, "sheet size unavailable"),
                }
            });
        }
    };

    let on_scroll = {
        let controller = controller.clone();
        move |_: ScrollEvent| {
            let controller = controller.clone();
            if let Some(area) = scroll_area() {
                spawn(async move {
                    if let Ok(offset) = area.get_scroll_offset().await {
                        let offset = offset.y as f32;
                        controller.borrow_mut().on_scroll(offset);
                        scroll_at_top.set(offset <= 0.0);
                    }
                });
            }
        }
    };

    let on_pointer_down = {
        let controller = controller.clone();
        move |evt: PointerEvent| {
            let motion = controller.borrow_mut().begin(pointer(&evt));
            apply(motion);
        }
    };
    let on_pointer_move = {
        let controller = controller.clone();
        move |evt: PointerEvent| {
            let motion = controller.borrow_mut().update(pointer(&evt));
            apply(motion);
        }
    };
    let on_pointer_up = {
        let controller = controller.clone();
        move |evt: PointerEvent| {
            let motion = controller.borrow_mut().end(pointer(&evt));
            apply(motion);
        }
    };
    let on_pointer_cancel = {
        let controller = controller.clone();
        move |_: PointerEvent| {
            let motion = controller.borrow_mut().finalize();
            apply(motion);
        }
    };
    let on_close = {
        let controller = controller.clone();
        move |_: MouseEvent| {
            let motion = controller.borrow_mut().dismiss();
            apply(motion);
        }
    };

    let transport = |action: &'static str| {
        let session = session.clone();
        move |_: MouseEvent| {
            let session = session.clone();
            spawn(async move {
                let result = match action {
                    "previous" => session.play_previous().await,
                    "next" => session.play_next().await,
                    "skip_back" => session.seek(-session.config().skip_back_seconds).await,
                    "skip_forward" => session.seek(SKIP_FORWARD_SECONDS).await,
                    _ => session.toggle_play_pause().await,
                };
                report(action, result);
            });
        }
    };

    let on_seek_commit = {
        let session = session.clone();
        move |e: Event<FormData>| {
            let PlaybackSession {
                position_millis,
                duration_millis,
                ..
            } = snapshot();
            if duration_millis == 0 {
                return;
            }
            if let Ok(percent) = e.value().parse::<f64>() {
                let target = percent.clamp(0.0, 100.0) / 100.0 * duration_millis as f64;
                let delta_seconds = (target - position_millis as f64) / 1000.0;
                let session = session.clone();
                spawn(async move { report("seek", session.seek(delta_seconds).await) });
            }
        }
    };

    let current = snapshot();
    let Some(episode) = current.current_episode.clone() else {
        return rsx! {};
    };
    let progress = if current.duration_millis > 0 {
        (current.position_millis as f64 / current.duration_millis as f64 * 100.0).clamp(0.0, 100.0)
    } else {
        0.0
    };
    let play_icon = if current.status.is_playing() {
        "pause"
    } else if current.status.is_loading() {
        "loader"
    } else {
        "play"
    };
    let sheet_class = if entered() {
        "now-playing now-playing--entered"
    } else {
        "now-playing"
    };
    let style = sheet_style().unwrap_or_default();
    let scroll_class = if scroll_at_top() {
        "now-playing__scroll now-playing__scroll--at-top"
    } else {
        "now-playing__scroll"
    };

    rsx! {
        div { class: "now-playing__backdrop" }
        section {
            class: "{sheet_class}",
            style: "{style}",
            onmounted: on_mounted_sheet,
            onpointerdown: on_pointer_down,
            onpointermove: on_pointer_move,
            onpointerup: on_pointer_up,
            onpointercancel: on_pointer_cancel,
            header { class: "now-playing__header",
                div { class: "now-playing__grabber" }
                button {
                    class: "now-playing__close",
                    aria_label: "Close player",
                    onclick: on_close,
                    Icon { name: "chevron-down".to_string(), class: "icon".to_string() }
                }
            }
            div {
                id: SCROLL_AREA_ID,
                class: "{scroll_class}",
                onmounted: move |evt: MountedEvent| scroll_area.set(Some(evt.data())),
                onscroll: on_scroll,
                if let Some(url) = episode.artwork_url() {
                    img { class: "now-playing__art", src: "{url}", alt: "" }
                } else {
                    div { class: "now-playing__art now-playing__art--empty",
                        Icon { name: "music".to_string(), class: "icon icon--large".to_string() }
                    }
                }
                div { class: "now-playing__meta",
                    h2 { class: "now-playing__title", {episode.title.clone()} }
                    p { class: "now-playing__show", {episode.show_title.clone()} }
                }
                div { class: "now-playing__progress",
                    input {
                        r#type: "range",
                        min: "0",
                        max: "100",
                        step: "0.1",
                        value: "{progress}",
                        onchange: on_seek_commit,
                    }
                    div { class: "now-playing__times",
                        span { {format_duration(current.position_millis)} }
                        span { {format_duration(current.duration_millis)} }
                    }
                }
                div { class: "now-playing__controls",
                    button { aria_label: "Previous episode", onclick: transport("previous"),
                        Icon { name: "prev".to_string(), class: "icon".to_string() }
                    }
                    button { aria_label: "Skip back", onclick: transport("skip_back"),
                        Icon { name: "rewind".to_string(), class: "icon".to_string() }
                    }
                    button {
                        class: "now-playing__primary",
                        aria_label: "Play or pause",
                        onclick: transport("play_pause"),
                        Icon { name: play_icon.to_string(), class: "icon icon--large".to_string() }
                    }
                    button { aria_label: "Skip forward", onclick: transport("skip_forward"),
                        Icon { name: "forward".to_string(), class: "icon".to_string() }
                    }
                    button { aria_label: "Next episode", onclick: transport("next"),
                        Icon { name: "next".to_string(), class: "icon".to_string() }
                    }
                }
                div { class: "now-playing__notes",
                    p { class: "now-playing__date", {episode.release_date.format("%B %-d, %Y").to_string()} }
                    p { {episode.summary.clone()} }
                }
            }
        }
    }
}
