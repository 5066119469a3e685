//! The components module contains all shared components for our app.

mod app;
mod app_view;
pub mod audio_manager;
pub mod dismiss_gesture;
mod icons;
mod mini_player;
mod navigation;
mod player;
pub mod presentation_scale;
mod views;

pub use app::*;
pub use app_view::*;
pub use icons::*;
pub use mini_player::*;
pub use navigation::*;
pub use player::*;
