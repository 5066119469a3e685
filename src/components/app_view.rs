//! Defines the shared application view state.

#[derive(Clone, Debug, PartialEq)]
pub enum AppView {
    Home,
    /// Expanded player presented modally over the home stack.
    NowPlaying,
}

impl AppView {
    pub fn is_modal(&self) -> bool {
        matches!(self, AppView::NowPlaying)
    }
}

pub fn view_label(view: &AppView) -> &'static str {
    match view {
        AppView::Home => "Latest",
        AppView::NowPlaying => "Now Playing",
    }
}
