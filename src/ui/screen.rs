use ratatui::Frame;

use crate::{
    ui::{history::render_history, trends::render_trends},
    App, View,
};

/// A UI Screen boundary: responsible for rendering one view of the app
pub trait Screen {
    fn render(&self, app: &App, f: &mut Frame);
}

/// Settings, running round and round summary, all drawn by the App widget
pub struct TrainerScreen;

impl Screen for TrainerScreen {
    fn render(&self, app: &App, f: &mut Frame) {
        f.render_widget(app, f.area());
    }
}

pub struct HistoryScreen;

impl Screen for HistoryScreen {
    fn render(&self, app: &App, f: &mut Frame) {
        render_history(app, f);
    }
}

pub struct TrendsScreen;

impl Screen for TrendsScreen {
    fn render(&self, app: &App, f: &mut Frame) {
        render_trends(app, f);
    }
}

/// Helper to construct the appropriate screen for the current view
pub fn current_screen(view: &View) -> Box<dyn Screen> {
    match view {
        View::Trainer => Box::new(TrainerScreen),
        View::History => Box::new(HistoryScreen),
        View::Stats => Box::new(TrendsScreen),
    }
}
