//! Process-wide light/dark theme with explicit subscribers

use eframe::egui;

use crate::error::StorageError;
use crate::storage::{KeyValueStore, THEME_KEY};

/// Accent used for active items and the seek bar (#E50914)
pub const ACCENT: egui::Color32 = egui::Color32::from_rgb(229, 9, 20);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    /// Unknown text resolves to light.
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "dark" => Theme::Dark,
            _ => Theme::Light,
        }
    }

    pub fn flipped(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber = Box<dyn FnMut(Theme)>;

pub struct ThemeContext {
    theme: Theme,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_id: u64,
}

impl ThemeContext {
    pub fn new(theme: Theme) -> Self {
        Self {
            theme,
            subscribers: Vec::new(),
            next_id: 0,
        }
    }

    pub fn load(store: &dyn KeyValueStore) -> Self {
        let theme = store
            .get(THEME_KEY)
            .map(|v| Theme::parse(&v))
            .unwrap_or_default();
        Self::new(theme)
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn is_dark(&self) -> bool {
        self.theme == Theme::Dark
    }

    pub fn subscribe(&mut self, callback: impl FnMut(Theme) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    /// Flip the theme, persist it, then notify subscribers in registration
    /// order. The in-memory flag changes even if the write fails.
    pub fn toggle(&mut self, store: &mut dyn KeyValueStore) -> Result<Theme, StorageError> {
        self.theme = self.theme.flipped();
        let persisted = store.set(THEME_KEY, self.theme.as_str().to_string());
        for (_, subscriber) in self.subscribers.iter_mut() {
            subscriber(self.theme);
        }
        persisted.map(|_| self.theme)
    }

    pub fn visuals(&self) -> egui::Visuals {
        let mut visuals = match self.theme {
            Theme::Dark => egui::Visuals::dark(),
            Theme::Light => egui::Visuals::light(),
        };
        visuals.selection.bg_fill = ACCENT;
        visuals.hyperlink_color = ACCENT;
        if self.theme == Theme::Light {
            visuals.panel_fill = egui::Color32::from_rgb(245, 245, 247);
        }
        visuals
    }
}
