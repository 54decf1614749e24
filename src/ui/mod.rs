//! Screens and dialogs, as `show_*` methods on [`crate::app::Player13App`]

mod channel_panel;
mod dialogs;
mod home;
mod settings;
mod watch;
mod welcome;

use eframe::egui;

use crate::theme::ACCENT;

/// Sidebar entry with the accent highlight when active.
pub(crate) fn nav_button(ui: &mut egui::Ui, icon: &str, label: &str, active: bool) -> egui::Response {
    let text = egui::RichText::new(format!("{}  {}", icon, label)).size(15.0);
    let text = if active { text.color(ACCENT).strong() } else { text };
    ui.add_sized(
        [ui.available_width(), 36.0],
        egui::Button::new(text).frame(active).selected(active),
    )
}

/// Small upper-case group heading ("MENU", "LIBRARY").
pub(crate) fn section_label(ui: &mut egui::Ui, text: &str) {
    ui.add_space(12.0);
    ui.label(egui::RichText::new(text.to_uppercase()).small().weak());
    ui.add_space(4.0);
}

/// Rounded card frame following the current theme.
pub(crate) fn card(ui: &egui::Ui) -> egui::Frame {
    egui::Frame::group(ui.style())
        .fill(ui.visuals().extreme_bg_color)
        .corner_radius(12.0)
        .inner_margin(16.0)
}

pub(crate) fn status_bar(ctx: &egui::Context, id: &'static str, status: Option<&str>, busy: bool) -> bool {
    let mut dismissed = false;
    egui::TopBottomPanel::bottom(id).show(ctx, |ui| {
        ui.horizontal(|ui| {
            if busy {
                ui.spinner();
            }
            if let Some(status) = status {
                ui.label(status);
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.small_button("✕").on_hover_text("Dismiss").clicked() {
                        dismissed = true;
                    }
                });
            }
        });
    });
    dismissed
}
