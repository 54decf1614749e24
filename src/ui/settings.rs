use eframe::egui;

use crate::app::{Player13App, SettingsTab};
use crate::config::{EngineKind, USER_AGENTS};
use crate::player::internal;
use crate::theme::ACCENT;

impl Player13App {
    pub(crate) fn show_settings_window(&mut self, ctx: &egui::Context) {
        if !self.show_settings {
            return;
        }

        let mut open = true;
        egui::Window::new("⚙ Settings")
            .open(&mut open)
            .collapsible(false)
            .resizable(true)
            .min_width(460.0)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(egui::RichText::new("Customize your experience").weak());
                ui.add_space(6.0);
                ui.horizontal(|ui| {
                    ui.selectable_value(&mut self.settings_tab, SettingsTab::Appearance, "Appearance");
                    ui.selectable_value(&mut self.settings_tab, SettingsTab::Playback, "Playback");
                    ui.selectable_value(&mut self.settings_tab, SettingsTab::Console, "Console");
                });
                ui.separator();

                match self.settings_tab {
                    SettingsTab::Appearance => self.show_appearance_tab(ui),
                    SettingsTab::Playback => self.show_playback_tab(ui),
                    SettingsTab::Console => self.show_console_tab(ui),
                }

                ui.separator();
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("Done").clicked() {
                        self.show_settings = false;
                    }
                });
            });

        if !open {
            self.show_settings = false;
        }
    }

    fn show_appearance_tab(&mut self, ui: &mut egui::Ui) {
        let dark = self.state.theme.is_dark();
        ui.horizontal(|ui| {
            ui.label(egui::RichText::new(if dark { "🌙" } else { "☀" }).size(22.0));
            ui.vertical(|ui| {
                ui.strong("Dark Mode");
                ui.label(egui::RichText::new(if dark { "Enabled" } else { "Disabled" }).weak());
            });
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if toggle_switch(ui, dark).on_hover_text("Toggle dark mode").clicked() {
                    self.state.toggle_theme();
                }
            });
        });
    }

    fn show_playback_tab(&mut self, ui: &mut egui::Ui) {
        let mut changed = false;
        let config = &mut self.state.config;

        egui::Grid::new("playback_settings").num_columns(2).spacing([10.0, 8.0]).show(ui, |ui| {
            ui.label("Engine:");
            egui::ComboBox::from_id_salt("engine_kind")
                .selected_text(config.engine.label())
                .show_ui(ui, |ui| {
                    changed |= ui
                        .selectable_value(&mut config.engine, EngineKind::Pipe, EngineKind::Pipe.label())
                        .changed();
                    ui.add_enabled_ui(internal::AVAILABLE, |ui| {
                        changed |= ui
                            .selectable_value(&mut config.engine, EngineKind::Internal, EngineKind::Internal.label())
                            .on_disabled_hover_text("Built without the internal-player feature")
                            .changed();
                    });
                });
            ui.end_row();

            ui.label("FFmpeg:");
            ui.horizontal(|ui| {
                changed |= ui
                    .add(egui::TextEdit::singleline(&mut config.ffmpeg_path).desired_width(240.0))
                    .lost_focus();
                if ui.button("📁").on_hover_text("Browse for ffmpeg").clicked() {
                    if let Some(path) = rfd::FileDialog::new().set_title("Select ffmpeg").pick_file() {
                        config.ffmpeg_path = path.display().to_string();
                        changed = true;
                    }
                }
            });
            ui.end_row();

            ui.label("FFprobe:");
            ui.horizontal(|ui| {
                changed |= ui
                    .add(egui::TextEdit::singleline(&mut config.ffprobe_path).desired_width(240.0))
                    .lost_focus();
                if ui.button("📁").on_hover_text("Browse for ffprobe").clicked() {
                    if let Some(path) = rfd::FileDialog::new().set_title("Select ffprobe").pick_file() {
                        config.ffprobe_path = path.display().to_string();
                        changed = true;
                    }
                }
            });
            ui.end_row();

            ui.label("User Agent:");
            let current = USER_AGENTS
                .iter()
                .find(|(_, ua)| *ua == config.user_agent)
                .map(|(name, _)| *name)
                .unwrap_or("Custom");
            egui::ComboBox::from_id_salt("user_agent")
                .selected_text(current)
                .show_ui(ui, |ui| {
                    for (name, ua) in USER_AGENTS {
                        if ui.selectable_label(config.user_agent == *ua, *name).clicked() {
                            config.user_agent = ua.to_string();
                            changed = true;
                        }
                    }
                });
            ui.end_row();

            ui.label("Default stream:");
            changed |= ui
                .add(egui::TextEdit::singleline(&mut config.default_stream_url).desired_width(280.0))
                .lost_focus();
            ui.end_row();

            ui.label("Max frame height:");
            changed |= ui
                .add(egui::DragValue::new(&mut config.max_frame_height).range(144..=2160).suffix("p"))
                .changed();
            ui.end_row();
        });

        ui.add_space(6.0);
        changed |= ui.checkbox(&mut config.autoplay, "Autoplay streams (starts muted)").changed();
        changed |= ui.checkbox(&mut config.hw_accel, "Hardware decoding").changed();
        ui.label(egui::RichText::new("Engine changes apply to the next stream opened.").small().weak());

        if changed {
            self.state.save_config();
        }
    }

    fn show_console_tab(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.strong(format!("Console Log ({} lines)", self.console.len()));
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button("🗑 Clear").clicked() {
                    self.console.clear();
                }
            });
        });
        ui.separator();

        egui::ScrollArea::vertical()
            .max_height(320.0)
            .auto_shrink([false, false])
            .stick_to_bottom(true)
            .show(ui, |ui| {
                for line in self.console.snapshot() {
                    let color = if line.contains("[ERROR]") {
                        egui::Color32::RED
                    } else if line.contains("[WARN]") {
                        egui::Color32::YELLOW
                    } else if line.contains("[INFO]") {
                        egui::Color32::LIGHT_BLUE
                    } else {
                        egui::Color32::GRAY
                    };
                    ui.label(egui::RichText::new(line).monospace().color(color));
                }
            });
    }
}

/// iOS-style on/off switch
fn toggle_switch(ui: &mut egui::Ui, on: bool) -> egui::Response {
    let size = egui::vec2(2.4, 1.2) * ui.spacing().interact_size.y;
    let (rect, response) = ui.allocate_exact_size(size, egui::Sense::click());
    if ui.is_rect_visible(rect) {
        let t = ui.ctx().animate_bool_responsive(response.id, on);
        let radius = 0.5 * rect.height();
        let fill = if on { ACCENT } else { ui.visuals().widgets.inactive.bg_fill };
        ui.painter().rect_filled(rect, radius, fill);
        let x = egui::lerp((rect.left() + radius)..=(rect.right() - radius), t);
        ui.painter()
            .circle_filled(egui::pos2(x, rect.center().y), 0.75 * radius, egui::Color32::WHITE);
    }
    response
}
