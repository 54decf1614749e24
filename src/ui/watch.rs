use eframe::egui;

use super::{nav_button, section_label, status_bar};
use crate::app::Player13App;
use crate::theme::ACCENT;

const TOP_BAR_FILL: egui::Color32 = egui::Color32::from_rgb(12, 12, 14);

impl Player13App {
    pub(crate) fn show_watch(&mut self, ctx: &egui::Context) {
        let fullscreen = self.state.session().is_some_and(|s| s.is_fullscreen());

        if !fullscreen {
            self.show_watch_top_bar(ctx);
            self.show_watch_sidebar(ctx);
            if self.state.status().is_some() && status_bar(ctx, "watch_status", self.state.status(), self.importing)
            {
                self.state.clear_status();
            }
        } else if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            if let Some(session) = self.state.session_mut() {
                if !session.quality_menu_open() {
                    session.request_fullscreen();
                }
            }
        }

        egui::CentralPanel::default()
            .frame(egui::Frame::new().fill(egui::Color32::BLACK))
            .show(ctx, |ui| match self.state.session_mut() {
                Some(session) => self.overlay.show(ui, session),
                None => {
                    ui.centered_and_justified(|ui| {
                        ui.label(egui::RichText::new("Nothing playing").color(egui::Color32::GRAY));
                    });
                }
            });
    }

    fn show_watch_top_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("watch_top")
            .frame(egui::Frame::new().fill(TOP_BAR_FILL).inner_margin(egui::Margin::symmetric(16, 10)))
            .show(ctx, |ui| {
                ui.visuals_mut().override_text_color = Some(egui::Color32::WHITE);
                ui.horizontal(|ui| {
                    if ui.add(egui::Button::new("☰").frame(false)).on_hover_text("Toggle menu").clicked() {
                        self.watch_sidebar = !self.watch_sidebar;
                    }
                    if ui.add(egui::Button::new("←").frame(false)).on_hover_text("Back to home").clicked() {
                        self.go_home(ctx);
                        return;
                    }

                    if let Some(payload) = self.state.now_playing() {
                        ui.add_space(8.0);
                        ui.label(egui::RichText::new("▶").color(ACCENT).size(18.0));
                        ui.vertical(|ui| {
                            ui.strong(&payload.channel_name);
                            if let Some(ref category) = payload.category {
                                ui.label(egui::RichText::new(category).small().color(egui::Color32::GRAY));
                            }
                        });
                    }

                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        let (glyph, hover) = if self.favorite {
                            ("★", "Remove from favorites")
                        } else {
                            ("☆", "Add to favorites")
                        };
                        if ui.add(egui::Button::new(glyph).frame(false)).on_hover_text(hover).clicked() {
                            self.favorite = !self.favorite;
                        }
                    });
                });
            });
    }

    fn show_watch_sidebar(&mut self, ctx: &egui::Context) {
        egui::SidePanel::left("watch_sidebar")
            .resizable(false)
            .exact_width(260.0)
            .show_animated(ctx, self.watch_sidebar, |ui| {
                ui.add_space(12.0);
                ui.horizontal(|ui| {
                    ui.label(egui::RichText::new("▶ Player13").size(20.0).strong().color(ACCENT));
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.small_button("✕").on_hover_text("Close sidebar").clicked() {
                            self.watch_sidebar = false;
                        }
                    });
                });
                ui.separator();

                if nav_button(ui, "🏠", "Home", false).clicked() {
                    self.go_home(ctx);
                    return;
                }
                if nav_button(ui, "📺", "All Channels", self.show_channel_list).clicked() {
                    self.show_channel_list = !self.show_channel_list;
                }
                if self.show_channel_list {
                    ui.indent("watch_channel_list", |ui| self.show_channel_panel(ui, true));
                }
                nav_button(ui, "🔖", "Favorites", false);
                nav_button(ui, "🕘", "Recent", false);

                self.show_now_playing_card(ui);

                ui.with_layout(egui::Layout::bottom_up(egui::Align::Min), |ui| {
                    ui.add_space(12.0);
                    if nav_button(ui, "⚙", "Settings", false).clicked() {
                        self.show_settings = true;
                    }
                    ui.separator();
                });
            });
    }

    fn show_now_playing_card(&self, ui: &mut egui::Ui) {
        let Some(payload) = self.state.now_playing() else {
            return;
        };
        if payload.channel_name.is_empty() {
            return;
        }

        section_label(ui, "Now Playing");
        egui::Frame::group(ui.style()).corner_radius(10.0).show(ui, |ui| {
            ui.set_width(ui.available_width());
            ui.horizontal(|ui| {
                let logo = payload.channel_logo.as_deref().filter(|url| self.state.logo_allowed(url));
                match logo {
                    Some(url) => {
                        ui.label(egui::RichText::new("🖼").size(28.0)).on_hover_text(url);
                    }
                    None => {
                        ui.label(egui::RichText::new("📺").size(28.0));
                    }
                }
                ui.vertical(|ui| {
                    ui.strong(&payload.channel_name);
                    if let Some(ref category) = payload.category {
                        ui.label(egui::RichText::new(category).small().weak());
                    }
                });
            });
        });
    }
}
