use eframe::egui;

use super::{card, nav_button, section_label, status_bar};
use crate::app::{NavItem, Player13App};
use crate::theme::ACCENT;

impl Player13App {
    pub(crate) fn show_home(&mut self, ctx: &egui::Context) {
        self.show_home_sidebar(ctx);

        if status_bar(ctx, "home_status", self.state.status(), self.importing) {
            self.state.clear_status();
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().auto_shrink([false, false]).show(ui, |ui| {
                ui.add_space(16.0);
                ui.heading(egui::RichText::new("Welcome Back").size(30.0).strong());
                ui.label(egui::RichText::new("Continue watching your favorite channels").weak());
                ui.add_space(16.0);

                self.show_hero(ui);
                ui.add_space(16.0);
                self.show_quick_actions(ui);
                ui.add_space(16.0);

                card(ui).show(ui, |ui| {
                    ui.set_width(ui.available_width());
                    ui.horizontal(|ui| {
                        ui.heading("📺 Channels");
                        ui.label(egui::RichText::new(format!("({})", self.state.channels.len())).weak());
                    });
                    ui.add_space(6.0);
                    self.show_channel_panel(ui, false);
                });
            });
        });
    }

    fn show_home_sidebar(&mut self, ctx: &egui::Context) {
        egui::SidePanel::left("home_sidebar")
            .resizable(false)
            .exact_width(220.0)
            .show(ctx, |ui| {
                ui.add_space(16.0);
                ui.label(egui::RichText::new("▶ Player13").size(24.0).strong().color(ACCENT));

                section_label(ui, "Menu");
                if nav_button(ui, "🏠", "Home", self.active_nav == NavItem::Home).clicked() {
                    self.active_nav = NavItem::Home;
                }
                if nav_button(ui, "📺", "Channels", self.active_nav == NavItem::Channels).clicked() {
                    self.active_nav = NavItem::Channels;
                }
                if nav_button(ui, "🎙", "Live TV", self.active_nav == NavItem::LiveTv).clicked() {
                    self.active_nav = NavItem::LiveTv;
                    self.browse_live();
                }

                section_label(ui, "Library");
                if nav_button(ui, "🔖", "Favorites", self.active_nav == NavItem::Favorites).clicked() {
                    self.active_nav = NavItem::Favorites;
                }
                if nav_button(ui, "🕘", "Recent", self.active_nav == NavItem::Recent).clicked() {
                    self.active_nav = NavItem::Recent;
                }

                ui.with_layout(egui::Layout::bottom_up(egui::Align::Min), |ui| {
                    ui.add_space(12.0);
                    if nav_button(ui, "⚙", "Settings", false).clicked() {
                        self.show_settings = true;
                    }
                    ui.separator();
                });
            });
    }

    fn show_hero(&mut self, ui: &mut egui::Ui) {
        egui::Frame::new()
            .fill(if self.state.theme.is_dark() {
                egui::Color32::from_rgb(24, 24, 27)
            } else {
                egui::Color32::WHITE
            })
            .corner_radius(16.0)
            .inner_margin(24.0)
            .show(ui, |ui| {
                ui.set_width(ui.available_width());
                ui.label(egui::RichText::new("Start Watching").size(24.0).strong());
                ui.label(egui::RichText::new("Browse channels and enjoy your content").weak());
                ui.add_space(12.0);
                let button = egui::Button::new(egui::RichText::new("Browse Channels").color(egui::Color32::WHITE))
                    .fill(ACCENT)
                    .min_size(egui::vec2(160.0, 36.0));
                if ui.add(button).clicked() {
                    self.browse_live();
                }
            });
    }

    fn show_quick_actions(&mut self, ui: &mut egui::Ui) {
        ui.columns(3, |columns| {
            if quick_action(&mut columns[0], "▶", "Live TV", "Watch live broadcasts").clicked() {
                self.browse_live();
            }
            if quick_action(&mut columns[1], "📂", "Categories", "Browse by genre").clicked() {
                self.active_nav = NavItem::Channels;
            }
            if quick_action(&mut columns[2], "🔍", "Search", "Find your content").clicked() {
                self.active_nav = NavItem::Channels;
                self.search_query.clear();
            }
        });
    }
}

fn quick_action(ui: &mut egui::Ui, icon: &str, title: &str, subtitle: &str) -> egui::Response {
    let inner = card(ui).show(ui, |ui| {
        ui.set_width(ui.available_width());
        ui.horizontal(|ui| {
            ui.label(egui::RichText::new(icon).size(24.0).color(ACCENT));
            ui.vertical(|ui| {
                ui.strong(title);
                ui.label(egui::RichText::new(subtitle).small().weak());
            });
        });
    });
    inner.response.interact(egui::Sense::click())
}
