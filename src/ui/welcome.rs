use std::time::Instant;

use eframe::egui;

use super::card;
use crate::activation::DEVICE_MAC;
use crate::app::Player13App;
use crate::theme::ACCENT;

impl Player13App {
    pub(crate) fn show_welcome(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.add_space((ui.available_height() - 520.0).max(24.0) / 2.0);
                ui.label(egui::RichText::new("▶ Player13").size(34.0).strong().color(ACCENT));
                ui.add_space(24.0);

                ui.allocate_ui(egui::vec2(420.0, 0.0), |ui| {
                    card(ui).show(ui, |ui| {
                        ui.set_width(388.0);
                        ui.vertical_centered(|ui| {
                            ui.heading(egui::RichText::new("Welcome to Player13").size(26.0).strong());
                            ui.label(egui::RichText::new("Activate your device to get started").weak());
                        });
                        ui.add_space(20.0);

                        copy_row(ui, "Device MAC Address", DEVICE_MAC, "Copy MAC Address");
                        ui.add_space(12.0);
                        let code = self.activation.code().to_string();
                        copy_row(ui, "Activation Code", &code, "Copy Activation Code");
                        let left = self.activation.remaining(Instant::now()).as_secs();
                        ui.label(egui::RichText::new(format!("New code in {}s", left)).small().weak());
                        ui.add_space(16.0);

                        egui::Frame::new()
                            .fill(egui::Color32::from_rgba_unmultiplied(59, 130, 246, 30))
                            .corner_radius(8.0)
                            .inner_margin(12.0)
                            .show(ui, |ui| {
                                ui.label(egui::RichText::new("ℹ How to activate").strong());
                                ui.label(
                                    "Share these credentials with your service provider to activate \
                                     your device and start streaming.",
                                );
                            });
                        ui.add_space(16.0);

                        let button = egui::Button::new(
                            egui::RichText::new("Continue to Setup").color(egui::Color32::WHITE).size(16.0),
                        )
                        .fill(ACCENT)
                        .min_size(egui::vec2(ui.available_width(), 40.0));
                        if ui.add(button).clicked() {
                            log::info!("Welcome screen completed");
                            self.state.finish_welcome();
                        }
                    });
                });

                ui.add_space(16.0);
                ui.label(egui::RichText::new("Need help? Contact support").weak());
            });
        });
    }
}

fn copy_row(ui: &mut egui::Ui, label: &str, value: &str, hover: &str) {
    ui.label(egui::RichText::new(label).strong());
    ui.horizontal(|ui| {
        egui::Frame::group(ui.style()).show(ui, |ui| {
            ui.set_width(320.0);
            ui.vertical_centered(|ui| {
                ui.label(egui::RichText::new(value).monospace().size(18.0));
            });
        });
        if ui.button("📋").on_hover_text(hover).clicked() {
            ui.ctx().copy_text(value.to_string());
            log::info!("Copied {} to clipboard", label);
        }
    });
}
