use eframe::egui;

use crate::app::Player13App;
use crate::playlist::PlaylistSource;

const PLAYLIST_EXTENSIONS: &[&str] = &["m3u", "m3u8", "xspf", "gz"];

impl Player13App {
    pub(crate) fn show_add_channel_dialog(&mut self, ctx: &egui::Context) {
        let Some(form) = self.add_form.as_mut() else {
            return;
        };

        let mut submit = false;
        let mut cancel = false;
        egui::Window::new("➕ Add Channel")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                egui::Grid::new("add_channel_grid").num_columns(2).spacing([8.0, 8.0]).show(ui, |ui| {
                    ui.label("Name:");
                    ui.add(egui::TextEdit::singleline(&mut form.name).hint_text("Channel name").desired_width(320.0));
                    ui.end_row();
                    ui.label("Stream URL:");
                    let url = ui.add(
                        egui::TextEdit::singleline(&mut form.url)
                            .hint_text("http://.../stream.m3u8")
                            .desired_width(320.0),
                    );
                    ui.end_row();
                    if url.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                        submit = true;
                    }
                });

                if let Some(ref error) = form.error {
                    ui.add_space(6.0);
                    ui.colored_label(egui::Color32::from_rgb(200, 80, 80), format!("⚠ {}", error));
                }
                ui.add_space(10.0);

                ui.horizontal(|ui| {
                    if ui.button("Cancel").clicked() {
                        cancel = true;
                    }
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.button("Add").clicked() {
                            submit = true;
                        }
                    });
                });
            });

        if cancel {
            self.add_form = None;
        } else if submit {
            let (name, url) = (form.name.clone(), form.url.clone());
            match self.state.add_channel(&name, &url) {
                Ok(_) => self.add_form = None,
                Err(e) => {
                    if let Some(form) = self.add_form.as_mut() {
                        form.error = Some(e.to_string());
                    }
                }
            }
        }
    }

    pub(crate) fn show_delete_confirm(&mut self, ctx: &egui::Context) {
        let Some(id) = self.pending_delete else {
            return;
        };
        let Some(name) = self.state.channels.get(id).map(|c| c.name.clone()) else {
            self.pending_delete = None;
            return;
        };

        egui::Window::new("🗑 Delete Channel")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.add_space(6.0);
                ui.label(egui::RichText::new(format!("Delete channel \"{}\"?", name)).strong());
                ui.add_space(10.0);
                ui.horizontal(|ui| {
                    if ui.button("Cancel").clicked() {
                        self.pending_delete = None;
                    }
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        let delete = egui::RichText::new("Delete").color(egui::Color32::from_rgb(200, 80, 80));
                        if ui.button(delete).clicked() {
                            self.state.delete_channel(id);
                            self.pending_delete = None;
                        }
                    });
                });
            });
    }

    pub(crate) fn show_import_dialog(&mut self, ctx: &egui::Context) {
        let Some(input) = self.import_input.as_mut() else {
            return;
        };

        let mut source = None;
        let mut close = false;
        egui::Window::new("📥 Import Playlist")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label("M3U, M3U8 or XSPF playlist, from a URL or a local file:");
                ui.add_space(6.0);
                ui.horizontal(|ui| {
                    ui.add(
                        egui::TextEdit::singleline(input)
                            .hint_text("https://example.com/playlist.m3u")
                            .desired_width(360.0),
                    );
                    if ui.button("📁").on_hover_text("Browse for a playlist file").clicked() {
                        if let Some(path) = rfd::FileDialog::new()
                            .set_title("Import Playlist")
                            .add_filter("Playlists", PLAYLIST_EXTENSIONS)
                            .add_filter("All Files", &["*"])
                            .pick_file()
                        {
                            source = Some(PlaylistSource::File(path));
                        }
                    }
                });
                ui.add_space(10.0);
                ui.horizontal(|ui| {
                    if ui.button("Cancel").clicked() {
                        close = true;
                    }
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui
                            .add_enabled(!input.trim().is_empty(), egui::Button::new("Import"))
                            .clicked()
                        {
                            source = Some(PlaylistSource::parse(input));
                        }
                    });
                });
            });

        if let Some(source) = source {
            self.import_input = None;
            self.start_import(ctx, source);
        } else if close {
            self.import_input = None;
        }
    }
}
