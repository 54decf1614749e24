//! Video surface and transport controls drawn over it

use std::time::Instant;

use eframe::egui::{self, Color32, Rect, RichText, Vec2};

use super::session::MAX_PLAYED;
use super::{format_time, PlaybackPhase, PlaybackSession, VideoFrame, AUTO_LEVEL};
use crate::theme::ACCENT;

const BAR_HEIGHT: f32 = 64.0;
const CENTER_BUTTON: f32 = 72.0;

/// Textures and hover tracking for one mounted player.
#[derive(Default)]
pub struct VideoOverlay {
    live: Option<(u64, egui::TextureHandle)>,
    frozen: Option<(u64, egui::TextureHandle)>,
    source: Option<String>,
    was_hovered: bool,
}

impl VideoOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the textures of the previous stream when the source changes.
    fn follow_source(&mut self, source: Option<&str>) {
        if self.source.as_deref() != source {
            self.live = None;
            self.frozen = None;
            self.source = source.map(str::to_string);
        }
    }

    pub fn show(&mut self, ui: &mut egui::Ui, session: &mut PlaybackSession) {
        let ctx = ui.ctx().clone();
        let now = Instant::now();

        session.on_fullscreen_changed(ctx.input(|i| i.viewport().fullscreen.unwrap_or(false)));
        session.pump(now);
        self.follow_source(session.source());
        self.upload(&ctx, session);

        let rect = ui.available_rect_before_wrap();
        let response = ui.allocate_rect(rect, egui::Sense::click());
        ui.painter().rect_filled(rect, 0.0, Color32::BLACK);

        // Frozen snapshot replaces the live surface while paused or ended
        let texture = if session.snapshot().is_some() {
            self.frozen.as_ref()
        } else {
            self.live.as_ref()
        };
        if let Some((_, texture)) = texture {
            let image_rect = fit(rect, texture.size_vec2());
            ui.painter().image(
                texture.id(),
                image_rect,
                Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                Color32::WHITE,
            );
        }

        if session.is_loading() {
            let spinner_rect = Rect::from_center_size(rect.center(), Vec2::splat(48.0));
            ui.put(spinner_rect, egui::Spinner::new().size(48.0).color(Color32::WHITE));
        }
        if let Some(error) = session.last_error() {
            ui.painter().text(
                rect.center_top() + Vec2::new(0.0, 24.0),
                egui::Align2::CENTER_TOP,
                format!("⚠ {}", error),
                egui::FontId::proportional(14.0),
                Color32::YELLOW,
            );
        }

        self.track_pointer(ui, rect, session, now);
        if response.double_clicked() {
            session.request_fullscreen();
        }

        if session.controls_visible() {
            self.show_center_button(ui, rect, session);
            self.show_controls_bar(ui, rect, session);
            if session.quality_menu_open() {
                show_quality_menu(&ctx, rect, session);
            }
        }

        if !ctx.wants_keyboard_input() {
            let keys: Vec<egui::Key> = ctx.input(|i| {
                i.events
                    .iter()
                    .filter_map(|e| match e {
                        egui::Event::Key {
                            key,
                            pressed: true,
                            repeat,
                            ..
                        } if !*repeat || matches!(key, egui::Key::ArrowUp | egui::Key::ArrowDown) => Some(*key),
                        _ => None,
                    })
                    .collect()
            });
            for key in keys {
                session.handle_key(key);
            }
        }

        if let Some(fullscreen) = session.take_fullscreen_request() {
            ctx.send_viewport_cmd(egui::ViewportCommand::Fullscreen(fullscreen));
        }
        if let Some(after) = session.repaint_after(now) {
            ctx.request_repaint_after(after);
        }
    }

    /// Upload new live frames and a changed snapshot.
    fn upload(&mut self, ctx: &egui::Context, session: &PlaybackSession) {
        if let Some((id, frame)) = session.live_frame() {
            refresh(ctx, &mut self.live, "video_frame", id, frame);
        }
        match session.snapshot() {
            Some((id, frame)) => refresh(ctx, &mut self.frozen, "frozen_frame", id, frame),
            None => self.frozen = None,
        }
    }

    fn track_pointer(&mut self, ui: &egui::Ui, rect: Rect, session: &mut PlaybackSession, now: Instant) {
        let hovered = ui.rect_contains_pointer(rect);
        let moved = ui.input(|i| i.pointer.delta() != Vec2::ZERO);
        if hovered && moved {
            session.pointer_moved(now);
        }
        if self.was_hovered && !hovered {
            session.pointer_left();
        }
        self.was_hovered = hovered;
    }

    fn show_center_button(&self, ui: &mut egui::Ui, rect: Rect, session: &mut PlaybackSession) {
        let button_rect = Rect::from_center_size(rect.center(), Vec2::splat(CENTER_BUTTON));
        let ended = session.phase() == PlaybackPhase::Ended;
        let glyph = if ended {
            "⟲"
        } else if session.is_playing() {
            "⏸"
        } else {
            "▶"
        };
        let button = egui::Button::new(RichText::new(glyph).size(32.0).color(Color32::WHITE))
            .fill(Color32::from_black_alpha(140))
            .corner_radius(CENTER_BUTTON / 2.0);
        if ui.put(button_rect, button).clicked() {
            session.toggle_play_pause();
        }
    }

    fn show_controls_bar(&self, ui: &mut egui::Ui, rect: Rect, session: &mut PlaybackSession) {
        let bar = Rect::from_min_max(egui::pos2(rect.left(), rect.bottom() - BAR_HEIGHT), rect.max);
        ui.painter().rect_filled(bar, 0.0, Color32::from_black_alpha(160));

        ui.scope_builder(egui::UiBuilder::new().max_rect(bar.shrink2(Vec2::new(12.0, 6.0))), |ui| {
            ui.visuals_mut().override_text_color = Some(Color32::WHITE);
            ui.visuals_mut().selection.bg_fill = ACCENT;

            // Seek bar
            ui.spacing_mut().slider_width = ui.available_width();
            let mut played = session.played();
            let seek = ui.add(egui::Slider::new(&mut played, 0.0..=MAX_PLAYED).show_value(false));
            if seek.drag_started() {
                session.seek_begin();
            }
            if session.is_seeking() && (seek.dragged() || seek.changed()) {
                session.seek_drag(played);
            }
            if seek.drag_stopped() {
                session.seek_end(played);
            } else if seek.changed() && !session.is_seeking() {
                session.seek_begin();
                session.seek_end(played);
            }

            ui.horizontal(|ui| {
                let glyph = if session.is_playing() { "⏸" } else { "▶" };
                if ui
                    .add_enabled(session.is_ready(), egui::Button::new(glyph).frame(false))
                    .on_hover_text(if session.is_playing() { "Pause" } else { "Play" })
                    .clicked()
                {
                    session.toggle_play_pause();
                }

                let mute_glyph = if session.is_muted() { "🔇" } else { "🔊" };
                if ui
                    .add(egui::Button::new(mute_glyph).frame(false))
                    .on_hover_text(if session.is_muted() { "Unmute" } else { "Mute" })
                    .clicked()
                {
                    session.toggle_mute();
                }

                ui.spacing_mut().slider_width = 90.0;
                let mut volume = session.volume_display();
                if ui
                    .add(egui::Slider::new(&mut volume, 0.0..=1.0).show_value(false))
                    .changed()
                {
                    session.set_volume(volume);
                }

                ui.label(format!(
                    "{} / {}",
                    format_time(session.elapsed()),
                    format_time(session.duration())
                ));

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let fs_glyph = if session.is_fullscreen() { "🗗" } else { "⛶" };
                    if ui
                        .add(egui::Button::new(fs_glyph).frame(false))
                        .on_hover_text(if session.is_fullscreen() { "Exit Fullscreen" } else { "Fullscreen" })
                        .clicked()
                    {
                        session.request_fullscreen();
                    }

                    if ui
                        .add_enabled(!session.qualities().is_empty(), egui::Button::new("⚙").frame(false))
                        .on_hover_text("Quality settings")
                        .clicked()
                    {
                        session.toggle_quality_menu();
                    }
                });
            });
        });
    }
}

fn show_quality_menu(ctx: &egui::Context, rect: Rect, session: &mut PlaybackSession) {
    let anchor = egui::pos2(rect.right() - 12.0, rect.bottom() - BAR_HEIGHT - 8.0);
    egui::Area::new(egui::Id::new("quality_menu"))
        .order(egui::Order::Foreground)
        .pivot(egui::Align2::RIGHT_BOTTOM)
        .fixed_pos(anchor)
        .show(ctx, |ui| {
            egui::Frame::popup(ui.style()).show(ui, |ui| {
                ui.set_min_width(140.0);
                ui.horizontal(|ui| {
                    ui.strong("Quality");
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.small_button("✕").on_hover_text("Close quality menu").clicked() {
                            session.close_quality_menu();
                        }
                    });
                });
                ui.separator();

                let current = session.current_quality();
                let mut choice = None;
                if ui.selectable_label(current == AUTO_LEVEL, "Auto").clicked() {
                    choice = Some(AUTO_LEVEL);
                }
                for level in session.qualities() {
                    if ui.selectable_label(current == level.index, &level.name).clicked() {
                        choice = Some(level.index);
                    }
                }
                if let Some(level) = choice {
                    session.select_quality(level);
                }
            });
        });
}

fn refresh(
    ctx: &egui::Context,
    slot: &mut Option<(u64, egui::TextureHandle)>,
    name: &str,
    id: u64,
    frame: &VideoFrame,
) {
    if matches!(slot, Some((current, _)) if *current == id) {
        return;
    }
    let image = egui::ColorImage::from_rgb([frame.width as usize, frame.height as usize], &frame.data);
    match slot {
        Some((current, texture)) => {
            texture.set(image, egui::TextureOptions::LINEAR);
            *current = id;
        }
        None => *slot = Some((id, ctx.load_texture(name, image, egui::TextureOptions::LINEAR))),
    }
}

/// Largest rect with the frame's aspect ratio centered in `container`.
fn fit(container: Rect, size: Vec2) -> Rect {
    if size.x <= 0.0 || size.y <= 0.0 {
        return container;
    }
    let scale = (container.width() / size.x).min(container.height() / size.y);
    Rect::from_center_size(container.center(), size * scale)
}
