use eframe::egui;

use crate::app::{AddChannelForm, Player13App};
use crate::channels::ChannelListView;
use crate::models::ChannelId;
use crate::theme::ACCENT;

enum RowAction {
    Play(ChannelId),
    Delete(ChannelId),
}

struct Row {
    id: ChannelId,
    name: String,
    detail: String,
    selected: bool,
}

impl Player13App {
    /// Search box, add/import buttons and the channel list. `compact` drops
    /// the import button and the url column for the watch sidebar.
    pub(crate) fn show_channel_panel(&mut self, ui: &mut egui::Ui, compact: bool) {
        ui.horizontal(|ui| {
            ui.add(
                egui::TextEdit::singleline(&mut self.search_query)
                    .hint_text("🔍 Search channels...")
                    .desired_width(if compact { ui.available_width() - 36.0 } else { 260.0 }),
            );
            if ui.button("➕").on_hover_text("Add channel").clicked() {
                self.add_form = Some(AddChannelForm::default());
            }
            if !compact
                && ui
                    .add_enabled(!self.importing, egui::Button::new("📥 Import playlist"))
                    .clicked()
            {
                self.import_input = Some(String::new());
            }
        });
        ui.add_space(6.0);

        let (rows, empty) = match self.state.channels.search(&self.search_query) {
            ChannelListView::Items(items) => (
                items
                    .into_iter()
                    .map(|c| Row {
                        id: c.id,
                        name: c.name.clone(),
                        detail: c.group.clone().unwrap_or_else(|| c.url.clone()),
                        selected: self.state.channels.is_selected(c.id),
                    })
                    .collect::<Vec<_>>(),
                None,
            ),
            view => (Vec::new(), view.empty_message()),
        };

        if let Some(message) = empty {
            ui.add_space(12.0);
            ui.vertical_centered(|ui| ui.label(egui::RichText::new(message).weak()));
            return;
        }

        let mut action = None;
        egui::ScrollArea::vertical()
            .id_salt(if compact { "watch_channels" } else { "home_channels" })
            .auto_shrink([false, true])
            .max_height(if compact { 320.0 } else { f32::INFINITY })
            .show(ui, |ui| {
                for row in &rows {
                    ui.horizontal(|ui| {
                        let mut name = egui::RichText::new(&row.name);
                        if row.selected {
                            name = name.color(ACCENT).strong();
                        }
                        let response = ui.add(egui::Button::new(name).frame(false).selected(row.selected));
                        if response.on_hover_text(&row.detail).clicked() {
                            action = Some(RowAction::Play(row.id));
                        }
                        if !compact {
                            ui.label(egui::RichText::new(&row.detail).small().weak());
                        }
                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                            if ui.small_button("✕").on_hover_text("Delete channel").clicked() {
                                action = Some(RowAction::Delete(row.id));
                            }
                        });
                    });
                }
            });

        match action {
            Some(RowAction::Play(id)) => self.watch_channel(id),
            Some(RowAction::Delete(id)) => self.pending_delete = Some(id),
            None => {}
        }
    }
}
