//! The eframe application: per-frame pumping, background tasks and routing
//! to the screens in [`crate::ui`]

use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread;
use std::time::Instant;

use eframe::egui;

use crate::activation::ActivationCode;
use crate::app_state::AppState;
use crate::logging::ConsoleBuffer;
use crate::models::{ChannelId, Route};
use crate::player::overlay::VideoOverlay;
use crate::playlist::{self, PlaylistEntry, PlaylistSource};
use crate::shell::{self, ClosePolicy};

/// Background task messages
pub enum TaskResult {
    PlaylistLoaded {
        source: String,
        entries: Vec<PlaylistEntry>,
    },
    Error(String),
}

/// Entries of the home sidebar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavItem {
    Home,
    Channels,
    LiveTv,
    Favorites,
    Recent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsTab {
    Appearance,
    Playback,
    Console,
}

/// State of the "Add channel" modal
#[derive(Debug, Default)]
pub struct AddChannelForm {
    pub name: String,
    pub url: String,
    pub error: Option<String>,
}

pub struct Player13App {
    pub(crate) state: AppState,
    pub(crate) console: ConsoleBuffer,
    pub(crate) overlay: VideoOverlay,
    pub(crate) activation: ActivationCode,
    close_policy: ClosePolicy,
    task_sender: Sender<TaskResult>,
    task_receiver: Receiver<TaskResult>,

    // Home
    pub(crate) active_nav: NavItem,
    pub(crate) search_query: String,
    pub(crate) add_form: Option<AddChannelForm>,
    pub(crate) pending_delete: Option<ChannelId>,
    pub(crate) import_input: Option<String>,
    pub(crate) importing: bool,

    // Settings
    pub(crate) show_settings: bool,
    pub(crate) settings_tab: SettingsTab,

    // Watch
    pub(crate) watch_sidebar: bool,
    pub(crate) show_channel_list: bool,
    pub(crate) favorite: bool,
}

impl Player13App {
    pub fn new(state: AppState, console: ConsoleBuffer) -> Self {
        let (task_sender, task_receiver) = channel();
        Self {
            state,
            console,
            overlay: VideoOverlay::new(),
            activation: ActivationCode::new(),
            close_policy: ClosePolicy::current(),
            task_sender,
            task_receiver,
            active_nav: NavItem::Home,
            search_query: String::new(),
            add_form: None,
            pending_delete: None,
            import_input: None,
            importing: false,
            show_settings: false,
            settings_tab: SettingsTab::Appearance,
            watch_sidebar: false,
            show_channel_list: false,
            favorite: false,
        }
    }

    /// Open a channel on the watch screen with fresh per-mount UI state.
    pub(crate) fn watch_channel(&mut self, id: ChannelId) {
        let was_watching = matches!(self.state.route(), Route::Watch(_));
        if self.state.watch_channel(id) && !was_watching {
            self.enter_watch();
        }
    }

    pub(crate) fn browse_live(&mut self) {
        if self.state.browse_live() {
            self.enter_watch();
        }
    }

    fn enter_watch(&mut self) {
        self.overlay = VideoOverlay::new();
        self.watch_sidebar = false;
        self.favorite = false;
    }

    pub(crate) fn go_home(&mut self, ctx: &egui::Context) {
        if self.state.session().is_some_and(|s| s.is_fullscreen()) {
            ctx.send_viewport_cmd(egui::ViewportCommand::Fullscreen(false));
        }
        self.state.go_home();
        self.active_nav = NavItem::Home;
    }

    /// Fetch and parse a playlist on a worker thread.
    pub(crate) fn start_import(&mut self, ctx: &egui::Context, source: PlaylistSource) {
        if let Err(e) = self.state.check_import_source(&source) {
            self.state.set_status(e.to_string());
            return;
        }

        self.importing = true;
        self.state.set_status(format!("Importing {}...", source.label()));
        let sender = self.task_sender.clone();
        let user_agent = self.state.config.user_agent.clone();
        let ctx = ctx.clone();
        thread::spawn(move || {
            let label = source.label();
            let result = match playlist::load(&source, &user_agent) {
                Ok(entries) => TaskResult::PlaylistLoaded { source: label, entries },
                Err(e) => TaskResult::Error(format!("Import of {} failed: {}", label, e)),
            };
            let _ = sender.send(result);
            ctx.request_repaint();
        });
    }

    fn process_tasks(&mut self) {
        while let Ok(result) = self.task_receiver.try_recv() {
            match result {
                TaskResult::PlaylistLoaded { source, entries } => {
                    self.importing = false;
                    self.state.import_entries(&source, &entries);
                }
                TaskResult::Error(msg) => {
                    self.importing = false;
                    log::error!("{}", msg);
                    self.state.set_status(msg);
                }
            }
        }
    }
}

impl eframe::App for Player13App {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        shell::handle_close_request(ctx, self.close_policy);
        self.process_tasks();
        self.state.pump();
        if self.state.take_visuals_dirty() {
            ctx.set_visuals(self.state.theme.visuals());
        }

        match self.state.route() {
            Route::Welcome => {
                let now = Instant::now();
                self.activation.tick(now);
                ctx.request_repaint_after(self.activation.remaining(now));
                self.show_welcome(ctx);
            }
            Route::Home => self.show_home(ctx),
            Route::Watch(_) => self.show_watch(ctx),
        }

        self.show_settings_window(ctx);
        self.show_add_channel_dialog(ctx);
        self.show_delete_confirm(ctx);
        self.show_import_dialog(ctx);
    }
}
