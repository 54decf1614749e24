//! Player13 - native IPTV player
//! Channel manager and HLS playback surface built on egui and FFmpeg

// Hide console window on Windows release builds
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

// Use mimalloc for faster memory allocation (Linux, macOS)
#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

mod activation;
mod app;
mod app_state;
mod bridge;
mod channels;
mod config;
mod error;
mod logging;
mod models;
mod player;
mod playlist;
mod security;
mod shell;
mod storage;
mod theme;
mod ui;

use anyhow::anyhow;

use app::Player13App;
use app_state::AppState;
use config::AppConfig;
use storage::{FileStore, KeyValueStore, MemoryStore};

fn open_store() -> Box<dyn KeyValueStore> {
    match FileStore::open_default() {
        Ok(store) => {
            log::info!("Using storage {}", store.path().display());
            Box::new(store)
        }
        Err(e) => {
            log::error!("Storage unavailable, changes will not be saved: {}", e);
            Box::new(MemoryStore::new())
        }
    }
}

fn main() -> anyhow::Result<()> {
    let console = logging::init();
    log::info!("{} {} starting", shell::APP_TITLE, env!("CARGO_PKG_VERSION"));

    let config_path = AppConfig::config_path();
    let config = AppConfig::load_from(&config_path);
    let state = AppState::new(
        open_store(),
        config,
        shell::content_policy(),
        Box::new(player::create_engine),
    )
    .with_config_path(config_path);

    eframe::run_native(
        shell::APP_TITLE,
        shell::native_options(),
        Box::new(move |cc| {
            shell::install_fonts(&cc.egui_ctx);
            Ok(Box::new(Player13App::new(state, console)))
        }),
    )
    .map_err(|e| anyhow!("failed to open the window: {}", e))
}
