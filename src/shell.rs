//! Window creation and host lifecycle

use eframe::egui;

use crate::security::{ContentSecurityPolicy, DEFAULT_POLICY};

pub const APP_TITLE: &str = "Player13";
pub const WINDOW_SIZE: [f32; 2] = [1200.0, 800.0];
const MIN_WINDOW_SIZE: [f32; 2] = [800.0, 500.0];

/// What the host does when the user closes the window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClosePolicy {
    Quit,
    /// Keep the process resident and minimize instead
    StayResident,
}

impl ClosePolicy {
    pub fn for_platform(os: &str) -> Self {
        if os == "macos" {
            ClosePolicy::StayResident
        } else {
            ClosePolicy::Quit
        }
    }

    pub fn current() -> Self {
        Self::for_platform(std::env::consts::OS)
    }
}

/// Veto a pending close when the platform keeps apps alive without windows.
pub fn handle_close_request(ctx: &egui::Context, policy: ClosePolicy) {
    if policy != ClosePolicy::StayResident || !ctx.input(|i| i.viewport().close_requested()) {
        return;
    }
    log::info!("Close requested, minimizing instead of quitting");
    ctx.send_viewport_cmd(egui::ViewportCommand::CancelClose);
    ctx.send_viewport_cmd(egui::ViewportCommand::Minimized(true));
}

pub fn content_policy() -> ContentSecurityPolicy {
    let policy = ContentSecurityPolicy::parse(DEFAULT_POLICY);
    log::debug!(
        "Content policy loaded (media-src: {}, img-src: {}, connect-src: {})",
        policy.has_directive("media-src"),
        policy.has_directive("img-src"),
        policy.has_directive("connect-src")
    );
    policy
}

pub fn native_options() -> eframe::NativeOptions {
    eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(APP_TITLE)
            .with_inner_size(WINDOW_SIZE)
            .with_min_inner_size(MIN_WINDOW_SIZE)
            .with_icon(load_icon()),
        vsync: true,
        hardware_acceleration: eframe::HardwareAcceleration::Preferred,
        ..Default::default()
    }
}

/// Add a system emoji font so the sidebar and control glyphs render.
pub fn install_fonts(ctx: &egui::Context) {
    let mut fonts = egui::FontDefinitions::default();

    let candidates: &[&str] = if cfg!(target_os = "windows") {
        &["C:\\Windows\\Fonts\\seguiemj.ttf"]
    } else if cfg!(target_os = "macos") {
        &["/System/Library/Fonts/Apple Color Emoji.ttc"]
    } else {
        &[
            "/usr/share/fonts/truetype/noto/NotoColorEmoji.ttf",
            "/usr/share/fonts/noto-emoji/NotoColorEmoji.ttf",
            "/usr/share/fonts/google-noto-emoji/NotoColorEmoji.ttf",
            "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        ]
    };

    match candidates.iter().find_map(|path| std::fs::read(path).ok()) {
        Some(font_data) => {
            fonts
                .font_data
                .insert("emoji".to_owned(), egui::FontData::from_owned(font_data).into());
            fonts
                .families
                .entry(egui::FontFamily::Proportional)
                .or_default()
                .push("emoji".to_owned());
        }
        None => log::debug!("No system emoji font found"),
    }

    ctx.set_fonts(fonts);
}

/// Red rounded square with a white play triangle.
fn load_icon() -> egui::IconData {
    let size: usize = 64;
    let mut rgba = vec![0u8; size * size * 4];
    let radius = 0.18;

    for y in 0..size {
        for x in 0..size {
            let idx = (y * size + x) * 4;
            let nx = (x as f32 + 0.5) / size as f32;
            let ny = (y as f32 + 0.5) / size as f32;

            let cx = nx.clamp(radius, 1.0 - radius);
            let cy = ny.clamp(radius, 1.0 - radius);
            if (nx - cx).powi(2) + (ny - cy).powi(2) > radius * radius {
                continue;
            }

            let px = nx - 0.38;
            let py = ny - 0.5;
            let in_play = (0.0..=0.32).contains(&px) && py.abs() <= (0.32 - px) * 0.62;

            let pixel = if in_play {
                [255, 255, 255, 255]
            } else {
                // #E50914 darkening toward the bottom
                let shade = 1.0 - ny * 0.25;
                [(229.0 * shade) as u8, (9.0 * shade) as u8, (20.0 * shade) as u8, 255]
            };
            rgba[idx..idx + 4].copy_from_slice(&pixel);
        }
    }

    egui::IconData {
        rgba,
        width: size as u32,
        height: size as u32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_policy_per_platform() {
        assert_eq!(ClosePolicy::for_platform("macos"), ClosePolicy::StayResident);
        assert_eq!(ClosePolicy::for_platform("linux"), ClosePolicy::Quit);
        assert_eq!(ClosePolicy::for_platform("windows"), ClosePolicy::Quit);
    }

    #[test]
    fn test_icon_has_transparent_corners() {
        let icon = load_icon();
        assert_eq!(icon.rgba.len(), 64 * 64 * 4);
        assert_eq!(icon.rgba[3], 0);
        let center = (32 * 64 + 20) * 4;
        assert_eq!(icon.rgba[center + 3], 255);
    }
}
