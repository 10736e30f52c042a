//! Top-level entry point for running a session in a native window.

use eframe::egui;

use crate::clock::SystemClock;
use crate::config::AppConfig;
use crate::session::Session;

use super::myo_app::MyoApp;

/// Open a native window and drive `session` until the user quits.
///
/// The call blocks until the window is closed.
pub fn run_session(session: Session<SystemClock>, cfg: &AppConfig) -> eframe::Result<()> {
    let w = &cfg.window;
    let scene_size = egui::vec2(w.width as f32, w.height as f32);
    let app = MyoApp::new(session, cfg.log_dir(), scene_size, w.tick_hz, w.fullscreen);

    let opts = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(w.title.clone())
            .with_inner_size(scene_size)
            .with_fullscreen(w.fullscreen),
        ..Default::default()
    };

    eframe::run_native(&w.title, opts, Box::new(|_cc| Ok(Box::new(app))))
}
