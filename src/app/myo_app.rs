use std::path::PathBuf;

use eframe::egui;
use tracing::info;

use super::draw;
use super::review::Review;
use crate::clock::{SystemClock, TickPacer};
use crate::scene::{Flow, Input, RenderState};
use crate::session::Session;

/// Key bindings. Q/Escape quit, S starts, Space jumps, F toggles fullscreen.
fn read_inputs(ctx: &egui::Context) -> (Vec<Input>, bool) {
    ctx.input(|i| {
        let mut inputs = Vec::new();
        if i.key_pressed(egui::Key::S) {
            inputs.push(Input::Start);
        }
        if i.key_pressed(egui::Key::Space) {
            inputs.push(Input::Jump);
        }
        if i.key_pressed(egui::Key::Q) || i.key_pressed(egui::Key::Escape) {
            inputs.push(Input::Quit);
        }
        (inputs, i.key_pressed(egui::Key::F))
    })
}

/// Standalone eframe application driving one [`Session`].
pub struct MyoApp {
    session: Session<SystemClock>,
    log_dir: PathBuf,
    scene_size: egui::Vec2,
    pacer: TickPacer,
    /// Last frame produced by the session, repainted between steps.
    state: Option<RenderState>,
    fullscreen: bool,
    review: Option<Review>,
}

impl MyoApp {
    pub fn new(session: Session<SystemClock>, log_dir: PathBuf, scene_size: egui::Vec2, tick_hz: f64, fullscreen: bool) -> Self {
        Self {
            session,
            log_dir,
            scene_size,
            pacer: TickPacer::from_hz(tick_hz),
            state: None,
            fullscreen,
            review: None,
        }
    }

    /// Stop the session, save its recording and switch to the review plot.
    fn finish(&mut self) {
        let saved = self.session.finish(&self.log_dir);
        info!(files = saved.len(), "session finished");
        let saved = saved.iter().map(|p| p.display().to_string()).collect();
        self.review = Some(Review::new(
            self.session.conditioner(),
            self.session.threshold(),
            saved,
        ));
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// eframe integration
// ─────────────────────────────────────────────────────────────────────────────

impl eframe::App for MyoApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let (inputs, toggle_fullscreen) = read_inputs(ctx);
        if toggle_fullscreen {
            self.fullscreen = !self.fullscreen;
            ctx.send_viewport_cmd(egui::ViewportCommand::Fullscreen(self.fullscreen));
        }

        if let Some(review) = &self.review {
            if inputs.contains(&Input::Quit) {
                ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            }
            egui::CentralPanel::default().show(ctx, |ui| review.show(ui));
            return;
        }

        let mut quit = ctx.input(|i| i.viewport().close_requested());
        for input in inputs {
            if self.session.handle_input(input) == Flow::Quit {
                quit = true;
            }
        }
        if quit {
            self.finish();
            ctx.request_repaint();
            return;
        }

        // egui also calls `update` on pointer and key events; the game only
        // advances in whole steps at the configured rate
        let now = self.session.now();
        for _ in 0..self.pacer.due(now) {
            self.state = Some(self.session.tick());
        }
        if let Some(state) = &self.state {
            egui::CentralPanel::default()
                .frame(egui::Frame::NONE)
                .show(ctx, |ui| draw::paint(ui, state, self.scene_size));
        }

        ctx.request_repaint_after(self.pacer.until_next(self.session.now()));
    }
}
