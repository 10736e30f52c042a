//! Painting a [`RenderState`] with the egui painter.
//!
//! Scene coordinates are in pixels of the configured window size and are
//! scaled uniformly into whatever rect egui hands us.

use eframe::egui;
use egui::{Align2, Color32, FontId, Painter, Pos2, Rect, Shape, Stroke, Vec2};

use crate::game::{ObstacleKind, Sprite};
use crate::scene::{GameView, InstructionsView, RenderState, SetupView};

const SKY: Color32 = Color32::from_rgb(200, 225, 245);
const GROUND: Color32 = Color32::from_rgb(120, 85, 50);
const GRASS: Color32 = Color32::from_rgb(70, 150, 60);
const CACTUS: Color32 = Color32::from_rgb(30, 120, 40);
const SPIKES: Color32 = Color32::from_rgb(110, 110, 120);
const PLAYER: Color32 = Color32::from_rgb(230, 120, 40);

fn rgb(c: [u8; 3]) -> Color32 {
    Color32::from_rgb(c[0], c[1], c[2])
}

/// Maps scene pixels into the painter's rect.
struct Canvas<'a> {
    painter: &'a Painter,
    origin: Pos2,
    scale: f32,
    size: Vec2,
}

impl<'a> Canvas<'a> {
    fn new(painter: &'a Painter, rect: Rect, scene: Vec2) -> Self {
        let scale = (rect.width() / scene.x).min(rect.height() / scene.y).max(0.01);
        let used = scene * scale;
        let origin = rect.min + (rect.size() - used) / 2.0;
        Self {
            painter,
            origin,
            scale,
            size: scene,
        }
    }

    fn pos(&self, x: f64, y: f64) -> Pos2 {
        self.origin + Vec2::new(x as f32, y as f32) * self.scale
    }

    fn rect(&self, r: &crate::game::Rect) -> Rect {
        Rect::from_min_max(self.pos(r.x, r.y), self.pos(r.x + r.w, r.y + r.h))
    }

    fn fill(&self, x: f64, y: f64, w: f64, h: f64, color: Color32) {
        let r = Rect::from_min_max(self.pos(x, y), self.pos(x + w, y + h));
        self.painter.rect_filled(r, 0.0, color);
    }

    fn text(&self, x: f64, y: f64, text: impl ToString, size: f32, color: Color32) {
        self.painter.text(
            self.pos(x, y),
            Align2::CENTER_CENTER,
            text,
            FontId::proportional(size * self.scale),
            color,
        );
    }

    fn width(&self) -> f64 {
        self.size.x as f64
    }

    fn height(&self) -> f64 {
        self.size.y as f64
    }
}

pub fn paint(ui: &mut egui::Ui, state: &RenderState, scene_size: Vec2) {
    let size = ui.available_size();
    let (response, painter) = ui.allocate_painter(size, egui::Sense::hover());
    let canvas = Canvas::new(&painter, response.rect, scene_size);
    match state {
        RenderState::Setup(v) => paint_setup(&canvas, v),
        RenderState::Instructions(v) => paint_instructions(&canvas, v),
        RenderState::Game(v) => paint_game(&canvas, v),
    }
}

fn paint_setup(c: &Canvas<'_>, v: &SetupView) {
    c.fill(0.0, 0.0, c.width(), c.height(), Color32::BLACK);
    let (cx, cy) = (c.width() / 2.0, c.height() / 2.0);
    if let Some(r) = v.circle_radius {
        let r = r.min(cx.min(cy)) as f32 * c.scale;
        c.painter.circle_filled(c.pos(cx, cy), r, Color32::from_rgb(220, 40, 40));
    }
    let reading = match v.signal {
        Some(s) => format!("EMG {s:.1}  (threshold {:.1})", v.threshold),
        None => "waiting for signal".to_string(),
    };
    c.text(cx, c.height() - 30.0, reading, 20.0, Color32::WHITE);
}

fn paint_instructions(c: &Canvas<'_>, v: &InstructionsView) {
    c.fill(0.0, 0.0, c.width(), c.height(), Color32::BLACK);
    let color = v.color.map(rgb).unwrap_or(Color32::GRAY);
    let (cx, cy) = (c.width() / 2.0, c.height() / 2.0);
    c.text(cx, cy - 40.0, v.text, 40.0, color);
    if let Some(w) = v.bar_width {
        c.fill(cx - w / 2.0, cy + 20.0, w, 24.0, color);
    }
    if let Some((n, of)) = v.attempt {
        c.text(cx, c.height() - 30.0, format!("{n} / {of}"), 18.0, Color32::LIGHT_GRAY);
    } else if v.completed {
        c.text(cx, c.height() - 30.0, "done", 18.0, Color32::LIGHT_GRAY);
    } else {
        c.text(cx, c.height() - 30.0, "press S to start", 18.0, Color32::LIGHT_GRAY);
    }
}

fn paint_game(c: &Canvas<'_>, v: &GameView) {
    c.fill(0.0, 0.0, c.width(), c.height(), SKY);
    c.fill(0.0, v.ground_line, c.width(), c.height() - v.ground_line, GROUND);
    c.fill(0.0, v.ground_line, c.width(), 8.0, GRASS);

    // tile seams scroll with the world
    let first = (-v.scroll / v.tile_width).floor();
    let mut x = first * v.tile_width + v.scroll;
    while x < c.width() {
        c.painter.line_segment(
            [c.pos(x, v.ground_line), c.pos(x, c.height())],
            Stroke::new(1.0, GROUND.gamma_multiply(0.7)),
        );
        x += v.tile_width;
    }

    if v.goal_x >= 0.0 && v.goal_x <= c.width() {
        c.painter.line_segment(
            [c.pos(v.goal_x, 0.0), c.pos(v.goal_x, v.ground_line)],
            Stroke::new(4.0, Color32::WHITE),
        );
    }

    for o in &v.obstacles {
        let r = c.rect(&o.rect);
        match o.kind {
            ObstacleKind::Cactus => {
                c.painter.rect_filled(r.shrink2(Vec2::new(r.width() * 0.3, 0.0)), 4.0, CACTUS);
                let arm = Rect::from_min_size(
                    Pos2::new(r.left(), r.top() + r.height() * 0.3),
                    Vec2::new(r.width(), r.height() * 0.15),
                );
                c.painter.rect_filled(arm, 2.0, CACTUS);
            }
            ObstacleKind::Spikes => {
                let n = 3;
                let w = r.width() / n as f32;
                for i in 0..n {
                    let left = r.left() + i as f32 * w;
                    c.painter.add(Shape::convex_polygon(
                        vec![
                            Pos2::new(left, r.bottom()),
                            Pos2::new(left + w / 2.0, r.top()),
                            Pos2::new(left + w, r.bottom()),
                        ],
                        SPIKES,
                        Stroke::NONE,
                    ));
                }
            }
        }
    }

    paint_player(c, v);

    // phase strip and readouts
    let strip = v.color.map(rgb).unwrap_or(Color32::DARK_GRAY);
    c.fill(0.0, 0.0, c.width(), 12.0, strip);
    c.text(80.0, 36.0, format!("hits {}", v.hits), 18.0, Color32::BLACK);
    if let (Some(s), Some(t)) = (v.signal, v.threshold) {
        let full = 200.0;
        let level = (s / (2.0 * t.max(1e-9))).clamp(0.0, 1.0) * full;
        let x = c.width() - 40.0;
        c.fill(x, 30.0, 16.0, full, Color32::from_gray(60));
        c.fill(x, 30.0 + full - level, 16.0, level, strip);
        c.painter.line_segment(
            [c.pos(x - 4.0, 30.0 + full / 2.0), c.pos(x + 20.0, 30.0 + full / 2.0)],
            Stroke::new(2.0, Color32::WHITE),
        );
    }
    if !v.started && v.score.is_none() {
        c.text(c.width() / 2.0, c.height() / 3.0, "press S to start", 32.0, Color32::BLACK);
    }
    if let Some(score) = v.score {
        let stars: String = (0..3).map(|i| if i < score.stars { '★' } else { '☆' }).collect();
        c.text(c.width() / 2.0, c.height() / 3.0, stars, 64.0, Color32::from_rgb(240, 190, 0));
        c.text(
            c.width() / 2.0,
            c.height() / 3.0 + 60.0,
            format!("{} of {} avoided", score.avoided, score.total),
            24.0,
            Color32::BLACK,
        );
    }
}

fn paint_player(c: &Canvas<'_>, v: &GameView) {
    let p = &v.player;
    let body = crate::game::Rect::new(p.x + p.w * 0.2, p.y, p.w * 0.6, p.h * 0.75);
    c.painter.rect_filled(c.rect(&body), 6.0, PLAYER);
    c.painter
        .circle_filled(c.pos(p.x + p.w / 2.0, p.y + p.h * 0.12), (p.w * 0.2) as f32 * c.scale, Color32::from_rgb(250, 210, 170));

    let hip = p.y + p.h * 0.75;
    let foot = p.y + p.h;
    let (l, r) = match v.sprite {
        Sprite::Walk1 => (0.25, 0.75),
        Sprite::Walk2 => (0.4, 0.6),
        Sprite::Jump => (0.3, 0.7),
    };
    let leg = Stroke::new(8.0 * c.scale, PLAYER);
    let tuck = if v.sprite == Sprite::Jump { p.h * 0.1 } else { 0.0 };
    c.painter.line_segment([c.pos(p.x + p.w * 0.4, hip), c.pos(p.x + p.w * l, foot - tuck)], leg);
    c.painter.line_segment([c.pos(p.x + p.w * 0.6, hip), c.pos(p.x + p.w * r, foot - tuck)], leg);
}
