//! Post-session plot of the recorded output with the threshold.

use eframe::egui;
use egui_plot::{HLine, Legend, Line, Plot};

use crate::signal::SignalConditioner;

/// Points kept for drawing; longer recordings are decimated.
const MAX_POINTS: usize = 5000;

pub struct Review {
    output: Vec<[f64; 2]>,
    raw: Vec<[f64; 2]>,
    threshold: Option<f64>,
    saved: Vec<String>,
}

impl Review {
    pub fn new(conditioner: &SignalConditioner, threshold: Option<f64>, saved: Vec<String>) -> Self {
        let fs = conditioner.sampling_frequency();
        let stride = (conditioner.output().retained() / MAX_POINTS).max(1);
        let decimate = |h: &crate::signal::History| -> Vec<[f64; 2]> {
            h.iter()
                .step_by(stride)
                .map(|(i, v)| [i as f64 / fs, v])
                .collect()
        };
        Self {
            output: decimate(conditioner.output()),
            raw: decimate(conditioner.input()),
            threshold,
            saved,
        }
    }

    pub fn show(&self, ui: &mut egui::Ui) {
        ui.heading("Session recording");
        for path in &self.saved {
            ui.label(format!("saved {path}"));
        }
        ui.label("press Q to close");
        Plot::new("review_plot")
            .legend(Legend::default())
            .x_axis_label("time [s]")
            .show(ui, |plot_ui| {
                plot_ui.line(Line::new("raw", self.raw.clone()).width(1.0));
                plot_ui.line(Line::new("output", self.output.clone()).width(2.0));
                if let Some(t) = self.threshold {
                    plot_ui.hline(HLine::new("threshold", t).width(1.5));
                }
            });
    }
}
