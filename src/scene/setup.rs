use std::time::Duration;

use crate::events::EventController;

/// Live readout for placing electrodes: a circle follows the signal
/// whenever it exceeds the fixed threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SetupView {
    pub signal: Option<f64>,
    pub threshold: f64,
    /// Radius of the feedback circle; `None` while below threshold.
    pub circle_radius: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct SetupScene {
    threshold: f64,
}

impl SetupScene {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn start(&mut self, _now: Duration, _events: &EventController) {}

    pub fn stop(&mut self, _now: Duration, _events: &EventController) {}

    pub fn draw(&mut self, signal: Option<f64>) -> SetupView {
        SetupView {
            signal,
            threshold: self.threshold,
            circle_radius: signal.filter(|&s| s > self.threshold),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circle_only_above_threshold() {
        let mut s = SetupScene::new(8.0);
        assert_eq!(s.draw(None).circle_radius, None);
        assert_eq!(s.draw(Some(8.0)).circle_radius, None);
        assert_eq!(s.draw(Some(20.0)).circle_radius, Some(20.0));
    }
}
