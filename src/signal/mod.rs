//! EMG signal chain.

pub mod bandpass;
pub mod conditioner;
pub mod history;

pub use bandpass::Bandpass;
pub use conditioner::{Baseline, BaselineWindow, SignalConditioner, STD_MULTIPLIER};
pub use history::History;
