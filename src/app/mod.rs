//! egui front-end.
//!
//! | Sub-module  | Responsibility |
//! | ----------- | -------------- |
//! | [`myo_app`] | [`MyoApp`] (eframe) wrapper: key bindings, ticking, fullscreen |
//! | [`draw`]    | Painting a render state with the egui painter |
//! | [`review`]  | Post-session plot of the recording |
//! | [`run`]     | [`run_session()`] entry point |

mod draw;
mod myo_app;
mod review;
mod run;

pub use myo_app::MyoApp;
pub use run::run_session;
