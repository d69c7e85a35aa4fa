//! Ember Viewer - interactive particle effect playground
//!
//! Opens a window, emits particles at the cursor while the left mouse
//! button is held, and exposes the emitter and post-processing settings
//! through an egui side panel.

pub mod app;

pub use app::{run, ViewerOptions};
