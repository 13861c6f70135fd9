//! Egui front-end for the program editor (feature = "egui").
//!
//! [`EditorApp`] paints the session's [`Scene`](crate::editor::Scene) every
//! frame, turns pointer input into editor pointer events and hosts the
//! palette, the filter selector and the rename dialog. Sensor messages
//! arrive over a `crossbeam-channel` receiver.

#![cfg(feature = "egui")]

mod geometry;
mod render;
mod state;
mod ui;

pub use geometry::{element_rect, from_screen, hits_embedded_widget, part_rect, to_screen};
pub use state::{EditorApp, RenamePrompt};
