//! Visual editor for dataflow programs.
//!
//! Programs are diagrams of blocks (sensor devices, filters, number entries,
//! plots) whose pins are wired together. The crate provides the diagram
//! model and its recomputation, program (de)serialization, and a headless
//! editor that renders to a retained [`editor::Scene`] and reacts to pointer
//! events and live sensor data.
//!
//! The binary `flowedit` replays a recorded sensor log through a program and
//! prints the result as JSON.

pub mod color;
pub mod config;
pub mod editor;
pub mod engine;
pub mod error;
pub mod model;
pub mod spec;

// Optional GUI/egui functionality lives behind the `egui` feature flag.
// It paints the editor scene and hosts the palette and dialogs; see the
// demo in demos/egui_editor.rs.
#[cfg(feature = "egui")]
pub mod egui_app;

pub use config::EditorConfig;
pub use editor::EditorSession;
pub use error::{EditorError, Result};
