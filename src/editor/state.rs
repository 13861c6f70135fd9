//! Editor session.
//!
//! [`EditorSession`] owns everything tied to the program being edited: the
//! diagram, the drawing surface, presentation state, interaction state,
//! block names, plot series and the sensor bookkeeping. Loading another
//! program resets all of it.

use std::collections::{HashMap, HashSet};

use camino::Utf8Path;

use crate::config::EditorConfig;
use crate::error::Result;
use crate::model::{BlockId, Diagram, PinId};
use crate::spec::{ProgramSpec, diagram_to_spec, spec_to_diagram};

use super::interaction::InteractionState;
use super::operations::NameRegistry;
use super::scene::{Scene, Surface};
use super::sensor::{PlotSeries, SensorReading};
use super::view::ViewTable;

/// Editing state of one loaded program.
pub struct EditorSession<S: Surface = Scene> {
    pub(crate) surface: S,
    pub(crate) config: EditorConfig,
    pub(crate) diagram: Diagram,
    pub(crate) program_name: Option<String>,
    pub(crate) scale: f32,
    pub(crate) modified: bool,
    pub(crate) names: NameRegistry,
    pub(crate) views: ViewTable,
    pub(crate) plots: HashMap<BlockId, PlotSeries>,
    pub(crate) interaction: InteractionState,
    pub(crate) hovered_pin: Option<PinId>,
    pub(crate) last_sensor_data: Option<Vec<SensorReading>>,
    /// Sensor names seen in any payload since load.
    pub(crate) confirmed_sensors: HashSet<String>,
    /// Timestamp of the latest sensor message, and of the first one.
    pub(crate) timestamp: f64,
    pub(crate) first_timestamp: Option<f64>,
}

impl<S: Surface> EditorSession<S> {
    /// Create a session with an empty diagram.
    pub fn new(surface: S, config: EditorConfig) -> Self {
        Self {
            surface,
            config,
            diagram: Diagram::new(),
            program_name: None,
            scale: 1.0,
            modified: false,
            names: NameRegistry::new(),
            views: ViewTable::new(),
            plots: HashMap::new(),
            interaction: InteractionState::Idle,
            hovered_pin: None,
            last_sensor_data: None,
            confirmed_sensors: HashSet::new(),
            timestamp: 0.0,
            first_timestamp: None,
        }
    }

    /// Replace the current program.
    ///
    /// On error the current program stays loaded and displayed.
    pub fn load_program(&mut self, spec: &ProgramSpec) -> Result<()> {
        let diagram = spec_to_diagram(spec)?;

        self.cancel_interaction();
        let old: Vec<BlockId> = self.diagram.blocks.iter().map(|b| b.id).collect();
        for id in old {
            self.undisplay_block(id);
        }

        self.diagram = diagram;
        self.program_name = spec.name.clone();
        self.scale = 1.0;
        self.names.clear();
        self.views.clear();
        self.plots.clear();
        self.hovered_pin = None;
        self.last_sensor_data = None;
        self.confirmed_sensors.clear();
        self.timestamp = 0.0;
        self.first_timestamp = None;
        self.scale_classes();

        let mut renamed = false;
        for block in self.diagram.blocks.iter_mut() {
            if self.names.contains(&block.name) {
                let unique = self.names.unique_name(&block.name);
                tracing::warn!(
                    "Block {} repeats the name {:?}, renamed to {:?}",
                    block.id,
                    block.name,
                    unique
                );
                block.name = unique;
                renamed = true;
            }
            self.names.insert(&block.name, block.id);
        }

        let ids: Vec<BlockId> = self.diagram.blocks.iter().map(|b| b.id).collect();
        for id in ids {
            self.display_block(id);
        }
        self.display_connections();

        self.modified = renamed;
        tracing::info!(
            "Loaded program {:?} with {} blocks and {} connections",
            self.program_name.as_deref().unwrap_or("(unnamed)"),
            self.diagram.blocks.len(),
            self.diagram.connection_count()
        );
        Ok(())
    }

    /// Load a program from a JSON file.
    pub fn load_program_file(&mut self, path: &Utf8Path) -> Result<()> {
        let spec = ProgramSpec::load(path)?;
        self.load_program(&spec)
    }

    /// The edited program in serializable form.
    pub fn program_spec(&self) -> ProgramSpec {
        diagram_to_spec(&self.diagram, self.program_name.as_deref())
    }

    /// Save the edited program and clear the modified flag.
    pub fn save_program(&mut self, path: &Utf8Path) -> Result<()> {
        self.program_spec().save(path)?;
        self.modified = false;
        tracing::info!("Saved program to {}", path);
        Ok(())
    }

    /// Change the zoom by `increment` and redraw.
    pub fn zoom_blocks(&mut self, increment: f32) {
        self.scale = (self.scale + increment).max(self.config.min_scale);
        self.redraw_blocks();
        tracing::debug!("Zoom set to {:.2}", self.scale);
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Record that the visible layout of the program changed.
    pub fn layout_modified(&mut self) {
        self.modified = true;
    }

    pub fn diagram(&self) -> &Diagram {
        &self.diagram
    }

    /// Direct access to the diagram. Callers changing its structure must
    /// call [`redraw_blocks`](Self::redraw_blocks) afterwards.
    pub fn diagram_mut(&mut self) -> &mut Diagram {
        &mut self.diagram
    }

    pub fn program_name(&self) -> Option<&str> {
        self.program_name.as_deref()
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn views(&self) -> &ViewTable {
        &self.views
    }

    pub fn names(&self) -> &NameRegistry {
        &self.names
    }
}
