//! Headless dataflow program editor.
//!
//! The editor is split into a few cooperating pieces, all operating on an
//! [`EditorSession`]:
//!
//! - **scene**: the [`Surface`] drawing abstraction and the retained [`Scene`]
//! - **view**: per-block and per-pin screen state ([`ViewTable`])
//! - **render**: block and connection display, moving and zooming
//! - **interaction**: the pointer state machine ([`InteractionState`])
//! - **operations**: palette commands, rename, delete and entry fields
//! - **sensor**: live sensor data, value display and plot series
//!
//! Nothing here depends on a windowing toolkit; the egui front-end in
//! `egui_app` paints the [`Scene`] and feeds pointer events back in.

pub mod interaction;
pub mod operations;
pub mod render;
pub mod scene;
pub mod sensor;
pub mod state;
pub mod view;

pub use interaction::{InteractionState, PointerEvent};
pub use operations::{NameRegistry, PromptOutcome, RenameRequest, filter_block_spec, parse_number};
pub use render::{format_units, format_value};
pub use scene::{
    BlockBody, BlockElement, BlockLayout, BlockStyle, Bounds, ElementId, Graphic, GraphicId,
    GraphicTag, HitTarget, MenuCommand, MenuItem, ParamField, Scene, SceneElement, Surface,
};
pub use sensor::{PlotSeries, SensorMessage, SensorPayload, SensorReading, decode_image};
pub use state::EditorSession;
pub use view::{BlockView, PinView, ViewTable, pin_offset, pin_radius, stroke_width};
