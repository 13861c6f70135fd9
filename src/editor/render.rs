//! Block and connection rendering.
//!
//! These operations translate the diagram into surface elements and keep
//! the [`ViewTable`](super::view::ViewTable) in step with what is drawn:
//! every displayed pin owns exactly one circle, every connected input pin
//! owns exactly one line.

use crate::model::{Block, BlockId, BlockType, PinId, Value, format_number};

use super::scene::{
    BlockBody, BlockElement, BlockStyle, GraphicTag, MenuCommand, MenuItem, ParamField, Surface,
};
use super::sensor::decode_image;
use super::state::EditorSession;
use super::view::{BlockView, PinView, pin_offset, pin_radius, stroke_width};

/// Units as shown next to a value: `degrees C` becomes `°C`, `percent`
/// becomes `%`. Empty units are hidden.
pub fn format_units(units: &str) -> Option<String> {
    if units.is_empty() {
        return None;
    }
    Some(units.replace("degrees ", "°").replace("percent", "%"))
}

/// Value label text; null shows as `...`.
pub fn format_value(value: Option<&Value>) -> String {
    match value {
        Some(Value::Number(n)) => format_number(*n),
        Some(Value::Image(_)) | None => "...".to_string(),
    }
}

/// Build the surface element for a block.
fn block_element(block: &Block) -> BlockElement {
    let body = match block.block_type {
        BlockType::NumberEntry => BlockBody::NumberEntry {
            text: match &block.value {
                Some(Value::Number(n)) => format_number(*n),
                _ => String::new(),
            },
        },
        BlockType::Plot => BlockBody::Plot,
        _ if block.is_image_valued() => BlockBody::Image,
        _ => BlockBody::Value {
            text: format_value(block.value.as_ref()),
            units: block.units.as_deref().and_then(format_units),
        },
    };

    let params = block
        .params
        .iter()
        .map(|p| ParamField {
            name: p.name.clone(),
            text: p.value.map(format_number).unwrap_or_default(),
        })
        .collect();

    BlockElement {
        block: block.id,
        name: match block.block_type {
            BlockType::Plot => None,
            _ => Some(block.name.clone()),
        },
        body,
        params,
        menu: vec![
            MenuItem {
                label: "Rename".into(),
                command: MenuCommand::Rename,
            },
            MenuItem {
                label: "Delete".into(),
                command: MenuCommand::Delete,
            },
        ],
    }
}

impl<S: Surface> EditorSession<S> {
    /// Create the element and pin graphics of a block at its model position.
    pub fn display_block(&mut self, id: BlockId) {
        if self.views.block(id).is_some() {
            self.undisplay_block(id);
        }
        let Some(block) = self.diagram.find_block_by_id_mut(id) else {
            return;
        };
        for param in &mut block.params {
            if param.value.is_none() {
                param.value = Some(param.default);
            }
        }
        let block = &*block;

        let element = self.surface.create_element(block_element(block));
        let x = block.position.x * self.scale;
        let y = block.position.y * self.scale;
        self.surface.place_element(element, x, y);

        if block.block_type == BlockType::Plot {
            let points = self.plots.get(&id).map(|s| s.points()).unwrap_or_default();
            self.surface.set_plot(element, &points);
        } else if block.is_image_valued() {
            if let Some(Value::Image(data)) = &block.value {
                if let Some(bytes) = decode_image(data) {
                    self.surface.set_image(element, bytes);
                }
            }
        }

        let (w, h) = self.surface.measure_element(element).unwrap_or_default();
        let radius = pin_radius(self.scale);
        let fill = self.config.pin_rgb();
        let input_count = block.input_count();
        for (i, pin) in block.pins.iter().enumerate() {
            let pin_id = PinId::new(id, i);
            let (offset_x, offset_y) = pin_offset(pin.is_input, pin.index, input_count, w, h);
            let center = (x + offset_x, y + offset_y);
            let graphic = self
                .surface
                .circle(center, radius, fill, GraphicTag::Pin(pin_id));
            self.views.insert_pin(
                pin_id,
                PinView {
                    offset_x,
                    offset_y,
                    x: center.0,
                    y: center.1,
                    graphic,
                    connection: None,
                },
            );
        }

        self.views.insert_block(
            id,
            BlockView {
                x,
                y,
                w,
                h,
                element,
            },
        );
        tracing::debug!("Displayed block {} ({}) at {},{}", id, block.name, x, y);
    }

    /// Remove every graphic belonging to a block, including the lines of
    /// connections into and out of it. No-op for blocks that are not shown.
    pub fn undisplay_block(&mut self, id: BlockId) {
        let Some(view) = self.views.remove_block(id) else {
            return;
        };
        self.surface.remove_element(view.element);

        let pin_count = self
            .diagram
            .find_block_by_id(id)
            .map_or(0, |b| b.pins.len());
        for i in 0..pin_count {
            let pin_id = PinId::new(id, i);
            if let Some(pin_view) = self.views.remove_pin(pin_id) {
                self.surface.remove_graphic(pin_view.graphic);
                if let Some(conn) = pin_view.connection {
                    self.surface.remove_graphic(conn);
                }
            }
            if self.hovered_pin == Some(pin_id) {
                self.hovered_pin = None;
            }
        }

        for dest in self.diagram.find_dest_pins(id) {
            if let Some(conn) = self.views.pin_mut(dest).and_then(|v| v.connection.take()) {
                self.surface.remove_graphic(conn);
            }
        }
        tracing::debug!("Undisplayed block {}", id);
    }

    /// Draw the line of the connection ending at `dest`.
    pub fn display_connection(&mut self, dest: PinId, scale: f32) {
        let Some(source) = self.diagram.pin(dest).and_then(|p| p.source) else {
            return;
        };
        let (Some(from), Some(to)) = (self.views.pin(source), self.views.pin(dest)) else {
            return;
        };
        let (from, to) = ((from.x, from.y), (to.x, to.y));
        if let Some(old) = self.views.pin_mut(dest).and_then(|v| v.connection.take()) {
            self.surface.remove_graphic(old);
        }
        let line = self.surface.line(
            from,
            to,
            stroke_width(scale),
            self.config.connection_rgb(),
            GraphicTag::Connection(dest),
        );
        if let Some(view) = self.views.pin_mut(dest) {
            view.connection = Some(line);
        }
    }

    /// Draw every connection of the diagram.
    pub(crate) fn display_connections(&mut self) {
        let dests: Vec<PinId> = self
            .diagram
            .blocks
            .iter()
            .flat_map(|b| {
                b.pins
                    .iter()
                    .enumerate()
                    .filter(|(_, p)| p.source.is_some())
                    .map(move |(i, _)| PinId::new(b.id, i))
            })
            .collect();
        for dest in dests {
            self.display_connection(dest, self.scale);
        }
    }

    /// Re-route the line ending at `dest` to the current pin positions.
    pub fn move_conn(&mut self, dest: PinId) {
        let Some(source) = self.diagram.pin(dest).and_then(|p| p.source) else {
            return;
        };
        let (Some(from), Some(to)) = (self.views.pin(source), self.views.pin(dest)) else {
            return;
        };
        if let Some(line) = to.connection {
            self.surface
                .plot_line(line, (from.x, from.y), (to.x, to.y));
        }
    }

    /// Move a block to screen position `(x, y)`, dragging its pins and
    /// connections along.
    pub fn move_block(&mut self, id: BlockId, x: f32, y: f32) {
        let Some(view) = self.views.block_mut(id) else {
            return;
        };
        view.x = x;
        view.y = y;
        let element = view.element;
        self.surface.place_element(element, x, y);

        let scale = self.scale;
        let Some(block) = self.diagram.find_block_by_id_mut(id) else {
            return;
        };
        block.position.x = x / scale;
        block.position.y = y / scale;

        let mut inputs = Vec::new();
        for (i, pin) in block.pins.iter().enumerate() {
            let pin_id = PinId::new(id, i);
            if let Some(pv) = self.views.pin_mut(pin_id) {
                pv.x = x + pv.offset_x;
                pv.y = y + pv.offset_y;
                self.surface.center_circle(pv.graphic, (pv.x, pv.y));
            }
            if pin.is_input {
                inputs.push(pin_id);
            }
        }

        for dest in inputs {
            self.move_conn(dest);
        }
        for dest in self.diagram.find_dest_pins(id) {
            self.move_conn(dest);
        }
    }

    /// Apply the current zoom to block styles. A zoom close to 1 snaps to
    /// exactly 1.
    pub fn scale_classes(&mut self) {
        if self.scale > 0.95 && self.scale < 1.05 {
            self.scale = 1.0;
        }
        self.surface.set_style(BlockStyle::scaled(self.scale));
    }

    /// Rebuild every element and graphic at the current zoom.
    pub fn redraw_blocks(&mut self) {
        let ids: Vec<BlockId> = self.diagram.blocks.iter().map(|b| b.id).collect();
        for id in &ids {
            self.undisplay_block(*id);
        }
        self.scale_classes();
        for id in &ids {
            self.display_block(*id);
        }
        self.display_connections();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EditorConfig;
    use crate::editor::scene::Scene;
    use crate::model::{DeviceKind, Param, PinType};
    use crate::spec::{BlockSpec, ProgramSpec};

    fn session(blocks: Vec<BlockSpec>) -> EditorSession<Scene> {
        let mut s = EditorSession::new(Scene::new(), EditorConfig::default());
        s.load_program(&ProgramSpec { name: None, blocks }).unwrap();
        s
    }

    #[test]
    fn test_format_units() {
        assert_eq!(format_units("degrees C").as_deref(), Some("°C"));
        assert_eq!(format_units("percent").as_deref(), Some("%"));
        assert_eq!(format_units("PPM").as_deref(), Some("PPM"));
        assert_eq!(format_units(""), None);
    }

    #[test]
    fn test_display_block_pins_and_params() {
        let spec = BlockSpec {
            input_type: Some(PinType::Number),
            input_count: 1,
            output_type: Some(PinType::Number),
            output_count: 1,
            params: vec![Param::numeric("period", 0.0, 9999.0, 10.0)],
            ..BlockSpec::new("simple moving average", BlockType::NumberDisplayAndInput)
                .at(10.0, 20.0)
        };
        let s = session(vec![spec]);
        let block = &s.diagram().blocks[0];
        assert_eq!(block.params[0].value, Some(10.0));

        let view = *s.views().block(block.id).unwrap();
        assert_eq!((view.x, view.y), (10.0, 20.0));
        let input = s.views().pin(PinId::new(block.id, 0)).unwrap();
        assert_eq!((input.x, input.y), (view.x - 5.0, view.y + view.h / 2.0));
        let output = s.views().pin(PinId::new(block.id, 1)).unwrap();
        assert_eq!(output.x, view.x + view.w + 5.0);
        assert_eq!(s.surface().graphic_count(), 2);

        let element = s.surface().element(view.element).unwrap();
        assert_eq!(element.content.params[0].text, "10");
    }

    #[test]
    fn test_plot_has_no_name_label() {
        let s = session(vec![
            BlockSpec::plot("plot"),
            BlockSpec::device("temperature", DeviceKind::Temperature, "degrees C"),
        ]);
        let plot = s.surface().element_for_block(s.diagram().blocks[0].id).unwrap();
        assert_eq!(plot.content.name, None);
        let temp = s.surface().element_for_block(s.diagram().blocks[1].id).unwrap();
        assert_eq!(temp.content.name.as_deref(), Some("temperature"));
        assert_eq!(
            temp.content.body,
            BlockBody::Value {
                text: "...".into(),
                units: Some("°C".into())
            }
        );
    }

    #[test]
    fn test_undisplay_is_idempotent() {
        let mut s = session(vec![BlockSpec::plot("plot")]);
        let id = s.diagram().blocks[0].id;
        s.undisplay_block(id);
        s.undisplay_block(id);
        assert_eq!(s.surface().element_count(), 0);
        assert_eq!(s.surface().graphic_count(), 0);
    }

    #[test]
    fn test_move_block_updates_model_position() {
        let mut s = session(vec![BlockSpec::plot("plot")]);
        let id = s.diagram().blocks[0].id;
        s.zoom_blocks(1.0);
        s.move_block(id, 100.0, 50.0);
        let block = s.diagram().find_block_by_id(id).unwrap();
        assert_eq!((block.position.x, block.position.y), (50.0, 25.0));
    }

    #[test]
    fn test_scale_classes_snaps_near_one() {
        let mut s = session(Vec::new());
        s.zoom_blocks(0.04);
        assert_eq!(s.scale(), 1.0);
        s.zoom_blocks(0.1);
        assert!((s.scale() - 1.1).abs() < 1e-6);
        assert_eq!(s.surface().style().name_font, 18.0);
    }
}
