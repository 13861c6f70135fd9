//! Presentation state.
//!
//! Screen coordinates, sizes and surface handles of displayed blocks and
//! pins live here rather than on the model, keyed by [`BlockId`] and
//! [`PinId`]. The table is transient: it is rebuilt from the diagram on every
//! redraw and never saved.

use std::collections::HashMap;

use crate::model::{BlockId, PinId};

use super::scene::{ElementId, GraphicId};

/// Screen placement of a displayed block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockView {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
    pub element: ElementId,
}

impl BlockView {
    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x && px <= self.x + self.w && py >= self.y && py <= self.y + self.h
    }
}

/// Screen placement of a displayed pin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinView {
    /// Offset from the owning block's origin.
    pub offset_x: f32,
    pub offset_y: f32,
    /// Absolute screen position of the pin center.
    pub x: f32,
    pub y: f32,
    pub graphic: GraphicId,
    /// Line of the connection ending at this pin, for input pins.
    pub connection: Option<GraphicId>,
}

#[derive(Debug, Clone, Default)]
pub struct ViewTable {
    blocks: HashMap<BlockId, BlockView>,
    pins: HashMap<PinId, PinView>,
}

impl ViewTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn block(&self, id: BlockId) -> Option<&BlockView> {
        self.blocks.get(&id)
    }

    pub fn block_mut(&mut self, id: BlockId) -> Option<&mut BlockView> {
        self.blocks.get_mut(&id)
    }

    pub fn insert_block(&mut self, id: BlockId, view: BlockView) {
        self.blocks.insert(id, view);
    }

    pub fn remove_block(&mut self, id: BlockId) -> Option<BlockView> {
        self.blocks.remove(&id)
    }

    pub fn pin(&self, id: PinId) -> Option<&PinView> {
        self.pins.get(&id)
    }

    pub fn pin_mut(&mut self, id: PinId) -> Option<&mut PinView> {
        self.pins.get_mut(&id)
    }

    pub fn insert_pin(&mut self, id: PinId, view: PinView) {
        self.pins.insert(id, view);
    }

    pub fn remove_pin(&mut self, id: PinId) -> Option<PinView> {
        self.pins.remove(&id)
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn pin_count(&self) -> usize {
        self.pins.len()
    }

    /// Number of pins currently carrying a connection line.
    pub fn connection_count(&self) -> usize {
        self.pins.values().filter(|p| p.connection.is_some()).count()
    }

    pub fn clear(&mut self) {
        self.blocks.clear();
        self.pins.clear();
    }
}

/// Radius of a pin circle at the given zoom.
pub fn pin_radius(scale: f32) -> f32 {
    (15.0 * scale).clamp(8.0, 15.0)
}

/// Stroke width of a connection line at the given zoom.
pub fn stroke_width(scale: f32) -> f32 {
    (10.0 * scale).clamp(4.0, 10.0)
}

/// Offset of a pin from its block's origin, given the block's rendered size.
///
/// A single input sits at mid-height; several inputs are spread over the
/// middle half of the left edge. Outputs sit at mid-height on the right.
pub fn pin_offset(is_input: bool, index: usize, input_count: usize, w: f32, h: f32) -> (f32, f32) {
    if !is_input {
        (w + 5.0, h / 2.0)
    } else if input_count == 1 {
        (-5.0, h / 2.0)
    } else {
        (-5.0, h / 4.0 + h / 2.0 * index as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pin_offsets() {
        assert_eq!(pin_offset(true, 0, 1, 100.0, 80.0), (-5.0, 40.0));
        assert_eq!(pin_offset(true, 0, 2, 100.0, 80.0), (-5.0, 20.0));
        assert_eq!(pin_offset(true, 1, 2, 100.0, 80.0), (-5.0, 60.0));
        assert_eq!(pin_offset(false, 0, 2, 100.0, 80.0), (105.0, 40.0));
    }

    #[test]
    fn test_sizes_clamped() {
        assert_eq!(pin_radius(1.0), 15.0);
        assert_eq!(pin_radius(2.0), 15.0);
        assert_eq!(pin_radius(0.2), 8.0);
        assert_eq!(stroke_width(0.5), 5.0);
        assert_eq!(stroke_width(0.1), 4.0);
        assert_eq!(stroke_width(3.0), 10.0);
    }
}
