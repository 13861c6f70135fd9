//! Pointer interaction.
//!
//! The editor is always in exactly one [`InteractionState`]. Every pointer
//! event goes through [`EditorSession::handle_pointer`], which decides the
//! next state from the current one and what lies under the pointer.

use crate::model::{BlockId, PinId};

use super::scene::{GraphicId, GraphicTag, HitTarget, Surface};
use super::state::EditorSession;

/// What a pointer gesture is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    /// Moving a block; `offset` is block origin minus cursor.
    DraggingBlock { block: BlockId, offset: (f32, f32) },
    /// Dragging a rubber band out of `start_pin`.
    DrawingConnection {
        start_pin: PinId,
        rubber_band: Option<GraphicId>,
    },
}

/// A pointer event in screen coordinates, with the hit-test result at that
/// position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down { x: f32, y: f32, target: HitTarget },
    Move { x: f32, y: f32, target: HitTarget },
    Up { x: f32, y: f32, target: HitTarget },
}

impl PointerEvent {
    pub fn position(&self) -> (f32, f32) {
        match *self {
            PointerEvent::Down { x, y, .. }
            | PointerEvent::Move { x, y, .. }
            | PointerEvent::Up { x, y, .. } => (x, y),
        }
    }

    pub fn target(&self) -> HitTarget {
        match *self {
            PointerEvent::Down { target, .. }
            | PointerEvent::Move { target, .. }
            | PointerEvent::Up { target, .. } => target,
        }
    }
}

impl<S: Surface> EditorSession<S> {
    /// Advance the interaction state machine by one pointer event.
    pub fn handle_pointer(&mut self, event: PointerEvent) {
        let (x, y) = event.position();
        match event {
            PointerEvent::Down { target, .. } => {
                if self.interaction != InteractionState::Idle {
                    return;
                }
                match target {
                    HitTarget::Pin(pin) => {
                        tracing::debug!("Start connection at {:?}", pin);
                        self.interaction = InteractionState::DrawingConnection {
                            start_pin: pin,
                            rubber_band: None,
                        };
                    }
                    HitTarget::Block(_) => {
                        if let Some((block, view_x, view_y)) = self.block_at(x, y) {
                            self.interaction = InteractionState::DraggingBlock {
                                block,
                                offset: (view_x - x, view_y - y),
                            };
                        }
                    }
                    HitTarget::Connection(dest) => {
                        self.remove_connection(dest);
                    }
                    HitTarget::Canvas => {}
                }
            }
            PointerEvent::Move { target, .. } => {
                self.hover(match target {
                    HitTarget::Pin(pin) => Some(pin),
                    _ => None,
                });
                match self.interaction {
                    InteractionState::DraggingBlock { block, offset } => {
                        self.move_block(block, x + offset.0, y + offset.1);
                        self.layout_modified();
                    }
                    InteractionState::DrawingConnection {
                        start_pin,
                        rubber_band,
                    } => {
                        let Some(start) = self.views.pin(start_pin).map(|v| (v.x, v.y)) else {
                            return;
                        };
                        let line = match rubber_band {
                            Some(line) => {
                                self.surface.plot_line(line, start, (x, y));
                                line
                            }
                            None => self.surface.line(
                                start,
                                (x, y),
                                10.0,
                                self.config.connection_rgb(),
                                GraphicTag::RubberBand,
                            ),
                        };
                        self.interaction = InteractionState::DrawingConnection {
                            start_pin,
                            rubber_band: Some(line),
                        };
                    }
                    InteractionState::Idle => {}
                }
            }
            PointerEvent::Up { target, .. } => {
                if let InteractionState::DrawingConnection { start_pin, .. } = self.interaction {
                    if let HitTarget::Pin(end_pin) = target {
                        self.try_connect(start_pin, end_pin);
                    }
                }
                self.cancel_interaction();
            }
        }
    }

    /// Hit-test `(x, y)` on the surface and dispatch a down event.
    pub fn pointer_down(&mut self, x: f32, y: f32) {
        let target = self.surface.hit_test(x, y);
        self.handle_pointer(PointerEvent::Down { x, y, target });
    }

    pub fn pointer_move(&mut self, x: f32, y: f32) {
        let target = self.surface.hit_test(x, y);
        self.handle_pointer(PointerEvent::Move { x, y, target });
    }

    pub fn pointer_up(&mut self, x: f32, y: f32) {
        let target = self.surface.hit_test(x, y);
        self.handle_pointer(PointerEvent::Up { x, y, target });
    }

    /// Return to idle, discarding any rubber band.
    pub fn cancel_interaction(&mut self) {
        if let InteractionState::DrawingConnection {
            rubber_band: Some(line),
            ..
        } = self.interaction
        {
            self.surface.remove_graphic(line);
        }
        self.interaction = InteractionState::Idle;
    }

    /// Last block in diagram order whose box contains the point.
    fn block_at(&self, x: f32, y: f32) -> Option<(BlockId, f32, f32)> {
        self.diagram
            .blocks
            .iter()
            .rev()
            .filter_map(|b| self.views.block(b.id).map(|v| (b.id, v)))
            .find(|(_, v)| v.contains(x, y))
            .map(|(id, v)| (id, v.x, v.y))
    }

    /// Connect two pins of opposite direction. An input that already has a
    /// source is left alone.
    pub fn try_connect(&mut self, a: PinId, b: PinId) -> bool {
        let (Some(pa), Some(pb)) = (self.diagram.pin(a), self.diagram.pin(b)) else {
            return false;
        };
        if pa.is_input == pb.is_input {
            tracing::debug!("Ignoring connection between pins of the same direction");
            return false;
        }
        let (source, dest) = if pb.is_input { (a, b) } else { (b, a) };
        if !self.diagram.connect(source, dest) {
            return false;
        }
        self.display_connection(dest, self.scale);
        self.layout_modified();
        tracing::debug!("Connected {:?} -> {:?}", source, dest);
        true
    }

    /// Remove the connection ending at `dest` along with its line.
    pub fn remove_connection(&mut self, dest: PinId) -> bool {
        if self.diagram.disconnect(dest).is_none() {
            return false;
        }
        if let Some(line) = self.views.pin_mut(dest).and_then(|v| v.connection.take()) {
            self.surface.remove_graphic(line);
        }
        self.layout_modified();
        tracing::debug!("Removed connection into {:?}", dest);
        true
    }

    /// Move the hover highlight to `pin`.
    fn hover(&mut self, pin: Option<PinId>) {
        if self.hovered_pin == pin {
            return;
        }
        if let Some(old) = self.hovered_pin.and_then(|p| self.views.pin(p)) {
            self.surface.fill(old.graphic, self.config.pin_rgb());
        }
        if let Some(new) = pin.and_then(|p| self.views.pin(p)) {
            self.surface.fill(new.graphic, self.config.pin_hover_rgb());
        }
        self.hovered_pin = pin;
    }

    pub fn interaction(&self) -> InteractionState {
        self.interaction
    }

    pub fn hovered_pin(&self) -> Option<PinId> {
        self.hovered_pin
    }
}
