#![cfg(feature = "egui")]

use eframe::egui::{Pos2, Rect, Vec2};

use crate::editor::{BlockBody, Bounds, SceneElement};

/// Map a scene point to the screen, given the canvas origin.
pub fn to_screen(origin: Pos2, p: (f32, f32)) -> Pos2 {
    Pos2::new(origin.x + p.0, origin.y + p.1)
}

/// Map a screen point to scene coordinates.
pub fn from_screen(origin: Pos2, p: Pos2) -> (f32, f32) {
    (p.x - origin.x, p.y - origin.y)
}

/// Screen rectangle of a part of an element. `bounds` is relative to the
/// element origin.
pub fn part_rect(origin: Pos2, element: &SceneElement, bounds: &Bounds) -> Rect {
    Rect::from_min_size(
        to_screen(origin, (element.x + bounds.x, element.y + bounds.y)),
        Vec2::new(bounds.w, bounds.h),
    )
}

/// Screen rectangle of a whole element.
pub fn element_rect(origin: Pos2, element: &SceneElement) -> Rect {
    part_rect(
        origin,
        element,
        &Bounds::new(0.0, 0.0, element.layout.width, element.layout.height),
    )
}

/// True if the scene point lands on a widget embedded in the element (menu
/// button, number field, parameter field). Those points belong to egui
/// rather than to block dragging.
pub fn hits_embedded_widget(element: &SceneElement, x: f32, y: f32) -> bool {
    let (lx, ly) = (x - element.x, y - element.y);
    let layout = &element.layout;
    if layout.menu.contains(lx, ly) {
        return true;
    }
    if matches!(element.content.body, BlockBody::NumberEntry { .. })
        && layout.body.contains(lx, ly)
    {
        return true;
    }
    layout.params.iter().any(|(_, input)| input.contains(lx, ly))
}
