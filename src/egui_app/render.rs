#![cfg(feature = "egui")]

use eframe::egui::{self, Align2, Color32, FontId, Pos2, Stroke};

use crate::color::Rgb;
use crate::editor::{BlockBody, BlockStyle, Graphic, Scene, SceneElement};

use super::geometry::{element_rect, part_rect, to_screen};

pub(crate) fn rgb_to_color32(c: Rgb) -> Color32 {
    Color32::from_rgb(c.0, c.1, c.2)
}

const BLOCK_FILL: Color32 = Color32::from_rgb(250, 250, 250);
const BLOCK_BORDER: Color32 = Color32::from_rgb(170, 170, 170);
const TEXT: Color32 = Color32::from_rgb(40, 40, 40);

/// Paint every line of the scene. Lines sit below block elements.
pub fn paint_lines(painter: &egui::Painter, scene: &Scene, origin: Pos2) {
    for (_, g) in scene.graphics() {
        if let Graphic::Line {
            from,
            to,
            width,
            color,
            ..
        } = g
        {
            painter.line_segment(
                [to_screen(origin, *from), to_screen(origin, *to)],
                Stroke::new(*width, rgb_to_color32(*color)),
            );
        }
    }
}

/// Paint every pin circle of the scene, above block elements.
pub fn paint_circles(painter: &egui::Painter, scene: &Scene, origin: Pos2) {
    for (_, g) in scene.graphics() {
        if let Graphic::Circle {
            center,
            radius,
            fill,
            ..
        } = g
        {
            painter.circle_filled(to_screen(origin, *center), *radius, rgb_to_color32(*fill));
        }
    }
}

/// Paint the frame and static text of a block element. Interactive parts
/// (menu, text fields, plot, image) are added as widgets by the caller.
pub fn paint_element(
    painter: &egui::Painter,
    element: &SceneElement,
    origin: Pos2,
    style: &BlockStyle,
) {
    let rect = element_rect(origin, element);
    let rounding = 6.0 * style.scale;
    painter.rect_filled(rect, rounding, BLOCK_FILL);
    painter.rect_stroke(
        rect,
        rounding,
        Stroke::new(1.0, BLOCK_BORDER),
        egui::StrokeKind::Outside,
    );

    let layout = &element.layout;
    if let (Some(name), Some(bounds)) = (&element.content.name, &layout.name) {
        let r = part_rect(origin, element, bounds);
        painter.text(
            r.left_center(),
            Align2::LEFT_CENTER,
            name,
            FontId::proportional(style.name_font),
            TEXT,
        );
    }

    if let BlockBody::Value { text, units } = &element.content.body {
        let r = part_rect(origin, element, &layout.body);
        let value_rect = painter.text(
            r.left_center(),
            Align2::LEFT_CENTER,
            text,
            FontId::proportional(style.value_font),
            TEXT,
        );
        if let Some(units) = units {
            painter.text(
                value_rect.right_bottom(),
                Align2::LEFT_BOTTOM,
                format!(" {}", units),
                FontId::proportional(style.units_font),
                Color32::GRAY,
            );
        }
    }

    for (param, (label, _)) in element.content.params.iter().zip(&layout.params) {
        let r = part_rect(origin, element, label);
        painter.text(
            r.left_center(),
            Align2::LEFT_CENTER,
            &param.name,
            FontId::proportional(style.param_label_font),
            Color32::DARK_GRAY,
        );
    }
}
