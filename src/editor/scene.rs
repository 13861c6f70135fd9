//! Drawing surface.
//!
//! [`Surface`] is everything the editor needs from a drawing backend: block
//! elements with a type-specific body, circles for pins, lines for
//! connections, and hit testing. [`Scene`] is the retained in-memory
//! implementation. It lays out and measures block elements deterministically
//! from the current [`BlockStyle`], so the editor runs (and is tested)
//! without a window; the egui front-end simply paints it every frame.

use indexmap::IndexMap;

use crate::color::Rgb;
use crate::model::{BlockId, PinId};

// ────────────────────────────────────────────────────────────────────────────
// Handles and element content
// ────────────────────────────────────────────────────────────────────────────

/// Handle of a block element on a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub u64);

/// Handle of a pin circle, connection line or rubber band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GraphicId(pub u64);

/// What a graphic stands for; used to answer hit tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GraphicTag {
    Pin(PinId),
    /// Connection line, identified by its destination pin.
    Connection(PinId),
    RubberBand,
}

/// What lies under the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HitTarget {
    Canvas,
    Block(BlockId),
    Pin(PinId),
    Connection(PinId),
}

/// Type-specific body of a block element.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockBody {
    /// Editable number field.
    NumberEntry { text: String },
    /// Plot canvas.
    Plot,
    /// Image display.
    Image,
    /// Value label with optional units.
    Value { text: String, units: Option<String> },
}

/// A labelled parameter input below the body.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamField {
    pub name: String,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MenuCommand {
    Rename,
    Delete,
}

/// Entry of a block's context menu.
#[derive(Debug, Clone, PartialEq)]
pub struct MenuItem {
    pub label: String,
    pub command: MenuCommand,
}

/// Content of a block element.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockElement {
    pub block: BlockId,
    /// Name label; `None` hides it.
    pub name: Option<String>,
    pub body: BlockBody,
    pub params: Vec<ParamField>,
    pub menu: Vec<MenuItem>,
}

// ────────────────────────────────────────────────────────────────────────────
// Style and layout
// ────────────────────────────────────────────────────────────────────────────

/// Sizes of block parts at a given zoom factor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockStyle {
    pub scale: f32,
    pub padding: f32,
    pub min_width: f32,
    pub menu_icon_size: f32,
    pub name_font: f32,
    pub value_font: f32,
    pub units_font: f32,
    pub param_label_font: f32,
    pub input_width: f32,
    pub input_height: f32,
    pub plot_width: f32,
    pub plot_height: f32,
    pub image_width: f32,
    pub image_height: f32,
}

impl BlockStyle {
    /// Unscaled sizes.
    pub const BASE: BlockStyle = BlockStyle {
        scale: 1.0,
        padding: 8.0,
        min_width: 120.0,
        menu_icon_size: 14.0,
        name_font: 16.0,
        value_font: 30.0,
        units_font: 18.0,
        param_label_font: 14.0,
        input_width: 110.0,
        input_height: 30.0,
        plot_width: 300.0,
        plot_height: 200.0,
        image_width: 320.0,
        image_height: 240.0,
    };

    /// Every size multiplied by `scale` and rounded to whole pixels.
    pub fn scaled(scale: f32) -> Self {
        let s = |v: f32| (v * scale).round().max(1.0);
        let b = Self::BASE;
        Self {
            scale,
            padding: s(b.padding),
            min_width: s(b.min_width),
            menu_icon_size: s(b.menu_icon_size),
            name_font: s(b.name_font),
            value_font: s(b.value_font),
            units_font: s(b.units_font),
            param_label_font: s(b.param_label_font),
            input_width: s(b.input_width),
            input_height: s(b.input_height),
            plot_width: s(b.plot_width),
            plot_height: s(b.plot_height),
            image_width: s(b.image_width),
            image_height: s(b.image_height),
        }
    }
}

impl Default for BlockStyle {
    fn default() -> Self {
        Self::BASE
    }
}

/// Axis-aligned rectangle relative to an element origin.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bounds {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Bounds {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x && px <= self.x + self.w && py >= self.y && py <= self.y + self.h
    }

    pub fn translate(&self, dx: f32, dy: f32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.w, self.h)
    }
}

/// Placement of the parts of a block element.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BlockLayout {
    pub width: f32,
    pub height: f32,
    pub name: Option<Bounds>,
    pub menu: Bounds,
    pub body: Bounds,
    /// Label and input rectangles per parameter.
    pub params: Vec<(Bounds, Bounds)>,
}

/// Rough width of a text run; good enough for sizing boxes around labels.
fn text_width(text: &str, font: f32) -> f32 {
    text.chars().count() as f32 * font * 0.6
}

impl BlockLayout {
    /// Lay out `element` top to bottom: header (name and menu icon), body,
    /// then one label/input pair per parameter.
    pub fn compute(element: &BlockElement, style: &BlockStyle) -> Self {
        let pad = style.padding;
        let header_h = match element.name {
            Some(_) => (style.name_font * 1.4).max(style.menu_icon_size),
            None => style.menu_icon_size,
        };

        let (body_w, body_h) = match &element.body {
            BlockBody::NumberEntry { .. } => (style.input_width, style.input_height),
            BlockBody::Plot => (style.plot_width, style.plot_height),
            BlockBody::Image => (style.image_width, style.image_height),
            BlockBody::Value { text, units } => {
                let units_w = units
                    .as_deref()
                    .map_or(0.0, |u| text_width(&format!(" {}", u), style.units_font));
                (
                    text_width(text, style.value_font) + units_w,
                    style.value_font * 1.3,
                )
            }
        };

        let name_w = element
            .name
            .as_deref()
            .map_or(0.0, |n| text_width(n, style.name_font))
            + style.menu_icon_size
            + pad;
        let params_w = if element.params.is_empty() {
            0.0
        } else {
            style.input_width
        };
        let inner_w = body_w.max(name_w).max(params_w).max(style.min_width - 2.0 * pad);
        let width = inner_w + 2.0 * pad;

        let mut y = pad;
        let name = element
            .name
            .as_ref()
            .map(|_| Bounds::new(pad, y, inner_w - style.menu_icon_size, header_h));
        let menu = Bounds::new(
            width - pad - style.menu_icon_size,
            y,
            style.menu_icon_size,
            style.menu_icon_size,
        );
        y += header_h;

        let body = Bounds::new(pad, y, inner_w, body_h);
        y += body_h;

        let label_h = style.param_label_font * 1.3;
        let mut params = Vec::with_capacity(element.params.len());
        for _ in &element.params {
            let label = Bounds::new(pad, y, inner_w, label_h);
            y += label_h;
            let input = Bounds::new(pad, y, style.input_width, style.input_height);
            y += style.input_height;
            params.push((label, input));
        }

        Self {
            width,
            height: y + pad,
            name,
            menu,
            body,
            params,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Surface trait
// ────────────────────────────────────────────────────────────────────────────

/// Drawing backend used by the editor.
pub trait Surface {
    /// Create a block element. It is not visible until placed.
    fn create_element(&mut self, element: BlockElement) -> ElementId;
    /// Move an element's top-left corner to screen position `(x, y)`.
    fn place_element(&mut self, id: ElementId, x: f32, y: f32);
    /// Rendered outer size of an element.
    fn measure_element(&self, id: ElementId) -> Option<(f32, f32)>;
    fn remove_element(&mut self, id: ElementId);
    fn set_label(&mut self, id: ElementId, text: &str);
    fn set_value_text(&mut self, id: ElementId, text: &str);
    /// Replace the text shown in the named parameter field.
    fn set_param_text(&mut self, id: ElementId, param: &str, text: &str);
    /// Show encoded image bytes in an image body.
    fn set_image(&mut self, id: ElementId, bytes: Vec<u8>);
    fn set_plot(&mut self, id: ElementId, points: &[[f64; 2]]);
    /// Apply zoom-dependent sizes to elements created from now on.
    fn set_style(&mut self, style: BlockStyle);

    fn circle(&mut self, center: (f32, f32), radius: f32, fill: Rgb, tag: GraphicTag)
    -> GraphicId;
    fn center_circle(&mut self, id: GraphicId, center: (f32, f32));
    fn fill(&mut self, id: GraphicId, fill: Rgb);
    /// Draw a line behind every element and circle.
    fn line(
        &mut self,
        from: (f32, f32),
        to: (f32, f32),
        width: f32,
        color: Rgb,
        tag: GraphicTag,
    ) -> GraphicId;
    /// Re-route an existing line.
    fn plot_line(&mut self, id: GraphicId, from: (f32, f32), to: (f32, f32));
    fn remove_graphic(&mut self, id: GraphicId);

    /// What is drawn at screen position `(x, y)`, pins first.
    fn hit_test(&self, x: f32, y: f32) -> HitTarget;
}

// ────────────────────────────────────────────────────────────────────────────
// Scene
// ────────────────────────────────────────────────────────────────────────────

/// A block element as held by the scene.
#[derive(Debug, Clone)]
pub struct SceneElement {
    pub content: BlockElement,
    pub x: f32,
    pub y: f32,
    pub layout: BlockLayout,
    /// Encoded image bytes and a revision counter bumped on every change.
    pub image: Option<(u64, Vec<u8>)>,
    pub plot: Vec<[f64; 2]>,
}

impl SceneElement {
    /// Screen-space bounding box.
    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.x, self.y, self.layout.width, self.layout.height)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Graphic {
    Circle {
        center: (f32, f32),
        radius: f32,
        fill: Rgb,
        tag: GraphicTag,
    },
    Line {
        from: (f32, f32),
        to: (f32, f32),
        width: f32,
        color: Rgb,
        tag: GraphicTag,
    },
}

impl Graphic {
    pub fn tag(&self) -> GraphicTag {
        match self {
            Graphic::Circle { tag, .. } | Graphic::Line { tag, .. } => *tag,
        }
    }
}

/// Retained drawing surface.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    elements: IndexMap<ElementId, SceneElement>,
    graphics: IndexMap<GraphicId, Graphic>,
    style: BlockStyle,
    next_handle: u64,
    image_revision: u64,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_handle(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }

    pub fn style(&self) -> &BlockStyle {
        &self.style
    }

    /// Elements in paint order (later ones on top).
    pub fn elements(&self) -> impl Iterator<Item = (ElementId, &SceneElement)> {
        self.elements.iter().map(|(id, e)| (*id, e))
    }

    pub fn element(&self, id: ElementId) -> Option<&SceneElement> {
        self.elements.get(&id)
    }

    /// Lines first, then circles, each in creation order.
    pub fn graphics(&self) -> impl Iterator<Item = (GraphicId, &Graphic)> {
        let lines = self
            .graphics
            .iter()
            .filter(|(_, g)| matches!(g, Graphic::Line { .. }));
        let circles = self
            .graphics
            .iter()
            .filter(|(_, g)| matches!(g, Graphic::Circle { .. }));
        lines.chain(circles).map(|(id, g)| (*id, g))
    }

    pub fn graphic(&self, id: GraphicId) -> Option<&Graphic> {
        self.graphics.get(&id)
    }

    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    pub fn graphic_count(&self) -> usize {
        self.graphics.len()
    }

    /// Number of graphics carrying a tag that satisfies `pred`.
    pub fn count_tagged(&self, pred: impl Fn(GraphicTag) -> bool) -> usize {
        self.graphics.values().filter(|g| pred(g.tag())).count()
    }

    /// Element showing the given block, if any.
    pub fn element_for_block(&self, block: BlockId) -> Option<&SceneElement> {
        self.elements.values().find(|e| e.content.block == block)
    }
}

/// Distance from `p` to the segment `a`–`b`.
fn segment_distance(p: (f32, f32), a: (f32, f32), b: (f32, f32)) -> f32 {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let len2 = dx * dx + dy * dy;
    let t = if len2 == 0.0 {
        0.0
    } else {
        (((p.0 - a.0) * dx + (p.1 - a.1) * dy) / len2).clamp(0.0, 1.0)
    };
    let (cx, cy) = (a.0 + t * dx, a.1 + t * dy);
    ((p.0 - cx).powi(2) + (p.1 - cy).powi(2)).sqrt()
}

impl Surface for Scene {
    fn create_element(&mut self, content: BlockElement) -> ElementId {
        let id = ElementId(self.next_handle());
        let layout = BlockLayout::compute(&content, &self.style);
        self.elements.insert(
            id,
            SceneElement {
                content,
                x: 0.0,
                y: 0.0,
                layout,
                image: None,
                plot: Vec::new(),
            },
        );
        id
    }

    fn place_element(&mut self, id: ElementId, x: f32, y: f32) {
        if let Some(e) = self.elements.get_mut(&id) {
            e.x = x;
            e.y = y;
        }
    }

    fn measure_element(&self, id: ElementId) -> Option<(f32, f32)> {
        self.elements
            .get(&id)
            .map(|e| (e.layout.width, e.layout.height))
    }

    fn remove_element(&mut self, id: ElementId) {
        self.elements.shift_remove(&id);
    }

    fn set_label(&mut self, id: ElementId, text: &str) {
        if let Some(e) = self.elements.get_mut(&id) {
            if e.content.name.is_some() {
                e.content.name = Some(text.to_string());
            }
        }
    }

    fn set_value_text(&mut self, id: ElementId, value: &str) {
        if let Some(e) = self.elements.get_mut(&id) {
            match &mut e.content.body {
                BlockBody::Value { text, .. } | BlockBody::NumberEntry { text } => {
                    *text = value.to_string();
                }
                BlockBody::Plot | BlockBody::Image => {}
            }
        }
    }

    fn set_param_text(&mut self, id: ElementId, param: &str, text: &str) {
        if let Some(field) = self
            .elements
            .get_mut(&id)
            .and_then(|e| e.content.params.iter_mut().find(|f| f.name == param))
        {
            field.text = text.to_string();
        }
    }

    fn set_image(&mut self, id: ElementId, bytes: Vec<u8>) {
        self.image_revision += 1;
        let revision = self.image_revision;
        if let Some(e) = self.elements.get_mut(&id) {
            e.image = Some((revision, bytes));
        }
    }

    fn set_plot(&mut self, id: ElementId, points: &[[f64; 2]]) {
        if let Some(e) = self.elements.get_mut(&id) {
            e.plot = points.to_vec();
        }
    }

    fn set_style(&mut self, style: BlockStyle) {
        self.style = style;
    }

    fn circle(
        &mut self,
        center: (f32, f32),
        radius: f32,
        fill: Rgb,
        tag: GraphicTag,
    ) -> GraphicId {
        let id = GraphicId(self.next_handle());
        self.graphics.insert(
            id,
            Graphic::Circle {
                center,
                radius,
                fill,
                tag,
            },
        );
        id
    }

    fn center_circle(&mut self, id: GraphicId, to: (f32, f32)) {
        if let Some(Graphic::Circle { center, .. }) = self.graphics.get_mut(&id) {
            *center = to;
        }
    }

    fn fill(&mut self, id: GraphicId, color: Rgb) {
        if let Some(Graphic::Circle { fill, .. }) = self.graphics.get_mut(&id) {
            *fill = color;
        }
    }

    fn line(
        &mut self,
        from: (f32, f32),
        to: (f32, f32),
        width: f32,
        color: Rgb,
        tag: GraphicTag,
    ) -> GraphicId {
        let id = GraphicId(self.next_handle());
        self.graphics.insert(
            id,
            Graphic::Line {
                from,
                to,
                width,
                color,
                tag,
            },
        );
        id
    }

    fn plot_line(&mut self, id: GraphicId, new_from: (f32, f32), new_to: (f32, f32)) {
        if let Some(Graphic::Line { from, to, .. }) = self.graphics.get_mut(&id) {
            *from = new_from;
            *to = new_to;
        }
    }

    fn remove_graphic(&mut self, id: GraphicId) {
        self.graphics.shift_remove(&id);
    }

    fn hit_test(&self, x: f32, y: f32) -> HitTarget {
        for g in self.graphics.values().rev() {
            if let Graphic::Circle {
                center,
                radius,
                tag: GraphicTag::Pin(pin),
                ..
            } = g
            {
                if (x - center.0).powi(2) + (y - center.1).powi(2) <= radius * radius {
                    return HitTarget::Pin(*pin);
                }
            }
        }
        for e in self.elements.values().rev() {
            if e.bounds().contains(x, y) {
                return HitTarget::Block(e.content.block);
            }
        }
        for g in self.graphics.values().rev() {
            if let Graphic::Line {
                from,
                to,
                width,
                tag: GraphicTag::Connection(dest),
                ..
            } = g
            {
                if segment_distance((x, y), *from, *to) <= (width / 2.0).max(3.0) {
                    return HitTarget::Connection(*dest);
                }
            }
        }
        HitTarget::Canvas
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value_element(block: u32) -> BlockElement {
        BlockElement {
            block: BlockId(block),
            name: Some("temperature".into()),
            body: BlockBody::Value {
                text: "...".into(),
                units: Some("°C".into()),
            },
            params: Vec::new(),
            menu: Vec::new(),
        }
    }

    #[test]
    fn test_layout_grows_with_params() {
        let style = BlockStyle::BASE;
        let mut e = value_element(1);
        let plain = BlockLayout::compute(&e, &style);
        e.params.push(ParamField {
            name: "period".into(),
            text: "10".into(),
        });
        let with_param = BlockLayout::compute(&e, &style);
        assert_eq!(with_param.params.len(), 1);
        assert!(with_param.height > plain.height);
        assert!(plain.width >= style.min_width);
    }

    #[test]
    fn test_style_scaling_rounds() {
        let s = BlockStyle::scaled(0.5);
        assert_eq!(s.name_font, 8.0);
        assert_eq!(s.plot_width, 150.0);
        let s = BlockStyle::scaled(1.3);
        assert_eq!(s.value_font, 39.0);
    }

    #[test]
    fn test_hit_test_order() {
        let mut scene = Scene::new();
        let e = scene.create_element(value_element(1));
        scene.place_element(e, 100.0, 100.0);
        let pin = PinId::new(BlockId(1), 0);
        scene.circle((100.0, 110.0), 8.0, Rgb(0, 0, 0), GraphicTag::Pin(pin));
        let dest = PinId::new(BlockId(2), 0);
        scene.line(
            (0.0, 0.0),
            (50.0, 0.0),
            10.0,
            Rgb(0, 0, 0),
            GraphicTag::Connection(dest),
        );

        // pin wins over the block body it overlaps
        assert_eq!(scene.hit_test(101.0, 110.0), HitTarget::Pin(pin));
        assert_eq!(scene.hit_test(130.0, 120.0), HitTarget::Block(BlockId(1)));
        assert_eq!(scene.hit_test(25.0, 3.0), HitTarget::Connection(dest));
        assert_eq!(scene.hit_test(25.0, 40.0), HitTarget::Canvas);
    }

    #[test]
    fn test_graphics_paint_lines_first() {
        let mut scene = Scene::new();
        let c = scene.circle(
            (0.0, 0.0),
            8.0,
            Rgb(0, 0, 0),
            GraphicTag::Pin(PinId::new(BlockId(1), 0)),
        );
        let l = scene.line((0.0, 0.0), (1.0, 1.0), 4.0, Rgb(0, 0, 0), GraphicTag::RubberBand);
        let order: Vec<GraphicId> = scene.graphics().map(|(id, _)| id).collect();
        assert_eq!(order, vec![l, c]);
    }
}
