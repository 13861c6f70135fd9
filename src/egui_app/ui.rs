#![cfg(feature = "egui")]

use std::time::Duration;

use eframe::egui::{self, Color32, Key, Pos2, Rect, Sense, UiBuilder, Vec2};
use egui_plot::{Line, Plot, PlotPoints};

use crate::editor::{
    BlockBody, BlockLayout, Bounds, ElementId, HitTarget, MenuCommand, MenuItem, ParamField,
    PromptOutcome, SceneElement, Surface,
};
use crate::model::{BlockId, DeviceKind, FilterKind};

use super::geometry::{from_screen, hits_embedded_widget};
use super::render::{paint_circles, paint_element, paint_lines};
use super::state::{EditorApp, RenamePrompt};

/// The parts of an element that become egui widgets, copied out of the
/// scene so that the session can be mutated while they are shown.
struct ElementWidgets {
    id: ElementId,
    block: BlockId,
    x: f32,
    y: f32,
    layout: BlockLayout,
    body: BlockBody,
    params: Vec<ParamField>,
    menu: Vec<MenuItem>,
    plot: Vec<[f64; 2]>,
}

impl ElementWidgets {
    fn from_element(id: ElementId, e: &SceneElement) -> Self {
        Self {
            id,
            block: e.content.block,
            x: e.x,
            y: e.y,
            layout: e.layout.clone(),
            body: e.content.body.clone(),
            params: e.content.params.clone(),
            menu: e.content.menu.clone(),
            plot: e.plot.clone(),
        }
    }

    fn rect(&self, origin: Pos2, bounds: &Bounds) -> Rect {
        Rect::from_min_size(
            Pos2::new(origin.x + self.x + bounds.x, origin.y + self.y + bounds.y),
            Vec2::new(bounds.w, bounds.h),
        )
    }
}

pub(crate) fn update(app: &mut EditorApp, ctx: &egui::Context) {
    app.poll_sensors();
    handle_shortcuts(app, ctx);
    show_palette(app, ctx);
    egui::CentralPanel::default()
        .frame(egui::Frame::new().fill(Color32::WHITE))
        .show(ctx, |ui| show_canvas(app, ui));
    show_filter_selector(app, ctx);
    show_rename_prompt(app, ctx);
    forget_removed_images(app, ctx);

    if app.sensors.is_some() {
        ctx.request_repaint_after(Duration::from_millis(100));
    }
}

/// Ctrl+I zooms in, Ctrl+O zooms out.
fn handle_shortcuts(app: &mut EditorApp, ctx: &egui::Context) {
    let (zoom_in, zoom_out) = ctx.input(|i| {
        (
            i.modifiers.ctrl && i.key_pressed(Key::I),
            i.modifiers.ctrl && i.key_pressed(Key::O),
        )
    });
    let step = app.session.config().zoom_step;
    if zoom_in {
        app.session.zoom_blocks(step);
    }
    if zoom_out {
        app.session.zoom_blocks(-step);
    }
}

fn show_palette(app: &mut EditorApp, ctx: &egui::Context) {
    egui::SidePanel::left("palette")
        .resizable(false)
        .default_width(160.0)
        .show(ctx, |ui| {
            ui.heading(app.session.program_name().unwrap_or("Program"));
            ui.separator();

            ui.label("Sensors");
            for kind in DeviceKind::ALL {
                if ui.button(kind.as_str()).clicked() {
                    app.session.add_device_block(kind);
                }
            }
            ui.separator();
            if ui.button("filter…").clicked() {
                app.filter_selector_open = true;
            }
            if ui.button("number").clicked() {
                app.session.add_numeric_block();
            }
            if ui.button("plot").clicked() {
                app.session.add_plot_block();
            }
            ui.separator();

            ui.horizontal(|ui| {
                let step = app.session.config().zoom_step;
                if ui.small_button("−").on_hover_text("Ctrl+O").clicked() {
                    app.session.zoom_blocks(-step);
                }
                if ui.small_button("+").on_hover_text("Ctrl+I").clicked() {
                    app.session.zoom_blocks(step);
                }
                ui.label(format!("{}%", (app.session.scale() * 100.0).round() as i32));
            });

            if app.program_path.is_some() {
                let label = if app.session.is_modified() { "Save*" } else { "Save" };
                if ui.button(label).clicked() {
                    app.save();
                }
            }

            let unmapped = app.session.get_unmapped_sensors();
            if !unmapped.is_empty() && app.session.last_sensor_data().is_some() {
                ui.separator();
                ui.colored_label(
                    Color32::from_rgb(200, 120, 0),
                    format!("No data for: {}", unmapped.join(", ")),
                );
            }
            if let Some(note) = &app.notification {
                ui.separator();
                ui.label(note);
            }
        });
}

fn show_canvas(app: &mut EditorApp, ui: &mut egui::Ui) {
    let canvas = ui.available_rect_before_wrap();
    let origin = canvas.min;
    ui.allocate_rect(canvas, Sense::hover());
    handle_pointer(app, ui, canvas, origin);

    let painter = ui.painter_at(canvas);
    paint_lines(&painter, app.session.surface(), origin);

    let style = *app.session.surface().style();
    let ids: Vec<ElementId> = app.session.surface().elements().map(|(id, _)| id).collect();
    let mut commands = Vec::new();
    for id in ids {
        let Some(element) = app.session.surface().element(id) else {
            continue;
        };
        paint_element(&painter, element, origin, &style);
        let widgets = ElementWidgets::from_element(id, element);
        show_element_widgets(app, ui, origin, &widgets, &mut commands);
    }

    paint_circles(&painter, app.session.surface(), origin);

    for (block, command) in commands {
        match command {
            MenuCommand::Rename => {
                app.rename = app.session.rename_block(block).map(|request| RenamePrompt {
                    text: request.default.clone(),
                    request,
                    error: None,
                });
            }
            MenuCommand::Delete => {
                app.session.delete_block(block);
            }
        }
    }
}

/// Translate egui pointer input over the canvas into editor pointer events.
fn handle_pointer(app: &mut EditorApp, ui: &egui::Ui, canvas: Rect, origin: Pos2) {
    let ctx = ui.ctx();
    let (pos, pressed, released, moved) = ctx.input(|i| {
        (
            i.pointer.latest_pos(),
            i.pointer.primary_pressed(),
            i.pointer.primary_released(),
            i.pointer.delta() != Vec2::ZERO,
        )
    });
    let Some(pos) = pos else {
        return;
    };
    let (x, y) = from_screen(origin, pos);

    if pressed && canvas.contains(pos) && ctx.layer_id_at(pos) == Some(ui.layer_id()) {
        let on_widget = match app.session.surface().hit_test(x, y) {
            HitTarget::Block(block) => app
                .session
                .surface()
                .element_for_block(block)
                .is_some_and(|e| hits_embedded_widget(e, x, y)),
            _ => false,
        };
        if !on_widget {
            app.session.pointer_down(x, y);
        }
    }
    if moved {
        app.session.pointer_move(x, y);
    }
    if released {
        app.session.pointer_up(x, y);
    }
}

fn show_element_widgets(
    app: &mut EditorApp,
    ui: &mut egui::Ui,
    origin: Pos2,
    w: &ElementWidgets,
    commands: &mut Vec<(BlockId, MenuCommand)>,
) {
    let menu_rect = w.rect(origin, &w.layout.menu);
    ui.scope_builder(UiBuilder::new().max_rect(menu_rect), |ui| {
        ui.menu_button("☰", |ui| {
            for item in &w.menu {
                if ui.button(&item.label).clicked() {
                    commands.push((w.block, item.command));
                    ui.close();
                }
            }
        });
    });

    let body_rect = w.rect(origin, &w.layout.body);
    match &w.body {
        BlockBody::NumberEntry { text } => {
            let mut text = text.clone();
            let response = ui.put(
                body_rect,
                egui::TextEdit::singleline(&mut text).desired_width(body_rect.width()),
            );
            if response.changed() {
                app.session.number_entry_changed(w.block, &text);
            }
        }
        BlockBody::Plot => {
            ui.scope_builder(UiBuilder::new().max_rect(body_rect), |ui| {
                Plot::new(("block_plot", w.id.0))
                    .width(body_rect.width())
                    .height(body_rect.height())
                    .allow_drag(false)
                    .allow_zoom(false)
                    .allow_scroll(false)
                    .allow_boxed_zoom(false)
                    .show(ui, |plot_ui| {
                        plot_ui.line(Line::new("value", PlotPoints::from(w.plot.clone())));
                    });
            });
        }
        BlockBody::Image => match app.image_source(ui.ctx(), w.id) {
            Some(source) => {
                ui.put(
                    body_rect,
                    egui::Image::new(source).fit_to_exact_size(body_rect.size()),
                );
            }
            None => {
                ui.painter().text(
                    body_rect.center(),
                    egui::Align2::CENTER_CENTER,
                    "no image",
                    egui::FontId::proportional(14.0),
                    Color32::GRAY,
                );
            }
        },
        BlockBody::Value { .. } => {}
    }

    for (param, (_, input)) in w.params.iter().zip(&w.layout.params) {
        let rect = w.rect(origin, input);
        let mut text = param.text.clone();
        let response = ui.put(
            rect,
            egui::TextEdit::singleline(&mut text).desired_width(rect.width()),
        );
        if response.changed() {
            app.session.param_entry_changed(w.block, &param.name, &text);
        }
    }
}

fn show_filter_selector(app: &mut EditorApp, ctx: &egui::Context) {
    if !app.filter_selector_open {
        return;
    }
    let mut open = true;
    let mut chosen = None;
    egui::Window::new("Select a Filter")
        .open(&mut open)
        .collapsible(false)
        .resizable(false)
        .show(ctx, |ui| {
            ui.horizontal_wrapped(|ui| {
                for kind in FilterKind::PALETTE {
                    if ui.button(kind.as_str()).clicked() {
                        chosen = Some(kind);
                    }
                }
            });
        });
    if let Some(kind) = chosen {
        app.session.add_filter_block(kind.as_str());
        open = false;
    }
    app.filter_selector_open = open;
}

fn show_rename_prompt(app: &mut EditorApp, ctx: &egui::Context) {
    let Some(prompt) = app.rename.as_mut() else {
        return;
    };
    let mut outcome = None;
    let modal = egui::Modal::new(egui::Id::new("rename_block")).show(ctx, |ui| {
        ui.heading(&prompt.request.title);
        ui.label(&prompt.request.prompt);
        let response = ui.text_edit_singleline(&mut prompt.text);
        if let Some(error) = &prompt.error {
            ui.colored_label(Color32::RED, error);
        }
        ui.horizontal(|ui| {
            let enter = response.lost_focus() && ui.input(|i| i.key_pressed(Key::Enter));
            if ui.button("OK").clicked() || enter {
                outcome = Some(PromptOutcome::Submitted(prompt.text.clone()));
            }
            if ui.button("Cancel").clicked() {
                outcome = Some(PromptOutcome::Cancelled);
            }
        });
    });
    if modal.should_close() && outcome.is_none() {
        outcome = Some(PromptOutcome::Cancelled);
    }

    let Some(outcome) = outcome else {
        return;
    };
    let request = prompt.request.clone();
    match app.session.complete_rename(&request, outcome) {
        Ok(_) => app.rename = None,
        Err(e) => {
            if let Some(prompt) = app.rename.as_mut() {
                prompt.error = Some(e.to_string());
            }
        }
    }
}

fn forget_removed_images(app: &mut EditorApp, ctx: &egui::Context) {
    let gone: Vec<ElementId> = app
        .images
        .keys()
        .filter(|id| app.session.surface().element(**id).is_none())
        .copied()
        .collect();
    for id in gone {
        if let Some(image) = app.images.remove(&id) {
            ctx.forget_image(&image.uri);
        }
    }
}
