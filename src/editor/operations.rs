//! Palette and block commands.
//!
//! Adding blocks from the palette, renaming, deleting and the text inputs
//! embedded in block elements. Each operation updates the diagram and the
//! drawing together and marks the program as modified.

use indexmap::IndexMap;

use crate::error::{Result, invalid_name};
use crate::model::{BlockId, BlockType, DeviceKind, FilterKind, Param, PinType, Value, format_number};
use crate::spec::{BlockSpec, ViewSpec, create_flow_block};

use super::interaction::InteractionState;
use super::scene::Surface;
use super::state::EditorSession;

// ────────────────────────────────────────────────────────────────────────────
// Name registry
// ────────────────────────────────────────────────────────────────────────────

/// Block names in use, mapped to the block carrying them.
#[derive(Debug, Clone, Default)]
pub struct NameRegistry {
    names: IndexMap<String, BlockId>,
}

impl NameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, id: BlockId) {
        self.names.insert(name.to_string(), id);
    }

    /// Drop `name` if it is registered to `id`.
    pub fn remove(&mut self, name: &str, id: BlockId) {
        if self.names.get(name) == Some(&id) {
            self.names.shift_remove(name);
        }
    }

    pub fn get(&self, name: &str) -> Option<BlockId> {
        self.names.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn clear(&mut self) {
        self.names.clear();
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.keys().map(String::as_str)
    }

    /// `name` if unused, otherwise `name N` for the smallest free `N >= 2`.
    pub fn unique_name(&self, name: &str) -> String {
        if !self.contains(name) {
            return name.to_string();
        }
        let mut count = 2;
        while self.contains(&format!("{} {}", name, count)) {
            count += 1;
        }
        format!("{} {}", name, count)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Block specs offered by the palette
// ────────────────────────────────────────────────────────────────────────────

/// Spec of a filter block as picked from the filter selector. Unknown
/// filter names get the default two-input numeric layout. Moving averages
/// become `number_display_and_input` blocks named after the filter.
pub fn filter_block_spec(filter_type: &str) -> BlockSpec {
    let block_type = BlockType::parse(filter_type);
    let mut spec = BlockSpec {
        input_type: Some(PinType::Number),
        input_count: 2,
        output_type: Some(PinType::Number),
        output_count: 1,
        ..BlockSpec::new(filter_type, block_type)
    };

    let BlockType::Filter(kind) = spec.block_type else {
        return spec;
    };
    match kind {
        FilterKind::Not | FilterKind::AbsoluteValue => spec.input_count = 1,
        FilterKind::SimpleMovingAverage | FilterKind::ExponentialMovingAverage => {
            spec.block_type = BlockType::NumberDisplayAndInput;
            spec.input_count = 1;
            spec.params = vec![Param::numeric("period", 0.0, 9999.0, 10.0)];
        }
        FilterKind::Blur => {
            spec.input_type = Some(PinType::Image);
            spec.output_type = Some(PinType::Image);
            spec.input_count = 1;
            spec.params = vec![Param::numeric("blur_amount", 0.0, 50.0, 5.0)];
        }
        FilterKind::Brightness => {
            spec.input_type = Some(PinType::Image);
            spec.output_type = Some(PinType::Image);
            spec.input_count = 1;
            spec.params = vec![Param::numeric("brightness_adjustment", -100.0, 100.0, 0.0)];
        }
        _ => {}
    }
    spec
}

// ────────────────────────────────────────────────────────────────────────────
// Rename prompt
// ────────────────────────────────────────────────────────────────────────────

/// Request for the front-end to prompt for a new block name.
#[derive(Debug, Clone, PartialEq)]
pub struct RenameRequest {
    pub block: BlockId,
    pub title: String,
    pub prompt: String,
    pub default: String,
}

/// Result of a modal prompt.
#[derive(Debug, Clone, PartialEq)]
pub enum PromptOutcome {
    Submitted(String),
    Cancelled,
}

fn is_allowed_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, ' ' | '_' | '-' | '.' | '(' | ')')
}

// ────────────────────────────────────────────────────────────────────────────
// Commands
// ────────────────────────────────────────────────────────────────────────────

impl<S: Surface> EditorSession<S> {
    pub fn get_unique_name(&self, name: &str) -> String {
        self.names.unique_name(name)
    }

    /// Append a block built from `spec` at the next cascade position and
    /// display it.
    fn add_block(&mut self, mut spec: BlockSpec) -> BlockId {
        let placement = &self.config.placement;
        let offset = self.diagram.blocks.len() as f32 * placement.cascade_step;
        spec.view = Some(ViewSpec {
            x: placement.origin_x + offset,
            y: placement.origin_y + offset,
        });
        spec.name = self.get_unique_name(&spec.name);

        let id = self.diagram.next_block_id();
        self.diagram.push_block(create_flow_block(id, &spec));
        self.names.insert(&spec.name, id);
        self.display_block(id);
        self.layout_modified();
        tracing::debug!("Added {} block {:?} as {}", spec.block_type, spec.name, id);
        id
    }

    /// Add a sensor device block named after its type.
    pub fn add_device_block(&mut self, kind: DeviceKind) -> BlockId {
        let units = self.config.units_for(kind).to_string();
        self.add_block(BlockSpec::device(kind.as_str(), kind, &units))
    }

    pub fn add_filter_block(&mut self, filter_type: &str) -> BlockId {
        self.add_block(filter_block_spec(filter_type))
    }

    pub fn add_numeric_block(&mut self) -> BlockId {
        self.add_block(BlockSpec::number_entry("number"))
    }

    pub fn add_plot_block(&mut self) -> BlockId {
        self.add_block(BlockSpec::plot("plot"))
    }

    /// Ask for a new name for a block; `None` if the block does not exist.
    pub fn rename_block(&self, id: BlockId) -> Option<RenameRequest> {
        let block = self.diagram.find_block_by_id(id)?;
        Some(RenameRequest {
            block: id,
            title: "Rename Block".to_string(),
            prompt: "New Name".to_string(),
            default: block.name.clone(),
        })
    }

    /// Check that `name` may be given to block `id`.
    pub fn validate_block_name(&self, id: BlockId, name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(invalid_name(name, "name must not be empty"));
        }
        if let Some(c) = name.chars().find(|c| !is_allowed_name_char(*c)) {
            return Err(invalid_name(name, format!("character {:?} is not allowed", c)));
        }
        let taken = match self.names.get(name) {
            Some(owner) => owner != id,
            None => self
                .diagram
                .find_block_by_name(name)
                .is_some_and(|b| b.id != id),
        };
        if taken {
            return Err(invalid_name(name, "another block already has this name"));
        }
        Ok(())
    }

    /// Finish a rename started with [`rename_block`](Self::rename_block).
    ///
    /// Returns `Ok(true)` if the block was renamed, `Ok(false)` if the prompt
    /// was cancelled or the block has gone away meanwhile.
    pub fn complete_rename(
        &mut self,
        request: &RenameRequest,
        outcome: PromptOutcome,
    ) -> Result<bool> {
        let PromptOutcome::Submitted(name) = outcome else {
            return Ok(false);
        };
        let id = request.block;
        let Some(old) = self.diagram.find_block_by_id(id).map(|b| b.name.clone()) else {
            return Ok(false);
        };
        if old == name {
            return Ok(false);
        }
        self.validate_block_name(id, &name)?;

        if let Some(block) = self.diagram.find_block_by_id_mut(id) {
            block.name = name.clone();
        }
        self.names.remove(&old, id);
        self.names.insert(&name, id);
        if let Some(view) = self.views.block(id) {
            self.surface.set_label(view.element, &name);
        }
        self.layout_modified();
        tracing::debug!("Renamed block {} from {:?} to {:?}", id, old, name);
        Ok(true)
    }

    /// Remove a block, its graphics and every connection touching it.
    pub fn delete_block(&mut self, id: BlockId) -> bool {
        let Some(name) = self.diagram.find_block_by_id(id).map(|b| b.name.clone()) else {
            return false;
        };

        let busy = match self.interaction {
            InteractionState::DraggingBlock { block, .. } => block == id,
            InteractionState::DrawingConnection { start_pin, .. } => start_pin.block == id,
            InteractionState::Idle => false,
        };
        if busy {
            self.cancel_interaction();
        }

        self.undisplay_block(id);
        self.diagram.remove_block(id);
        self.names.remove(&name, id);
        self.plots.remove(&id);
        self.layout_modified();
        tracing::debug!("Deleted block {} ({})", id, name);
        true
    }

    /// Handle an edit of a number entry field. Text that is not a number
    /// sets the block to null.
    pub fn number_entry_changed(&mut self, id: BlockId, text: &str) {
        let value = parse_number(text).map(Value::Number);
        let Some(block) = self.diagram.find_block_by_id_mut(id) else {
            return;
        };
        block.update_value(value);
        if let Some(view) = self.views.block(id) {
            self.surface.set_value_text(view.element, text);
        }
        self.layout_modified();
    }

    /// Handle an edit of a parameter field. Values are clamped to the
    /// parameter's range; text that is not a number clears the value. The
    /// field is rewritten to show a clamped value, and cleared for text that
    /// cannot start a number.
    pub fn param_entry_changed(&mut self, id: BlockId, param: &str, text: &str) {
        let Some(p) = self
            .diagram
            .find_block_by_id_mut(id)
            .and_then(|b| b.params.iter_mut().find(|p| p.name == param))
        else {
            return;
        };
        let parsed = parse_number(text);
        p.value = parsed.map(|v| v.clamp(p.min.min(p.max), p.max.max(p.min)));
        tracing::debug!("Parameter {} of block {} set to {:?}", param, id, p.value);
        let shown = match p.value {
            Some(v) if Some(v) != parsed => format_number(v),
            None if !is_number_prefix(text) => String::new(),
            _ => text.to_string(),
        };
        if let Some(view) = self.views.block(id) {
            self.surface.set_param_text(view.element, param, &shown);
        }
        self.layout_modified();
    }
}

/// Parse user input as a number; NaN and non-numbers give `None`.
pub fn parse_number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|v| !v.is_nan())
}

/// Partial input such as `-` or `1e` on the way to a number.
fn is_number_prefix(text: &str) -> bool {
    text.trim()
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'))
}
