//! Program and block specifications.
//!
//! A [`ProgramSpec`] is the serialized form of a diagram: the blocks with
//! their pin layout, parameters, positions and, per input pin, the id of the
//! block feeding it. [`spec_to_diagram`] builds a live [`Diagram`] from it and
//! [`diagram_to_spec`] turns an edited diagram back into a spec for saving.

use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{EditorError, Result};
use crate::model::{
    Block, BlockId, BlockType, DeviceKind, Diagram, FilterState, Param, Pin, PinId, PinType,
    Position, Value,
};

/// Serialized dataflow program.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgramSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub blocks: Vec<BlockSpec>,
}

impl ProgramSpec {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load a program from a JSON file.
    pub fn load(path: &Utf8Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Save the program as pretty-printed JSON.
    pub fn save(&self, path: &Utf8Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

/// Initial placement of a block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewSpec {
    pub x: f32,
    pub y: f32,
}

/// Specification of a single block, as produced by the palette or read from
/// a program file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<BlockId>,
    pub name: String,
    #[serde(rename = "type")]
    pub block_type: BlockType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
    #[serde(default)]
    pub has_seq: bool,
    #[serde(default)]
    pub input_type: Option<PinType>,
    #[serde(default)]
    pub input_count: usize,
    #[serde(default)]
    pub output_type: Option<PinType>,
    #[serde(default)]
    pub output_count: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<Param>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view: Option<ViewSpec>,
    /// Per input pin: id of the block whose first output feeds it.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<Option<BlockId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl BlockSpec {
    /// Minimal spec of the given type without pins.
    pub fn new(name: &str, block_type: BlockType) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            block_type,
            units: None,
            has_seq: false,
            input_type: None,
            input_count: 0,
            output_type: None,
            output_count: 0,
            params: Vec::new(),
            view: None,
            sources: Vec::new(),
            value: None,
        }
    }

    /// A sensor device: no inputs, one numeric output.
    pub fn device(name: &str, kind: DeviceKind, units: &str) -> Self {
        Self {
            units: Some(units.to_string()),
            has_seq: true,
            output_type: Some(PinType::Number),
            output_count: 1,
            ..Self::new(name, BlockType::Device(kind))
        }
    }

    /// A numeric entry block: one numeric output.
    pub fn number_entry(name: &str) -> Self {
        Self {
            output_type: Some(PinType::Number),
            output_count: 1,
            ..Self::new(name, BlockType::NumberEntry)
        }
    }

    /// A plot block: one numeric input.
    pub fn plot(name: &str) -> Self {
        Self {
            input_type: Some(PinType::Number),
            input_count: 1,
            ..Self::new(name, BlockType::Plot)
        }
    }

    pub fn at(mut self, x: f32, y: f32) -> Self {
        self.view = Some(ViewSpec { x, y });
        self
    }
}

/// Build a block from its specification.
pub fn create_flow_block(id: BlockId, spec: &BlockSpec) -> Block {
    let mut pins = Vec::with_capacity(spec.input_count + spec.output_count);
    for index in 0..spec.input_count {
        pins.push(Pin {
            is_input: true,
            index,
            source: None,
        });
    }
    for index in 0..spec.output_count {
        pins.push(Pin {
            is_input: false,
            index,
            source: None,
        });
    }
    let position = spec
        .view
        .map(|v| Position { x: v.x, y: v.y })
        .unwrap_or_default();
    Block {
        id,
        name: spec.name.clone(),
        block_type: spec.block_type.clone(),
        units: spec.units.clone(),
        has_seq: spec.has_seq,
        input_type: spec.input_type,
        output_type: spec.output_type,
        pins,
        params: spec.params.clone(),
        value: spec.value.clone(),
        position,
        filter_state: FilterState::default(),
    }
}

/// Build a diagram from a program specification.
///
/// Blocks keep the ids given in the spec; blocks without an id get a fresh
/// one. Sources that reference unknown blocks, or blocks without an output
/// pin, are dropped.
pub fn spec_to_diagram(spec: &ProgramSpec) -> Result<Diagram> {
    let mut seen = HashSet::new();
    for id in spec.blocks.iter().filter_map(|b| b.id) {
        if id.0 == u32::MAX {
            return Err(EditorError::BlockIdOutOfRange(id));
        }
        if !seen.insert(id) {
            return Err(EditorError::DuplicateBlockId(id));
        }
    }

    let mut diagram = Diagram::new();
    // fresh ids must never collide with explicit ones
    if let Some(max) = seen.iter().max() {
        diagram.reserve_ids_through(*max);
    }

    let mut ids = Vec::with_capacity(spec.blocks.len());
    for b in &spec.blocks {
        let id = match b.id {
            Some(id) => id,
            None => diagram.next_block_id(),
        };
        ids.push(id);
        diagram.push_block(create_flow_block(id, b));
    }

    for (b, dest_id) in spec.blocks.iter().zip(ids) {
        for (input_index, source) in b.sources.iter().enumerate() {
            let Some(source_id) = source else { continue };
            let source_pin = diagram
                .find_block_by_id(*source_id)
                .and_then(|src| src.output_pin(0));
            let dest_pin = diagram
                .find_block_by_id(dest_id)
                .and_then(|dst| dst.input_pin(input_index));
            match (source_pin, dest_pin) {
                (Some(s), Some(d)) => {
                    diagram.connect(s, d);
                }
                _ => tracing::warn!(
                    "Dropping connection {} -> {} input {}: pin not found",
                    source_id,
                    dest_id,
                    input_index
                ),
            }
        }
    }

    Ok(diagram)
}

/// Serialize a diagram back into a program specification.
pub fn diagram_to_spec(diagram: &Diagram, name: Option<&str>) -> ProgramSpec {
    let blocks = diagram
        .blocks
        .iter()
        .map(|b| {
            let sources = b
                .pins
                .iter()
                .filter(|p| p.is_input)
                .map(|p| p.source.map(|s: PinId| s.block))
                .collect::<Vec<_>>();
            BlockSpec {
                id: Some(b.id),
                name: b.name.clone(),
                block_type: b.block_type.clone(),
                units: b.units.clone(),
                has_seq: b.has_seq,
                input_type: b.input_type,
                input_count: b.input_count(),
                output_type: b.output_type,
                output_count: b.output_count(),
                params: b.params.clone(),
                view: Some(ViewSpec {
                    x: b.position.x,
                    y: b.position.y,
                }),
                sources: if sources.iter().all(Option::is_none) {
                    Vec::new()
                } else {
                    sources
                },
                // only entered numbers are program state; sensor values are live data
                value: match b.block_type {
                    BlockType::NumberEntry => b.value.clone(),
                    _ => None,
                },
            }
        })
        .collect();
    ProgramSpec {
        name: name.map(str::to_string),
        blocks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROGRAM: &str = r#"{
        "name": "greenhouse",
        "blocks": [
            {"id": 1, "name": "temperature", "type": "temperature", "units": "degrees C",
             "has_seq": true, "output_type": "n", "output_count": 1, "view": {"x": 10, "y": 20}},
            {"id": 2, "name": "plot", "type": "plot", "input_type": "n", "input_count": 1,
             "sources": [1]},
            {"name": "number", "type": "number_entry", "output_type": "n", "output_count": 1,
             "value": 4}
        ]
    }"#;

    #[test]
    fn test_spec_to_diagram_connects_sources() {
        let spec = ProgramSpec::from_json(PROGRAM).unwrap();
        let d = spec_to_diagram(&spec).unwrap();
        assert_eq!(d.blocks.len(), 3);
        assert_eq!(d.blocks[2].id, BlockId(3));
        assert_eq!(d.blocks[0].position, Position { x: 10.0, y: 20.0 });

        let plot_in = d.blocks[1].input_pin(0).unwrap();
        let source = d.pin(plot_in).unwrap().source.unwrap();
        assert_eq!(source.block, BlockId(1));
        assert_eq!(d.blocks[2].value, Some(Value::Number(4.0)));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let json = r#"{"blocks": [
            {"id": 1, "name": "a", "type": "plot"},
            {"id": 1, "name": "b", "type": "plot"}
        ]}"#;
        let spec = ProgramSpec::from_json(json).unwrap();
        assert!(matches!(
            spec_to_diagram(&spec),
            Err(EditorError::DuplicateBlockId(BlockId(1)))
        ));
    }

    #[test]
    fn test_largest_block_id_rejected() {
        let json = r#"{"blocks": [
            {"id": 4294967295, "name": "plot", "type": "plot", "input_count": 1}
        ]}"#;
        let spec = ProgramSpec::from_json(json).unwrap();
        assert!(matches!(
            spec_to_diagram(&spec),
            Err(EditorError::BlockIdOutOfRange(BlockId(u32::MAX)))
        ));

        let json = r#"{"blocks": [
            {"id": 4294967294, "name": "plot", "type": "plot", "input_count": 1},
            {"name": "number", "type": "number_entry", "output_count": 1}
        ]}"#;
        let spec = ProgramSpec::from_json(json).unwrap();
        let d = spec_to_diagram(&spec).unwrap();
        assert_eq!(d.blocks[1].id, BlockId(u32::MAX));
    }

    #[test]
    fn test_dangling_source_is_dropped() {
        let json = r#"{"blocks": [
            {"id": 1, "name": "plot", "type": "plot", "input_count": 1, "sources": [42]}
        ]}"#;
        let d = spec_to_diagram(&ProgramSpec::from_json(json).unwrap()).unwrap();
        assert_eq!(d.connection_count(), 0);
    }

    #[test]
    fn test_diagram_to_spec_keeps_connections() {
        let spec = ProgramSpec::from_json(PROGRAM).unwrap();
        let d = spec_to_diagram(&spec).unwrap();
        let saved = diagram_to_spec(&d, Some("greenhouse"));
        assert_eq!(saved.name.as_deref(), Some("greenhouse"));
        assert_eq!(saved.blocks[1].sources, vec![Some(BlockId(1))]);
        assert!(saved.blocks[0].sources.is_empty());

        let reloaded = spec_to_diagram(&saved).unwrap();
        assert_eq!(reloaded.connection_count(), 1);
        assert_eq!(reloaded.blocks[2].value, Some(Value::Number(4.0)));
    }

    #[test]
    fn test_unknown_fields_and_missing_blocks_default() {
        let spec = ProgramSpec::from_json("{}").unwrap();
        assert!(spec.blocks.is_empty());
        assert!(spec_to_diagram(&spec).unwrap().blocks.is_empty());
    }
}
