use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

// ────────────────────────────────────────────────────────────────────────────
// Identifiers
// ────────────────────────────────────────────────────────────────────────────

/// Unique block identifier within a diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(pub u32);

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Address of a pin: owning block plus position in [`Block::pins`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PinId {
    pub block: BlockId,
    pub pin: usize,
}

impl PinId {
    pub fn new(block: BlockId, pin: usize) -> Self {
        Self { block, pin }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Block types
// ────────────────────────────────────────────────────────────────────────────

/// Physical sensor devices that report values by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    Temperature,
    Humidity,
    Light,
    SoilMoisture,
    Co2,
}

impl DeviceKind {
    pub const ALL: [DeviceKind; 5] = [
        DeviceKind::Temperature,
        DeviceKind::Humidity,
        DeviceKind::Light,
        DeviceKind::SoilMoisture,
        DeviceKind::Co2,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DeviceKind::Temperature => "temperature",
            DeviceKind::Humidity => "humidity",
            DeviceKind::Light => "light",
            DeviceKind::SoilMoisture => "soilmoisture",
            DeviceKind::Co2 => "CO2",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.as_str() == s)
    }

    /// Default display units reported by this kind of sensor.
    pub fn default_units(self) -> &'static str {
        match self {
            DeviceKind::Temperature => "degrees C",
            DeviceKind::Humidity => "percent",
            DeviceKind::Light => "lux",
            DeviceKind::SoilMoisture => "",
            DeviceKind::Co2 => "PPM",
        }
    }
}

/// Filter blocks, named the way users pick them from the filter selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKind {
    Not,
    And,
    Or,
    Xor,
    Nand,
    Plus,
    Minus,
    Times,
    DividedBy,
    AbsoluteValue,
    Equals,
    NotEquals,
    LessThan,
    GreaterThan,
    SimpleMovingAverage,
    ExponentialMovingAverage,
    Blur,
    Brightness,
}

impl FilterKind {
    /// Filters offered by the palette's filter selector, in display order.
    pub const PALETTE: [FilterKind; 16] = [
        FilterKind::Not,
        FilterKind::And,
        FilterKind::Or,
        FilterKind::Xor,
        FilterKind::Nand,
        FilterKind::Plus,
        FilterKind::Minus,
        FilterKind::Times,
        FilterKind::DividedBy,
        FilterKind::AbsoluteValue,
        FilterKind::Equals,
        FilterKind::NotEquals,
        FilterKind::LessThan,
        FilterKind::GreaterThan,
        FilterKind::SimpleMovingAverage,
        FilterKind::ExponentialMovingAverage,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FilterKind::Not => "not",
            FilterKind::And => "and",
            FilterKind::Or => "or",
            FilterKind::Xor => "xor",
            FilterKind::Nand => "nand",
            FilterKind::Plus => "plus",
            FilterKind::Minus => "minus",
            FilterKind::Times => "times",
            FilterKind::DividedBy => "divided by",
            FilterKind::AbsoluteValue => "absolute value",
            FilterKind::Equals => "equals",
            FilterKind::NotEquals => "not equals",
            FilterKind::LessThan => "less than",
            FilterKind::GreaterThan => "greater than",
            FilterKind::SimpleMovingAverage => "simple moving average",
            FilterKind::ExponentialMovingAverage => "exponential moving average",
            FilterKind::Blur => "blur",
            FilterKind::Brightness => "brightness",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::PALETTE
            .into_iter()
            .chain([FilterKind::Blur, FilterKind::Brightness])
            .find(|f| f.as_str() == s)
    }

    /// True for filters operating on image values.
    pub fn is_image(self) -> bool {
        matches!(self, FilterKind::Blur | FilterKind::Brightness)
    }
}

/// The type of a block. Unknown type strings are preserved verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BlockType {
    Device(DeviceKind),
    Filter(FilterKind),
    NumberEntry,
    NumberDisplayAndInput,
    Plot,
    Other(String),
}

impl BlockType {
    pub fn parse(s: &str) -> Self {
        match s {
            "number_entry" => BlockType::NumberEntry,
            "number_display_and_input" => BlockType::NumberDisplayAndInput,
            "plot" => BlockType::Plot,
            _ => DeviceKind::parse(s)
                .map(BlockType::Device)
                .or_else(|| FilterKind::parse(s).map(BlockType::Filter))
                .unwrap_or_else(|| BlockType::Other(s.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            BlockType::Device(d) => d.as_str(),
            BlockType::Filter(f) => f.as_str(),
            BlockType::NumberEntry => "number_entry",
            BlockType::NumberDisplayAndInput => "number_display_and_input",
            BlockType::Plot => "plot",
            BlockType::Other(s) => s,
        }
    }

    /// True if the block represents a physical sensor device.
    pub fn is_device(&self) -> bool {
        matches!(self, BlockType::Device(_))
    }
}

impl From<String> for BlockType {
    fn from(s: String) -> Self {
        BlockType::parse(&s)
    }
}

impl From<BlockType> for String {
    fn from(t: BlockType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of value carried by a pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PinType {
    #[serde(rename = "n")]
    Number,
    #[serde(rename = "i")]
    Image,
}

// ────────────────────────────────────────────────────────────────────────────
// Values
// ────────────────────────────────────────────────────────────────────────────

/// A block value. The null value is represented by `Option::None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    /// Base64-encoded JPEG image.
    Image(String),
}

impl Value {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Image(_) => None,
        }
    }
}

/// Format a number the way the value label shows it (`10` rather than `10.0`).
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Pins, params, blocks
// ────────────────────────────────────────────────────────────────────────────

/// A connection point on a block.
#[derive(Debug, Clone, PartialEq)]
pub struct Pin {
    pub is_input: bool,
    /// Position among pins of the same direction.
    pub index: usize,
    /// Source pin feeding this pin. Only input pins hold a source.
    pub source: Option<PinId>,
}

/// A user-editable block parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    #[serde(rename = "type", default = "default_param_type")]
    pub param_type: PinType,
    pub min: f64,
    pub max: f64,
    pub default: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

fn default_param_type() -> PinType {
    PinType::Number
}

impl Param {
    pub fn numeric(name: &str, min: f64, max: f64, default: f64) -> Self {
        Self {
            name: name.to_string(),
            param_type: PinType::Number,
            min,
            max,
            default,
            value: None,
        }
    }

    /// Current value, falling back to the default.
    pub fn effective(&self) -> f64 {
        self.value.unwrap_or(self.default)
    }
}

/// Block position in unscaled canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

/// Running state of moving-average filters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterState {
    pub window: VecDeque<f64>,
    pub ema: Option<f64>,
}

/// A block of a dataflow diagram.
#[derive(Debug, Clone)]
pub struct Block {
    pub id: BlockId,
    pub name: String,
    pub block_type: BlockType,
    pub units: Option<String>,
    pub has_seq: bool,
    pub input_type: Option<PinType>,
    pub output_type: Option<PinType>,
    /// Input pins first, then output pins.
    pub pins: Vec<Pin>,
    pub params: Vec<Param>,
    pub value: Option<Value>,
    pub position: Position,
    pub(crate) filter_state: FilterState,
}

impl Block {
    pub fn input_count(&self) -> usize {
        self.pins.iter().filter(|p| p.is_input).count()
    }

    pub fn output_count(&self) -> usize {
        self.pins.iter().filter(|p| !p.is_input).count()
    }

    /// Pin id of the `index`-th output pin.
    pub fn output_pin(&self, index: usize) -> Option<PinId> {
        self.pins
            .iter()
            .position(|p| !p.is_input && p.index == index)
            .map(|i| PinId::new(self.id, i))
    }

    /// Pin id of the `index`-th input pin.
    pub fn input_pin(&self, index: usize) -> Option<PinId> {
        self.pins
            .iter()
            .position(|p| p.is_input && p.index == index)
            .map(|i| PinId::new(self.id, i))
    }

    pub fn pin_ids(&self) -> impl Iterator<Item = PinId> + '_ {
        (0..self.pins.len()).map(move |i| PinId::new(self.id, i))
    }

    pub fn update_value(&mut self, value: Option<Value>) {
        self.value = value;
    }

    pub fn is_device(&self) -> bool {
        self.block_type.is_device()
    }

    /// True for blocks whose output is an image.
    pub fn is_image_valued(&self) -> bool {
        self.output_type == Some(PinType::Image)
    }

    /// Filter this block evaluates, if any.
    ///
    /// Moving averages are stored as `number_display_and_input` blocks whose
    /// name carries the filter kind (`simple moving average 2`). Such a
    /// block that has been renamed still averages through its `period`
    /// parameter.
    pub fn filter_kind(&self) -> Option<FilterKind> {
        match &self.block_type {
            BlockType::Filter(kind) => Some(*kind),
            BlockType::NumberDisplayAndInput => {
                if self
                    .name
                    .starts_with(FilterKind::ExponentialMovingAverage.as_str())
                {
                    Some(FilterKind::ExponentialMovingAverage)
                } else if self.name.starts_with(FilterKind::SimpleMovingAverage.as_str())
                    || self.param("period").is_some()
                {
                    Some(FilterKind::SimpleMovingAverage)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    pub fn param(&self, name: &str) -> Option<&Param> {
        self.params.iter().find(|p| p.name == name)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Diagram
// ────────────────────────────────────────────────────────────────────────────

/// An ordered collection of blocks and their connections.
#[derive(Debug, Clone, Default)]
pub struct Diagram {
    pub blocks: Vec<Block>,
    next_id: u32,
}

impl Diagram {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a fresh block id.
    pub fn next_block_id(&mut self) -> BlockId {
        let id = BlockId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        id
    }

    /// Make sure ids up to and including `id` are never handed out.
    pub fn reserve_ids_through(&mut self, id: BlockId) {
        self.next_id = self.next_id.max(id.0.saturating_add(1));
    }

    /// Append a block, keeping the id counter ahead of every used id.
    pub fn push_block(&mut self, block: Block) {
        self.next_id = self.next_id.max(block.id.0.saturating_add(1));
        self.blocks.push(block);
    }

    pub fn find_block_by_id(&self, id: BlockId) -> Option<&Block> {
        self.blocks.iter().find(|b| b.id == id)
    }

    pub fn find_block_by_id_mut(&mut self, id: BlockId) -> Option<&mut Block> {
        self.blocks.iter_mut().find(|b| b.id == id)
    }

    pub fn find_block_by_name(&self, name: &str) -> Option<&Block> {
        self.blocks.iter().find(|b| b.name == name)
    }

    pub fn pin(&self, id: PinId) -> Option<&Pin> {
        self.find_block_by_id(id.block)?.pins.get(id.pin)
    }

    /// Input pins of other blocks whose source is a pin of `block`.
    pub fn find_dest_pins(&self, block: BlockId) -> Vec<PinId> {
        let mut dests = Vec::new();
        for b in &self.blocks {
            for (i, pin) in b.pins.iter().enumerate() {
                if pin.source.is_some_and(|s| s.block == block) {
                    dests.push(PinId::new(b.id, i));
                }
            }
        }
        dests
    }

    /// Set `dest.source = source`. Returns false if either pin is missing,
    /// the directions are wrong, or `dest` already has a source.
    pub fn connect(&mut self, source: PinId, dest: PinId) -> bool {
        match self.pin(source) {
            Some(p) if !p.is_input => {}
            _ => return false,
        }
        let Some(dest_pin) = self
            .find_block_by_id_mut(dest.block)
            .and_then(|b| b.pins.get_mut(dest.pin))
        else {
            return false;
        };
        if !dest_pin.is_input || dest_pin.source.is_some() {
            return false;
        }
        dest_pin.source = Some(source);
        true
    }

    /// Clear the source of `dest`, returning the previous source.
    pub fn disconnect(&mut self, dest: PinId) -> Option<PinId> {
        self.find_block_by_id_mut(dest.block)?
            .pins
            .get_mut(dest.pin)?
            .source
            .take()
    }

    /// Remove a block and detach every pin that it was feeding.
    pub fn remove_block(&mut self, id: BlockId) -> Option<Block> {
        let idx = self.blocks.iter().position(|b| b.id == id)?;
        let removed = self.blocks.remove(idx);
        for b in &mut self.blocks {
            for pin in &mut b.pins {
                if pin.source.is_some_and(|s| s.block == id) {
                    pin.source = None;
                }
            }
        }
        Some(removed)
    }

    /// Number of live connections.
    pub fn connection_count(&self) -> usize {
        self.blocks
            .iter()
            .flat_map(|b| b.pins.iter())
            .filter(|p| p.source.is_some())
            .count()
    }
}
