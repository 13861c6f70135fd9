//! Diagram recomputation.
//!
//! Sensor blocks and numeric entries hold values set from outside; every
//! other block computes its value from the blocks feeding its input pins.
//! [`Diagram::update`] evaluates blocks in dependency order so that each
//! block sees the values its sources computed in the same pass.

use std::collections::HashMap;

use crate::model::{Block, BlockId, BlockType, Diagram, FilterKind, Value};

impl Diagram {
    /// Recompute the value of every derived block.
    ///
    /// Blocks that sit on a cycle cannot be ordered and evaluate to null.
    pub fn update(&mut self) {
        let (order, cyclic) = self.evaluation_order();

        for id in cyclic {
            if let Some(block) = self.find_block_by_id_mut(id) {
                if is_derived(block) {
                    block.value = None;
                }
            }
        }

        for id in order {
            let inputs = self.input_values(id);
            if let Some(block) = self.find_block_by_id_mut(id) {
                if is_derived(block) {
                    block.value = compute(block, &inputs);
                }
            }
        }
    }

    /// Values currently present at the input pins of `id`, in pin order.
    fn input_values(&self, id: BlockId) -> Vec<Option<Value>> {
        let Some(block) = self.find_block_by_id(id) else {
            return Vec::new();
        };
        block
            .pins
            .iter()
            .filter(|p| p.is_input)
            .map(|p| {
                p.source
                    .and_then(|s| self.find_block_by_id(s.block))
                    .and_then(|src| src.value.clone())
            })
            .collect()
    }

    /// Kahn ordering of blocks by their connections. Returns the ordered ids
    /// and the ids left over because they are part of (or fed by) a cycle.
    fn evaluation_order(&self) -> (Vec<BlockId>, Vec<BlockId>) {
        let mut indegree: HashMap<BlockId, usize> =
            self.blocks.iter().map(|b| (b.id, 0)).collect();
        let mut edges: HashMap<BlockId, Vec<BlockId>> = HashMap::new();
        for b in &self.blocks {
            for pin in b.pins.iter().filter(|p| p.is_input) {
                if let Some(src) = pin.source {
                    if indegree.contains_key(&src.block) {
                        edges.entry(src.block).or_default().push(b.id);
                        *indegree.entry(b.id).or_default() += 1;
                    }
                }
            }
        }

        let mut ready: Vec<BlockId> = self
            .blocks
            .iter()
            .filter(|b| indegree[&b.id] == 0)
            .map(|b| b.id)
            .collect();
        ready.reverse();

        let mut order = Vec::with_capacity(self.blocks.len());
        while let Some(id) = ready.pop() {
            order.push(id);
            for next in edges.get(&id).into_iter().flatten() {
                if let Some(d) = indegree.get_mut(next) {
                    *d -= 1;
                    if *d == 0 {
                        ready.push(*next);
                    }
                }
            }
        }

        let cyclic = self
            .blocks
            .iter()
            .map(|b| b.id)
            .filter(|id| !order.contains(id))
            .collect();
        (order, cyclic)
    }
}

/// Blocks whose value comes from their inputs rather than from outside.
fn is_derived(block: &Block) -> bool {
    !matches!(block.block_type, BlockType::Device(_) | BlockType::NumberEntry)
        && block.input_count() > 0
}

fn truth(b: bool) -> f64 {
    if b { 1.0 } else { 0.0 }
}

fn compute(block: &mut Block, inputs: &[Option<Value>]) -> Option<Value> {
    let Some(kind) = block.filter_kind() else {
        // displays and plots mirror their first input
        return inputs.first().cloned().flatten();
    };

    let a = inputs.first().cloned().flatten().and_then(|v| v.as_number());
    let b = inputs.get(1).cloned().flatten().and_then(|v| v.as_number());

    let result = match kind {
        FilterKind::SimpleMovingAverage => {
            let period = period_of(block);
            let state = &mut block.filter_state;
            let x = a?;
            state.window.push_back(x);
            while state.window.len() > period {
                state.window.pop_front();
            }
            state.window.iter().sum::<f64>() / state.window.len() as f64
        }
        FilterKind::ExponentialMovingAverage => {
            let alpha = 2.0 / (period_of(block) as f64 + 1.0);
            let state = &mut block.filter_state;
            let x = a?;
            let next = match state.ema {
                Some(prev) => alpha * x + (1.0 - alpha) * prev,
                None => x,
            };
            state.ema = Some(next);
            next
        }
        FilterKind::Not => truth(a? == 0.0),
        FilterKind::AbsoluteValue => a?.abs(),
        FilterKind::And => truth(a? != 0.0 && b? != 0.0),
        FilterKind::Or => truth(a? != 0.0 || b? != 0.0),
        FilterKind::Xor => truth((a? != 0.0) != (b? != 0.0)),
        FilterKind::Nand => truth(!(a? != 0.0 && b? != 0.0)),
        FilterKind::Plus => a? + b?,
        FilterKind::Minus => a? - b?,
        FilterKind::Times => a? * b?,
        FilterKind::DividedBy => {
            let (a, b) = (a?, b?);
            if b == 0.0 {
                return None;
            }
            a / b
        }
        FilterKind::Equals => truth(a? == b?),
        FilterKind::NotEquals => truth(a? != b?),
        FilterKind::LessThan => truth(a? < b?),
        FilterKind::GreaterThan => truth(a? > b?),
        // image processing itself runs on the controller
        FilterKind::Blur | FilterKind::Brightness => return inputs.first().cloned().flatten(),
    };
    Some(Value::Number(result))
}

fn period_of(block: &Block) -> usize {
    let period = block.param("period").map_or(10.0, |p| p.effective());
    if period.is_finite() && period >= 1.0 {
        period as usize
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DeviceKind, Param, PinType};
    use crate::spec::{BlockSpec, create_flow_block};

    fn add(d: &mut Diagram, spec: BlockSpec) -> BlockId {
        let id = d.next_block_id();
        d.push_block(create_flow_block(id, &spec));
        id
    }

    fn filter(kind: FilterKind, inputs: usize) -> BlockSpec {
        BlockSpec {
            input_type: Some(PinType::Number),
            input_count: inputs,
            output_type: Some(PinType::Number),
            output_count: 1,
            ..BlockSpec::new(kind.as_str(), BlockType::Filter(kind))
        }
    }

    fn wire(d: &mut Diagram, from: BlockId, to: BlockId, input: usize) {
        let s = d.find_block_by_id(from).unwrap().output_pin(0).unwrap();
        let t = d.find_block_by_id(to).unwrap().input_pin(input).unwrap();
        assert!(d.connect(s, t));
    }

    fn set(d: &mut Diagram, id: BlockId, v: f64) {
        d.find_block_by_id_mut(id)
            .unwrap()
            .update_value(Some(Value::Number(v)));
    }

    fn value(d: &Diagram, id: BlockId) -> Option<f64> {
        d.find_block_by_id(id)
            .unwrap()
            .value
            .as_ref()
            .and_then(|v| v.as_number())
    }

    #[test]
    fn test_binary_filters() {
        let cases = [
            (FilterKind::Plus, 6.0, 2.0, Some(8.0)),
            (FilterKind::Minus, 6.0, 2.0, Some(4.0)),
            (FilterKind::Times, 6.0, 2.0, Some(12.0)),
            (FilterKind::DividedBy, 6.0, 2.0, Some(3.0)),
            (FilterKind::DividedBy, 6.0, 0.0, None),
            (FilterKind::And, 1.0, 0.0, Some(0.0)),
            (FilterKind::Or, 1.0, 0.0, Some(1.0)),
            (FilterKind::Xor, 1.0, 1.0, Some(0.0)),
            (FilterKind::Nand, 1.0, 1.0, Some(0.0)),
            (FilterKind::Equals, 2.0, 2.0, Some(1.0)),
            (FilterKind::NotEquals, 2.0, 2.0, Some(0.0)),
            (FilterKind::LessThan, 1.0, 2.0, Some(1.0)),
            (FilterKind::GreaterThan, 1.0, 2.0, Some(0.0)),
        ];
        for (kind, x, y, expected) in cases {
            let mut d = Diagram::new();
            let a = add(&mut d, BlockSpec::number_entry("a"));
            let b = add(&mut d, BlockSpec::number_entry("b"));
            let f = add(&mut d, filter(kind, 2));
            wire(&mut d, a, f, 0);
            wire(&mut d, b, f, 1);
            set(&mut d, a, x);
            set(&mut d, b, y);
            d.update();
            assert_eq!(value(&d, f), expected, "{}", kind.as_str());
        }
    }

    #[test]
    fn test_missing_input_gives_null() {
        let mut d = Diagram::new();
        let a = add(&mut d, BlockSpec::number_entry("a"));
        let f = add(&mut d, filter(FilterKind::Plus, 2));
        wire(&mut d, a, f, 0);
        set(&mut d, a, 1.0);
        d.update();
        assert_eq!(value(&d, f), None);
    }

    #[test]
    fn test_chain_evaluates_in_dependency_order() {
        let mut d = Diagram::new();
        // plot added first so that diagram order differs from data flow
        let plot = add(&mut d, BlockSpec::plot("plot"));
        let abs = add(&mut d, filter(FilterKind::AbsoluteValue, 1));
        let t = add(
            &mut d,
            BlockSpec::device("temperature", DeviceKind::Temperature, "degrees C"),
        );
        wire(&mut d, t, abs, 0);
        wire(&mut d, abs, plot, 0);
        set(&mut d, t, -4.5);
        d.update();
        assert_eq!(value(&d, plot), Some(4.5));
        // devices keep their value
        assert_eq!(value(&d, t), Some(-4.5));
    }

    #[test]
    fn test_simple_moving_average_window() {
        let mut d = Diagram::new();
        let a = add(&mut d, BlockSpec::number_entry("a"));
        let mut spec = filter(FilterKind::SimpleMovingAverage, 1);
        spec.params = vec![Param::numeric("period", 0.0, 9999.0, 2.0)];
        let f = add(&mut d, spec);
        wire(&mut d, a, f, 0);
        for (x, expected) in [(2.0, 2.0), (4.0, 3.0), (8.0, 6.0)] {
            set(&mut d, a, x);
            d.update();
            assert_eq!(value(&d, f), Some(expected));
        }
    }

    #[test]
    fn test_exponential_moving_average() {
        let mut d = Diagram::new();
        let a = add(&mut d, BlockSpec::number_entry("a"));
        let mut spec = filter(FilterKind::ExponentialMovingAverage, 1);
        // alpha = 2 / (3 + 1) = 0.5
        spec.params = vec![Param::numeric("period", 0.0, 9999.0, 3.0)];
        let f = add(&mut d, spec);
        wire(&mut d, a, f, 0);
        set(&mut d, a, 10.0);
        d.update();
        assert_eq!(value(&d, f), Some(10.0));
        set(&mut d, a, 20.0);
        d.update();
        assert_eq!(value(&d, f), Some(15.0));
    }

    #[test]
    fn test_display_and_input_block_averages_by_name() {
        let mut d = Diagram::new();
        let a = add(&mut d, BlockSpec::number_entry("a"));
        let spec = BlockSpec {
            input_type: Some(PinType::Number),
            input_count: 1,
            output_type: Some(PinType::Number),
            output_count: 1,
            params: vec![Param {
                value: Some(2.0),
                ..Param::numeric("period", 0.0, 9999.0, 10.0)
            }],
            ..BlockSpec::new("simple moving average", BlockType::NumberDisplayAndInput)
        };
        let f = add(&mut d, spec);
        wire(&mut d, a, f, 0);
        for (x, expected) in [(2.0, 2.0), (4.0, 3.0)] {
            set(&mut d, a, x);
            d.update();
            assert_eq!(value(&d, f), Some(expected));
        }

        let ema = d.find_block_by_id(f).map(|b| Block {
            name: "exponential moving average 2".into(),
            ..b.clone()
        });
        assert_eq!(
            ema.and_then(|b| b.filter_kind()),
            Some(FilterKind::ExponentialMovingAverage)
        );
    }

    #[test]
    fn test_plain_display_and_input_mirrors_input() {
        let mut d = Diagram::new();
        let a = add(&mut d, BlockSpec::number_entry("a"));
        let spec = BlockSpec {
            input_type: Some(PinType::Number),
            input_count: 1,
            output_type: Some(PinType::Number),
            output_count: 1,
            ..BlockSpec::new("display", BlockType::NumberDisplayAndInput)
        };
        let f = add(&mut d, spec);
        wire(&mut d, a, f, 0);
        set(&mut d, a, 7.0);
        d.update();
        assert_eq!(value(&d, f), Some(7.0));
    }

    #[test]
    fn test_cycle_evaluates_to_null() {
        let mut d = Diagram::new();
        let f1 = add(&mut d, filter(FilterKind::AbsoluteValue, 1));
        let f2 = add(&mut d, filter(FilterKind::AbsoluteValue, 1));
        wire(&mut d, f1, f2, 0);
        wire(&mut d, f2, f1, 0);
        d.find_block_by_id_mut(f1).unwrap().value = Some(Value::Number(1.0));
        d.update();
        assert_eq!(value(&d, f1), None);
        assert_eq!(value(&d, f2), None);
    }
}
