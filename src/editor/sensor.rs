//! Live sensor data.
//!
//! The controller periodically sends a snapshot of every sensor it can see.
//! [`EditorSession::handle_sensor_data`] maps readings onto device blocks by
//! name, recomputes the diagram and refreshes what every block displays.

use std::collections::{HashSet, VecDeque};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{BlockId, BlockType, Value};

use super::render::format_value;
use super::scene::Surface;
use super::state::EditorSession;

/// One sensor value of a payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub name: String,
    #[serde(default)]
    pub value: Option<Value>,
}

/// Sensor snapshot as sent by the controller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorPayload {
    #[serde(default)]
    pub data: Option<Vec<SensorReading>>,
}

/// A timestamped payload, one per line of a sensor log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorMessage {
    /// Seconds.
    pub timestamp: f64,
    #[serde(flatten)]
    pub payload: SensorPayload,
}

impl SensorMessage {
    pub fn from_json(line: &str) -> Result<Self> {
        Ok(serde_json::from_str(line)?)
    }
}

/// Rolling window of `(time, value)` samples shown by a plot block.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotSeries {
    capacity: usize,
    samples: VecDeque<(f64, f64)>,
}

impl PlotSeries {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            samples: VecDeque::with_capacity(capacity),
        }
    }

    /// Append a sample, dropping the oldest one when full.
    pub fn push(&mut self, t: f64, value: f64) {
        self.samples.push_back((t, value));
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn last(&self) -> Option<(f64, f64)> {
        self.samples.back().copied()
    }

    pub fn points(&self) -> Vec<[f64; 2]> {
        self.samples.iter().map(|&(t, v)| [t, v]).collect()
    }
}

/// Decode a base64 image value. Undecodable data is logged and ignored.
pub fn decode_image(data: &str) -> Option<Vec<u8>> {
    match STANDARD.decode(data.trim()) {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            tracing::warn!("Ignoring undecodable image value: {}", e);
            None
        }
    }
}

impl<S: Surface> EditorSession<S> {
    /// Apply a sensor snapshot received at `timestamp` (seconds).
    ///
    /// Payloads without `data` are ignored. Device blocks missing from the
    /// snapshot are set to null.
    pub fn handle_sensor_data(&mut self, timestamp: f64, payload: &SensorPayload) {
        let Some(data) = &payload.data else {
            return;
        };
        self.timestamp = timestamp;
        self.first_timestamp.get_or_insert(timestamp);

        let mut received = HashSet::with_capacity(data.len());
        for reading in data {
            if let Some(id) = self.names.get(&reading.name) {
                if let Some(block) = self.diagram.find_block_by_id_mut(id) {
                    block.update_value(reading.value.clone());
                }
            }
            received.insert(reading.name.as_str());
            self.confirmed_sensors.insert(reading.name.clone());
        }

        for block in &mut self.diagram.blocks {
            if block.is_device() && !received.contains(block.name.as_str()) {
                block.update_value(None);
            }
        }
        self.last_sensor_data = Some(data.clone());

        self.diagram.update();

        let ids: Vec<BlockId> = self.diagram.blocks.iter().map(|b| b.id).collect();
        for id in ids {
            self.display_block_value(id);
        }
        tracing::debug!("Applied {} sensor readings at {}", data.len(), timestamp);
    }

    /// Names of device blocks for which no payload since load carried data.
    pub fn get_unmapped_sensors(&self) -> Vec<String> {
        self.diagram
            .blocks
            .iter()
            .filter(|b| b.is_device() && !self.confirmed_sensors.contains(&b.name))
            .map(|b| b.name.clone())
            .collect()
    }

    /// Show a block's current value. Plot blocks record it as a new sample.
    pub fn display_block_value(&mut self, id: BlockId) {
        let Some(block) = self.diagram.find_block_by_id(id) else {
            return;
        };
        let element = self.views.block(id).map(|v| v.element);

        match block.block_type {
            BlockType::NumberEntry => {}
            BlockType::Plot => {
                let t = self.timestamp - self.first_timestamp.unwrap_or(self.timestamp);
                let window = self.config.plot_window;
                let series = self
                    .plots
                    .entry(id)
                    .or_insert_with(|| PlotSeries::new(window));
                match block.value.as_ref().and_then(Value::as_number) {
                    Some(v) if v.is_finite() => series.push(t, v),
                    _ => series.clear(),
                }
                if let Some(element) = element {
                    self.surface.set_plot(element, &series.points());
                }
            }
            _ if block.is_image_valued() => {
                // a null image keeps the last frame on screen
                if let (Some(Value::Image(data)), Some(element)) = (&block.value, element) {
                    if let Some(bytes) = decode_image(data) {
                        self.surface.set_image(element, bytes);
                    }
                }
            }
            _ => {
                if let Some(element) = element {
                    let text = format_value(block.value.as_ref());
                    self.surface.set_value_text(element, &text);
                }
            }
        }
    }

    /// Payload of the most recent sensor message.
    pub fn last_sensor_data(&self) -> Option<&[SensorReading]> {
        self.last_sensor_data.as_deref()
    }

    /// Samples currently held by a plot block.
    pub fn plot_series(&self, id: BlockId) -> Option<&PlotSeries> {
        self.plots.get(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_shapes() {
        let msg = SensorMessage::from_json(
            r#"{"timestamp": 12.5, "data": [{"name": "temperature", "value": 21.5},
                {"name": "camera", "value": "aGVsbG8="}, {"name": "light", "value": null}]}"#,
        )
        .unwrap();
        assert_eq!(msg.timestamp, 12.5);
        let data = msg.payload.data.unwrap();
        assert_eq!(data[0].value, Some(Value::Number(21.5)));
        assert_eq!(data[1].value, Some(Value::Image("aGVsbG8=".into())));
        assert_eq!(data[2].value, None);

        let empty = SensorMessage::from_json(r#"{"timestamp": 1}"#).unwrap();
        assert!(empty.payload.data.is_none());
    }

    #[test]
    fn test_plot_series_window() {
        let mut s = PlotSeries::new(3);
        for i in 0..5 {
            s.push(i as f64, i as f64 * 2.0);
        }
        assert_eq!(s.len(), 3);
        assert_eq!(s.points()[0], [2.0, 4.0]);
        assert_eq!(s.last(), Some((4.0, 8.0)));
        s.clear();
        assert!(s.is_empty());
    }

    #[test]
    fn test_decode_image() {
        assert_eq!(decode_image("aGVsbG8=").as_deref(), Some(&b"hello"[..]));
        assert_eq!(decode_image("not base64!"), None);
    }
}
