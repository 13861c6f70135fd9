//! Editor configuration.
//!
//! Every field has a default, so a configuration file only needs to list
//! the settings it changes.

use camino::Utf8Path;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::color::{Rgb, parse_color};
use crate::error::{EditorError, Result};
use crate::model::DeviceKind;

/// Where the palette drops new blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    pub origin_x: f32,
    pub origin_y: f32,
    /// Diagonal offset per block already in the diagram.
    pub cascade_step: f32,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            origin_x: 200.0,
            origin_y: 50.0,
            cascade_step: 50.0,
        }
    }
}

/// Complete editor configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub placement: PlacementConfig,
    /// Number of samples kept by plot blocks.
    pub plot_window: usize,
    /// Zoom increment used by the zoom in/out shortcuts.
    pub zoom_step: f32,
    /// Smallest allowed zoom factor.
    pub min_scale: f32,
    pub pin_color: String,
    pub pin_hover_color: String,
    pub connection_color: String,
    /// Units shown for each device type, keyed by type name.
    pub device_units: IndexMap<String, String>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            placement: PlacementConfig::default(),
            plot_window: 30,
            zoom_step: 0.1,
            min_scale: 0.2,
            pin_color: "#4682b4".to_string(),
            pin_hover_color: "#f06".to_string(),
            connection_color: "#555".to_string(),
            device_units: DeviceKind::ALL
                .iter()
                .map(|d| (d.as_str().to_string(), d.default_units().to_string()))
                .collect(),
        }
    }
}

impl EditorConfig {
    /// Load a configuration from a JSON file.
    pub fn load(path: &Utf8Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: EditorConfig = serde_json::from_str(&text)
            .map_err(|e| EditorError::Config(format!("{}: {}", path, e)))?;
        config.validate()?;
        tracing::info!("Loaded editor configuration from {}", path);
        Ok(config)
    }

    /// Save the configuration as pretty-printed JSON.
    pub fn save(&self, path: &Utf8Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        tracing::debug!("Saved editor configuration to {}", path);
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("pin_color", &self.pin_color),
            ("pin_hover_color", &self.pin_hover_color),
            ("connection_color", &self.connection_color),
        ] {
            if parse_color(value).is_none() {
                return Err(EditorError::Config(format!(
                    "{} is not a color: {:?}",
                    field, value
                )));
            }
        }
        if self.plot_window == 0 {
            return Err(EditorError::Config("plot_window must be at least 1".into()));
        }
        if !(self.min_scale > 0.0) {
            return Err(EditorError::Config("min_scale must be positive".into()));
        }
        Ok(())
    }

    pub fn pin_rgb(&self) -> Rgb {
        parse_color(&self.pin_color).unwrap_or(Rgb(0x46, 0x82, 0xb4))
    }

    pub fn pin_hover_rgb(&self) -> Rgb {
        parse_color(&self.pin_hover_color).unwrap_or(Rgb(0xff, 0x00, 0x66))
    }

    pub fn connection_rgb(&self) -> Rgb {
        parse_color(&self.connection_color).unwrap_or(Rgb(0x55, 0x55, 0x55))
    }

    /// Units for a device block, falling back to the device's defaults.
    pub fn units_for(&self, kind: DeviceKind) -> &str {
        self.device_units
            .get(kind.as_str())
            .map(String::as_str)
            .unwrap_or(kind.default_units())
    }
}
