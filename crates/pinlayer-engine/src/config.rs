//! Engine configuration.
//!
//! Every field has a default reproducing the engine's built-in constants, so
//! a config file only needs to name what it overrides:
//!
//! ```json
//! { "fixed_selector_cap": 4, "skip_owner_markers": ["pin-runtime"] }
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tunables for scanning, measuring and relocating candidates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixedLayerConfig {
    /// Maximum number of elements registered per fixed selector.
    pub fixed_selector_cap: usize,

    /// Elements at least this tall (in CSS px) are never relocated.
    pub transfer_height_cap: f64,

    /// Base of the synthesized z-index of relocated elements.
    pub z_index_base: u32,

    /// Delay between a visibility mutation and the pass it schedules.
    #[serde(with = "millis")]
    pub debounce: Duration,

    /// Value forced onto `bottom` while probing the auto-top baseline.
    pub probe_bottom: String,

    /// Attributes marking a `<style>` owner as framework-internal.
    pub skip_owner_markers: Vec<String>,

    /// Attribute names whose mutation schedules a pass.
    pub visibility_attributes: Vec<String>,

    /// Border above the viewport content, added to the committed padding when
    /// recognizing a flush-top element.
    pub border_top: f64,
}

impl Default for FixedLayerConfig {
    fn default() -> Self {
        Self {
            fixed_selector_cap: 10,
            transfer_height_cap: 300.0,
            z_index_base: 10_000,
            debounce: Duration::from_millis(16),
            probe_bottom: "-9999vh".to_string(),
            skip_owner_markers: vec![
                "pin-boilerplate".to_string(),
                "pin-runtime".to_string(),
                "pin-extension".to_string(),
            ],
            visibility_attributes: vec!["hidden".to_string()],
            border_top: 0.0,
        }
    }
}

impl FixedLayerConfig {
    /// Whether a mutation of `name` should schedule a pass.
    #[must_use]
    pub fn is_visibility_attribute(&self, name: &str) -> bool {
        self.visibility_attributes.iter().any(|a| a == name)
    }
}

/// `Duration` as whole milliseconds.
mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let config: FixedLayerConfig =
            serde_json::from_str(r#"{ "fixed_selector_cap": 3, "debounce": 40 }"#).unwrap();
        assert_eq!(config.fixed_selector_cap, 3);
        assert_eq!(config.debounce, Duration::from_millis(40));
        assert_eq!(config.z_index_base, 10_000);
        assert!(config.is_visibility_attribute("hidden"));
    }
}
