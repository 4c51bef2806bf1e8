//! Centralized configuration and builder for the history panel.
//!
//! Sources (lowest to highest priority):
//! - defaults (collapsed, 20% width, 25px tab);
//! - ENV: PH_HISTORY_COLLAPSED, PH_HISTORY_WIDTH_FRACTION, PH_HISTORY_COLLAPSED_WIDTH;
//! - construction-time options object (JSON), key "history".
//!
//! The "history" option:
//! - absent            => panel enabled with defaults;
//! - false / null / 0 / "" (falsy) => panel disabled;
//! - true / {}         => panel enabled with defaults;
//! - { "collapsed": bool, "width_fraction": f64, "collapsed_width": u32 } => overrides;
//! - anything else (non-zero numbers, non-empty strings, arrays, wrong field
//!   types including explicit null, unknown fields)
//!   is rejected at construction (HistoryError::InvalidConfig), never coerced.

use anyhow::Result;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::fmt;

use crate::error::HistoryError;
use crate::panel::{PanelGeometry, DEFAULT_COLLAPSED_WIDTH_PX, DEFAULT_WIDTH_FRACTION};

/// Configuration of one history panel.
#[derive(Clone, Debug, PartialEq)]
pub struct HistoryConfig {
    /// Initial panel state.
    /// Env: PH_HISTORY_COLLAPSED (default true; "1|true|on|yes" => true)
    pub collapsed: bool,

    /// Share of the container width used by the expanded panel, (0, 1].
    /// Env: PH_HISTORY_WIDTH_FRACTION (default 0.2)
    pub width_fraction: f64,

    /// Width of the collapsed tab, px.
    /// Env: PH_HISTORY_COLLAPSED_WIDTH (default 25)
    pub collapsed_width_px: u32,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            collapsed: true,
            width_fraction: DEFAULT_WIDTH_FRACTION,
            collapsed_width_px: DEFAULT_COLLAPSED_WIDTH_PX,
        }
    }
}

// Object form of the "history" option.
// Absent key => None; explicit null is a type error, not "default".
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct HistoryOptions {
    #[serde(default, deserialize_with = "present")]
    collapsed: Option<bool>,
    #[serde(default, deserialize_with = "present")]
    width_fraction: Option<f64>,
    #[serde(default, deserialize_with = "present")]
    collapsed_width: Option<u32>,
}

fn present<'de, D, T>(d: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(d).map(Some)
}

// Falsy in the widget's sense: the panel is switched off.
fn is_falsy(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

fn env_flag(s: &str) -> bool {
    let s = s.trim().to_ascii_lowercase();
    s == "1" || s == "true" || s == "on" || s == "yes"
}

impl HistoryConfig {
    /// Defaults overridden by ENV (malformed numbers are ignored, as elsewhere).
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("PH_HISTORY_COLLAPSED") {
            cfg.collapsed = env_flag(&v);
        }

        if let Ok(v) = std::env::var("PH_HISTORY_WIDTH_FRACTION") {
            if let Ok(f) = v.trim().parse::<f64>() {
                if f > 0.0 && f <= 1.0 {
                    cfg.width_fraction = f;
                }
            }
        }

        if let Ok(v) = std::env::var("PH_HISTORY_COLLAPSED_WIDTH") {
            if let Ok(n) = v.trim().parse::<u32>() {
                cfg.collapsed_width_px = n;
            }
        }

        cfg
    }

    /// Parse the widget options object (the whole object, not just "history")
    /// on top of defaults. Ok(None) means the panel is disabled.
    pub fn from_options(options: &Value) -> Result<Option<Self>> {
        Self::default().merge_options(options)
    }

    /// Same as from_options() but on top of `self` (e.g. from_env()).
    pub fn merge_options(self, options: &Value) -> Result<Option<Self>> {
        let history = match options {
            Value::Object(map) => map.get("history"),
            Value::Null => None,
            other => {
                return Err(HistoryError::InvalidConfig(format!(
                    "options must be an object, got {}",
                    json_type(other)
                ))
                .into())
            }
        };
        self.merge_history_value(history)
    }

    /// Interpret the raw "history" value (None = key absent).
    pub fn merge_history_value(self, history: Option<&Value>) -> Result<Option<Self>> {
        let obj = match history {
            None => return Ok(Some(self.build()?)),
            Some(v) if is_falsy(v) => return Ok(None),
            Some(Value::Bool(true)) => return Ok(Some(self.build()?)),
            Some(v @ Value::Object(_)) => v,
            Some(other) => {
                return Err(HistoryError::InvalidConfig(format!(
                    "\"history\" must be falsy, true or an object, got {}",
                    json_type(other)
                ))
                .into())
            }
        };

        let opts: HistoryOptions = serde_json::from_value(obj.clone())
            .map_err(|e| HistoryError::InvalidConfig(format!("\"history\": {}", e)))?;

        let mut cfg = self;
        if let Some(c) = opts.collapsed {
            cfg.collapsed = c;
        }
        if let Some(f) = opts.width_fraction {
            cfg.width_fraction = f;
        }
        if let Some(w) = opts.collapsed_width {
            cfg.collapsed_width_px = w;
        }
        Ok(Some(cfg.build()?))
    }

    /// Fluent setters (builder-style) to override specific fields.

    pub fn with_collapsed(mut self, on: bool) -> Self {
        self.collapsed = on;
        self
    }

    pub fn with_width_fraction(mut self, f: f64) -> Self {
        self.width_fraction = f;
        self
    }

    pub fn with_collapsed_width_px(mut self, px: u32) -> Self {
        self.collapsed_width_px = px;
        self
    }

    /// Finish the builder: validate and return the configuration.
    pub fn build(self) -> Result<Self> {
        if !(self.width_fraction > 0.0 && self.width_fraction <= 1.0) {
            return Err(HistoryError::InvalidConfig(format!(
                "width_fraction must be in (0, 1], got {}",
                self.width_fraction
            ))
            .into());
        }
        Ok(self)
    }

    pub fn geometry(&self) -> PanelGeometry {
        PanelGeometry {
            width_fraction: self.width_fraction,
            collapsed_width_px: self.collapsed_width_px,
        }
    }
}

fn json_type(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl fmt::Display for HistoryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "HistoryConfig {{ \
             collapsed: {}, \
             width_fraction: {}, \
             collapsed_width_px: {} \
             }}",
            self.collapsed, self.width_fraction, self.collapsed_width_px,
        )
    }
}
