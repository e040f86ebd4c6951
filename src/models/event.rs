//! Intrusion event model
//!
//! One decoded frame from the detection backend. Only `intrusion` is read;
//! everything else the backend sends is carried along untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Raw flag as sent by the backend. Kept as JSON so `1`, `"1"` and
    /// `true` stay distinguishable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intrusion: Option<Value>,

    /// Fields not consumed by the dashboard
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Event {
    /// Event carrying an integer intrusion flag
    pub fn with_flag(flag: i64) -> Self {
        Self {
            intrusion: Some(Value::from(flag)),
            extra: Map::new(),
        }
    }

    /// Alert-worthy iff the flag is the number 1. Strings, booleans and
    /// any other number are ignored.
    pub fn is_intrusion(&self) -> bool {
        match &self.intrusion {
            Some(Value::Number(n)) => n.as_f64() == Some(1.0),
            _ => false,
        }
    }
}
