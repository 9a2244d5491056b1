//! Schemaless payload used by the CLI
//!
//! Content kinds embedding the engine bring their own payload types; the
//! operator CLI only needs a name and a bag of attributes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::lifecycle::ItemPayload;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenericPayload {
    pub name: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

impl GenericPayload {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Map::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }
}

impl ItemPayload for GenericPayload {
    fn name(&self) -> &str {
        &self.name
    }
}
