//! The payload document: a JSON object with a fixed required shape and
//! arbitrary extra keys that must survive every edit.
//!
//! ```json
//! {
//!   "event_type": "ephemeraless",
//!   "client_payload": {
//!     "essdev_instances": {},
//!     "assdk_instances": {},
//!     "ess_custom_ports_egress": {},
//!     "ess_custom_ports_ingress": {},
//!     "region": "eu-central-1"
//!   }
//! }
//! ```

use crate::error::{EssdevError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

// ---------------------------------------------------------------------------
// Key constants
// ---------------------------------------------------------------------------

pub const EVENT_TYPE: &str = "event_type";
pub const CLIENT_PAYLOAD: &str = "client_payload";
pub const ESSDEV_INSTANCES: &str = "essdev_instances";
pub const ASSDK_INSTANCES: &str = "assdk_instances";
pub const PORTS_EGRESS: &str = "ess_custom_ports_egress";
pub const PORTS_INGRESS: &str = "ess_custom_ports_ingress";
pub const REGION: &str = "region";

pub const DEFAULT_EVENT_TYPE: &str = "ephemeraless";
pub const DEFAULT_REGION: &str = "eu-central-1";

/// Maps keyed by instance name; a delete clears the name from all of them.
const INSTANCE_KEYED: [&str; 3] = [ESSDEV_INSTANCES, PORTS_EGRESS, PORTS_INGRESS];

// ---------------------------------------------------------------------------
// InstanceRecord
// ---------------------------------------------------------------------------

/// One entry of `essdev_instances`.
///
/// `volume_size1` is a decimal string, not a number: downstream workflows
/// read it that way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceRecord {
    pub instance_type: String,
    pub volume_size1: String,
    pub ami: Option<String>,
}

impl InstanceRecord {
    pub fn new(instance_type: impl Into<String>, volume_size_gb: u32, ami: Option<String>) -> Self {
        Self {
            instance_type: instance_type.into(),
            volume_size1: volume_size_gb.to_string(),
            ami,
        }
    }
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Document(Map<String, Value>);

fn default_client_payload() -> Map<String, Value> {
    let mut payload = Map::new();
    payload.insert(ESSDEV_INSTANCES.into(), json!({}));
    payload.insert(ASSDK_INSTANCES.into(), json!({}));
    payload.insert(PORTS_EGRESS.into(), json!({}));
    payload.insert(PORTS_INGRESS.into(), json!({}));
    payload.insert(REGION.into(), json!(DEFAULT_REGION));
    payload
}

/// A fresh document with every required key at its default value.
pub fn default_document() -> Document {
    let mut root = Map::new();
    root.insert(EVENT_TYPE.into(), json!(DEFAULT_EVENT_TYPE));
    root.insert(CLIENT_PAYLOAD.into(), Value::Object(default_client_payload()));
    Document(root)
}

/// Backfill missing required keys without touching anything already present.
///
/// A non-object root is discarded in favour of the default document, and a
/// non-object `client_payload` is replaced by an empty one before its keys
/// are filled in.
pub fn normalize(raw: Value) -> Document {
    let Value::Object(mut root) = raw else {
        return default_document();
    };

    root.entry(EVENT_TYPE)
        .or_insert_with(|| json!(DEFAULT_EVENT_TYPE));

    let payload = root
        .entry(CLIENT_PAYLOAD)
        .or_insert_with(|| Value::Object(Map::new()));
    if !payload.is_object() {
        *payload = Value::Object(Map::new());
    }
    if let Value::Object(payload) = payload {
        for (key, value) in default_client_payload() {
            payload.entry(key).or_insert(value);
        }
    }

    Document(root)
}

impl Document {
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Pretty JSON with 2-space indentation, no trailing newline.
    pub fn to_pretty_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.0)?)
    }

    fn client_payload(&self) -> Result<&Map<String, Value>> {
        self.0
            .get(CLIENT_PAYLOAD)
            .and_then(Value::as_object)
            .ok_or_else(|| shape_error(CLIENT_PAYLOAD))
    }

    fn client_payload_mut(&mut self) -> Result<&mut Map<String, Value>> {
        self.0
            .get_mut(CLIENT_PAYLOAD)
            .and_then(Value::as_object_mut)
            .ok_or_else(|| shape_error(CLIENT_PAYLOAD))
    }

    fn section(&self, key: &str) -> Result<&Map<String, Value>> {
        self.client_payload()?
            .get(key)
            .and_then(Value::as_object)
            .ok_or_else(|| shape_error(key))
    }

    fn section_mut(&mut self, key: &str) -> Result<&mut Map<String, Value>> {
        self.client_payload_mut()?
            .get_mut(key)
            .and_then(Value::as_object_mut)
            .ok_or_else(|| shape_error(key))
    }

    /// Insert or fully replace the record for `name`.
    pub fn upsert_instance(&mut self, name: &str, record: &InstanceRecord) -> Result<()> {
        let value = serde_json::to_value(record)?;
        self.section_mut(ESSDEV_INSTANCES)?
            .insert(name.to_string(), value);
        Ok(())
    }

    /// Drop `name` from the instance map and both port maps.
    ///
    /// Returns true if the name was present in any of them.
    pub fn remove_instance(&mut self, name: &str) -> Result<bool> {
        for key in INSTANCE_KEYED {
            self.section(key)?;
        }
        let mut removed = false;
        for key in INSTANCE_KEYED {
            removed |= self.section_mut(key)?.shift_remove(name).is_some();
        }
        Ok(removed)
    }

    /// Instance names, sorted.
    pub fn instance_names(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.section(ESSDEV_INSTANCES)?.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    pub fn instance(&self, name: &str) -> Option<&Value> {
        self.section(ESSDEV_INSTANCES).ok()?.get(name)
    }

    pub fn region(&self) -> Option<&str> {
        self.client_payload().ok()?.get(REGION)?.as_str()
    }
}

fn shape_error(key: &str) -> EssdevError {
    EssdevError::InvalidShape {
        key: key.to_string(),
    }
}
