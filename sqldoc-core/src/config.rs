//! Collection configuration.
//!
//! Options are usually built in code but can also come from a JSON object:
//!
//! ```ignore
//! let options = CollectionOptions::from_json(&json!({
//!     "versionTracking": true,
//!     "model": "person"
//! }))?;
//! ```

use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{DocumentStoreError, DocumentStoreResult};

const RECOGNIZED_OPTIONS: [&str; 2] = ["versionTracking", "model"];

/// Options applied when a collection is opened.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionOptions {
    /// Keep every revision instead of pruning non-current ones on commit.
    #[serde(default)]
    pub version_tracking: bool,
    /// Registered model name that writes are validated against and results merged into.
    #[serde(default)]
    pub model: Option<String>,
}

impl CollectionOptions {
    /// Creates the default options: no version tracking and no model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps every revision of a document when `version_tracking` is `true`.
    ///
    /// # Arguments
    ///
    /// * `version_tracking` - Retain history instead of pruning on commit
    pub fn with_version_tracking(mut self, version_tracking: bool) -> Self {
        self.version_tracking = version_tracking;
        self
    }

    /// Binds the collection to the registered model `model`.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Reads options from a JSON object. Unknown keys are ignored with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Configuration`] if `value` is not an object or an
    /// option has the wrong type.
    pub fn from_json(value: &Value) -> DocumentStoreResult<Self> {
        let object = value.as_object().ok_or_else(|| {
            DocumentStoreError::Configuration(format!(
                "collection options must be an object, found {value}"
            ))
        })?;

        for key in object.keys() {
            if !RECOGNIZED_OPTIONS.contains(&key.as_str()) {
                warn!("ignoring unknown collection option '{key}'");
            }
        }

        serde_json::from_value(value.clone())
            .map_err(|err| DocumentStoreError::Configuration(err.to_string()))
    }
}
