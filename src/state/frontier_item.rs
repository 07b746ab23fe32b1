use crate::storage::StorageError;
use serde::{Deserialize, Serialize};

/// Version tag written into every serialized frontier payload
pub const FRONTIER_SCHEMA_VERSION: u32 = 1;

/// A URL waiting in the frontier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontierItem {
    /// Absolute, normalized URL; also the seen-set key
    pub url: String,

    /// Category slug inherited from the list page that discovered this URL
    #[serde(default)]
    pub genre_hint: Option<String>,

    /// List page this URL was found on
    #[serde(default)]
    pub source_list: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct FrontierPayload {
    v: u32,
    #[serde(flatten)]
    item: FrontierItem,
}

impl FrontierItem {
    /// Creates an item with no hint or source, as used for seeds
    pub fn seed(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            genre_hint: None,
            source_list: None,
        }
    }

    /// Serializes the item as a versioned JSON payload
    pub fn to_payload(&self) -> Result<String, StorageError> {
        serde_json::to_string(&FrontierPayload {
            v: FRONTIER_SCHEMA_VERSION,
            item: self.clone(),
        })
        .map_err(|e| StorageError::Serialization(e.to_string()))
    }

    /// Parses a payload written by [`FrontierItem::to_payload`]
    ///
    /// Payloads carrying any other schema version are rejected.
    pub fn from_payload(payload: &str) -> Result<Self, StorageError> {
        let parsed: FrontierPayload = serde_json::from_str(payload)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        if parsed.v != FRONTIER_SCHEMA_VERSION {
            return Err(StorageError::Serialization(format!(
                "unsupported frontier payload version {}",
                parsed.v
            )));
        }

        Ok(parsed.item)
    }
}
