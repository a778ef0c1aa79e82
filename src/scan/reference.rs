/// Reference dataset the scanner resolves barcodes against
///
/// Read-only once built. The surrounding application can supply its own
/// dataset as a JSON file; otherwise the demo records are used.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use super::CrateStatus;
use crate::config::ConfigError;

/// What the warehouse knows about a crate carrying a given barcode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrateRecord {
    pub crate_id: String,
    pub customer_name: String,
    pub status: CrateStatus,
}

/// One entry of a reference dataset file
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
struct ReferenceEntry {
    barcode: String,
    crate_id: String,
    customer_name: String,
    status: CrateStatus,
}

/// Barcode → crate record lookup table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceSet {
    records: HashMap<String, CrateRecord>,
}

impl ReferenceSet {
    /// The two crates known to the demo scanner screen
    pub fn demo() -> Self {
        let mut records = HashMap::new();
        records.insert(
            "WH001234".to_string(),
            CrateRecord {
                crate_id: "CR-001234".to_string(),
                customer_name: "ABC Manufacturing Corp".to_string(),
                status: CrateStatus::Available,
            },
        );
        records.insert(
            "WH005678".to_string(),
            CrateRecord {
                crate_id: "CR-005678".to_string(),
                customer_name: "Global Logistics Ltd".to_string(),
                status: CrateStatus::ScheduledDelivery,
            },
        );
        Self { records }
    }

    /// Parse a JSON array of `{ barcode, crateId, customerName, status }`
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let entries: Vec<ReferenceEntry> = serde_json::from_str(json)?;
        let mut records = HashMap::with_capacity(entries.len());

        for entry in entries {
            let record = CrateRecord {
                crate_id: entry.crate_id,
                customer_name: entry.customer_name,
                status: entry.status,
            };
            if records.insert(entry.barcode.clone(), record).is_some() {
                return Err(ConfigError::DuplicateBarcode(entry.barcode));
            }
        }

        Ok(Self { records })
    }

    /// Load a dataset file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let set = Self::from_json(&json)?;
        info!("📦 Loaded {} reference crates from {}", set.len(), path.display());
        Ok(set)
    }

    /// Exact, case-sensitive lookup
    pub fn get(&self, barcode: &str) -> Option<&CrateRecord> {
        self.records.get(barcode)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
