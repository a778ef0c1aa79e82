/// Scan resolution module
///
/// This module turns a scan into a crate lookup:
/// - Reference dataset of known barcodes (reference.rs)
/// - Barcode decoding strategy for camera images (decoder.rs)
/// - UI-facing scan flow with simulated latency (flow.rs)

pub mod decoder;
pub mod flow;
pub mod reference;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::capture::ImageCapture;
use decoder::BarcodeDecoder;
use reference::ReferenceSet;

/// Lifecycle status of a crate in the warehouse
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CrateStatus {
    Available,
    Occupied,
    ScheduledDelivery,
    InTransit,
}

impl CrateStatus {
    /// Human label for display
    pub fn label(&self) -> &'static str {
        match self {
            CrateStatus::Available => "Available",
            CrateStatus::Occupied => "Occupied",
            CrateStatus::ScheduledDelivery => "Scheduled Delivery",
            CrateStatus::InTransit => "In Transit",
        }
    }
}

/// What gets resolved: a camera image or a typed code
#[derive(Debug, Clone, PartialEq)]
pub enum ScanInput {
    Image(ImageCapture),
    Manual(String),
}

impl ScanInput {
    /// Manual entry, trimmed; `None` when nothing but whitespace was typed
    pub fn manual(raw: &str) -> Option<Self> {
        let code = raw.trim();
        if code.is_empty() {
            None
        } else {
            Some(ScanInput::Manual(code.to_string()))
        }
    }
}

/// Outcome of one scan
///
/// A miss is a normal result with `found == false` and only `barcode` set.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    pub barcode: String,
    pub found: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crate_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<CrateStatus>,
}

impl ScanResult {
    pub fn not_found(barcode: impl Into<String>) -> Self {
        Self {
            barcode: barcode.into(),
            found: false,
            crate_id: None,
            customer_name: None,
            status: None,
        }
    }
}

/// Pure barcode → crate resolver
pub struct Resolver {
    reference: ReferenceSet,
    decoder: Box<dyn BarcodeDecoder>,
}

impl Resolver {
    pub fn new(reference: ReferenceSet, decoder: impl BarcodeDecoder + 'static) -> Self {
        Self {
            reference,
            decoder: Box::new(decoder),
        }
    }

    /// Derive the barcode for `input` and look it up
    ///
    /// Never fails. The barcode reported is exactly the one looked up.
    pub fn resolve(&self, input: &ScanInput) -> ScanResult {
        let barcode = match input {
            ScanInput::Manual(code) => code.clone(),
            ScanInput::Image(image) => self.decoder.decode(image),
        };
        self.lookup(barcode)
    }

    fn lookup(&self, barcode: String) -> ScanResult {
        match self.reference.get(&barcode) {
            Some(record) => {
                debug!("Barcode {} matched crate {}", barcode, record.crate_id);
                ScanResult {
                    found: true,
                    crate_id: Some(record.crate_id.clone()),
                    customer_name: Some(record.customer_name.clone()),
                    status: Some(record.status),
                    barcode,
                }
            }
            None => {
                debug!("Barcode {} not in reference set", barcode);
                ScanResult::not_found(barcode)
            }
        }
    }

    pub fn reference(&self) -> &ReferenceSet {
        &self.reference
    }
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("reference_len", &self.reference.len())
            .finish()
    }
}
