/// Barcode decoding strategy for camera scans
///
/// There is no real barcode reader yet. `DigestDecoder` stands in for one:
/// it maps the image payload onto a fixed list of demo codes so the same
/// photo always yields the same barcode.

use crate::capture::ImageCapture;

/// Codes the demo decoder can "read"
pub const DEMO_BARCODES: &[&str] = &["WH001234", "WH005678", "WH009999"];

/// Turns an acquired image into a barcode string
pub trait BarcodeDecoder: Send + Sync {
    fn decode(&self, image: &ImageCapture) -> String;
}

impl<F> BarcodeDecoder for F
where
    F: Fn(&ImageCapture) -> String + Send + Sync,
{
    fn decode(&self, image: &ImageCapture) -> String {
        self(image)
    }
}

/// Deterministic stand-in decoder
///
/// Picks one of `candidates` from an FNV-1a digest of the image bytes.
#[derive(Debug, Clone)]
pub struct DigestDecoder {
    candidates: Vec<String>,
}

impl DigestDecoder {
    pub fn new(candidates: Vec<String>) -> Self {
        Self { candidates }
    }

    pub fn demo() -> Self {
        Self::new(DEMO_BARCODES.iter().map(|code| code.to_string()).collect())
    }
}

impl BarcodeDecoder for DigestDecoder {
    fn decode(&self, image: &ImageCapture) -> String {
        if self.candidates.is_empty() {
            return String::new();
        }
        let index = (fnv1a(image.bytes()) % self.candidates.len() as u64) as usize;
        self.candidates[index].clone()
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    bytes
        .iter()
        .fold(OFFSET, |hash, &b| (hash ^ b as u64).wrapping_mul(PRIME))
}
