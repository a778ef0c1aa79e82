/// Scan flow driven by the scanner screen
///
/// Acquisition, the simulated scanning delay and resolution in one place, so
/// the UI only has to start a task and render what comes back.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use super::{Resolver, ScanInput, ScanResult};
use crate::capture::{AcquisitionError, AcquisitionService, ImageCapture};

/// Result of a camera scan: the photo and what it resolved to
#[derive(Debug, Clone, PartialEq)]
pub struct CameraScan {
    pub capture: ImageCapture,
    pub result: ScanResult,
}

#[derive(Debug, Clone)]
pub struct ScanFlow {
    acquisition: Arc<AcquisitionService>,
    resolver: Arc<Resolver>,
    delay: Duration,
}

impl ScanFlow {
    pub fn new(acquisition: Arc<AcquisitionService>, resolver: Arc<Resolver>, delay: Duration) -> Self {
        Self {
            acquisition,
            resolver,
            delay,
        }
    }

    /// Whether camera scans use the native camera
    pub fn native_camera(&self) -> bool {
        self.acquisition.is_supported()
    }

    pub fn reference_len(&self) -> usize {
        self.resolver.reference().len()
    }

    /// Take a photo, then resolve the barcode decoded from it
    pub async fn scan_camera(self) -> Result<CameraScan, AcquisitionError> {
        // Cancellation and failures go straight back to the screen
        let capture = self.acquisition.acquire().await?;

        // Give the user the "Scanning..." state before the answer lands
        self.simulate_latency().await;

        // The capture is kept for the preview, resolution gets its own copy
        let result = self.resolver.resolve(&ScanInput::Image(capture.clone()));
        info!("🔎 Camera scan: {} (found: {})", result.barcode, result.found);

        Ok(CameraScan { capture, result })
    }

    /// Resolve a typed code; `None` when the code is blank
    pub async fn scan_manual(self, code: String) -> Option<ScanResult> {
        // Blank input never reaches the resolver
        let input = ScanInput::manual(&code)?;
        self.simulate_latency().await;

        let result = self.resolver.resolve(&input);
        info!("🔎 Manual scan: {} (found: {})", result.barcode, result.found);

        Some(result)
    }

    async fn simulate_latency(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::picker::{FilePicker, FilePickerSource, PickerOptions};
    use crate::capture::test_png;
    use crate::scan::reference::ReferenceSet;
    use async_trait::async_trait;
    use std::path::PathBuf;

    struct FixedPicker(Option<PathBuf>);

    #[async_trait]
    impl FilePicker for FixedPicker {
        async fn pick_image(&self, _options: &PickerOptions) -> Option<PathBuf> {
            self.0.clone()
        }
    }

    fn flow_with(picked: Option<PathBuf>) -> ScanFlow {
        let acquisition = AcquisitionService::with_source(Box::new(FilePickerSource::new(FixedPicker(picked))));
        let resolver = Resolver::new(ReferenceSet::demo(), |_: &ImageCapture| "WH001234".to_string());
        ScanFlow::new(Arc::new(acquisition), Arc::new(resolver), Duration::ZERO)
    }

    #[tokio::test]
    async fn test_manual_scan() {
        let flow = flow_with(None);

        let hit = flow.clone().scan_manual(" WH005678 ".to_string()).await.unwrap();
        assert!(hit.found);
        assert_eq!(hit.customer_name.as_deref(), Some("Global Logistics Ltd"));

        assert_eq!(flow.clone().scan_manual("   ".to_string()).await, None);
    }

    #[tokio::test]
    async fn test_camera_scan_through_picker() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crate.png");
        std::fs::write(&path, test_png(4, 4, 99)).unwrap();

        let flow = flow_with(Some(path));
        assert!(!flow.native_camera());

        let scan = flow.scan_camera().await.unwrap();
        assert_eq!(scan.capture.dimensions(), (4, 4));
        assert!(scan.result.found);
        assert_eq!(scan.result.crate_id.as_deref(), Some("CR-001234"));
    }

    #[tokio::test]
    async fn test_camera_scan_cancelled() {
        let flow = flow_with(None);
        assert_eq!(flow.scan_camera().await, Err(AcquisitionError::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency_is_applied() {
        let mut flow = flow_with(None);
        flow.delay = Duration::from_millis(1500);

        let start = tokio::time::Instant::now();
        let result = flow.scan_manual("ZZ000000".to_string()).await.unwrap();

        assert!(!result.found);
        assert!(start.elapsed() >= Duration::from_millis(1500));
    }
}
