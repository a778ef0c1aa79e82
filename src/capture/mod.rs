/// Image acquisition module
///
/// This module obtains a single still image for the scanner:
/// - From the native camera when the platform has one (native.rs)
/// - From a file picker dialog otherwise (picker.rs)
///
/// Both variants implement `ImageSource` and produce the same
/// `ImageCapture`, so the rest of the app never knows where an image came from.

pub mod data_uri;
pub mod error;
pub mod native;
pub mod picker;

use std::io::Cursor;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use image::ImageReader;
use tokio::sync::Mutex;
use tracing::{info, warn};

pub use error::AcquisitionError;
use native::NativeCamera;
use picker::{DialogPicker, FilePickerSource};

/// Where an image came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOrigin {
    NativeCamera,
    FilePicker,
}

impl CaptureOrigin {
    pub fn label(&self) -> &'static str {
        match self {
            CaptureOrigin::NativeCamera => "Native camera",
            CaptureOrigin::FilePicker => "File picker fallback",
        }
    }
}

/// A single acquired still image
///
/// Created by one `acquire()` call, handed to resolution, then dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageCapture {
    bytes: Vec<u8>,
    mime: &'static str,
    width: u32,
    height: u32,
    origin: CaptureOrigin,
    captured_at: DateTime<Utc>,
}

impl ImageCapture {
    /// Wrap raw image bytes, sniffing the format and reading the header
    ///
    /// Only the header is parsed, so this stays cheap enough for the async
    /// executor even for full-size photos.
    pub fn from_bytes(bytes: Vec<u8>, origin: CaptureOrigin) -> Result<Self, AcquisitionError> {
        if bytes.is_empty() {
            return Err(AcquisitionError::EmptyImage);
        }

        let format = image::guess_format(&bytes)
            .map_err(|e| AcquisitionError::UnsupportedFormat(e.to_string()))?;

        let (width, height) = ImageReader::with_format(Cursor::new(&bytes), format)
            .into_dimensions()
            .map_err(|e| AcquisitionError::UnsupportedFormat(e.to_string()))?;

        Ok(Self {
            mime: format.to_mime_type(),
            width,
            height,
            bytes,
            origin,
            captured_at: Utc::now(),
        })
    }

    /// Build a capture from a `data:` URI handed back by a camera
    pub fn from_data_uri(uri: &str, origin: CaptureOrigin) -> Result<Self, AcquisitionError> {
        let (declared_mime, bytes) = data_uri::decode(uri)?;
        let capture = Self::from_bytes(bytes, origin)?;

        if declared_mime != capture.mime {
            warn!(
                "Camera declared {} but payload is {}, trusting the payload",
                declared_mime, capture.mime
            );
        }

        Ok(capture)
    }

    /// The self-contained `data:` URI encoding of this image
    pub fn to_data_uri(&self) -> String {
        data_uri::encode(self.mime, &self.bytes)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime(&self) -> &'static str {
        self.mime
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn origin(&self) -> CaptureOrigin {
        self.origin
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }
}

/// One way of obtaining a still image
#[async_trait]
pub trait ImageSource: Send + Sync {
    /// Which variant this is
    fn origin(&self) -> CaptureOrigin;

    /// Obtain exactly one image, or fail with a distinguishable error
    async fn acquire(&self) -> Result<ImageCapture, AcquisitionError>;
}

/// Entry point the UI talks to for images
///
/// The source variant is picked once, at construction, from the
/// camera capability check. Only one acquisition may be outstanding at a time.
pub struct AcquisitionService {
    source: Box<dyn ImageSource>,
    native_supported: bool,
    in_flight: Mutex<()>,
}

impl AcquisitionService {
    /// Check the platform camera and pick the matching source
    pub fn new() -> Self {
        Self::from_detected(NativeCamera::detect())
    }

    /// Native camera when one was detected, the file dialog otherwise
    pub fn from_detected(camera: Option<NativeCamera>) -> Self {
        let source: Box<dyn ImageSource> = match camera {
            Some(camera) => Box::new(camera),
            None => Box::new(FilePickerSource::new(DialogPicker)),
        };

        Self::with_source(source)
    }

    /// Use an explicit source
    pub fn with_source(source: Box<dyn ImageSource>) -> Self {
        let native_supported = source.origin() == CaptureOrigin::NativeCamera;
        info!("📷 Image acquisition via {}", source.origin().label());

        Self {
            source,
            native_supported,
            in_flight: Mutex::new(()),
        }
    }

    /// Whether native camera capture is in use
    pub fn is_supported(&self) -> bool {
        self.native_supported
    }

    /// Obtain a single image from the selected source
    pub async fn acquire(&self) -> Result<ImageCapture, AcquisitionError> {
        let _guard = self.in_flight.try_lock().map_err(|_| {
            warn!("⚠️  acquire() called while another acquisition is pending");
            AcquisitionError::Busy
        })?;

        match self.source.acquire().await {
            Ok(capture) => {
                let (width, height) = capture.dimensions();
                info!(
                    "📸 Acquired {}x{} {} ({} bytes)",
                    width,
                    height,
                    capture.mime(),
                    capture.bytes().len()
                );
                Ok(capture)
            }
            Err(e) if e.is_cancellation() => {
                info!("Acquisition cancelled");
                Err(e)
            }
            Err(e) => {
                warn!("⚠️  Acquisition failed: {}", e);
                Err(e)
            }
        }
    }
}

impl Default for AcquisitionService {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AcquisitionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AcquisitionService")
            .field("origin", &self.source.origin())
            .field("native_supported", &self.native_supported)
            .finish()
    }
}

/// Encode a solid-colour PNG for tests
#[cfg(test)]
pub(crate) fn test_png(width: u32, height: u32, shade: u8) -> Vec<u8> {
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

    let img = RgbImage::from_pixel(width, height, Rgb([shade, shade, shade]));
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::native::{CameraDevice, PhotoOptions};
    use std::sync::Arc;
    use tokio::sync::Notify;

    /// Camera that always hands back the same PNG
    struct StillCamera(Vec<u8>);

    #[async_trait]
    impl CameraDevice for StillCamera {
        fn name(&self) -> String {
            "still".to_string()
        }

        fn is_available(&self) -> bool {
            true
        }

        async fn get_photo(&self, _options: &PhotoOptions) -> Result<String, AcquisitionError> {
            Ok(data_uri::encode("image/png", &self.0))
        }
    }

    /// Source that returns a fixed PNG, optionally after a gate opens
    struct FakeSource {
        origin: CaptureOrigin,
        started: Arc<Notify>,
        release: Option<Arc<Notify>>,
        result: Result<Vec<u8>, AcquisitionError>,
    }

    impl FakeSource {
        fn returning(result: Result<Vec<u8>, AcquisitionError>) -> Self {
            Self {
                origin: CaptureOrigin::FilePicker,
                started: Arc::new(Notify::new()),
                release: None,
                result,
            }
        }
    }

    #[async_trait]
    impl ImageSource for FakeSource {
        fn origin(&self) -> CaptureOrigin {
            self.origin
        }

        async fn acquire(&self) -> Result<ImageCapture, AcquisitionError> {
            self.started.notify_one();
            if let Some(release) = &self.release {
                release.notified().await;
            }
            let bytes = self.result.clone()?;
            ImageCapture::from_bytes(bytes, self.origin)
        }
    }

    #[test]
    fn test_from_bytes_sniffs_png() {
        let capture = ImageCapture::from_bytes(test_png(4, 3, 10), CaptureOrigin::FilePicker).unwrap();
        assert_eq!(capture.mime(), "image/png");
        assert_eq!(capture.dimensions(), (4, 3));
        assert!(capture.to_data_uri().starts_with("data:image/png;base64,iVBORw0KGgo"));
    }

    #[test]
    fn test_from_bytes_rejects_garbage_and_empty() {
        assert_eq!(
            ImageCapture::from_bytes(Vec::new(), CaptureOrigin::FilePicker),
            Err(AcquisitionError::EmptyImage)
        );
        assert!(matches!(
            ImageCapture::from_bytes(b"just some text".to_vec(), CaptureOrigin::FilePicker),
            Err(AcquisitionError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_from_bytes_rejects_broken_header() {
        // PNG signature with the IHDR chunk cut off
        let png = test_png(4, 3, 10);
        assert!(matches!(
            ImageCapture::from_bytes(png[..12].to_vec(), CaptureOrigin::FilePicker),
            Err(AcquisitionError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_data_uri_is_source_agnostic() {
        let png = test_png(2, 2, 200);
        let native = ImageCapture::from_bytes(png.clone(), CaptureOrigin::NativeCamera).unwrap();
        let picked = ImageCapture::from_bytes(png, CaptureOrigin::FilePicker).unwrap();
        assert_eq!(native.to_data_uri(), picked.to_data_uri());

        let reparsed =
            ImageCapture::from_data_uri(&native.to_data_uri(), CaptureOrigin::NativeCamera).unwrap();
        assert_eq!(reparsed.bytes(), native.bytes());
    }

    #[test]
    fn test_capability_follows_source() {
        let service = AcquisitionService::with_source(Box::new(FakeSource::returning(Ok(test_png(1, 1, 0)))));
        assert!(!service.is_supported());

        let mut native = FakeSource::returning(Ok(test_png(1, 1, 0)));
        native.origin = CaptureOrigin::NativeCamera;
        let service = AcquisitionService::with_source(Box::new(native));
        assert!(service.is_supported());
        assert!(service.is_supported());
    }

    #[test]
    fn test_no_camera_selects_file_picker() {
        let service = AcquisitionService::from_detected(None);
        assert!(!service.is_supported());
        assert_eq!(service.source.origin(), CaptureOrigin::FilePicker);
    }

    #[tokio::test]
    async fn test_detected_camera_selects_native() {
        let camera = NativeCamera::new(Arc::new(StillCamera(test_png(3, 2, 40))));
        let service = AcquisitionService::from_detected(Some(camera));
        assert!(service.is_supported());

        let capture = service.acquire().await.unwrap();
        assert_eq!(capture.origin(), CaptureOrigin::NativeCamera);
        assert_eq!(capture.dimensions(), (3, 2));
    }

    #[test]
    fn test_new_agrees_with_capability_check() {
        let service = AcquisitionService::new();
        assert_eq!(service.is_supported(), native::native_capture_supported());
    }

    #[tokio::test]
    async fn test_cancel_is_an_error_not_empty_payload() {
        let service =
            AcquisitionService::with_source(Box::new(FakeSource::returning(Err(AcquisitionError::Cancelled))));
        let result = service.acquire().await;
        assert_eq!(result, Err(AcquisitionError::Cancelled));
    }

    #[tokio::test]
    async fn test_sequential_acquisitions_are_independent() {
        let service =
            AcquisitionService::with_source(Box::new(FakeSource::returning(Ok(test_png(3, 3, 50)))));

        let first = service.acquire().await.unwrap();
        let second = service.acquire().await.unwrap();

        assert_eq!(first.bytes(), second.bytes());
        assert!(second.captured_at() >= first.captured_at());
    }

    #[tokio::test]
    async fn test_overlapping_acquire_is_busy() {
        let release = Arc::new(Notify::new());
        let mut source = FakeSource::returning(Ok(test_png(2, 2, 0)));
        source.release = Some(release.clone());
        let started = source.started.clone();

        let service = Arc::new(AcquisitionService::with_source(Box::new(source)));

        let pending = {
            let service = service.clone();
            tokio::spawn(async move { service.acquire().await })
        };

        started.notified().await;
        assert_eq!(service.acquire().await, Err(AcquisitionError::Busy));

        release.notify_one();
        let first = pending.await.unwrap();
        assert!(first.is_ok());

        // Guard released once the first call resolved
        release.notify_one();
        assert!(service.acquire().await.is_ok());
    }
}
