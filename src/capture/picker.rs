/// File picker fallback
///
/// Used when there is no native camera: the user picks an existing image
/// file, which is read fully into memory and wrapped like a camera photo.

use std::path::PathBuf;

use async_trait::async_trait;
use rfd::AsyncFileDialog;
use tracing::info;

use super::{AcquisitionError, CaptureOrigin, ImageCapture, ImageSource};

/// Extensions offered by the picker (the `image/*` equivalent)
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "webp", "bmp", "tif", "tiff",
];

/// Camera hint for pickers that can open a camera directly
///
/// Desktop dialogs have no camera mode and ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureHint {
    /// Rear camera, pointed at the crate label
    Environment,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickerOptions {
    pub title: String,
    pub extensions: &'static [&'static str],
    pub capture_hint: CaptureHint,
}

impl Default for PickerOptions {
    fn default() -> Self {
        Self {
            title: "Select Barcode Photo".to_string(),
            extensions: IMAGE_EXTENSIONS,
            capture_hint: CaptureHint::Environment,
        }
    }
}

/// Something that lets the user choose one file
///
/// `None` means the dialog was dismissed without a choice.
#[async_trait]
pub trait FilePicker: Send + Sync {
    async fn pick_image(&self, options: &PickerOptions) -> Option<PathBuf>;
}

/// The native file dialog
#[derive(Debug, Clone, Copy, Default)]
pub struct DialogPicker;

#[async_trait]
impl FilePicker for DialogPicker {
    async fn pick_image(&self, options: &PickerOptions) -> Option<PathBuf> {
        AsyncFileDialog::new()
            .set_title(options.title.as_str())
            .add_filter("Images", options.extensions)
            .pick_file()
            .await
            .map(|handle| handle.path().to_path_buf())
    }
}

/// The file picker variant of `ImageSource`
pub struct FilePickerSource {
    picker: Box<dyn FilePicker>,
    options: PickerOptions,
}

impl FilePickerSource {
    pub fn new(picker: impl FilePicker + 'static) -> Self {
        Self {
            picker: Box::new(picker),
            options: PickerOptions::default(),
        }
    }
}

#[async_trait]
impl ImageSource for FilePickerSource {
    fn origin(&self) -> CaptureOrigin {
        CaptureOrigin::FilePicker
    }

    async fn acquire(&self) -> Result<ImageCapture, AcquisitionError> {
        // A dismissed dialog is a cancellation, never an empty payload
        let path = self
            .picker
            .pick_image(&self.options)
            .await
            .ok_or(AcquisitionError::Cancelled)?;

        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|e| AcquisitionError::from_io(&path, &e))?;

        // A directory is not a usable selection
        if !metadata.is_file() {
            return Err(AcquisitionError::NoSelection(format!(
                "{} is not a file",
                path.display()
            )));
        }

        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| AcquisitionError::from_io(&path, &e))?;

        info!("🖼️  Read {} ({} bytes)", path.display(), bytes.len());

        ImageCapture::from_bytes(bytes, CaptureOrigin::FilePicker)
    }
}
