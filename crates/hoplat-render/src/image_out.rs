use image::{ImageError, ImageFormat, RgbImage};
use std::fs;
use std::path::Path;

/// Saves the chart as PNG regardless of the path's extension, creating parent directories.
pub fn write_png(path: &Path, image: &RgbImage) -> Result<(), ImageError> {
    if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(ImageError::IoError)?;
    }
    image.save_with_format(path, ImageFormat::Png)
}
