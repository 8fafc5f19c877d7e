use std::fs;
use std::path::Path;

use image::RgbImage;

use crate::errors::{PrepError, PrepResult};

/// Decode an image file of any supported format into a RGB 8-bit buffer.
pub fn load_image(path: impl AsRef<Path>) -> PrepResult<RgbImage> {
    let path = path.as_ref();
    let image = image::open(path)
        .map_err(|source| PrepError::ImageDecode { path: path.to_owned(), source })?
        .to_rgb8();
    debug!("Loaded {:?} ({}x{})", path, image.width(), image.height());
    Ok(image)
}

/// Read a class label file, one label per line. Blank trailing lines are
/// dropped so indices line up with the model output.
pub fn load_labels(path: impl AsRef<Path>) -> PrepResult<Vec<String>> {
    let content = fs::read_to_string(path.as_ref())?;
    let mut labels: Vec<String> = content.lines().map(|s| s.trim_end().to_string()).collect();
    while labels.last().is_some_and(|l| l.is_empty()) {
        labels.pop();
    }
    Ok(labels)
}
