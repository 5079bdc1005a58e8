//! Loading captured frames from image files for offline runs.

use std::path::Path;

use warebot_core::Frame;

#[derive(thiserror::Error, Debug)]
pub enum ImageIoError {
    #[error("failed to read frame {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: image::ImageError,
    },
}

/// Decode an image file into an RGB8 [`Frame`].
pub fn load_frame(path: impl AsRef<Path>) -> Result<Frame, ImageIoError> {
    let path = path.as_ref();
    let img = image::open(path)
        .map_err(|source| ImageIoError::Decode {
            path: path.display().to_string(),
            source,
        })?
        .to_rgb8();
    Ok(frame_from_rgb(&img))
}

/// Wrap a decoded `image::RgbImage` buffer as a [`Frame`].
pub fn frame_from_rgb(img: &image::RgbImage) -> Frame {
    Frame::new(
        img.width() as usize,
        img.height() as usize,
        img.as_raw().clone(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_a_png() {
        let mut img = image::RgbImage::new(8, 4);
        img.put_pixel(3, 2, image::Rgb([10, 200, 30]));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        img.save(&path).unwrap();

        let frame = load_frame(&path).unwrap();
        assert_eq!(frame.width, 8);
        assert_eq!(frame.height, 4);
        assert_eq!(frame.rgb(3, 2), [10, 200, 30]);
        assert_eq!(frame.rgb(0, 0), [0, 0, 0]);
    }
}
