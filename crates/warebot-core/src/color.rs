//! RGB to HSV conversion and in-range thresholding.
//!
//! Hue uses the half-degree convention (0..=179) so calibration files written
//! against OpenCV tooling stay valid.

use crate::calib::ColorProfile;
use crate::image::{Frame, GrayImage, HsvImage};

/// Convert one RGB8 pixel to HSV8 with H in [0,179].
#[inline]
pub fn rgb_to_hsv(rgb: [u8; 3]) -> [u8; 3] {
    let r = rgb[0] as f32;
    let g = rgb[1] as f32;
    let b = rgb[2] as f32;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let v = max;
    let s = if max > 0.0 { 255.0 * delta / max } else { 0.0 };

    let h = if delta <= 0.0 {
        0.0
    } else if max == r {
        60.0 * (g - b) / delta
    } else if max == g {
        120.0 + 60.0 * (b - r) / delta
    } else {
        240.0 + 60.0 * (r - g) / delta
    };
    let h = if h < 0.0 { h + 360.0 } else { h };

    [
        (h / 2.0).round().min(179.0) as u8,
        s.round().min(255.0) as u8,
        v.round().min(255.0) as u8,
    ]
}

/// Convert a whole frame to HSV.
pub fn frame_to_hsv(frame: &Frame) -> HsvImage {
    let mut out = HsvImage::zeros(frame.width, frame.height);
    for y in 0..frame.height {
        for x in 0..frame.width {
            out.set_hsv(x, y, rgb_to_hsv(frame.rgb(x, y)));
        }
    }
    out
}

/// Luminance (Rec. 601) grayscale of a frame.
pub fn frame_to_gray(frame: &Frame) -> GrayImage {
    let mut out = GrayImage::zeros(frame.width, frame.height);
    for y in 0..frame.height {
        for x in 0..frame.width {
            let [r, g, b] = frame.rgb(x, y);
            let lum = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
            out.set(x, y, lum.round().min(255.0) as u8);
        }
    }
    out
}

/// Binary mask (255 inside, 0 outside) of pixels whose HSV value lies within
/// the profile bounds componentwise.
pub fn in_range(hsv: &HsvImage, profile: &ColorProfile) -> GrayImage {
    let mut out = GrayImage::zeros(hsv.width, hsv.height);
    let lo = profile.lower;
    let hi = profile.upper;
    for y in 0..hsv.height {
        for x in 0..hsv.width {
            let p = hsv.hsv(x, y);
            let inside = p[0] >= lo[0]
                && p[0] <= hi[0]
                && p[1] >= lo[1]
                && p[1] <= hi[1]
                && p[2] >= lo[2]
                && p[2] <= hi[2];
            if inside {
                out.set(x, y, 255);
            }
        }
    }
    out
}

/// Binary mask of grayscale pixels at or above `threshold`. Used by the wall
/// sub-detector to pick out bright wall surfaces.
pub fn gray_threshold(gray: &GrayImage, threshold: u8) -> GrayImage {
    let mut out = GrayImage::zeros(gray.width, gray.height);
    for (dst, src) in out.data.iter_mut().zip(gray.data.iter()) {
        if *src >= threshold {
            *dst = 255;
        }
    }
    out
}
