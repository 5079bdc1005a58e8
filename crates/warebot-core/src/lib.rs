//! Core image, geometry and calibration building blocks for the warebot
//! perception pipeline.
//!
//! This crate is deliberately free of any camera, actuator or threading
//! concerns: it provides buffers, masks, contours and the calibration record
//! that the higher-level crates compose into the per-frame pipeline.

mod calib;
mod color;
mod contour;
mod homography;
mod image;
mod logger;
pub mod mask;

pub use calib::{
    load_color_thresholds, load_focal_length, load_homography, save_color_thresholds,
    save_focal_length, save_homography, CalibrationData, CalibrationError, Category, ColorProfile,
};
pub use color::{frame_to_gray, frame_to_hsv, gray_threshold, in_range, rgb_to_hsv};
pub use contour::{approx_polygon_closed, find_external_contours, BoundingBox, Contour};
pub use homography::GroundHomography;
pub use image::{Frame, GrayImage, HsvImage};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;
pub use logger::init_with_level;
