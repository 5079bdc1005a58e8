//! Calibration records and their on-disk formats.
//!
//! Three small text files, produced by offline calibration tools:
//!
//! * `color_thresholds.csv` — one row per category:
//!   `label,lowerH,lowerS,lowerV,upperH,upperS,upperV` (integers, H in 0..=179)
//! * `homography.csv` — header row, then three rows of three floats
//!   (row-major 3x3 ground homography)
//! * `focal_length.csv` — header row, then one row `label,focalLengthPixels`
//!
//! Loading happens once at startup and failures are fatal before any loop
//! spawns. The one exception is a *missing* homography file: ground-plane
//! ranging is then disabled and the affected registry slots stay empty, which
//! the state machine treats as "landmark not seen".

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::homography::GroundHomography;

/// Object category driving segmentation and ranging model selection.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum Category {
    Item,
    Shelf,
    Marker,
    Obstacle,
    Wall,
    Ramp,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Item,
        Category::Shelf,
        Category::Marker,
        Category::Obstacle,
        Category::Wall,
        Category::Ramp,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Category::Item => "item",
            Category::Shelf => "shelf",
            Category::Marker => "marker",
            Category::Obstacle => "obstacle",
            Category::Wall => "wall",
            Category::Ramp => "ramp",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.label().eq_ignore_ascii_case(s))
            .ok_or(())
    }
}

/// Inclusive HSV bounds for one category, OpenCV ranges.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ColorProfile {
    pub lower: [u8; 3],
    pub upper: [u8; 3],
}

#[derive(thiserror::Error, Debug)]
pub enum CalibrationError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("{path}:{line}: {reason}")]
    Malformed {
        path: String,
        line: usize,
        reason: String,
    },
    #[error("no color profile for category `{0}`")]
    MissingColor(Category),
}

/// Immutable calibration record for one run.
///
/// Passed by reference into every component that needs it; nothing in the
/// pipeline holds module-level calibration state.
#[derive(Clone, Debug)]
pub struct CalibrationData {
    colors: HashMap<Category, ColorProfile>,
    pub homography: Option<GroundHomography>,
    pub focal_length_px: f64,
}

impl CalibrationData {
    pub fn new(
        colors: HashMap<Category, ColorProfile>,
        homography: Option<GroundHomography>,
        focal_length_px: f64,
    ) -> Self {
        Self {
            colors,
            homography,
            focal_length_px,
        }
    }

    /// Load all calibration files from `dir`.
    ///
    /// A missing `homography.csv` disables ground-plane ranging; a malformed
    /// one is still an error.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self, CalibrationError> {
        let dir = dir.as_ref();
        let colors = load_color_thresholds(dir.join("color_thresholds.csv"))?;
        let focal_length_px = load_focal_length(dir.join("focal_length.csv"))?;

        let homography_path = dir.join("homography.csv");
        let homography = if homography_path.exists() {
            Some(load_homography(homography_path)?)
        } else {
            log::warn!("no homography.csv in {}; ground ranging disabled", dir.display());
            None
        };

        Ok(Self {
            colors,
            homography,
            focal_length_px,
        })
    }

    pub fn color_profile(&self, category: Category) -> Result<&ColorProfile, CalibrationError> {
        self.colors
            .get(&category)
            .ok_or(CalibrationError::MissingColor(category))
    }

    pub fn has_color_profile(&self, category: Category) -> bool {
        self.colors.contains_key(&category)
    }
}

fn malformed(path: &Path, line: usize, reason: impl Into<String>) -> CalibrationError {
    CalibrationError::Malformed {
        path: path.display().to_string(),
        line,
        reason: reason.into(),
    }
}

/// Parse the per-category HSV threshold table.
pub fn load_color_thresholds(
    path: impl AsRef<Path>,
) -> Result<HashMap<Category, ColorProfile>, CalibrationError> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)?;
    let mut out = HashMap::new();

    for (i, line) in raw.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() != 7 {
            return Err(malformed(path, i + 1, "expected 7 comma-separated fields"));
        }
        let category = Category::from_str(fields[0])
            .map_err(|_| malformed(path, i + 1, format!("unknown category `{}`", fields[0])))?;

        let mut vals = [0u8; 6];
        for (j, f) in fields[1..].iter().enumerate() {
            vals[j] = f
                .parse::<u8>()
                .map_err(|_| malformed(path, i + 1, format!("bad integer `{f}`")))?;
        }
        let profile = ColorProfile {
            lower: [vals[0], vals[1], vals[2]],
            upper: [vals[3], vals[4], vals[5]],
        };
        if profile.lower[0] > 179 || profile.upper[0] > 179 {
            return Err(malformed(path, i + 1, "hue bound exceeds 179"));
        }
        out.insert(category, profile);
    }

    if out.is_empty() {
        return Err(malformed(path, 1, "no color profiles found"));
    }
    Ok(out)
}

/// Write the threshold table in the same row format the loader accepts.
pub fn save_color_thresholds(
    path: impl AsRef<Path>,
    colors: &HashMap<Category, ColorProfile>,
) -> Result<(), CalibrationError> {
    let mut rows: Vec<(Category, &ColorProfile)> = colors.iter().map(|(c, p)| (*c, p)).collect();
    rows.sort_by_key(|(c, _)| c.label());
    let mut body = String::new();
    for (c, p) in rows {
        body.push_str(&format!(
            "{},{},{},{},{},{},{}\n",
            c.label(),
            p.lower[0],
            p.lower[1],
            p.lower[2],
            p.upper[0],
            p.upper[1],
            p.upper[2]
        ));
    }
    fs::write(path, body)?;
    Ok(())
}

/// Parse the ground homography file: header row, then a row-major 3x3 matrix.
pub fn load_homography(path: impl AsRef<Path>) -> Result<GroundHomography, CalibrationError> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)?;
    let mut rows = [[0.0f64; 3]; 3];
    let mut filled = 0usize;

    for (i, line) in raw.lines().enumerate().skip(1) {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if filled == 3 {
            return Err(malformed(path, i + 1, "more than 3 matrix rows"));
        }
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() != 3 {
            return Err(malformed(path, i + 1, "expected 3 comma-separated floats"));
        }
        for (j, f) in fields.iter().enumerate() {
            rows[filled][j] = f
                .parse::<f64>()
                .map_err(|_| malformed(path, i + 1, format!("bad float `{f}`")))?;
        }
        filled += 1;
    }

    if filled != 3 {
        return Err(malformed(path, filled + 1, "expected 3 matrix rows"));
    }
    Ok(GroundHomography::from_array(rows))
}

/// Write a homography file the loader round-trips within 1e-6.
pub fn save_homography(
    path: impl AsRef<Path>,
    h: &GroundHomography,
) -> Result<(), CalibrationError> {
    let rows = h.to_array();
    let mut body = String::from("h00,h01,h02\n");
    for r in rows {
        body.push_str(&format!("{:.9},{:.9},{:.9}\n", r[0], r[1], r[2]));
    }
    fs::write(path, body)?;
    Ok(())
}

/// Parse the focal length file: header row, then `label,focalLengthPixels`.
pub fn load_focal_length(path: impl AsRef<Path>) -> Result<f64, CalibrationError> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)?;

    for (i, line) in raw.lines().enumerate().skip(1) {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() != 2 {
            return Err(malformed(path, i + 1, "expected `label,focalLengthPixels`"));
        }
        let focal = fields[1]
            .parse::<f64>()
            .map_err(|_| malformed(path, i + 1, format!("bad float `{}`", fields[1])))?;
        if !focal.is_finite() || focal <= 0.0 {
            return Err(malformed(path, i + 1, "focal length must be positive"));
        }
        return Ok(focal);
    }
    Err(malformed(path, 2, "missing focal length row"))
}

/// Write a focal length file in the loader's format.
pub fn save_focal_length(
    path: impl AsRef<Path>,
    label: &str,
    focal_px: f64,
) -> Result<(), CalibrationError> {
    fs::write(
        path,
        format!("label,focalLengthPixels\n{label},{focal_px:.6}\n"),
    )?;
    Ok(())
}
