//! Binary mask morphology and raster fill.
//!
//! Masks are `GrayImage`s holding 0 or 255. The morphological pair used by the
//! segmenter (open then close, 5x5 square element) removes speckle noise and
//! fills small gaps before contour extraction.

use nalgebra::Point2;

use crate::image::GrayImage;

/// Erode with a square structuring element of side `kernel` (odd).
pub fn erode(mask: &GrayImage, kernel: usize) -> GrayImage {
    morph(mask, kernel, true)
}

/// Dilate with a square structuring element of side `kernel` (odd).
pub fn dilate(mask: &GrayImage, kernel: usize) -> GrayImage {
    morph(mask, kernel, false)
}

/// Erosion followed by dilation. Drops blobs smaller than the element.
pub fn open(mask: &GrayImage, kernel: usize) -> GrayImage {
    dilate(&erode(mask, kernel), kernel)
}

/// Dilation followed by erosion. Bridges gaps smaller than the element.
pub fn close(mask: &GrayImage, kernel: usize) -> GrayImage {
    erode(&dilate(mask, kernel), kernel)
}

fn morph(mask: &GrayImage, kernel: usize, is_erode: bool) -> GrayImage {
    debug_assert!(kernel % 2 == 1, "kernel side must be odd");
    let r = (kernel / 2) as i32;
    let mut out = GrayImage::zeros(mask.width, mask.height);

    for y in 0..mask.height as i32 {
        for x in 0..mask.width as i32 {
            // erode: pixel survives only if the whole window is foreground;
            // dilate: pixel lights up if any window pixel is foreground.
            let mut keep = is_erode;
            'win: for dy in -r..=r {
                for dx in -r..=r {
                    let fg = mask.at_i32(x + dx, y + dy) != 0;
                    if is_erode && !fg {
                        keep = false;
                        break 'win;
                    }
                    if !is_erode && fg {
                        keep = true;
                        break 'win;
                    }
                }
            }
            if keep {
                out.set(x as usize, y as usize, 255);
            }
        }
    }
    out
}

/// Elementwise logical AND of two same-sized masks.
pub fn and(a: &GrayImage, b: &GrayImage) -> GrayImage {
    debug_assert_eq!((a.width, a.height), (b.width, b.height));
    let mut out = GrayImage::zeros(a.width, a.height);
    for (dst, (pa, pb)) in out.data.iter_mut().zip(a.data.iter().zip(b.data.iter())) {
        if *pa != 0 && *pb != 0 {
            *dst = 255;
        }
    }
    out
}

/// Rasterize a closed polygon into `mask` as solid foreground (scanline fill,
/// even-odd rule). Used to turn wall contours into a filled gating region.
pub fn fill_polygon(mask: &mut GrayImage, polygon: &[Point2<f32>]) {
    if polygon.len() < 3 {
        return;
    }
    let min_y = polygon.iter().map(|p| p.y).fold(f32::INFINITY, f32::min);
    let max_y = polygon
        .iter()
        .map(|p| p.y)
        .fold(f32::NEG_INFINITY, f32::max);
    let y0 = min_y.floor().max(0.0) as usize;
    let y1 = (max_y.ceil() as i64).min(mask.height as i64 - 1).max(0) as usize;

    let mut xs: Vec<f32> = Vec::new();
    for y in y0..=y1 {
        let yc = y as f32 + 0.5;
        xs.clear();
        for i in 0..polygon.len() {
            let a = polygon[i];
            let b = polygon[(i + 1) % polygon.len()];
            if (a.y <= yc && b.y > yc) || (b.y <= yc && a.y > yc) {
                let t = (yc - a.y) / (b.y - a.y);
                xs.push(a.x + t * (b.x - a.x));
            }
        }
        xs.sort_by(|p, q| p.partial_cmp(q).unwrap_or(std::cmp::Ordering::Equal));
        for pair in xs.chunks_exact(2) {
            if pair[1] < 0.0 || pair[0] > (mask.width - 1) as f32 {
                continue;
            }
            let x0 = pair[0].ceil().max(0.0) as usize;
            let x1 = pair[1].floor().min((mask.width - 1) as f32) as usize;
            for x in x0..=x1 {
                mask.set(x, y, 255);
            }
        }
    }
}
