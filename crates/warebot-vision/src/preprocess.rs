//! Frame preparation: optional downscale, Gaussian blur, colour conversions.

use warebot_core::{frame_to_gray, frame_to_hsv, Frame, GrayImage, HsvImage};

use crate::params::PreprocessParams;

/// A frame ready for segmentation: scaled/blurred RGB plus HSV and grayscale
/// conversions computed once per cycle.
#[derive(Clone, Debug)]
pub struct PreparedFrame {
    pub rgb: Frame,
    pub hsv: HsvImage,
    pub gray: GrayImage,
}

impl PreparedFrame {
    #[inline]
    pub fn width(&self) -> usize {
        self.rgb.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.rgb.height
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Preprocessor {
    params: PreprocessParams,
}

impl Preprocessor {
    pub fn new(params: PreprocessParams) -> Self {
        Self { params }
    }

    pub fn prepare(&self, frame: &Frame) -> PreparedFrame {
        let mut rgb = if self.params.scale < 1.0 {
            downscale(frame, self.params.scale)
        } else {
            frame.clone()
        };
        if self.params.blur_kernel >= 3 {
            rgb = gaussian_blur(&rgb, self.params.blur_kernel);
        }
        let hsv = frame_to_hsv(&rgb);
        let gray = frame_to_gray(&rgb);
        PreparedFrame { rgb, hsv, gray }
    }
}

/// Bilinear downscale of an RGB frame.
pub fn downscale(frame: &Frame, scale: f32) -> Frame {
    let out_w = ((frame.width as f32 * scale).round() as usize).max(1);
    let out_h = ((frame.height as f32 * scale).round() as usize).max(1);
    let mut out = Frame::filled(out_w, out_h, [0, 0, 0]);
    out.captured_at = frame.captured_at;

    let sx = frame.width as f32 / out_w as f32;
    let sy = frame.height as f32 / out_h as f32;
    for y in 0..out_h {
        for x in 0..out_w {
            let fx = ((x as f32 + 0.5) * sx - 0.5).max(0.0);
            let fy = ((y as f32 + 0.5) * sy - 0.5).max(0.0);
            let x0 = (fx as usize).min(frame.width - 1);
            let y0 = (fy as usize).min(frame.height - 1);
            let x1 = (x0 + 1).min(frame.width - 1);
            let y1 = (y0 + 1).min(frame.height - 1);
            let tx = fx - x0 as f32;
            let ty = fy - y0 as f32;

            let mut rgb = [0u8; 3];
            for c in 0..3 {
                let p00 = frame.rgb(x0, y0)[c] as f32;
                let p10 = frame.rgb(x1, y0)[c] as f32;
                let p01 = frame.rgb(x0, y1)[c] as f32;
                let p11 = frame.rgb(x1, y1)[c] as f32;
                let a = p00 + tx * (p10 - p00);
                let b = p01 + tx * (p11 - p01);
                rgb[c] = (a + ty * (b - a)).round().clamp(0.0, 255.0) as u8;
            }
            out.set_rgb(x, y, rgb);
        }
    }
    out
}

/// Separable Gaussian blur; `kernel` must be odd (3 or 5 in practice).
pub fn gaussian_blur(frame: &Frame, kernel: usize) -> Frame {
    let weights: Vec<f32> = match kernel {
        3 => vec![1.0, 2.0, 1.0],
        5 => vec![1.0, 4.0, 6.0, 4.0, 1.0],
        _ => binomial_row(kernel),
    };
    let norm: f32 = weights.iter().sum();
    let r = (kernel / 2) as i32;

    let w = frame.width;
    let h = frame.height;
    let mut tmp = frame.clone();

    // horizontal pass
    for y in 0..h {
        for x in 0..w {
            let mut acc = [0.0f32; 3];
            for (k, wt) in weights.iter().enumerate() {
                let sx = (x as i32 + k as i32 - r).clamp(0, w as i32 - 1) as usize;
                let p = frame.rgb(sx, y);
                for c in 0..3 {
                    acc[c] += p[c] as f32 * wt;
                }
            }
            tmp.set_rgb(x, y, acc.map(|v| (v / norm).round() as u8));
        }
    }

    // vertical pass
    let mut out = tmp.clone();
    for y in 0..h {
        for x in 0..w {
            let mut acc = [0.0f32; 3];
            for (k, wt) in weights.iter().enumerate() {
                let sy = (y as i32 + k as i32 - r).clamp(0, h as i32 - 1) as usize;
                let p = tmp.rgb(x, sy);
                for c in 0..3 {
                    acc[c] += p[c] as f32 * wt;
                }
            }
            out.set_rgb(x, y, acc.map(|v| (v / norm).round() as u8));
        }
    }
    out
}

fn binomial_row(n: usize) -> Vec<f32> {
    let mut row = vec![1.0f32];
    for _ in 1..n {
        let mut next = vec![1.0f32; row.len() + 1];
        for i in 1..row.len() {
            next[i] = row[i - 1] + row[i];
        }
        row = next;
    }
    row
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downscale_halves_dimensions() {
        let f = Frame::filled(64, 48, [100, 150, 200]);
        let s = downscale(&f, 0.5);
        assert_eq!((s.width, s.height), (32, 24));
        assert_eq!(s.rgb(10, 10), [100, 150, 200]);
    }

    #[test]
    fn blur_preserves_flat_regions() {
        let f = Frame::filled(16, 16, [42, 42, 42]);
        let b = gaussian_blur(&f, 5);
        assert_eq!(b.rgb(8, 8), [42, 42, 42]);
        assert_eq!(b.rgb(0, 0), [42, 42, 42]);
    }

    #[test]
    fn blur_smooths_an_edge() {
        let mut f = Frame::filled(16, 1, [0, 0, 0]);
        for x in 8..16 {
            f.set_rgb(x, 0, [255, 255, 255]);
        }
        let b = gaussian_blur(&f, 5);
        let v = b.rgb(8, 0)[0];
        assert!(v > 0 && v < 255);
    }

    #[test]
    fn prepare_produces_matching_planes() {
        let pre = Preprocessor::new(PreprocessParams {
            scale: 0.5,
            blur_kernel: 5,
        });
        let frame = Frame::filled(40, 30, [0, 200, 0]);
        let prepared = pre.prepare(&frame);
        assert_eq!((prepared.width(), prepared.height()), (20, 15));
        assert_eq!(prepared.hsv.width, 20);
        assert_eq!(prepared.gray.height, 15);
    }
}
