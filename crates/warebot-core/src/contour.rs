//! External-boundary contour extraction and derived shape metrics.
//!
//! Contours are traced with Moore-neighbour border following (8-connectivity,
//! clockwise in image coordinates), one boundary per connected component, so
//! interior holes are never reported.

use nalgebra::Point2;

use crate::image::GrayImage;

/// Axis-aligned bounding box in pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl BoundingBox {
    #[inline]
    pub fn area(&self) -> f32 {
        self.w * self.h
    }

    /// Horizontal centre of the box.
    #[inline]
    pub fn center_x(&self) -> f32 {
        self.x + self.w / 2.0
    }

    /// Midpoint of the bottom edge; the point assumed to touch the ground.
    #[inline]
    pub fn bottom_center(&self) -> Point2<f32> {
        Point2::new(self.x + self.w / 2.0, self.y + self.h)
    }
}

/// Closed boundary of one connected foreground region.
#[derive(Clone, Debug)]
pub struct Contour {
    pub points: Vec<Point2<f32>>,
}

impl Contour {
    /// Shoelace area of the closed boundary polygon.
    pub fn area(&self) -> f32 {
        polygon_area(&self.points)
    }

    /// Closed polygon arc length.
    pub fn perimeter(&self) -> f32 {
        if self.points.len() < 2 {
            return 0.0;
        }
        let mut p = 0.0;
        for i in 0..self.points.len() {
            let a = self.points[i];
            let b = self.points[(i + 1) % self.points.len()];
            p += (b - a).norm();
        }
        p
    }

    pub fn bounding_box(&self) -> BoundingBox {
        let mut min_x = f32::INFINITY;
        let mut min_y = f32::INFINITY;
        let mut max_x = f32::NEG_INFINITY;
        let mut max_y = f32::NEG_INFINITY;
        for p in &self.points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        if self.points.is_empty() {
            return BoundingBox {
                x: 0.0,
                y: 0.0,
                w: 0.0,
                h: 0.0,
            };
        }
        BoundingBox {
            x: min_x,
            y: min_y,
            // +1 so a single pixel spans one pixel, matching raster extent
            w: max_x - min_x + 1.0,
            h: max_y - min_y + 1.0,
        }
    }

    /// Width over height of the bounding box; 0 for a degenerate box.
    pub fn aspect_ratio(&self) -> f32 {
        let bb = self.bounding_box();
        if bb.h <= 0.0 {
            return 0.0;
        }
        bb.w / bb.h
    }

    /// 4*pi*area / perimeter^2; 1.0 for an ideal circle, 0 when degenerate.
    pub fn circularity(&self) -> f32 {
        let p = self.perimeter();
        if p <= 0.0 {
            return 0.0;
        }
        4.0 * std::f32::consts::PI * self.area() / (p * p)
    }

    /// Convex hull of the boundary points (monotone chain, CCW).
    pub fn convex_hull(&self) -> Vec<Point2<f32>> {
        convex_hull(&self.points)
    }

    /// Contour area over hull area; 0 when the hull is degenerate.
    pub fn solidity(&self) -> f32 {
        let hull_area = polygon_area(&self.convex_hull());
        if hull_area <= 0.0 {
            return 0.0;
        }
        self.area() / hull_area
    }

    /// Contour area over bounding-box area; 0 when the box is degenerate.
    pub fn fill_ratio(&self) -> f32 {
        let bb = self.bounding_box();
        if bb.area() <= 0.0 {
            return 0.0;
        }
        self.area() / bb.area()
    }

    /// Reduced-vertex closed polygon (Douglas-Peucker with tolerance
    /// `epsilon`, in pixels).
    pub fn approx_polygon(&self, epsilon: f32) -> Vec<Point2<f32>> {
        approx_polygon_closed(&self.points, epsilon)
    }
}

fn polygon_area(points: &[Point2<f32>]) -> f32 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut twice = 0.0;
    for i in 0..points.len() {
        let a = points[i];
        let b = points[(i + 1) % points.len()];
        twice += a.x * b.y - b.x * a.y;
    }
    twice.abs() / 2.0
}

fn cross(o: Point2<f32>, a: Point2<f32>, b: Point2<f32>) -> f32 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

fn convex_hull(points: &[Point2<f32>]) -> Vec<Point2<f32>> {
    if points.len() < 3 {
        return points.to_vec();
    }
    let mut pts = points.to_vec();
    pts.sort_by(|a, b| {
        a.x.partial_cmp(&b.x)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.y.partial_cmp(&b.y).unwrap_or(std::cmp::Ordering::Equal))
    });
    pts.dedup_by(|a, b| a == b);
    if pts.len() < 3 {
        return pts;
    }

    let mut hull: Vec<Point2<f32>> = Vec::with_capacity(pts.len() + 1);
    for &p in &pts {
        while hull.len() >= 2 && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0 {
            hull.pop();
        }
        hull.push(p);
    }
    let lower_len = hull.len() + 1;
    for &p in pts.iter().rev().skip(1) {
        while hull.len() >= lower_len && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0
        {
            hull.pop();
        }
        hull.push(p);
    }
    hull.pop();
    hull
}

fn point_segment_distance(p: Point2<f32>, a: Point2<f32>, b: Point2<f32>) -> f32 {
    let ab = b - a;
    let len2 = ab.norm_squared();
    if len2 <= f32::EPSILON {
        return (p - a).norm();
    }
    let t = ((p - a).dot(&ab) / len2).clamp(0.0, 1.0);
    (p - (a + ab * t)).norm()
}

fn douglas_peucker(points: &[Point2<f32>], epsilon: f32, out: &mut Vec<Point2<f32>>) {
    if points.len() < 3 {
        out.extend_from_slice(&points[..points.len().saturating_sub(1)]);
        return;
    }
    let first = points[0];
    let last = points[points.len() - 1];
    let mut max_d = 0.0;
    let mut max_i = 0;
    for (i, &p) in points.iter().enumerate().skip(1).take(points.len() - 2) {
        let d = point_segment_distance(p, first, last);
        if d > max_d {
            max_d = d;
            max_i = i;
        }
    }
    if max_d > epsilon {
        douglas_peucker(&points[..=max_i], epsilon, out);
        douglas_peucker(&points[max_i..], epsilon, out);
    } else {
        out.push(first);
    }
}

/// Closed-polygon simplification: split at the two mutually farthest anchor
/// points, simplify both open chains, rejoin.
pub fn approx_polygon_closed(points: &[Point2<f32>], epsilon: f32) -> Vec<Point2<f32>> {
    if points.len() < 4 {
        return points.to_vec();
    }
    let anchor = 0;
    let mut far = 0;
    let mut far_d = 0.0;
    for (i, p) in points.iter().enumerate() {
        let d = (p - points[anchor]).norm_squared();
        if d > far_d {
            far_d = d;
            far = i;
        }
    }
    if far == 0 {
        return vec![points[0]];
    }

    // Each open chain contributes its vertices excluding the final endpoint,
    // so joining the two halves yields a closed polygon without duplicates.
    let mut wrap_half: Vec<Point2<f32>> = points[far..].to_vec();
    wrap_half.push(points[anchor]);

    let mut out = Vec::new();
    douglas_peucker(&points[anchor..=far], epsilon, &mut out);
    douglas_peucker(&wrap_half, epsilon, &mut out);
    out
}

// Moore neighbourhood, clockwise in image coordinates (y grows downward):
// E, SE, S, SW, W, NW, N, NE.
const NEIGHBORS: [(i32, i32); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

/// Trace the external boundaries of all connected components in `mask`.
///
/// Components are discovered in raster order, so the returned contour order is
/// deterministic for a given mask.
pub fn find_external_contours(mask: &GrayImage) -> Vec<Contour> {
    let mut labels = vec![false; mask.width * mask.height];
    let mut contours = Vec::new();

    for y in 0..mask.height {
        for x in 0..mask.width {
            let idx = y * mask.width + x;
            if mask.data[idx] == 0 || labels[idx] {
                continue;
            }
            // First raster hit of a component is its topmost-leftmost pixel.
            flood_label(mask, x, y, &mut labels);
            contours.push(trace_boundary(mask, (x as i32, y as i32)));
        }
    }
    contours
}

fn flood_label(mask: &GrayImage, x: usize, y: usize, labels: &mut [bool]) {
    let mut stack = vec![(x as i32, y as i32)];
    labels[y * mask.width + x] = true;
    while let Some((cx, cy)) = stack.pop() {
        for (dx, dy) in NEIGHBORS {
            let nx = cx + dx;
            let ny = cy + dy;
            if nx < 0 || ny < 0 || nx >= mask.width as i32 || ny >= mask.height as i32 {
                continue;
            }
            let nidx = ny as usize * mask.width + nx as usize;
            if mask.data[nidx] != 0 && !labels[nidx] {
                labels[nidx] = true;
                stack.push((nx, ny));
            }
        }
    }
}

fn trace_boundary(mask: &GrayImage, start: (i32, i32)) -> Contour {
    let fg = |p: (i32, i32)| mask.at_i32(p.0, p.1) != 0;

    let mut points = vec![Point2::new(start.0 as f32, start.1 as f32)];
    let mut cur = start;
    // Start scanning at NW: everything above and left of the raster-first
    // pixel is background.
    let mut scan_start = 5usize;
    let mut first_move: Option<((i32, i32), (i32, i32))> = None;
    let step_cap = 4 * mask.width * mask.height;

    for _ in 0..step_cap {
        let mut found = None;
        for i in 0..8 {
            let d = (scan_start + i) % 8;
            let n = (cur.0 + NEIGHBORS[d].0, cur.1 + NEIGHBORS[d].1);
            if fg(n) {
                found = Some((n, d));
                break;
            }
        }
        let Some((next, dir)) = found else {
            break; // isolated pixel
        };
        match first_move {
            Some(fm) if fm == (cur, next) => break, // closed the loop
            None => first_move = Some((cur, next)),
            _ => {}
        }
        if next != start {
            points.push(Point2::new(next.0 as f32, next.1 as f32));
        }
        cur = next;
        scan_start = (dir + 6) % 8;
    }

    Contour { points }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect_mask(w: usize, h: usize, x0: usize, y0: usize, rw: usize, rh: usize) -> GrayImage {
        let mut m = GrayImage::zeros(w, h);
        for y in y0..y0 + rh {
            for x in x0..x0 + rw {
                m.set(x, y, 255);
            }
        }
        m
    }

    fn disc_mask(w: usize, h: usize, cx: f32, cy: f32, r: f32) -> GrayImage {
        let mut m = GrayImage::zeros(w, h);
        for y in 0..h {
            for x in 0..w {
                let dx = x as f32 - cx;
                let dy = y as f32 - cy;
                if dx * dx + dy * dy <= r * r {
                    m.set(x, y, 255);
                }
            }
        }
        m
    }

    #[test]
    fn square_contour_metrics() {
        let m = rect_mask(40, 40, 10, 10, 20, 20);
        let contours = find_external_contours(&m);
        assert_eq!(contours.len(), 1);
        let c = &contours[0];

        // Traced boundary spans 19 px per side (pixel centres).
        assert!((c.area() - 19.0 * 19.0).abs() < 1.0);
        assert!((c.perimeter() - 4.0 * 19.0).abs() < 1.0);
        let bb = c.bounding_box();
        assert_eq!((bb.x, bb.y, bb.w, bb.h), (10.0, 10.0, 20.0, 20.0));
        assert!((c.aspect_ratio() - 1.0).abs() < 1e-3);
        assert!(c.solidity() > 0.95);
        assert!(c.fill_ratio() > 0.8);
        // pi/4 for an ideal square
        assert!((c.circularity() - std::f32::consts::FRAC_PI_4).abs() < 0.05);
    }

    #[test]
    fn disc_is_nearly_circular() {
        let m = disc_mask(64, 64, 32.0, 32.0, 20.0);
        let contours = find_external_contours(&m);
        assert_eq!(contours.len(), 1);
        assert!(contours[0].circularity() > 0.85);
    }

    #[test]
    fn two_blobs_two_contours_in_raster_order() {
        let mut m = rect_mask(40, 20, 2, 2, 6, 6);
        for y in 10..16 {
            for x in 20..30 {
                m.set(x, y, 255);
            }
        }
        let contours = find_external_contours(&m);
        assert_eq!(contours.len(), 2);
        assert!(contours[0].bounding_box().y < contours[1].bounding_box().y);
    }

    #[test]
    fn approx_reduces_square_to_four_vertices() {
        let m = rect_mask(40, 40, 5, 5, 25, 25);
        let c = &find_external_contours(&m)[0];
        let poly = c.approx_polygon(0.02 * c.perimeter());
        assert_eq!(poly.len(), 4);
    }

    #[test]
    fn degenerate_contours_yield_zero_metrics() {
        let c = Contour {
            points: vec![Point2::new(3.0, 3.0)],
        };
        assert_eq!(c.area(), 0.0);
        assert_eq!(c.perimeter(), 0.0);
        assert_eq!(c.circularity(), 0.0);
        assert_eq!(c.solidity(), 0.0);
        let line = Contour {
            points: vec![Point2::new(0.0, 0.0), Point2::new(5.0, 0.0)],
        };
        assert_eq!(line.area(), 0.0);
        assert_eq!(line.solidity(), 0.0);
    }

    #[test]
    fn hole_boundaries_are_not_reported() {
        let mut m = rect_mask(30, 30, 5, 5, 20, 20);
        for y in 12..18 {
            for x in 12..18 {
                m.set(x, y, 0);
            }
        }
        let contours = find_external_contours(&m);
        assert_eq!(contours.len(), 1);
    }
}
