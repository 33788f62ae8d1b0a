use std::f32::consts::FRAC_PI_2;

use bevy::prelude::*;
use lyon_tessellation::math::point;
use lyon_tessellation::path::Path;
use lyon_tessellation::{
    BuffersBuilder, FillOptions, FillRule, FillTessellator, FillVertex, VertexBuffers,
};

use super::{Contour, ShapeStyle};
use crate::error::GooeyError;

const MIN_EDGE: f32 = 1e-6;
/// Miter offsets never stretch beyond this multiple of the bevel size.
const MITER_LIMIT: f32 = 2.0;

/// Triangle mesh data for one piece, independent of any renderer.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PieceGeometry {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
    pub min: Vec3,
    pub max: Vec3,
}

impl PieceGeometry {
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn width(&self) -> f32 {
        self.size().x
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn half_extents(&self) -> Vec3 {
        self.size() * 0.5
    }

    pub fn translate(&mut self, offset: Vec3) {
        for p in &mut self.positions {
            *p = (Vec3::from_array(*p) + offset).to_array();
        }
        self.min += offset;
        self.max += offset;
    }

    fn push_vertex(&mut self, position: Vec3, normal: Vec3) -> u32 {
        let index = self.positions.len() as u32;
        self.positions.push(position.to_array());
        self.normals.push(normal.to_array());
        index
    }

    /// Push a triangle wound counter-clockwise when seen from `normal`.
    fn push_indices(&mut self, a: u32, b: u32, c: u32, normal: Vec3) {
        let pa = Vec3::from_array(self.positions[a as usize]);
        let pb = Vec3::from_array(self.positions[b as usize]);
        let pc = Vec3::from_array(self.positions[c as usize]);
        if (pb - pa).cross(pc - pa).dot(normal) < 0.0 {
            self.indices.extend_from_slice(&[a, c, b]);
        } else {
            self.indices.extend_from_slice(&[a, b, c]);
        }
    }

    fn push_quad(&mut self, corners: [Vec3; 4], outward: Vec3) {
        let [a, b, c, d] = corners;
        let mut normal = (c - a).cross(d - b);
        if normal.length_squared() < MIN_EDGE * MIN_EDGE {
            return;
        }
        normal = normal.normalize();
        if normal.dot(outward) < 0.0 {
            normal = -normal;
        }
        let ia = self.push_vertex(a, normal);
        let ib = self.push_vertex(b, normal);
        let ic = self.push_vertex(c, normal);
        let id = self.push_vertex(d, normal);
        self.push_indices(ia, ib, ic, normal);
        self.push_indices(ia, ic, id, normal);
    }

    fn recompute_bounds(&mut self) {
        let mut min = Vec3::splat(f32::MAX);
        let mut max = Vec3::splat(f32::MIN);
        for p in &self.positions {
            let p = Vec3::from_array(*p);
            min = min.min(p);
            max = max.max(p);
        }
        if self.positions.is_empty() {
            min = Vec3::ZERO;
            max = Vec3::ZERO;
        }
        self.min = min;
        self.max = max;
    }
}

/// Signed area, positive for counter-clockwise (y up).
pub fn signed_area(contour: &[Vec2]) -> f32 {
    let n = contour.len();
    let mut a = 0.0;
    for i in 0..n {
        let p = contour[i];
        let q = contour[(i + 1) % n];
        a += p.x * q.y - q.x * p.y;
    }
    a * 0.5
}

/// Drop repeated points, including a closing point equal to the first.
fn clean(contour: &Contour) -> Contour {
    let mut out: Contour = Vec::with_capacity(contour.len());
    for &p in contour {
        if out.last().is_none_or(|last| last.distance_squared(p) > MIN_EDGE * MIN_EDGE) {
            out.push(p);
        }
    }
    while out.len() > 1 && out[0].distance_squared(out[out.len() - 1]) <= MIN_EDGE * MIN_EDGE {
        out.pop();
    }
    out
}

/// Unit normal of edge `a -> b` pointing away from the filled material.
fn edge_normal(a: Vec2, b: Vec2, sign: f32) -> Vec2 {
    let d = b - a;
    (Vec2::new(d.y, -d.x) * sign).normalize_or_zero()
}

fn offset_contour(contour: &[Vec2], amount: f32, sign: f32) -> Vec<Vec2> {
    if amount == 0.0 {
        return contour.to_vec();
    }
    let n = contour.len();
    (0..n)
        .map(|i| {
            let prev = contour[(i + n - 1) % n];
            let p = contour[i];
            let next = contour[(i + 1) % n];
            let n1 = edge_normal(prev, p, sign);
            let n2 = edge_normal(p, next, sign);
            let miter = (n1 + n2).normalize_or_zero();
            if miter == Vec2::ZERO {
                return p + n1 * amount;
            }
            let stretch = (1.0 / miter.dot(n1).max(1.0 / MITER_LIMIT)).min(MITER_LIMIT);
            p + miter * amount * stretch
        })
        .collect()
}

/// `(outward offset, z)` of every wall ring, front to back.
fn bevel_rings(style: &ShapeStyle) -> Vec<(f32, f32)> {
    let half_depth = style.depth * 0.5;
    let segments = style.bevel_segments;
    if segments == 0 || (style.bevel_thickness <= 0.0 && style.bevel_size <= 0.0) {
        return vec![(0.0, half_depth), (0.0, -half_depth)];
    }
    let ring = |i: usize| {
        let a = i as f32 / segments as f32 * FRAC_PI_2;
        (
            style.bevel_size * a.sin(),
            half_depth + style.bevel_thickness * a.cos(),
        )
    };
    let mut rings: Vec<(f32, f32)> = (0..=segments).map(ring).collect();
    rings.extend((0..=segments).rev().map(|i| {
        let (offset, z) = ring(i);
        (offset, -z)
    }));
    rings
}

fn tessellate_cap(contours: &[Contour]) -> Result<VertexBuffers<[f32; 2], u32>, GooeyError> {
    let mut builder = Path::builder();
    for contour in contours {
        builder.begin(point(contour[0].x, contour[0].y));
        for p in &contour[1..] {
            builder.line_to(point(p.x, p.y));
        }
        builder.end(true);
    }
    let path = builder.build();

    let mut buffers: VertexBuffers<[f32; 2], u32> = VertexBuffers::new();
    FillTessellator::new()
        .tessellate_path(
            &path,
            &FillOptions::tolerance(0.001).with_fill_rule(FillRule::NonZero),
            &mut BuffersBuilder::new(&mut buffers, |v: FillVertex| v.position().to_array()),
        )
        .map_err(|e| GooeyError::Tessellation(format!("{e:?}")))?;
    Ok(buffers)
}

/// Extrude closed outlines along Z, centered on z = 0, with rounded bevels
/// on both faces. Outer/hole orientation is taken from the largest contour.
pub fn extrude(contours: &[Contour], style: &ShapeStyle) -> Result<PieceGeometry, GooeyError> {
    let contours: Vec<Contour> = contours
        .iter()
        .map(clean)
        .filter(|c| c.len() >= 3 && signed_area(c).abs() > MIN_EDGE)
        .collect();
    let mut geometry = PieceGeometry::default();
    if contours.is_empty() {
        return Ok(geometry);
    }

    let outer_area = contours
        .iter()
        .map(|c| signed_area(c))
        .fold(0.0_f32, |best, a| if a.abs() > best.abs() { a } else { best });
    let sign = if outer_area > 0.0 { 1.0 } else { -1.0 };

    let rings = bevel_rings(style);

    for contour in &contours {
        let offsets: Vec<Vec<Vec2>> = rings
            .iter()
            .map(|&(amount, _)| offset_contour(contour, amount, sign))
            .collect();
        let n = contour.len();
        for r in 0..rings.len() - 1 {
            let (z0, z1) = (rings[r].1, rings[r + 1].1);
            for i in 0..n {
                let j = (i + 1) % n;
                // Flat bevel rings still need to face away from the body.
                let outward = edge_normal(contour[i], contour[j], sign)
                    .extend((z0 + z1).signum() * 1e-3);
                geometry.push_quad(
                    [
                        offsets[r][i].extend(z0),
                        offsets[r][j].extend(z0),
                        offsets[r + 1][j].extend(z1),
                        offsets[r + 1][i].extend(z1),
                    ],
                    outward,
                );
            }
        }
    }

    let cap = tessellate_cap(&contours)?;
    let front_z = rings[0].1;
    let back_z = rings[rings.len() - 1].1;
    for (z, normal) in [(front_z, Vec3::Z), (back_z, Vec3::NEG_Z)] {
        let base = geometry.positions.len() as u32;
        for v in &cap.vertices {
            geometry.push_vertex(Vec3::new(v[0], v[1], z), normal);
        }
        for tri in cap.indices.chunks_exact(3) {
            geometry.push_indices(base + tri[0], base + tri[1], base + tri[2], normal);
        }
    }

    geometry.recompute_bounds();
    Ok(geometry)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x0: f32, y0: f32, x1: f32, y1: f32) -> Contour {
        vec![
            Vec2::new(x0, y0),
            Vec2::new(x1, y0),
            Vec2::new(x1, y1),
            Vec2::new(x0, y1),
        ]
    }

    fn style(segments: usize) -> ShapeStyle {
        ShapeStyle {
            size: 1.0,
            depth: 2.0,
            bevel_thickness: 0.5,
            bevel_size: 0.3,
            bevel_segments: segments,
            curve_segments: 4,
        }
    }

    fn assert_consistent_winding(g: &PieceGeometry) {
        for tri in g.indices.chunks_exact(3) {
            let p = |i: u32| Vec3::from_array(g.positions[i as usize]);
            let n = Vec3::from_array(g.normals[tri[0] as usize]);
            let face = (p(tri[1]) - p(tri[0])).cross(p(tri[2]) - p(tri[0]));
            assert!(face.dot(n) >= -1e-6, "triangle wound against its normal");
        }
    }

    #[test]
    fn square_extrusion_bounds_include_bevel() {
        let g = extrude(&[rect(0.0, 0.0, 1.0, 1.0)], &style(3)).unwrap();
        assert!(!g.is_empty());
        assert!((g.min.x + 0.3).abs() < 1e-4);
        assert!((g.max.x - 1.3).abs() < 1e-4);
        assert!((g.min.z + 1.5).abs() < 1e-4);
        assert!((g.max.z - 1.5).abs() < 1e-4);
        assert_eq!(g.indices.len() % 3, 0);
        assert_eq!(g.positions.len(), g.normals.len());
    }

    #[test]
    fn normals_are_unit_and_winding_follows_them() {
        let g = extrude(&[rect(0.0, 0.0, 2.0, 1.0)], &style(4)).unwrap();
        for n in &g.normals {
            assert!((Vec3::from_array(*n).length() - 1.0).abs() < 1e-4);
        }
        assert_consistent_winding(&g);
    }

    #[test]
    fn orientation_of_input_does_not_matter() {
        let ccw = rect(0.0, 0.0, 1.0, 1.0);
        let mut cw = ccw.clone();
        cw.reverse();
        let a = extrude(&[ccw], &style(2)).unwrap();
        let b = extrude(&[cw], &style(2)).unwrap();
        assert!((a.min - b.min).length() < 1e-5);
        assert!((a.max - b.max).length() < 1e-5);
        assert_consistent_winding(&b);
    }

    #[test]
    fn holes_stay_open_in_the_caps() {
        let outer = rect(0.0, 0.0, 1.0, 1.0);
        let mut hole = rect(0.3, 0.3, 0.7, 0.7);
        hole.reverse();
        let g = extrude(&[outer, hole], &style(0)).unwrap();
        assert_consistent_winding(&g);

        for tri in g.indices.chunks_exact(3) {
            let n = Vec3::from_array(g.normals[tri[0] as usize]);
            if n.z.abs() < 0.99 {
                continue;
            }
            let centroid = tri
                .iter()
                .map(|&i| Vec3::from_array(g.positions[i as usize]))
                .sum::<Vec3>()
                / 3.0;
            let inside_hole = (0.3..0.7).contains(&centroid.x) && (0.3..0.7).contains(&centroid.y);
            assert!(!inside_hole, "cap covers the hole at {centroid:?}");
        }
    }

    #[test]
    fn degenerate_contours_produce_nothing() {
        let line = vec![Vec2::ZERO, Vec2::X, Vec2::X * 2.0];
        let g = extrude(&[line, vec![Vec2::ZERO]], &style(2)).unwrap();
        assert!(g.is_empty());
        assert_eq!(g.size(), Vec3::ZERO);
    }

    #[test]
    fn translate_moves_bounds() {
        let mut g = extrude(&[rect(0.0, 0.0, 1.0, 1.0)], &style(1)).unwrap();
        let c = g.center();
        g.translate(-c);
        assert!(g.center().length() < 1e-5);
    }
}
