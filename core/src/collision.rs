//! Narrow-phase collision kernels. Every kernel takes shapes in canonical
//! order (`shape1.kind() <= shape2.kind()`) and produces contacts whose
//! normal points from shape1 toward shape2, with a feature id that stays
//! stable while the touching features stay the same, so the contact solver
//! can persist impulses across steps.

use crate::math::Vec2;
use crate::shape::{Shape, ShapeGeom};

/// Local feature indices on each shape. Equal pairs across steps mean the
/// same geometric contact, so accumulated impulses carry over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FeaturePair {
    pub f1: u8,
    pub f2: u8,
}

impl FeaturePair {
    pub const fn new(f1: u8, f2: u8) -> Self {
        Self { f1, f2 }
    }
}

/// One narrow-phase contact point.
#[derive(Debug, Clone, Copy)]
pub struct Contact {
    pub position: Vec2,
    /// Unit normal from shape1 toward shape2.
    pub normal: Vec2,
    /// Penetration depth, positive when overlapping.
    pub depth: f32,
    pub feature: FeaturePair,
}

/// Collide two shapes in canonical order. Appends zero, one, or two contact
/// points to `out` (cleared first) and reports whether any were produced.
pub fn collide(s1: &Shape, s2: &Shape, out: &mut Vec<Contact>) -> bool {
    debug_assert!(s1.kind() <= s2.kind());
    out.clear();
    match (&s1.world, &s2.world) {
        (
            ShapeGeom::Circle {
                center: c1,
                radius: r1,
            },
            ShapeGeom::Circle {
                center: c2,
                radius: r2,
            },
        ) => circle_circle(*c1, *r1, *c2, *r2, FeaturePair::new(0, 0), out),
        (
            ShapeGeom::Circle { center, radius },
            ShapeGeom::Segment { a, b, radius: rs },
        ) => {
            let (closest, region) = closest_on_segment(*center, *a, *b);
            circle_circle(
                *center,
                *radius,
                closest,
                *rs,
                FeaturePair::new(0, region),
                out,
            );
        }
        (ShapeGeom::Circle { center, radius }, ShapeGeom::Poly { verts }) => {
            circle_poly(*center, *radius, verts, out);
        }
        (
            ShapeGeom::Segment {
                a: a1,
                b: b1,
                radius: r1,
            },
            ShapeGeom::Segment {
                a: a2,
                b: b2,
                radius: r2,
            },
        ) => {
            let (p1, m1, p2, m2) = closest_between_segments(*a1, *b1, *a2, *b2);
            circle_circle(p1, *r1, p2, *r2, FeaturePair::new(m1, m2), out);
        }
        (ShapeGeom::Segment { a, b, radius }, ShapeGeom::Poly { verts }) => {
            segment_poly(*a, *b, *radius, verts, out);
        }
        (ShapeGeom::Poly { verts: va }, ShapeGeom::Poly { verts: vb }) => {
            poly_poly(va, vb, out);
        }
        _ => debug_assert!(false, "shape pair not in canonical order"),
    }
    !out.is_empty()
}

/// Outward edge normals of a CCW convex polygon.
pub fn poly_normals(verts: &[Vec2]) -> Vec<Vec2> {
    let n = verts.len();
    (0..n)
        .map(|i| Vec2::cross_vec_scalar(verts[(i + 1) % n] - verts[i], 1.0).normalized())
        .collect()
}

fn circle_circle(c1: Vec2, r1: f32, c2: Vec2, r2: f32, feature: FeaturePair, out: &mut Vec<Contact>) {
    let d = c2 - c1;
    let dist_sq = d.length_sq();
    let rsum = r1 + r2;
    if dist_sq >= rsum * rsum {
        return;
    }
    let dist = dist_sq.sqrt();
    let normal = if dist > 1e-8 {
        d * (1.0 / dist)
    } else {
        Vec2::new(1.0, 0.0)
    };
    let depth = rsum - dist;
    out.push(Contact {
        position: c1 + normal * (r1 - 0.5 * depth),
        normal,
        depth,
        feature,
    });
}

fn circle_poly(c: Vec2, r: f32, verts: &[Vec2], out: &mut Vec<Contact>) {
    let n = verts.len();
    if n < 3 {
        return;
    }
    let normals = poly_normals(verts);

    // Face of maximum separation.
    let mut best = f32::MIN;
    let mut best_i = 0;
    for i in 0..n {
        let sep = normals[i].dot(c - verts[i]);
        if sep > best {
            best = sep;
            best_i = i;
        }
    }
    if best > r {
        return;
    }

    if best < 1e-4 {
        // Center inside the polygon: push out along the shallowest face.
        let n_out = normals[best_i];
        out.push(Contact {
            position: c - n_out * best,
            normal: -n_out,
            depth: r - best,
            feature: FeaturePair::new(0, best_i as u8),
        });
        return;
    }

    // Center outside: exact test against the face segment covers corners.
    let v0 = verts[best_i];
    let v1 = verts[(best_i + 1) % n];
    let (closest, region) = closest_on_segment(c, v0, v1);
    let d = c - closest;
    let dist_sq = d.length_sq();
    if dist_sq >= r * r {
        return;
    }
    let dist = dist_sq.sqrt();
    let to_circle = if dist > 1e-8 {
        d * (1.0 / dist)
    } else {
        normals[best_i]
    };
    let f2 = match region {
        0 => best_i as u8,
        1 => 128 + best_i as u8,
        _ => 128 + ((best_i + 1) % n) as u8,
    };
    out.push(Contact {
        position: closest,
        normal: -to_circle,
        depth: r - dist,
        feature: FeaturePair::new(0, f2),
    });
}

/// Closest point on [a, b] to p, with the feature region it landed in:
/// 0 = interior, 1 = endpoint a, 2 = endpoint b.
fn closest_on_segment(p: Vec2, a: Vec2, b: Vec2) -> (Vec2, u8) {
    let ab = b - a;
    let len_sq = ab.length_sq();
    if len_sq < 1e-12 {
        return (a, 1);
    }
    let t = (p - a).dot(ab) / len_sq;
    if t <= 0.0 {
        (a, 1)
    } else if t >= 1.0 {
        (b, 2)
    } else {
        (a + ab * t, 0)
    }
}

/// Closest points between two segments with their feature regions.
fn closest_between_segments(p1: Vec2, q1: Vec2, p2: Vec2, q2: Vec2) -> (Vec2, u8, Vec2, u8) {
    let d1 = q1 - p1;
    let d2 = q2 - p2;
    let r = p1 - p2;
    let a = d1.length_sq();
    let e = d2.length_sq();
    let f = d2.dot(r);

    let (s, t) = if a <= 1e-12 && e <= 1e-12 {
        (0.0, 0.0)
    } else if a <= 1e-12 {
        (0.0, (f / e).clamp(0.0, 1.0))
    } else {
        let c = d1.dot(r);
        if e <= 1e-12 {
            ((-c / a).clamp(0.0, 1.0), 0.0)
        } else {
            let b = d1.dot(d2);
            let denom = a * e - b * b;
            let mut s = if denom.abs() > 1e-12 {
                ((b * f - c * e) / denom).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let mut t = (b * s + f) / e;
            if t < 0.0 {
                t = 0.0;
                s = (-c / a).clamp(0.0, 1.0);
            } else if t > 1.0 {
                t = 1.0;
                s = ((b - c) / a).clamp(0.0, 1.0);
            }
            (s, t)
        }
    };

    let region = |u: f32| -> u8 {
        if u <= 0.0 {
            1
        } else if u >= 1.0 {
            2
        } else {
            0
        }
    };
    (p1 + d1 * s, region(s), p2 + d2 * t, region(t))
}

#[derive(Clone, Copy)]
struct ClipVertex {
    v: Vec2,
    id: u8,
}

/// Clip a two-point segment against the half-space `dot(normal, p) <= offset`.
/// A point produced by the clip itself takes `clip_id` as its feature.
fn clip_segment_to_line(
    input: [ClipVertex; 2],
    normal: Vec2,
    offset: f32,
    clip_id: u8,
) -> Option<[ClipVertex; 2]> {
    let d0 = normal.dot(input[0].v) - offset;
    let d1 = normal.dot(input[1].v) - offset;

    let mut out = [input[0]; 2];
    let mut count = 0;
    if d0 <= 0.0 {
        out[count] = input[0];
        count += 1;
    }
    if d1 <= 0.0 {
        out[count] = input[1];
        count += 1;
    }
    if d0 * d1 < 0.0 {
        let t = d0 / (d0 - d1);
        out[count] = ClipVertex {
            v: input[0].v + (input[1].v - input[0].v) * t,
            id: clip_id,
        };
        count += 1;
    }
    if count == 2 { Some(out) } else { None }
}

/// Greatest separation of `other`'s vertices over `verts`' faces.
fn max_separation(verts: &[Vec2], normals: &[Vec2], other: &[Vec2]) -> (f32, usize) {
    let mut best = f32::MIN;
    let mut best_i = 0;
    for i in 0..verts.len() {
        let mut sep = f32::MAX;
        for v in other {
            sep = sep.min(normals[i].dot(*v - verts[i]));
        }
        if sep > best {
            best = sep;
            best_i = i;
        }
    }
    (best, best_i)
}

fn incident_edge(normals: &[Vec2], ref_normal: Vec2) -> usize {
    let mut best = f32::MAX;
    let mut best_i = 0;
    for (i, n) in normals.iter().enumerate() {
        let d = n.dot(ref_normal);
        if d < best {
            best = d;
            best_i = i;
        }
    }
    best_i
}

/// SAT + reference/incident edge clipping for two convex polygons.
fn poly_poly(va: &[Vec2], vb: &[Vec2], out: &mut Vec<Contact>) {
    if va.len() < 3 || vb.len() < 3 {
        return;
    }
    let na = poly_normals(va);
    let nb = poly_normals(vb);

    let (sep_a, edge_a) = max_separation(va, &na, vb);
    if sep_a > 0.0 {
        return;
    }
    let (sep_b, edge_b) = max_separation(vb, &nb, va);
    if sep_b > 0.0 {
        return;
    }

    // Prefer A as reference unless B is clearly deeper; the relative bias
    // keeps the choice stable frame to frame.
    let flip = sep_b > sep_a * 0.98 + 0.001;
    let (rv, rn, re, iv, inn) = if flip {
        (vb, &nb, edge_b, va, &na)
    } else {
        (va, &na, edge_a, vb, &nb)
    };

    let ref_normal = rn[re];
    let rv0 = rv[re];
    let rv1 = rv[(re + 1) % rv.len()];
    let tangent = (rv1 - rv0).normalized();

    let inc = incident_edge(inn, ref_normal);
    let inc_next = (inc + 1) % iv.len();
    let incident = [
        ClipVertex {
            v: iv[inc],
            id: inc as u8,
        },
        ClipVertex {
            v: iv[inc_next],
            id: inc_next as u8,
        },
    ];

    // Clip the incident edge to the reference edge's side planes.
    let clipped = clip_segment_to_line(incident, -tangent, -tangent.dot(rv0), 64 + 2 * re as u8)
        .and_then(|c| clip_segment_to_line(c, tangent, tangent.dot(rv1), 64 + 2 * re as u8 + 1));
    let Some(clipped) = clipped else {
        return;
    };

    for cv in clipped {
        let sep = ref_normal.dot(cv.v - rv0);
        if sep <= 0.0 {
            let (normal, feature) = if flip {
                (-ref_normal, FeaturePair::new(cv.id, re as u8))
            } else {
                (ref_normal, FeaturePair::new(re as u8, cv.id))
            };
            out.push(Contact {
                position: cv.v,
                normal,
                depth: -sep,
                feature,
            });
        }
    }
}

/// Capsule segment against a convex polygon: SAT over the polygon's faces
/// and the segment's own normal, radius folded into the separations.
fn segment_poly(a: Vec2, b: Vec2, radius: f32, verts: &[Vec2], out: &mut Vec<Contact>) {
    let n = verts.len();
    if n < 3 {
        return;
    }
    let normals = poly_normals(verts);

    // Polygon face axes.
    let mut best_p = f32::MIN;
    let mut bp_i = 0;
    for i in 0..n {
        let sep = normals[i].dot(a - verts[i]).min(normals[i].dot(b - verts[i])) - radius;
        if sep > best_p {
            best_p = sep;
            bp_i = i;
        }
    }
    if best_p > 0.0 {
        return;
    }

    // Segment face axes, one per side.
    let axis = (b - a).normalized().perp();
    let mut best_s = f32::MIN;
    let mut seg_dir = axis;
    let mut seg_face = 0u8;
    for (face, dir) in [(0u8, axis), (1u8, -axis)] {
        let mut sep = f32::MAX;
        for v in verts {
            sep = sep.min(dir.dot(*v - a));
        }
        let sep = sep - radius;
        if sep > best_s {
            best_s = sep;
            seg_dir = dir;
            seg_face = face;
        }
    }
    if best_s > 0.0 {
        return;
    }

    if best_s > best_p * 0.98 + 0.001 {
        // Reference face on the segment; clip the incident polygon edge to
        // the segment's extent.
        let inc = incident_edge(&normals, seg_dir);
        let inc_next = (inc + 1) % n;
        let incident = [
            ClipVertex {
                v: verts[inc],
                id: inc as u8,
            },
            ClipVertex {
                v: verts[inc_next],
                id: inc_next as u8,
            },
        ];
        let tangent = (b - a).normalized();
        let clipped = clip_segment_to_line(incident, -tangent, -tangent.dot(a), 64)
            .and_then(|c| clip_segment_to_line(c, tangent, tangent.dot(b), 65));
        let Some(clipped) = clipped else {
            return;
        };
        for cv in clipped {
            let sep = seg_dir.dot(cv.v - a) - radius;
            if sep <= 0.0 {
                out.push(Contact {
                    position: cv.v,
                    normal: seg_dir,
                    depth: -sep,
                    feature: FeaturePair::new(seg_face, cv.id),
                });
            }
        }
    } else {
        // Reference face on the polygon; clip the segment to its side planes.
        let ref_normal = normals[bp_i];
        let rv0 = verts[bp_i];
        let rv1 = verts[(bp_i + 1) % n];
        let tangent = (rv1 - rv0).normalized();
        let seg = [
            ClipVertex { v: a, id: 0 },
            ClipVertex { v: b, id: 1 },
        ];
        let clipped = clip_segment_to_line(seg, -tangent, -tangent.dot(rv0), 64)
            .and_then(|c| clip_segment_to_line(c, tangent, tangent.dot(rv1), 65));
        let Some(clipped) = clipped else {
            return;
        };
        for cv in clipped {
            let sep = ref_normal.dot(cv.v - rv0) - radius;
            if sep <= 0.0 {
                out.push(Contact {
                    position: cv.v - ref_normal * radius,
                    normal: -ref_normal,
                    depth: -sep,
                    feature: FeaturePair::new(cv.id, bp_i as u8),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::{Shape, ShapeGeom, box_verts};
    use approx::assert_relative_eq;

    fn circle(center: Vec2, radius: f32) -> Shape {
        Shape::new(0, ShapeGeom::Circle { center, radius }, 1.0, 0.0, 0.5)
    }

    fn poly(verts: Vec<Vec2>) -> Shape {
        Shape::new(1, ShapeGeom::Poly { verts }, 1.0, 0.0, 0.5)
    }

    #[test]
    fn circle_circle_overlap() {
        let a = circle(Vec2::ZERO, 1.0);
        let b = circle(Vec2::new(1.5, 0.0), 1.0);
        let mut out = Vec::new();
        assert!(collide(&a, &b, &mut out));
        assert_eq!(out.len(), 1);
        let c = &out[0];
        assert_relative_eq!(c.normal.x, 1.0, epsilon = 1e-6);
        assert_relative_eq!(c.depth, 0.5, epsilon = 1e-6);
    }

    #[test]
    fn circle_circle_separated() {
        let a = circle(Vec2::ZERO, 1.0);
        let b = circle(Vec2::new(3.0, 0.0), 1.0);
        let mut out = Vec::new();
        assert!(!collide(&a, &b, &mut out));
        assert!(out.is_empty());
    }

    #[test]
    fn circle_on_box_face() {
        let a = circle(Vec2::new(0.0, 1.4), 0.5);
        let b = poly(box_verts(2.0, 1.0));
        let mut out = Vec::new();
        assert!(collide(&a, &b, &mut out));
        let c = &out[0];
        // normal from circle toward the box
        assert_relative_eq!(c.normal.y, -1.0, epsilon = 1e-5);
        assert_relative_eq!(c.depth, 0.1, epsilon = 1e-5);
    }

    #[test]
    fn box_on_box_has_two_points_with_distinct_features() {
        let a = poly(box_verts(1.0, 1.0));
        let mut b = poly(box_verts(1.0, 1.0));
        b.cache(&crate::math::Transform::new(Vec2::new(0.0, 1.9), 0.0));
        let mut out = Vec::new();
        assert!(collide(&a, &b, &mut out));
        assert_eq!(out.len(), 2);
        assert_ne!(out[0].feature, out[1].feature);
        for c in &out {
            assert_relative_eq!(c.depth, 0.1, epsilon = 1e-5);
            assert_relative_eq!(c.normal.y.abs(), 1.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn box_features_stable_across_frames() {
        let a = poly(box_verts(1.0, 1.0));
        let mut b = poly(box_verts(1.0, 1.0));
        b.cache(&crate::math::Transform::new(Vec2::new(0.0, 1.9), 0.0));
        let mut first = Vec::new();
        collide(&a, &b, &mut first);
        b.cache(&crate::math::Transform::new(Vec2::new(0.0, 1.89), 0.0));
        let mut second = Vec::new();
        collide(&a, &b, &mut second);
        assert_eq!(first.len(), second.len());
        for (x, y) in first.iter().zip(&second) {
            assert_eq!(x.feature, y.feature);
        }
    }

    #[test]
    fn segment_under_box() {
        let seg = Shape::new(
            0,
            ShapeGeom::Segment {
                a: Vec2::new(-5.0, 0.0),
                b: Vec2::new(5.0, 0.0),
                radius: 0.1,
            },
            1.0,
            0.0,
            0.5,
        );
        let mut b = poly(box_verts(0.5, 0.5));
        b.cache(&crate::math::Transform::new(Vec2::new(0.0, 0.55), 0.0));
        let mut out = Vec::new();
        assert!(collide(&seg, &b, &mut out));
        for c in &out {
            // normal from segment up into the box
            assert!(c.normal.y > 0.9);
            assert!(c.depth >= 0.0);
        }
    }

    #[test]
    fn circle_rests_on_segment() {
        let c = circle(Vec2::new(0.0, 0.55), 0.5);
        let seg = Shape::new(
            1,
            ShapeGeom::Segment {
                a: Vec2::new(-5.0, 0.0),
                b: Vec2::new(5.0, 0.0),
                radius: 0.1,
            },
            1.0,
            0.0,
            0.5,
        );
        let mut out = Vec::new();
        assert!(collide(&c, &seg, &mut out));
        assert_eq!(out.len(), 1);
        assert_relative_eq!(out[0].normal.y, -1.0, epsilon = 1e-5);
        assert_relative_eq!(out[0].depth, 0.05, epsilon = 1e-5);
    }
}
