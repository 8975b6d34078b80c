use super::cloud::{NodeKind, PointCloud};
use glam::DVec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;

/// Regular grid of `(nx + 1) x (ny + 1)` nodes on `[origin, origin + width]`.
/// Node `(i, j)` has index `j * (nx + 1) + i`; the outermost ring is boundary.
pub fn regular_grid(origin: DVec2, width: [f64; 2], nx: usize, ny: usize) -> PointCloud {
    let dx = width[0] / nx as f64;
    let dy = width[1] / ny as f64;

    let mut points = Vec::with_capacity((nx + 1) * (ny + 1));
    for j in 0..=ny {
        for i in 0..=nx {
            let position = origin + DVec2::new(i as f64 * dx, j as f64 * dy);
            let kind = if i == 0 || j == 0 || i == nx || j == ny {
                NodeKind::Boundary
            } else {
                NodeKind::Interior
            };
            points.push((position, kind));
        }
    }
    PointCloud::new(points)
}

/// Regular grid whose interior nodes are shifted by a uniform random offset
/// of at most `amplitude` grid spacings in each direction.
pub fn perturbed_grid(
    origin: DVec2,
    width: [f64; 2],
    nx: usize,
    ny: usize,
    amplitude: f64,
    seed: u64,
) -> PointCloud {
    let mut rng = StdRng::seed_from_u64(seed);
    let h = DVec2::new(width[0] / nx as f64, width[1] / ny as f64);
    let grid = regular_grid(origin, width, nx, ny);

    let points: Vec<(DVec2, NodeKind)> = grid
        .nodes
        .iter()
        .map(|node| {
            let mut position = node.position;
            if !node.kind.is_boundary() && amplitude > 0.0 {
                let shift = DVec2::new(
                    rng.gen_range(-amplitude..amplitude),
                    rng.gen_range(-amplitude..amplitude),
                );
                position += shift * h;
            }
            (position, node.kind)
        })
        .collect();
    PointCloud::new(points)
}

/// Annulus between `r_inner` (hole 0) and `r_outer` (outer boundary) with
/// `n_rings + 1` concentric rings of `n_angular` nodes each. Alternate rings
/// are rotated by half a step.
pub fn annulus(
    center: DVec2,
    r_inner: f64,
    r_outer: f64,
    n_rings: usize,
    n_angular: usize,
) -> PointCloud {
    let dr = (r_outer - r_inner) / n_rings as f64;
    let dtheta = 2.0 * PI / n_angular as f64;

    let mut points = Vec::with_capacity((n_rings + 1) * n_angular);
    for k in 0..=n_rings {
        let r = r_inner + k as f64 * dr;
        let shift = if k % 2 == 1 { 0.5 * dtheta } else { 0.0 };
        let kind = if k == 0 {
            NodeKind::Hole(0)
        } else if k == n_rings {
            NodeKind::Boundary
        } else {
            NodeKind::Interior
        };
        for a in 0..n_angular {
            let theta = a as f64 * dtheta + shift;
            points.push((center + r * DVec2::new(theta.cos(), theta.sin()), kind));
        }
    }
    PointCloud::new(points)
}

/// Square grid with a circular hole cut out. Grid nodes closer than half a
/// spacing to the hole are dropped and the hole rim is sampled at roughly the
/// grid spacing.
pub fn square_with_hole(
    origin: DVec2,
    width: f64,
    n: usize,
    hole_center: DVec2,
    hole_radius: f64,
) -> PointCloud {
    let h = width / n as f64;
    let grid = regular_grid(origin, [width, width], n, n);

    let mut points: Vec<(DVec2, NodeKind)> = grid
        .nodes
        .iter()
        .filter(|node| node.position.distance(hole_center) > hole_radius + 0.5 * h)
        .map(|node| (node.position, node.kind))
        .collect();

    let n_rim = ((2.0 * PI * hole_radius / h).ceil() as usize).max(8);
    let dtheta = 2.0 * PI / n_rim as f64;
    for a in 0..n_rim {
        let theta = a as f64 * dtheta;
        let position = hole_center + hole_radius * DVec2::new(theta.cos(), theta.sin());
        points.push((position, NodeKind::Hole(0)));
    }
    PointCloud::new(points)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regular_grid_tags_outer_ring() {
        let cloud = regular_grid(DVec2::ZERO, [1.0, 1.0], 4, 4);
        assert_eq!(cloud.len(), 25);
        assert_eq!(cloud.num_boundary(), 16);
        assert_eq!(cloud.interior_indices().len(), 9);
        assert!((cloud.position(24) - DVec2::new(1.0, 1.0)).length() < 1e-15);
    }

    #[test]
    fn perturbation_keeps_boundary_fixed_and_is_seeded() {
        let a = perturbed_grid(DVec2::ZERO, [1.0, 1.0], 6, 6, 0.2, 7);
        let b = perturbed_grid(DVec2::ZERO, [1.0, 1.0], 6, 6, 0.2, 7);
        let grid = regular_grid(DVec2::ZERO, [1.0, 1.0], 6, 6);
        assert_eq!(a.fingerprint(), b.fingerprint());
        for (p, g) in a.nodes.iter().zip(&grid.nodes) {
            if g.kind.is_boundary() {
                assert_eq!(p.position, g.position);
            } else {
                assert!((p.position - g.position).abs().max_element() <= 0.2 / 6.0 + 1e-15);
            }
        }
    }

    #[test]
    fn annulus_has_one_hole() {
        let cloud = annulus(DVec2::ZERO, 0.25, 1.0, 6, 24);
        assert_eq!(cloud.len(), 7 * 24);
        assert_eq!(cloud.holes.len(), 1);
        assert_eq!(cloud.holes[0].len(), 24);
        assert_eq!(cloud.num_boundary(), 48);
    }

    #[test]
    fn square_with_hole_clears_the_disk() {
        let c = DVec2::new(0.5, 0.5);
        let cloud = square_with_hole(DVec2::ZERO, 1.0, 20, c, 0.2);
        for node in &cloud.nodes {
            assert!(node.position.distance(c) >= 0.2 - 1e-12);
        }
        assert_eq!(cloud.holes.len(), 1);
    }
}
