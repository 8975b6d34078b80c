use glam::DVec2;
use std::collections::BTreeMap;
use std::hash::{DefaultHasher, Hash, Hasher};

/// Classification of a node in the cloud.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Interior,
    /// Outer boundary of the domain.
    Boundary,
    /// Boundary of the interior hole with the given id.
    Hole(u32),
}

impl NodeKind {
    /// Decode the flag column of a point-cloud file:
    /// 0 interior, 1 outer boundary, k >= 2 boundary of hole k - 2.
    pub fn from_flag(flag: i64) -> Option<Self> {
        match flag {
            0 => Some(NodeKind::Interior),
            1 => Some(NodeKind::Boundary),
            k if k >= 2 => u32::try_from(k - 2).ok().map(NodeKind::Hole),
            _ => None,
        }
    }

    pub fn flag(&self) -> i64 {
        match self {
            NodeKind::Interior => 0,
            NodeKind::Boundary => 1,
            NodeKind::Hole(id) => *id as i64 + 2,
        }
    }

    pub fn is_boundary(&self) -> bool {
        !matches!(self, NodeKind::Interior)
    }
}

/// A single node of the cloud.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Node {
    pub id: usize,
    pub position: DVec2,
    pub kind: NodeKind,
}

/// The complete discretization of the domain: nodes in canonical order plus
/// the polygons of any interior holes.
#[derive(Clone, Debug)]
pub struct PointCloud {
    pub nodes: Vec<Node>,
    pub holes: Vec<Vec<DVec2>>,
}

impl PointCloud {
    /// Build a cloud from positions and tags. Node ids follow input order and
    /// hole polygons are rebuilt from the hole-boundary nodes.
    pub fn new(points: impl IntoIterator<Item = (DVec2, NodeKind)>) -> Self {
        let nodes: Vec<Node> = points
            .into_iter()
            .enumerate()
            .map(|(id, (position, kind))| Node { id, position, kind })
            .collect();
        let holes = rebuild_hole_polygons(&nodes);
        Self { nodes, holes }
    }

    /// Replace the reconstructed hole polygons with exact ones.
    pub fn with_holes(mut self, holes: Vec<Vec<DVec2>>) -> Self {
        self.holes = holes;
        self
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn position(&self, i: usize) -> DVec2 {
        self.nodes[i].position
    }

    pub fn is_boundary(&self, i: usize) -> bool {
        self.nodes[i].kind.is_boundary()
    }

    pub fn interior_indices(&self) -> Vec<usize> {
        self.nodes
            .iter()
            .filter(|n| !n.kind.is_boundary())
            .map(|n| n.id)
            .collect()
    }

    pub fn boundary_indices(&self) -> Vec<usize> {
        self.nodes
            .iter()
            .filter(|n| n.kind.is_boundary())
            .map(|n| n.id)
            .collect()
    }

    /// `true` at every boundary (outer or hole) node.
    pub fn boundary_mask(&self) -> Vec<bool> {
        self.nodes.iter().map(|n| n.kind.is_boundary()).collect()
    }

    pub fn num_boundary(&self) -> usize {
        self.nodes.iter().filter(|n| n.kind.is_boundary()).count()
    }

    /// Lower-left and upper-right corners of the cloud.
    pub fn bounding_box(&self) -> (DVec2, DVec2) {
        self.nodes.iter().fold(
            (DVec2::splat(f64::INFINITY), DVec2::splat(f64::NEG_INFINITY)),
            |(lo, hi), n| (lo.min(n.position), hi.max(n.position)),
        )
    }

    /// Distance from every node to its closest other node.
    pub fn nearest_distances(&self) -> Vec<f64> {
        self.nodes
            .iter()
            .map(|a| {
                self.nodes
                    .iter()
                    .filter(|b| b.id != a.id)
                    .map(|b| a.position.distance(b.position))
                    .fold(f64::INFINITY, f64::min)
            })
            .collect()
    }

    /// Hash of coordinates and tags, used to key caches.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.nodes.len().hash(&mut hasher);
        for node in &self.nodes {
            node.position.x.to_bits().hash(&mut hasher);
            node.position.y.to_bits().hash(&mut hasher);
            node.kind.hash(&mut hasher);
        }
        for hole in &self.holes {
            for v in hole {
                v.x.to_bits().hash(&mut hasher);
                v.y.to_bits().hash(&mut hasher);
            }
        }
        hasher.finish()
    }

    /// Whether the straight segment `a`-`b` passes through the inside of any
    /// hole. Touching a hole vertex (a hole-boundary node) is allowed.
    pub fn segment_crosses_hole(&self, a: DVec2, b: DVec2) -> bool {
        let mid = 0.5 * (a + b);
        self.holes.iter().any(|hole| {
            if hole.len() < 3 {
                return false;
            }
            if point_in_polygon(mid, hole) && !on_polygon_edge(mid, hole) {
                return true;
            }
            (0..hole.len()).any(|k| {
                let p = hole[k];
                let q = hole[(k + 1) % hole.len()];
                segments_cross(a, b, p, q)
            })
        })
    }
}

/// Group hole-boundary nodes by hole id and order each group by angle around
/// its centroid. Exact for star-shaped holes.
fn rebuild_hole_polygons(nodes: &[Node]) -> Vec<Vec<DVec2>> {
    let mut groups: BTreeMap<u32, Vec<DVec2>> = BTreeMap::new();
    for node in nodes {
        if let NodeKind::Hole(id) = node.kind {
            groups.entry(id).or_default().push(node.position);
        }
    }
    groups
        .into_values()
        .map(|mut pts| {
            let centroid = pts.iter().copied().sum::<DVec2>() / pts.len() as f64;
            pts.sort_by(|p, q| {
                let ap = (*p - centroid).y.atan2((*p - centroid).x);
                let aq = (*q - centroid).y.atan2((*q - centroid).x);
                ap.total_cmp(&aq)
            });
            pts
        })
        .collect()
}

fn orient(a: DVec2, b: DVec2, c: DVec2) -> f64 {
    (b - a).perp_dot(c - a)
}

/// Proper crossing of segments `a`-`b` and `p`-`q` (shared endpoints and
/// collinear touching do not count).
fn segments_cross(a: DVec2, b: DVec2, p: DVec2, q: DVec2) -> bool {
    let scale = (b - a).length().max((q - p).length());
    let eps = 1e-12 * scale * scale;
    let o1 = orient(a, b, p);
    let o2 = orient(a, b, q);
    let o3 = orient(p, q, a);
    let o4 = orient(p, q, b);
    ((o1 > eps && o2 < -eps) || (o1 < -eps && o2 > eps))
        && ((o3 > eps && o4 < -eps) || (o3 < -eps && o4 > eps))
}

fn on_polygon_edge(p: DVec2, polygon: &[DVec2]) -> bool {
    (0..polygon.len()).any(|k| {
        let a = polygon[k];
        let b = polygon[(k + 1) % polygon.len()];
        let ab = b - a;
        let len2 = ab.length_squared();
        if len2 == 0.0 {
            return p.distance(a) == 0.0;
        }
        let s = (p - a).dot(ab) / len2;
        (0.0..=1.0).contains(&s) && p.distance(a + s * ab) <= 1e-12 * len2.sqrt()
    })
}

/// Even-odd ray casting.
fn point_in_polygon(p: DVec2, polygon: &[DVec2]) -> bool {
    let mut inside = false;
    let n = polygon.len();
    let mut j = n - 1;
    for i in 0..n {
        let (pi, pj) = (polygon[i], polygon[j]);
        if (pi.y > p.y) != (pj.y > p.y) {
            let x_cross = pj.x + (p.y - pj.y) * (pi.x - pj.x) / (pi.y - pj.y);
            if p.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_hole_cloud() -> PointCloud {
        let pts = vec![
            (DVec2::new(-1.0, 0.0), NodeKind::Interior),
            (DVec2::new(1.0, 0.0), NodeKind::Interior),
            (DVec2::new(-0.5, -0.5), NodeKind::Hole(0)),
            (DVec2::new(0.5, -0.5), NodeKind::Hole(0)),
            (DVec2::new(0.5, 0.5), NodeKind::Hole(0)),
            (DVec2::new(-0.5, 0.5), NodeKind::Hole(0)),
            (DVec2::new(-1.0, 2.0), NodeKind::Boundary),
        ];
        PointCloud::new(pts)
    }

    #[test]
    fn flags_round_trip_through_node_kind() {
        for flag in [0, 1, 2, 5] {
            assert_eq!(NodeKind::from_flag(flag).unwrap().flag(), flag);
        }
        assert!(NodeKind::from_flag(-1).is_none());
        let last = u32::MAX as i64 + 2;
        assert_eq!(NodeKind::from_flag(last), Some(NodeKind::Hole(u32::MAX)));
        assert!(NodeKind::from_flag(last + 1).is_none());
        assert!(NodeKind::from_flag(i64::MAX).is_none());
    }

    #[test]
    fn hole_polygon_is_rebuilt_in_angular_order() {
        let cloud = square_hole_cloud();
        assert_eq!(cloud.holes.len(), 1);
        let hole = &cloud.holes[0];
        assert_eq!(hole.len(), 4);
        // consecutive vertices of a square are edges, never diagonals
        for k in 0..4 {
            let d = hole[k].distance(hole[(k + 1) % 4]);
            assert!((d - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn segments_through_the_hole_are_detected() {
        let cloud = square_hole_cloud();
        assert!(cloud.segment_crosses_hole(cloud.position(0), cloud.position(1)));
        // chord between opposite hole corners runs through the hole
        assert!(cloud.segment_crosses_hole(cloud.position(2), cloud.position(4)));
        // hole edge itself is fine
        assert!(!cloud.segment_crosses_hole(cloud.position(2), cloud.position(3)));
        assert!(!cloud.segment_crosses_hole(cloud.position(0), cloud.position(6)));
    }

    #[test]
    fn fingerprint_tracks_geometry() {
        let a = square_hole_cloud();
        let mut b = square_hole_cloud();
        assert_eq!(a.fingerprint(), b.fingerprint());
        b.nodes[0].position.x += 1e-9;
        assert_ne!(a.fingerprint(), b.fingerprint());
    }
}
