use std::sync::Arc;

use crate::discretization::cloud::{NodeKind, PointCloud};
use crate::error::{GfdError, Result};
use glam::DVec2;
use nalgebra::DVector;

/// Shared function type for boundary values that may depend on time and position.
pub type SFn = Arc<dyn Fn(f64, DVec2) -> f64 + Send + Sync>;

/// Local trait allowing convenient conversion into [`SFn`].
pub trait IntoSFn {
    fn into_sfn(self) -> SFn;
}

fn c(val: f64) -> SFn {
    Arc::new(move |_, _| val)
}

impl IntoSFn for f64 {
    fn into_sfn(self) -> SFn {
        c(self)
    }
}

impl IntoSFn for SFn {
    fn into_sfn(self) -> SFn {
        self
    }
}

impl<F> IntoSFn for F
where
    F: Fn(f64, DVec2) -> f64 + Send + Sync + 'static,
{
    fn into_sfn(self) -> SFn {
        Arc::new(self)
    }
}

/// Which boundary nodes a rule applies to.
#[derive(Clone)]
pub enum BoundarySelector {
    AnyBoundary,
    /// Nodes flagged as the outer boundary.
    Outer,
    /// Nodes on the boundary of one hole.
    Hole(u32),
    Predicate(Arc<dyn Fn(DVec2, NodeKind) -> bool + Send + Sync>),
}

impl BoundarySelector {
    pub fn matches(&self, p: DVec2, kind: NodeKind) -> bool {
        if !kind.is_boundary() {
            return false;
        }
        match self {
            BoundarySelector::AnyBoundary => true,
            BoundarySelector::Outer => kind == NodeKind::Boundary,
            BoundarySelector::Hole(id) => kind == NodeKind::Hole(*id),
            BoundarySelector::Predicate(pred) => pred(p, kind),
        }
    }
}

/// Dirichlet rule `u = g(t, x)` on the selected nodes.
#[derive(Clone)]
pub struct BCRule {
    pub on: BoundarySelector,
    pub value: SFn,
}

/// Ordered set of boundary rules. Later rules take precedence over earlier
/// ones where selectors overlap.
#[derive(Clone, Default)]
pub struct BCRegistry {
    rules: Vec<BCRule>,
}

impl BCRegistry {
    pub fn add(&mut self, rule: BCRule) {
        self.rules.push(rule);
    }

    /// Builder form of [`BCRegistry::add`] for a Dirichlet rule.
    pub fn dirichlet(mut self, on: BoundarySelector, g: impl IntoSFn) -> Self {
        self.add(BCRule {
            on,
            value: g.into_sfn(),
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn find_for(&self, p: DVec2, kind: NodeKind) -> Option<&BCRule> {
        self.rules.iter().rev().find(|r| r.on.matches(p, kind))
    }

    /// Prescribed `(node, value)` pairs at time `t`.
    /// Fails if the cloud has no boundary or a boundary node has no rule,
    /// since the system would then be under-determined.
    pub fn values(&self, cloud: &PointCloud, t: f64) -> Result<Vec<(usize, f64)>> {
        if cloud.num_boundary() == 0 {
            return Err(GfdError::SingularOperator(
                "the point cloud has no boundary nodes".into(),
            ));
        }
        cloud
            .nodes
            .iter()
            .filter(|n| n.kind.is_boundary())
            .map(|n| {
                self.find_for(n.position, n.kind)
                    .map(|rule| (n.id, (rule.value)(t, n.position)))
                    .ok_or_else(|| {
                        GfdError::SingularOperator(format!(
                            "boundary node {} at ({:.4}, {:.4}) has no boundary condition",
                            n.id, n.position.x, n.position.y
                        ))
                    })
            })
            .collect()
    }

    /// Overwrite the boundary entries of `u` with their values at time `t`.
    pub fn apply(&self, cloud: &PointCloud, t: f64, u: &mut DVector<f64>) -> Result<()> {
        for (i, g) in self.values(cloud, t)? {
            u[i] = g;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cloud() -> PointCloud {
        PointCloud::new(vec![
            (DVec2::new(0.0, 0.0), NodeKind::Boundary),
            (DVec2::new(0.5, 0.5), NodeKind::Interior),
            (DVec2::new(0.4, 0.5), NodeKind::Hole(0)),
            (DVec2::new(1.0, 0.0), NodeKind::Boundary),
        ])
    }

    #[test]
    fn later_rules_win() {
        let reg = BCRegistry::default()
            .dirichlet(BoundarySelector::AnyBoundary, 1.0)
            .dirichlet(BoundarySelector::Hole(0), |t: f64, p: DVec2| t + p.x);
        let mut u = DVector::zeros(4);
        reg.apply(&cloud(), 2.0, &mut u).unwrap();
        assert_eq!(u.as_slice(), &[1.0, 0.0, 2.4, 1.0]);
    }

    #[test]
    fn missing_rule_is_singular() {
        let reg = BCRegistry::default().dirichlet(BoundarySelector::Outer, 0.0);
        assert!(matches!(
            reg.values(&cloud(), 0.0),
            Err(GfdError::SingularOperator(_))
        ));
    }

    #[test]
    fn predicate_selector() {
        let right = BoundarySelector::Predicate(Arc::new(|p: DVec2, _: NodeKind| p.x > 0.9));
        assert!(right.matches(DVec2::new(1.0, 0.0), NodeKind::Boundary));
        assert!(!right.matches(DVec2::new(1.0, 0.0), NodeKind::Interior));
        assert!(!right.matches(DVec2::new(0.0, 0.0), NodeKind::Boundary));
    }
}
