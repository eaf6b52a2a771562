//! Bounded fitness constraints over a [`Distribution`].
//!
//! Each constraint precomputes an expected per-bin aggregate and a
//! normalizing relator from the full item collection, once per run.
//! `score` is a sum of squared per-bin deviations, normalized by the
//! relator and squashed through a logistic curve, so every constraint
//! yields a comparable, bounded value no matter how pathological the
//! input gets. Lower is better throughout.

use std::collections::HashMap;
use std::sync::Arc;

use crate::distribution::Distribution;
use crate::item::{ItemArena, ItemId};

/// Default weight for a colliding group the caller gave no weight for.
const DEFAULT_GROUP_WEIGHT: f64 = 0.1;

/// Logistic squash: monotonically increasing in `x`, bounded to
/// `(0, max_value)`. Non-finite input saturates to the maximum penalty
/// instead of propagating.
pub fn squash(x: f64, max_value: f64, mid: f64, slope: f64) -> f64 {
    if !x.is_finite() {
        return max_value;
    }
    let e = (-slope * (x - mid)).exp();
    if !e.is_finite() {
        // x far below mid; cannot happen for deviation sums, but the
        // squash itself never panics or returns NaN.
        return 0.0;
    }
    max_value / (1.0 + e)
}

/// A stateless scoring function over distributions. Lower is better;
/// output is bounded by the constraint's squash ceiling.
pub trait Constraint: Send + Sync {
    fn description(&self) -> &'static str;
    fn score(&self, distribution: &Distribution) -> f64;
}

fn relator_or_unit(relator: f64) -> f64 {
    if relator > f64::EPSILON {
        relator
    } else {
        1.0
    }
}

/// Penalizes bins whose total item weight deviates from the mean.
pub struct WeightHomogeneity {
    arena: Arc<ItemArena>,
    expected: f64,
    relator: f64,
}

impl WeightHomogeneity {
    pub fn new(arena: Arc<ItemArena>, ids: &[ItemId], bin_count: usize) -> Self {
        let expected = ids.iter().map(|&id| arena.get(id).weight()).sum::<f64>() / bin_count as f64;
        let relator = relator_or_unit(expected * expected * bin_count as f64);
        Self {
            arena,
            expected,
            relator,
        }
    }
}

impl Constraint for WeightHomogeneity {
    fn description(&self) -> &'static str {
        "weight homogeneity"
    }

    fn score(&self, distribution: &Distribution) -> f64 {
        let heterogeneity: f64 = distribution
            .bins()
            .iter()
            .map(|bin| {
                let total: f64 = bin.iter().map(|&id| self.arena.get(id).weight()).sum();
                (total - self.expected).powi(2)
            })
            .sum();
        squash(heterogeneity / self.relator, 2.0, 0.0, 7.0)
    }
}

/// Penalizes bins whose item count deviates from the mean.
pub struct SizeHomogeneity {
    expected: f64,
    relator: f64,
}

impl SizeHomogeneity {
    pub fn new(item_count: usize, bin_count: usize) -> Self {
        let expected = item_count as f64 / bin_count as f64;
        let relator = relator_or_unit(expected * expected * bin_count as f64);
        Self { expected, relator }
    }
}

impl Constraint for SizeHomogeneity {
    fn description(&self) -> &'static str {
        "size homogeneity"
    }

    fn score(&self, distribution: &Distribution) -> f64 {
        let heterogeneity: f64 = distribution
            .bins()
            .iter()
            .map(|bin| (bin.len() as f64 - self.expected).powi(2))
            .sum();
        squash(heterogeneity / self.relator, 2.0, 0.0, 5.0)
    }
}

/// Penalizes bins whose total rendering cost deviates from the mean.
pub struct RenderCostHomogeneity {
    arena: Arc<ItemArena>,
    expected: f64,
    relator: f64,
}

impl RenderCostHomogeneity {
    pub fn new(arena: Arc<ItemArena>, ids: &[ItemId], bin_count: usize) -> Self {
        let expected = ids
            .iter()
            .map(|&id| arena.get(id).render_cost() as f64)
            .sum::<f64>()
            / bin_count as f64;
        let relator = relator_or_unit(expected * expected * bin_count as f64);
        Self {
            arena,
            expected,
            relator,
        }
    }
}

impl Constraint for RenderCostHomogeneity {
    fn description(&self) -> &'static str {
        "render cost homogeneity"
    }

    fn score(&self, distribution: &Distribution) -> f64 {
        let heterogeneity: f64 = distribution
            .bins()
            .iter()
            .map(|bin| {
                let total: f64 = bin.iter().map(|&id| self.arena.get(id).render_cost() as f64).sum();
                (total - self.expected).powi(2)
            })
            .sum();
        squash(heterogeneity / self.relator, 2.0, 0.0, 5.0)
    }
}

/// Penalizes placing items that share a group label in the same bin.
///
/// All colliding pairs are recorded once up front; scoring only walks
/// the pair list and checks same-bin membership. A same-bin collision
/// contributes `(1 - 1/(1 + pair weight sum)) * heaviest colliding
/// label weight`; per-bin factors are squared before summing so one
/// badly packed bin hurts more than two mildly packed ones.
pub struct GroupExclusivity {
    arena: Arc<ItemArena>,
    arena_len: usize,
    collisions: Vec<Collision>,
    relator: f64,
}

struct Collision {
    first: ItemId,
    second: ItemId,
    label_weight: f64,
}

impl GroupExclusivity {
    pub fn new(
        arena: Arc<ItemArena>,
        ids: &[ItemId],
        bin_count: usize,
        group_weights: &HashMap<String, f64>,
    ) -> Self {
        let mut members: HashMap<&str, Vec<ItemId>> = HashMap::new();
        let mut pair_weights: HashMap<(ItemId, ItemId), f64> = HashMap::new();

        for &id in ids {
            for group in arena.get(id).groups() {
                let weight = group_weights
                    .get(group.as_str())
                    .copied()
                    .unwrap_or(DEFAULT_GROUP_WEIGHT);
                let seen = members.entry(group.as_str()).or_default();
                for &other in seen.iter() {
                    let key = if other < id { (other, id) } else { (id, other) };
                    let entry = pair_weights.entry(key).or_insert(0.0);
                    if weight > *entry {
                        *entry = weight;
                    }
                }
                seen.push(id);
            }
        }

        let collisions: Vec<Collision> = pair_weights
            .into_iter()
            .map(|((first, second), label_weight)| Collision {
                first,
                second,
                label_weight,
            })
            .collect();

        let total: f64 = collisions
            .iter()
            .map(|c| {
                let pair_weight = arena.get(c.first).weight() + arena.get(c.second).weight();
                (1.0 - 1.0 / (1.0 + pair_weight)) * c.label_weight
            })
            .sum();
        let relator = relator_or_unit((total / bin_count as f64).powi(2));

        Self {
            arena_len: arena.len(),
            arena,
            collisions,
            relator,
        }
    }
}

impl Constraint for GroupExclusivity {
    fn description(&self) -> &'static str {
        "group exclusivity"
    }

    fn score(&self, distribution: &Distribution) -> f64 {
        if self.collisions.is_empty() {
            return squash(0.0, 2.0, 0.0, 100.0);
        }

        let located = distribution.locate(self.arena_len);
        let mut bin_factors = vec![0.0_f64; distribution.bin_count()];

        for collision in &self.collisions {
            let (a, b) = (
                located[collision.first.0 as usize],
                located[collision.second.0 as usize],
            );
            if let (Some(bin), Some(other)) = (a, b) {
                if bin == other {
                    let pair_weight = self.arena.get(collision.first).weight()
                        + self.arena.get(collision.second).weight();
                    bin_factors[bin] += (1.0 - 1.0 / (1.0 + pair_weight)) * collision.label_weight;
                }
            }
        }

        let factor: f64 = bin_factors.iter().map(|f| f * f).sum();
        squash(factor / self.relator, 2.0, 0.0, 100.0)
    }
}

/// The four standard constraints, scored together.
pub struct ConstraintSet {
    constraints: Vec<Box<dyn Constraint>>,
}

impl ConstraintSet {
    /// Weight, size, and render-cost homogeneity plus group
    /// exclusivity, precomputed over the full item collection.
    pub fn standard(
        arena: Arc<ItemArena>,
        ids: &[ItemId],
        bin_count: usize,
        group_weights: &HashMap<String, f64>,
    ) -> Self {
        Self {
            constraints: vec![
                Box::new(WeightHomogeneity::new(arena.clone(), ids, bin_count)),
                Box::new(SizeHomogeneity::new(ids.len(), bin_count)),
                Box::new(RenderCostHomogeneity::new(arena.clone(), ids, bin_count)),
                Box::new(GroupExclusivity::new(arena, ids, bin_count, group_weights)),
            ],
        }
    }

    pub fn from_constraints(constraints: Vec<Box<dyn Constraint>>) -> Self {
        Self { constraints }
    }

    /// One score per constraint, in construction order.
    pub fn score_vector(&self, distribution: &Distribution) -> Vec<f64> {
        self.constraints
            .iter()
            .map(|c| c.score(distribution))
            .collect()
    }

    /// Scalar fitness: the sum of all constraint scores.
    pub fn total(&self, distribution: &Distribution) -> f64 {
        self.constraints.iter().map(|c| c.score(distribution)).sum()
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentNode;
    use crate::item::Item;

    fn arena_of(weights: &[(f64, &[&str])]) -> (Arc<ItemArena>, Vec<ItemId>) {
        let mut arena = ItemArena::new();
        let ids = weights
            .iter()
            .enumerate()
            .map(|(i, (weight, groups))| {
                arena.insert(Item::new(
                    Arc::new(ContentNode::leaf(format!("item-{i}"), Vec::<String>::new())),
                    *weight,
                    groups.iter().copied(),
                ))
            })
            .collect();
        (Arc::new(arena), ids)
    }

    #[test]
    fn test_squash_bounded_and_monotone() {
        let floor = squash(0.0, 2.0, 0.0, 5.0);
        assert!((floor - 1.0).abs() < 1e-12);
        let mut previous = floor;
        for i in 1..20 {
            let value = squash(i as f64 * 0.5, 2.0, 0.0, 5.0);
            assert!(value > previous);
            assert!(value < 2.0);
            previous = value;
        }
    }

    #[test]
    fn test_squash_saturates_on_pathological_input() {
        assert_eq!(squash(f64::INFINITY, 2.0, 0.0, 5.0), 2.0);
        assert_eq!(squash(f64::NAN, 2.0, 0.0, 5.0), 2.0);
        assert!((squash(1e300, 2.0, 0.0, 5.0) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_single_bin_scores_homogeneity_floor() {
        let (arena, ids) = arena_of(&[(1.0, &[]), (2.0, &[]), (3.0, &[])]);
        let distribution = Distribution::even(&ids, 1);

        let weight = WeightHomogeneity::new(arena.clone(), &ids, 1);
        let size = SizeHomogeneity::new(ids.len(), 1);

        // With one bin the per-bin aggregate equals the expectation
        // exactly; both constraints sit at their floor.
        assert!((weight.score(&distribution) - 1.0).abs() < 1e-12);
        assert!((size.score(&distribution) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_even_split_near_floor() {
        // Six unit-weight, group-free items over three bins.
        let items: Vec<(f64, &[&str])> = vec![(1.0, &[]); 6];
        let (arena, ids) = arena_of(&items);
        let even = Distribution::even(&ids, 3);

        let weight = WeightHomogeneity::new(arena.clone(), &ids, 3);
        let size = SizeHomogeneity::new(ids.len(), 3);

        assert!((weight.score(&even) - 1.0).abs() < 1e-9);
        assert!((size.score(&even) - 1.0).abs() < 1e-9);

        // A lopsided assignment scores strictly worse on both.
        let lopsided = Distribution::from_bins(vec![
            ids.clone(),
            Vec::new(),
            Vec::new(),
        ]);
        assert!(weight.score(&lopsided) > weight.score(&even));
        assert!(size.score(&lopsided) > size.score(&even));
    }

    #[test]
    fn test_shared_group_same_bin_scores_worse() {
        let (arena, ids) = arena_of(&[(5.0, &["X"]), (5.0, &["X"])]);
        let constraint = GroupExclusivity::new(arena, &ids, 2, &HashMap::new());

        let together = Distribution::from_bins(vec![vec![ids[0], ids[1]], Vec::new()]);
        let apart = Distribution::from_bins(vec![vec![ids[0]], vec![ids[1]]]);

        assert!(constraint.score(&together) > constraint.score(&apart));
    }

    #[test]
    fn test_group_weights_scale_the_penalty() {
        let (arena, ids) = arena_of(&[(5.0, &["X"]), (5.0, &["X"])]);
        let mut heavy = HashMap::new();
        heavy.insert("X".to_string(), 5.0);

        let weighted = GroupExclusivity::new(arena.clone(), &ids, 2, &heavy);
        let unweighted = GroupExclusivity::new(arena, &ids, 2, &HashMap::new());

        let together = Distribution::from_bins(vec![vec![ids[0], ids[1]], Vec::new()]);
        // Both are normalized by their own relator, so the scores match
        // at this single-pair scale; what matters is both stay bounded
        // and above the floor.
        assert!(weighted.score(&together) > 1.0);
        assert!(unweighted.score(&together) > 1.0);
        assert!(weighted.score(&together) <= 2.0);
    }

    #[test]
    fn test_no_collisions_scores_floor_without_blowup() {
        let (arena, ids) = arena_of(&[(1.0, &["a"]), (1.0, &["b"])]);
        let constraint = GroupExclusivity::new(arena, &ids, 2, &HashMap::new());
        let distribution = Distribution::even(&ids, 2);
        assert!((constraint.score(&distribution) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_constraint_set_total_is_vector_sum() {
        let (arena, ids) = arena_of(&[(1.0, &["X"]), (2.0, &["X"]), (3.0, &[])]);
        let set = ConstraintSet::standard(arena, &ids, 2, &HashMap::new());
        let distribution = Distribution::even(&ids, 2);

        let vector = set.score_vector(&distribution);
        assert_eq!(vector.len(), 4);
        assert!((set.total(&distribution) - vector.iter().sum::<f64>()).abs() < 1e-12);
        for score in vector {
            assert!(score > 0.0 && score <= 2.0);
        }
    }
}
