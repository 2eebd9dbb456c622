//! Polish a blend over every ingredient at once.
//!
//! Minimizes the squared, tolerance-scaled protein and energy miss, plus any
//! cost above the soft ceiling, over all blends that respect the inclusion
//! bands and total 100%. The objective is convex, so accelerated projected
//! gradient reaches the closest attainable blend from any feasible start,
//! whatever number of ingredients it takes to get there.

use crate::evaluate::NUMERIC_SLACK;
use crate::ingredient::Ingredient;
use crate::score::MIN_SCALE;
use crate::target::NutritionalTarget;

const BATCH: f64 = 100.0;
const MAX_ITERATIONS: usize = 4000;
/// Largest per-ingredient move (percentage points) still counted as progress.
const STEP_TOLERANCE: f64 = 1e-10;
const PROJECTION_STEPS: usize = 100;
/// Floor of the cost band, as a share of `max_cost`.
const MIN_COST_BAND: f64 = 0.05;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Refinement {
    /// Catalog-ordered inclusions; within bands, summing to 100.
    pub inclusions: Vec<f64>,
    pub iterations: usize,
}

/// Scaled residuals, each linear in the inclusions: `r = row · x − offset`.
struct BlendFit {
    protein: Vec<f64>,
    energy: Vec<f64>,
    cost: Vec<f64>,
    protein_offset: f64,
    energy_offset: f64,
    cost_offset: f64,
}

impl BlendFit {
    fn new(ingredients: &[Ingredient], target: &NutritionalTarget, soft_cost_ratio: f64) -> Self {
        let protein_scale = target.protein_tolerance.max(MIN_SCALE);
        let energy_scale = target.energy_tolerance.max(MIN_SCALE);
        let ceiling = soft_cost_ratio * target.max_cost;
        let cost_scale = (target.max_cost - ceiling)
            .max(MIN_COST_BAND * target.max_cost)
            .max(MIN_SCALE);

        Self {
            protein: ingredients
                .iter()
                .map(|i| i.protein_per_unit / (BATCH * protein_scale))
                .collect(),
            energy: ingredients
                .iter()
                .map(|i| i.energy_per_unit / (BATCH * energy_scale))
                .collect(),
            cost: ingredients
                .iter()
                .map(|i| i.cost_per_unit / (BATCH * cost_scale))
                .collect(),
            protein_offset: target.target_protein / protein_scale,
            energy_offset: target.target_energy / energy_scale,
            cost_offset: ceiling / cost_scale,
        }
    }

    fn residuals(&self, x: &[f64]) -> [f64; 3] {
        [
            dot(&self.protein, x) - self.protein_offset,
            dot(&self.energy, x) - self.energy_offset,
            (dot(&self.cost, x) - self.cost_offset).max(0.0),
        ]
    }

    fn value(&self, x: &[f64]) -> f64 {
        self.residuals(x).iter().map(|r| r * r).sum()
    }

    fn gradient(&self, x: &[f64], out: &mut [f64]) {
        let [rp, re, rc] = self.residuals(x);
        for (i, g) in out.iter_mut().enumerate() {
            *g = 2.0 * (rp * self.protein[i] + re * self.energy[i] + rc * self.cost[i]);
        }
    }

    /// Upper bound on the gradient's Lipschitz constant (trace of the Hessian bound).
    fn lipschitz(&self) -> f64 {
        2.0 * (dot(&self.protein, &self.protein)
            + dot(&self.energy, &self.energy)
            + dot(&self.cost, &self.cost))
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(a, b)| a * b).sum()
}

/// Polish `start` (catalog order). `None` when fewer than two ingredients can
/// move, since the batch total then pins every inclusion.
pub(crate) fn refine(
    ingredients: &[Ingredient],
    target: &NutritionalTarget,
    soft_cost_ratio: f64,
    start: &[f64],
) -> Option<Refinement> {
    let movable = ingredients
        .iter()
        .filter(|i| i.headroom() > NUMERIC_SLACK)
        .count();
    if movable < 2 || start.len() != ingredients.len() {
        return None;
    }

    let fit = BlendFit::new(ingredients, target, soft_cost_ratio);
    let lipschitz = fit.lipschitz();
    if !(lipschitz.is_finite() && lipschitz > 0.0) {
        return None;
    }
    let step = 1.0 / lipschitz;

    let lo: Vec<f64> = ingredients.iter().map(|i| i.min_inclusion).collect();
    let hi: Vec<f64> = ingredients.iter().map(|i| i.max_inclusion).collect();
    let n = ingredients.len();

    let mut x = vec![0.0; n];
    project(start, &lo, &hi, BATCH, &mut x);
    let mut fx = fit.value(&x);

    let mut y = x.clone();
    let mut t = 1.0_f64;
    let mut plain = true;
    let mut grad = vec![0.0; n];
    let mut trial = vec![0.0; n];
    let mut next = vec![0.0; n];
    let mut iterations = 0;

    while iterations < MAX_ITERATIONS && fx > 0.0 {
        iterations += 1;

        fit.gradient(&y, &mut grad);
        for ((trial, y), g) in trial.iter_mut().zip(&y).zip(&grad) {
            *trial = y - step * g;
        }
        project(&trial, &lo, &hi, BATCH, &mut next);
        let f_next = fit.value(&next);

        if f_next > fx {
            // A plain step from `x` cannot ascend; only momentum can overshoot.
            if plain {
                break;
            }
            t = 1.0;
            y.copy_from_slice(&x);
            plain = true;
            continue;
        }

        let t_next = 0.5 * (1.0 + (1.0 + 4.0 * t * t).sqrt());
        let momentum = (t - 1.0) / t_next;
        let mut moved = 0.0_f64;
        for ((y, next), x) in y.iter_mut().zip(&next).zip(&x) {
            let delta = next - x;
            moved = moved.max(delta.abs());
            *y = next + momentum * delta;
        }
        x.copy_from_slice(&next);
        fx = f_next;
        t = t_next;
        plain = false;

        if moved <= STEP_TOLERANCE {
            break;
        }
    }

    Some(Refinement {
        inclusions: x,
        iterations,
    })
}

/// Euclidean projection of `y` onto `{lo ≤ x ≤ hi, Σx = total}`.
///
/// The projection is `clamp(y − λ, lo, hi)` for the `λ` where the clamped sum
/// meets `total`; that sum is non-increasing in `λ`, so bisection finds it.
/// Requires `Σlo ≤ total ≤ Σhi`.
fn project(y: &[f64], lo: &[f64], hi: &[f64], total: f64, out: &mut [f64]) {
    let clamped_sum = |lambda: f64| -> f64 {
        y.iter()
            .zip(lo)
            .zip(hi)
            .map(|((y, lo), hi)| (y - lambda).clamp(*lo, *hi))
            .sum()
    };

    // At `low` every entry sits at its max; at `high`, at its min.
    let mut low = y
        .iter()
        .zip(hi)
        .map(|(y, hi)| y - hi)
        .fold(f64::INFINITY, f64::min);
    let mut high = y
        .iter()
        .zip(lo)
        .map(|(y, lo)| y - lo)
        .fold(f64::NEG_INFINITY, f64::max);

    for _ in 0..PROJECTION_STEPS {
        let mid = 0.5 * (low + high);
        if mid <= low || mid >= high {
            break;
        }
        if clamped_sum(mid) > total {
            low = mid;
        } else {
            high = mid;
        }
    }

    let lambda = 0.5 * (low + high);
    for (((out, y), lo), hi) in out.iter_mut().zip(y).zip(lo).zip(hi) {
        *out = (y - lambda).clamp(*lo, *hi);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::ingredient;

    fn triangle() -> Vec<Ingredient> {
        vec![
            ingredient("filler", 0.0, 0.0, 0.20, 0.0, 100.0),
            ingredient("protein-meal", 40.0, 0.0, 0.50, 0.0, 100.0),
            ingredient("fat", 0.0, 4000.0, 0.40, 0.0, 100.0),
        ]
    }

    fn triangle_target() -> NutritionalTarget {
        NutritionalTarget {
            target_protein: 10.0,
            protein_tolerance: 1.0,
            target_energy: 2000.0,
            energy_tolerance: 100.0,
            max_cost: 1.0,
        }
    }

    #[test]
    fn projection_lands_in_bounds_and_totals_the_batch() {
        let lo = [0.0, 5.0, 0.0];
        let hi = [50.0, 60.0, 10.0];
        let mut out = [0.0; 3];

        project(&[90.0, 40.0, 30.0], &lo, &hi, 100.0, &mut out);

        assert!((out.iter().sum::<f64>() - 100.0).abs() < 1e-9);
        for i in 0..3 {
            assert!(out[i] >= lo[i] && out[i] <= hi[i], "{out:?}");
        }
        assert_eq!(out[0], 50.0);
        assert_eq!(out[2], 10.0);
        assert!((out[1] - 40.0).abs() < 1e-9);
    }

    #[test]
    fn projection_keeps_a_point_already_inside() {
        let lo = [0.0; 3];
        let hi = [100.0; 3];
        let mut out = [0.0; 3];

        project(&[20.0, 30.0, 50.0], &lo, &hi, 100.0, &mut out);

        for (a, b) in out.iter().zip([20.0, 30.0, 50.0]) {
            assert!((a - b).abs() < 1e-9, "{out:?}");
        }
    }

    #[test]
    fn reaches_a_blend_that_needs_three_ingredients() {
        // The only exact hit is 25/25/50; no single ingredient or pair gets there.
        let ingredients = triangle();
        let refined = refine(&ingredients, &triangle_target(), 0.8, &[0.0, 37.5, 62.5]).unwrap();

        let x = &refined.inclusions;
        assert!((x[0] - 25.0).abs() < 1e-3, "{x:?}");
        assert!((x[1] - 25.0).abs() < 1e-3, "{x:?}");
        assert!((x[2] - 50.0).abs() < 1e-3, "{x:?}");
        assert!((x.iter().sum::<f64>() - 100.0).abs() < 1e-9);
        assert!(refined.iterations >= 1);
    }

    #[test]
    fn pinned_batch_is_left_alone() {
        let ingredients = vec![
            ingredient("corn", 8.5, 3350.0, 0.65, 0.0, 100.0),
            ingredient("premix", 0.0, 0.0, 2.0, 1.0, 1.0),
        ];
        assert_eq!(refine(&ingredients, &triangle_target(), 0.8, &[99.0, 1.0]), None);
    }

    #[test]
    fn unreachable_target_settles_on_the_nearest_blend() {
        // Protein 10 needs 25% meal, but it is capped at 10%.
        let mut ingredients = triangle();
        ingredients[1].max_inclusion = 10.0;
        let refined = refine(&ingredients, &triangle_target(), 0.8, &[40.0, 10.0, 50.0]).unwrap();

        let x = &refined.inclusions;
        assert!((x[1] - 10.0).abs() < 1e-6, "{x:?}");
        assert!((x[2] - 50.0).abs() < 1e-3, "{x:?}");
        assert!((x.iter().sum::<f64>() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn refinement_is_deterministic() {
        let ingredients = triangle();
        let a = refine(&ingredients, &triangle_target(), 0.8, &[10.0, 10.0, 80.0]);
        let b = refine(&ingredients, &triangle_target(), 0.8, &[10.0, 10.0, 80.0]);
        assert_eq!(a, b);
    }
}
