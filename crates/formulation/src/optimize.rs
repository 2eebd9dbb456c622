//! Bounded search for a feasible, high-scoring blend.
//!
//! Procedure, per round:
//! 1. Start every ingredient at its minimum inclusion; the rest of the batch is
//!    the free mass `F = 100 − Σ min`.
//! 2. Pick a *primary set* (one ingredient or a pair) whose nutrient
//!    coefficients come closest to the average the free mass must supply, and
//!    split `F` between its members in the ratio of that closest point.
//! 3. Clip members pushed above their maximum and hand the overflow to a new
//!    primary set chosen among the unclipped ingredients against the residual gap.
//! 4. Renormalize the free portion so the blend totals exactly 100%.
//! 5. Evaluate and score; stop at the first feasible blend, otherwise move to
//!    the next-ranked primary set.
//!
//! Primary sets mix at most two ingredients, so a target that only a blend of
//! three or more can reach is missed by every round. When no round is feasible
//! the best blend is polished over all ingredients at once (see `refine`) and
//! kept if it ranks higher.
//!
//! Distances are measured with protein and energy scaled by their tolerances,
//! so one unit on either axis is one tolerance band.

use serde::{Deserialize, Serialize};

use crate::error::FormulationError;
use crate::evaluate::{ConstraintEvaluator, FormulationResult, NUMERIC_SLACK};
use crate::ingredient::{Ingredient, IngredientCatalog, IngredientId};
use crate::refine::refine;
use crate::score::{EfficiencyScorer, MIN_SCALE, ScoreWeights};
use crate::state::FormulationState;
use crate::target::NutritionalTarget;

pub const DEFAULT_MAX_ROUNDS: usize = 25;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizerConfig {
    /// Upper bound on search rounds (each round tries one primary set).
    pub max_rounds: usize,
    pub score_weights: ScoreWeights,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            max_rounds: DEFAULT_MAX_ROUNDS,
            score_weights: ScoreWeights::default(),
        }
    }
}

impl OptimizerConfig {
    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    pub fn with_score_weights(mut self, score_weights: ScoreWeights) -> Self {
        self.score_weights = score_weights;
        self
    }

    pub fn validate(&self) -> Result<(), FormulationError> {
        if self.max_rounds == 0 {
            return Err(FormulationError::validation("maxRounds must be at least 1"));
        }
        self.score_weights.validate()
    }
}

/// Best blend found, with its evaluation.
///
/// `result` is exactly what [`crate::evaluate()`] returns for `state`; it is
/// infeasible when no round produced a feasible blend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationOutcome {
    pub state: FormulationState,
    pub result: FormulationResult,
    /// Rounds actually executed.
    pub rounds: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Optimizer {
    config: OptimizerConfig,
    evaluator: ConstraintEvaluator,
}

impl Optimizer {
    pub fn new(config: OptimizerConfig) -> Self {
        Self {
            config,
            evaluator: ConstraintEvaluator::new(EfficiencyScorer::new(config.score_weights)),
        }
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    pub fn evaluator(&self) -> &ConstraintEvaluator {
        &self.evaluator
    }

    pub fn optimize(
        &self,
        catalog: &IngredientCatalog,
        target: &NutritionalTarget,
    ) -> Result<OptimizationOutcome, FormulationError> {
        self.config.validate()?;
        target.validate()?;
        catalog.check_bounds()?;

        let search = Search::new(catalog, target);

        // Bounds pinned at their minimums: a single candidate, nothing to search.
        let ranked = if search.free_mass > NUMERIC_SLACK {
            let eligible = with_headroom(search.ingredients(), &search.base, &[]);
            let gap = search.space.gap(search.ingredients(), &search.base, search.free_mass);
            rank_primary_sets(search.ingredients(), &search.space, gap, &eligible)
        } else {
            Vec::new()
        };
        let round_budget = self.config.max_rounds.min(ranked.len().max(1));

        let mut best = self.run_round(&search, ranked.first(), 0)?;
        let mut rounds = 1;

        while !best.result.feasible && rounds < round_budget {
            let candidate = self.run_round(&search, ranked.get(rounds), rounds)?;
            rounds += 1;
            if outranks(&candidate.result, &best.result) {
                best = candidate;
            }
        }

        if !best.result.feasible {
            if let Some(candidate) = self.polish(&search, &best)? {
                if outranks(&candidate.result, &best.result) {
                    best = candidate;
                }
            }
        }

        tracing::info!(
            ingredients = catalog.len(),
            rounds,
            feasible = best.result.feasible,
            score = best.result.efficiency_score,
            "formulation optimized"
        );

        Ok(OptimizationOutcome {
            state: best.state,
            result: best.result,
            rounds,
        })
    }

    fn run_round(
        &self,
        search: &Search<'_>,
        primary: Option<&PrimarySet>,
        round: usize,
    ) -> Result<Candidate, FormulationError> {
        let ingredients = search.ingredients();
        let inclusions = match primary {
            Some(primary) if search.free_mass > NUMERIC_SLACK => {
                let mut alloc = self.allocate(search, primary);
                renormalize(ingredients, &search.base, search.free_mass, &mut alloc);
                alloc
            }
            _ => search.base.clone(),
        };

        let candidate = self.candidate(search, &inclusions)?;

        tracing::debug!(
            round,
            primary = ?primary.map(|p| p.ids(ingredients)),
            feasible = candidate.result.feasible,
            score = candidate.result.efficiency_score,
            "formulation round evaluated"
        );

        Ok(candidate)
    }

    /// Refine `best` over every ingredient; `None` when nothing can move.
    fn polish(
        &self,
        search: &Search<'_>,
        best: &Candidate,
    ) -> Result<Option<Candidate>, FormulationError> {
        let ingredients = search.ingredients();
        let start: Vec<f64> = ingredients.iter().map(|i| best.state.get(&i.id)).collect();

        let Some(refined) = refine(
            ingredients,
            search.target,
            self.config.score_weights.soft_cost_ratio,
            &start,
        ) else {
            return Ok(None);
        };

        let candidate = self.candidate(search, &refined.inclusions)?;

        tracing::debug!(
            iterations = refined.iterations,
            feasible = candidate.result.feasible,
            score = candidate.result.efficiency_score,
            "formulation blend polished"
        );

        Ok(Some(candidate))
    }

    fn candidate(
        &self,
        search: &Search<'_>,
        inclusions: &[f64],
    ) -> Result<Candidate, FormulationError> {
        let state = FormulationState::from_pairs(
            search
                .ingredients()
                .iter()
                .zip(inclusions)
                .map(|(i, inclusion)| (i.id.clone(), *inclusion)),
        );
        let result = self.evaluator.evaluate(&state, search.catalog, search.target)?;
        Ok(Candidate { state, result })
    }

    /// Distribute `free_mass` over the primary set, clipping at maximums and
    /// re-selecting among unclipped ingredients for any overflow.
    fn allocate(&self, search: &Search<'_>, primary: &PrimarySet) -> Vec<f64> {
        let ingredients = search.ingredients();
        let mut alloc = search.base.clone();
        let mut clipped = vec![false; ingredients.len()];
        let mut members = primary.members.clone();
        let mut remaining = search.free_mass;

        // Every pass with overflow clips at least one more ingredient.
        let pass_budget = self.config.max_rounds.max(ingredients.len() + 1);
        for _ in 0..pass_budget {
            for &(idx, weight) in &members {
                alloc[idx] += remaining * weight;
            }
            remaining = 0.0;

            for &(idx, _) in &members {
                let max = ingredients[idx].max_inclusion;
                if alloc[idx] > max {
                    remaining += alloc[idx] - max;
                    alloc[idx] = max;
                    clipped[idx] = true;
                }
            }

            if remaining <= NUMERIC_SLACK {
                break;
            }

            let eligible = with_headroom(ingredients, &alloc, &clipped);
            let gap = search.space.gap(ingredients, &alloc, remaining);
            match rank_primary_sets(ingredients, &search.space, gap, &eligible).into_iter().next() {
                Some(next) => members = next.members,
                None => break,
            }
        }

        alloc
    }
}

/// Optimize with the default configuration.
pub fn optimize(
    catalog: &IngredientCatalog,
    target: &NutritionalTarget,
) -> Result<OptimizationOutcome, FormulationError> {
    Optimizer::default().optimize(catalog, target)
}

/// Inputs shared by every round of one `optimize` call.
struct Search<'a> {
    catalog: &'a IngredientCatalog,
    target: &'a NutritionalTarget,
    space: NutrientSpace,
    /// Minimum inclusions, in catalog order.
    base: Vec<f64>,
    free_mass: f64,
}

impl<'a> Search<'a> {
    fn new(catalog: &'a IngredientCatalog, target: &'a NutritionalTarget) -> Self {
        let base: Vec<f64> = catalog.iter().map(|i| i.min_inclusion).collect();
        let free_mass = (100.0 - base.iter().sum::<f64>()).max(0.0);
        Self {
            catalog,
            target,
            space: NutrientSpace::new(target),
            base,
            free_mass,
        }
    }

    fn ingredients(&self) -> &'a [Ingredient] {
        self.catalog.as_slice()
    }
}

struct Candidate {
    state: FormulationState,
    result: FormulationResult,
}

/// Feasible beats infeasible, then strictly higher score; ties keep the earlier round.
fn outranks(a: &FormulationResult, b: &FormulationResult) -> bool {
    match (a.feasible, b.feasible) {
        (true, false) => true,
        (false, true) => false,
        _ => a.efficiency_score > b.efficiency_score,
    }
}

/// Tolerance-scaled protein/energy coordinates.
#[derive(Debug, Clone, Copy)]
struct NutrientSpace {
    target_protein: f64,
    target_energy: f64,
    protein_scale: f64,
    energy_scale: f64,
}

impl NutrientSpace {
    fn new(target: &NutritionalTarget) -> Self {
        Self {
            target_protein: target.target_protein,
            target_energy: target.target_energy,
            protein_scale: target.protein_tolerance.max(MIN_SCALE),
            energy_scale: target.energy_tolerance.max(MIN_SCALE),
        }
    }

    fn point(&self, ingredient: &Ingredient) -> [f64; 2] {
        [
            ingredient.protein_per_unit / self.protein_scale,
            ingredient.energy_per_unit / self.energy_scale,
        ]
    }

    /// Average coefficients `mass` more units must carry for the blend to hit the target.
    fn gap(&self, ingredients: &[Ingredient], inclusions: &[f64], mass: f64) -> [f64; 2] {
        let (mut protein, mut energy) = (0.0, 0.0);
        for (ingredient, inclusion) in ingredients.iter().zip(inclusions) {
            protein += inclusion * ingredient.protein_per_unit;
            energy += inclusion * ingredient.energy_per_unit;
        }
        let mass = mass.max(MIN_SCALE);
        [
            (100.0 * self.target_protein - protein) / mass / self.protein_scale,
            (100.0 * self.target_energy - energy) / mass / self.energy_scale,
        ]
    }
}

/// One or two ingredients with the share of the free mass each receives.
#[derive(Debug, Clone, PartialEq)]
struct PrimarySet {
    members: Vec<(usize, f64)>,
    /// Scaled distance from the mix to the gap point.
    distance: f64,
    /// Cost per unit of the mix; breaks distance ties.
    cost: f64,
}

impl PrimarySet {
    fn ids<'a>(&self, ingredients: &'a [Ingredient]) -> Vec<&'a IngredientId> {
        self.members.iter().map(|&(idx, _)| &ingredients[idx].id).collect()
    }
}

fn with_headroom(ingredients: &[Ingredient], inclusions: &[f64], clipped: &[bool]) -> Vec<usize> {
    ingredients
        .iter()
        .enumerate()
        .filter(|&(idx, ingredient)| {
            !clipped.get(idx).copied().unwrap_or(false)
                && ingredient.max_inclusion - inclusions[idx] > NUMERIC_SLACK
        })
        .map(|(idx, _)| idx)
        .collect()
}

/// Rank every single ingredient and every non-degenerate pair among `eligible`
/// by distance to `gap`, then by cost, then by catalog order.
fn rank_primary_sets(
    ingredients: &[Ingredient],
    space: &NutrientSpace,
    gap: [f64; 2],
    eligible: &[usize],
) -> Vec<PrimarySet> {
    let mut sets = Vec::with_capacity(eligible.len() * (eligible.len() + 1) / 2);

    for &i in eligible {
        let a = space.point(&ingredients[i]);
        sets.push(PrimarySet {
            members: vec![(i, 1.0)],
            distance: distance(a, gap),
            cost: ingredients[i].cost_per_unit,
        });
    }

    for (pos, &i) in eligible.iter().enumerate() {
        for &j in &eligible[pos + 1..] {
            let a = space.point(&ingredients[i]);
            let b = space.point(&ingredients[j]);
            let share = closest_share(a, b, gap);

            // Endpoints duplicate a single-ingredient set.
            if share <= NUMERIC_SLACK || share >= 1.0 - NUMERIC_SLACK {
                continue;
            }

            let mix = [
                share * a[0] + (1.0 - share) * b[0],
                share * a[1] + (1.0 - share) * b[1],
            ];
            sets.push(PrimarySet {
                members: vec![(i, share), (j, 1.0 - share)],
                distance: distance(mix, gap),
                cost: share * ingredients[i].cost_per_unit
                    + (1.0 - share) * ingredients[j].cost_per_unit,
            });
        }
    }

    // Stable sort: generation order (catalog order) settles remaining ties.
    sets.sort_by(|x, y| {
        x.distance
            .total_cmp(&y.distance)
            .then_with(|| x.cost.total_cmp(&y.cost))
    });
    sets
}

/// Share of `a` in the point of segment `a`–`b` nearest to `gap`.
fn closest_share(a: [f64; 2], b: [f64; 2], gap: [f64; 2]) -> f64 {
    let d = [a[0] - b[0], a[1] - b[1]];
    let len_sq = d[0] * d[0] + d[1] * d[1];
    if len_sq <= f64::EPSILON {
        return 0.5;
    }
    let t = ((gap[0] - b[0]) * d[0] + (gap[1] - b[1]) * d[1]) / len_sq;
    t.clamp(0.0, 1.0)
}

fn distance(p: [f64; 2], q: [f64; 2]) -> f64 {
    ((p[0] - q[0]).powi(2) + (p[1] - q[1]).powi(2)).sqrt()
}

/// Scale the free portion so the blend totals exactly 100%, then clamp into bounds.
fn renormalize(ingredients: &[Ingredient], base: &[f64], free_mass: f64, alloc: &mut [f64]) {
    let allocated: f64 = alloc.iter().zip(base).map(|(a, b)| a - b).sum();
    if allocated > NUMERIC_SLACK {
        let factor = free_mass / allocated;
        for (inclusion, min) in alloc.iter_mut().zip(base) {
            *inclusion = min + (*inclusion - min) * factor;
        }
    }
    for (inclusion, ingredient) in alloc.iter_mut().zip(ingredients) {
        *inclusion = inclusion.clamp(ingredient.min_inclusion, ingredient.max_inclusion);
    }
}
