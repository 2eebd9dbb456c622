//! Feed formulation domain module.
//!
//! Blends livestock feed from an ingredient catalog so the mix hits a
//! protein/energy target within tolerance, stays under a cost ceiling and
//! respects each ingredient's inclusion band. Pure, deterministic domain
//! logic (no IO, no HTTP, no storage).

pub mod error;
pub mod evaluate;
pub mod ingredient;
pub mod optimize;
mod refine;
pub mod score;
pub mod session;
pub mod state;
pub mod target;

#[cfg(test)]
mod fixtures;

pub use error::FormulationError;
pub use evaluate::{
    ConstraintEvaluator, FormulationResult, MASS_BALANCE_TOLERANCE, NUMERIC_SLACK, Totals,
    Violation, evaluate,
};
pub use ingredient::{Ingredient, IngredientCatalog, IngredientId};
pub use optimize::{
    DEFAULT_MAX_ROUNDS, OptimizationOutcome, Optimizer, OptimizerConfig, optimize,
};
pub use score::{EfficiencyScorer, ScoreWeights, score};
pub use session::{
    BlendEvaluated, BlendOptimized, ChangeTarget, EditInclusion, FormulationSaved,
    FormulationSession, InclusionEdited, MarkSaved, OptimizeBlend, ReplaceState, SessionCommand,
    SessionEvent, SessionId, SessionPhase, StateReplaced, TargetChanged,
};
pub use state::{COMPLETE_TOTAL_TOLERANCE, FormulationState};
pub use target::NutritionalTarget;
