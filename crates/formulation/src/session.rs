//! Formulation session: one user's blend being edited, evaluated, optimized
//! and finally handed off for saving.
//!
//! Lifecycle: `Draft → Evaluated` on every edit, `→ Optimized` on an explicit
//! optimize request (an optimized blend is also evaluated), `→ Saved` once
//! the external persistence collaborator has stored it. Any later edit starts
//! a new draft.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use feedforge_core::{
    Aggregate, AggregateId, AggregateRoot, DomainError, DomainResult, TenantId,
};

use crate::evaluate::FormulationResult;
use crate::ingredient::{IngredientCatalog, IngredientId};
use crate::optimize::{Optimizer, OptimizerConfig};
use crate::state::FormulationState;
use crate::target::NutritionalTarget;

/// Session identifier (tenant-scoped via `tenant_id` fields in commands/events).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub AggregateId);

impl SessionId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for SessionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Where the session's blend stands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "lowercase")]
pub enum SessionPhase {
    /// Edited but not yet evaluated.
    Draft { state: FormulationState },
    Evaluated {
        state: FormulationState,
        result: FormulationResult,
    },
    Optimized {
        state: FormulationState,
        result: FormulationResult,
        rounds: usize,
    },
    Saved {
        state: FormulationState,
        result: FormulationResult,
        name: String,
    },
}

impl SessionPhase {
    pub fn state(&self) -> &FormulationState {
        match self {
            SessionPhase::Draft { state }
            | SessionPhase::Evaluated { state, .. }
            | SessionPhase::Optimized { state, .. }
            | SessionPhase::Saved { state, .. } => state,
        }
    }

    /// Latest evaluation; `None` while in draft.
    pub fn result(&self) -> Option<&FormulationResult> {
        match self {
            SessionPhase::Draft { .. } => None,
            SessionPhase::Evaluated { result, .. }
            | SessionPhase::Optimized { result, .. }
            | SessionPhase::Saved { result, .. } => Some(result),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SessionPhase::Draft { .. } => "draft",
            SessionPhase::Evaluated { .. } => "evaluated",
            SessionPhase::Optimized { .. } => "optimized",
            SessionPhase::Saved { .. } => "saved",
        }
    }
}

/// Aggregate root: FormulationSession.
///
/// Holds a shared, read-only catalog; the session only ever replaces its own
/// blend and target.
#[derive(Debug, Clone, PartialEq)]
pub struct FormulationSession {
    id: SessionId,
    tenant_id: TenantId,
    catalog: Arc<IngredientCatalog>,
    target: NutritionalTarget,
    optimizer: Optimizer,
    phase: SessionPhase,
    version: u64,
}

impl FormulationSession {
    /// Open a session with an empty draft blend.
    pub fn open(
        id: SessionId,
        tenant_id: TenantId,
        catalog: Arc<IngredientCatalog>,
        target: NutritionalTarget,
    ) -> Self {
        Self {
            id,
            tenant_id,
            catalog,
            target,
            optimizer: Optimizer::default(),
            phase: SessionPhase::Draft {
                state: FormulationState::new(),
            },
            version: 0,
        }
    }

    pub fn with_optimizer_config(mut self, config: OptimizerConfig) -> Self {
        self.optimizer = Optimizer::new(config);
        self
    }

    pub fn id_typed(&self) -> SessionId {
        self.id
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn catalog(&self) -> &IngredientCatalog {
        &self.catalog
    }

    pub fn target(&self) -> &NutritionalTarget {
        &self.target
    }

    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    pub fn state(&self) -> &FormulationState {
        self.phase.state()
    }

    pub fn result(&self) -> Option<&FormulationResult> {
        self.phase.result()
    }
}

impl AggregateRoot for FormulationSession {
    type Id = SessionId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: set one ingredient's inclusion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditInclusion {
    pub tenant_id: TenantId,
    pub session_id: SessionId,
    pub ingredient_id: IngredientId,
    pub inclusion: f64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: replace the whole blend (e.g. load a saved formulation).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplaceState {
    pub tenant_id: TenantId,
    pub session_id: SessionId,
    pub state: FormulationState,
    pub occurred_at: DateTime<Utc>,
}

/// Command: change the nutritional target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeTarget {
    pub tenant_id: TenantId,
    pub session_id: SessionId,
    pub target: NutritionalTarget,
    pub occurred_at: DateTime<Utc>,
}

/// Command: replace the blend with the optimizer's best.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizeBlend {
    pub tenant_id: TenantId,
    pub session_id: SessionId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: record that the evaluated blend was saved under `name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkSaved {
    pub tenant_id: TenantId,
    pub session_id: SessionId,
    pub name: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SessionCommand {
    EditInclusion(EditInclusion),
    ReplaceState(ReplaceState),
    ChangeTarget(ChangeTarget),
    OptimizeBlend(OptimizeBlend),
    MarkSaved(MarkSaved),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InclusionEdited {
    pub tenant_id: TenantId,
    pub session_id: SessionId,
    pub ingredient_id: IngredientId,
    pub inclusion: f64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateReplaced {
    pub tenant_id: TenantId,
    pub session_id: SessionId,
    pub state: FormulationState,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetChanged {
    pub tenant_id: TenantId,
    pub session_id: SessionId,
    pub target: NutritionalTarget,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlendEvaluated {
    pub tenant_id: TenantId,
    pub session_id: SessionId,
    pub result: FormulationResult,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlendOptimized {
    pub tenant_id: TenantId,
    pub session_id: SessionId,
    pub state: FormulationState,
    pub result: FormulationResult,
    pub rounds: usize,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormulationSaved {
    pub tenant_id: TenantId,
    pub session_id: SessionId,
    pub name: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SessionEvent {
    InclusionEdited(InclusionEdited),
    StateReplaced(StateReplaced),
    TargetChanged(TargetChanged),
    BlendEvaluated(BlendEvaluated),
    BlendOptimized(BlendOptimized),
    FormulationSaved(FormulationSaved),
}

impl SessionEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            SessionEvent::InclusionEdited(_) => "formulation.session.inclusion_edited",
            SessionEvent::StateReplaced(_) => "formulation.session.state_replaced",
            SessionEvent::TargetChanged(_) => "formulation.session.target_changed",
            SessionEvent::BlendEvaluated(_) => "formulation.session.blend_evaluated",
            SessionEvent::BlendOptimized(_) => "formulation.session.blend_optimized",
            SessionEvent::FormulationSaved(_) => "formulation.session.saved",
        }
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            SessionEvent::InclusionEdited(e) => e.occurred_at,
            SessionEvent::StateReplaced(e) => e.occurred_at,
            SessionEvent::TargetChanged(e) => e.occurred_at,
            SessionEvent::BlendEvaluated(e) => e.occurred_at,
            SessionEvent::BlendOptimized(e) => e.occurred_at,
            SessionEvent::FormulationSaved(e) => e.occurred_at,
        }
    }
}

impl Aggregate for FormulationSession {
    type Command = SessionCommand;
    type Event = SessionEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        let current = self.phase.state().clone();
        match event {
            SessionEvent::InclusionEdited(e) => {
                let mut state = current;
                state.set(e.ingredient_id.clone(), e.inclusion);
                self.phase = SessionPhase::Draft { state };
            }
            SessionEvent::StateReplaced(e) => {
                self.phase = SessionPhase::Draft {
                    state: e.state.clone(),
                };
            }
            SessionEvent::TargetChanged(e) => {
                self.target = e.target;
                self.phase = SessionPhase::Draft { state: current };
            }
            SessionEvent::BlendEvaluated(e) => {
                self.phase = SessionPhase::Evaluated {
                    state: current,
                    result: e.result.clone(),
                };
            }
            SessionEvent::BlendOptimized(e) => {
                self.phase = SessionPhase::Optimized {
                    state: e.state.clone(),
                    result: e.result.clone(),
                    rounds: e.rounds,
                };
            }
            SessionEvent::FormulationSaved(e) => {
                if let Some(result) = self.phase.result().cloned() {
                    self.phase = SessionPhase::Saved {
                        state: current,
                        result,
                        name: e.name.clone(),
                    };
                }
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            SessionCommand::EditInclusion(cmd) => self.handle_edit(cmd),
            SessionCommand::ReplaceState(cmd) => self.handle_replace(cmd),
            SessionCommand::ChangeTarget(cmd) => self.handle_change_target(cmd),
            SessionCommand::OptimizeBlend(cmd) => self.handle_optimize(cmd),
            SessionCommand::MarkSaved(cmd) => self.handle_mark_saved(cmd),
        }
    }
}

impl FormulationSession {
    fn ensure_scope(&self, tenant_id: TenantId, session_id: SessionId) -> DomainResult<()> {
        if self.tenant_id != tenant_id {
            return Err(DomainError::invariant("tenant mismatch"));
        }
        if self.id != session_id {
            return Err(DomainError::invariant("session_id mismatch"));
        }
        Ok(())
    }

    fn evaluated(
        &self,
        tenant_id: TenantId,
        state: &FormulationState,
        target: &NutritionalTarget,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<SessionEvent> {
        let result = self
            .optimizer
            .evaluator()
            .evaluate(state, &self.catalog, target)?;
        Ok(SessionEvent::BlendEvaluated(BlendEvaluated {
            tenant_id,
            session_id: self.id,
            result,
            occurred_at,
        }))
    }

    fn handle_edit(&self, cmd: &EditInclusion) -> DomainResult<Vec<SessionEvent>> {
        self.ensure_scope(cmd.tenant_id, cmd.session_id)?;

        if !self.catalog.contains(&cmd.ingredient_id) {
            return Err(DomainError::validation(format!(
                "unknown ingredient: {}",
                cmd.ingredient_id
            )));
        }
        if !cmd.inclusion.is_finite() {
            return Err(DomainError::validation("inclusion must be a finite number"));
        }

        let mut state = self.state().clone();
        state.set(cmd.ingredient_id.clone(), cmd.inclusion);

        Ok(vec![
            SessionEvent::InclusionEdited(InclusionEdited {
                tenant_id: cmd.tenant_id,
                session_id: cmd.session_id,
                ingredient_id: cmd.ingredient_id.clone(),
                inclusion: cmd.inclusion,
                occurred_at: cmd.occurred_at,
            }),
            self.evaluated(cmd.tenant_id, &state, &self.target, cmd.occurred_at)?,
        ])
    }

    fn handle_replace(&self, cmd: &ReplaceState) -> DomainResult<Vec<SessionEvent>> {
        self.ensure_scope(cmd.tenant_id, cmd.session_id)?;

        // Evaluating first rejects unknown ingredients before anything is emitted.
        let evaluated = self.evaluated(cmd.tenant_id, &cmd.state, &self.target, cmd.occurred_at)?;

        Ok(vec![
            SessionEvent::StateReplaced(StateReplaced {
                tenant_id: cmd.tenant_id,
                session_id: cmd.session_id,
                state: cmd.state.clone(),
                occurred_at: cmd.occurred_at,
            }),
            evaluated,
        ])
    }

    fn handle_change_target(&self, cmd: &ChangeTarget) -> DomainResult<Vec<SessionEvent>> {
        self.ensure_scope(cmd.tenant_id, cmd.session_id)?;
        cmd.target.validate()?;

        Ok(vec![
            SessionEvent::TargetChanged(TargetChanged {
                tenant_id: cmd.tenant_id,
                session_id: cmd.session_id,
                target: cmd.target,
                occurred_at: cmd.occurred_at,
            }),
            self.evaluated(cmd.tenant_id, self.state(), &cmd.target, cmd.occurred_at)?,
        ])
    }

    fn handle_optimize(&self, cmd: &OptimizeBlend) -> DomainResult<Vec<SessionEvent>> {
        self.ensure_scope(cmd.tenant_id, cmd.session_id)?;

        let outcome = self.optimizer.optimize(&self.catalog, &self.target)?;

        Ok(vec![SessionEvent::BlendOptimized(BlendOptimized {
            tenant_id: cmd.tenant_id,
            session_id: cmd.session_id,
            state: outcome.state,
            result: outcome.result,
            rounds: outcome.rounds,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_mark_saved(&self, cmd: &MarkSaved) -> DomainResult<Vec<SessionEvent>> {
        self.ensure_scope(cmd.tenant_id, cmd.session_id)?;

        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("formulation name cannot be empty"));
        }

        match &self.phase {
            SessionPhase::Draft { .. } => Err(DomainError::invariant(
                "a draft formulation must be evaluated before it can be saved",
            )),
            SessionPhase::Saved { .. } => Err(DomainError::conflict("formulation is already saved")),
            SessionPhase::Evaluated { .. } | SessionPhase::Optimized { .. } => {
                Ok(vec![SessionEvent::FormulationSaved(FormulationSaved {
                    tenant_id: cmd.tenant_id,
                    session_id: cmd.session_id,
                    name: cmd.name.trim().to_string(),
                    occurred_at: cmd.occurred_at,
                })])
            }
        }
    }
}
