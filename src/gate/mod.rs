//! Cost gate for billable generation.
//!
//! # Overview
//!
//! Every billable action moves through
//! `Idle → Estimating → AwaitingConfirmation → Executing → Reconciling → Idle`.
//! The gate holds at most one action awaiting confirmation; submitting a
//! new one replaces it. `Estimating` and `Reconciling` are taken
//! synchronously inside `submit` and `execute`, so [`CostGate::phase`] only
//! ever reports the other three.
//!
//! - **submit**: credential check, then input preparation, then estimate
//! - **cancel**: drop the pending action, no side effects
//! - **confirm**: take the pending action for execution
//! - **execute**: invoke once, then commit the artifact and accrue the
//!   reported usage in a single document update, unless the document was
//!   replaced in the meantime
//!
//! # Example
//!
//! ```ignore
//! let estimate = gate.submit(credential.as_ref(), || Ok(action))?;
//! println!("{} will cost about {}", estimate.action, format_currency(estimate.total_cost));
//!
//! let receipt = gate.confirm()?.execute(&store, invoke, commit).await?;
//! println!("{}", receipt.summary());
//! ```

mod action;
mod notification;

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

pub use action::{ActionKind, OutputEstimates};
pub use notification::{CostNotification, DEFAULT_DISMISS_AFTER};

use crate::budget::{
    format_currency, format_percent_delta, percent_delta, PricingModel, TokenCount, TokenEstimator,
};
use crate::capability::{CapabilityError, Credential, Generated};
use crate::error::{StudioError, StudioResult};
use crate::history::ProjectStore;
use crate::project::ProjectDocument;

/// Lifecycle phase of a billable action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GatePhase {
    Idle,
    Estimating,
    AwaitingConfirmation,
    Executing,
    Reconciling,
}

/// Pre-execution cost estimate shown to the user.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostEstimate {
    pub action: ActionKind,
    pub model: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_cost: f64,
}

/// Usage reported by the capability after execution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActualUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_cost: f64,
}

/// Actual cost of a completed action, compared with its estimate.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostReceipt {
    pub action: ActionKind,
    pub actual: ActualUsage,
    pub estimated_cost: f64,
}

impl CostReceipt {
    /// Signed difference of actual against estimated cost, in percent.
    pub fn delta_percent(&self) -> Option<f64> {
        percent_delta(self.estimated_cost, self.actual.total_cost)
    }

    /// One-line notification text.
    pub fn summary(&self) -> String {
        format!(
            "{}: {} (estimated {}, {}) | {} in / {} out tokens",
            self.action,
            format_currency(self.actual.total_cost),
            format_currency(self.estimated_cost),
            format_percent_delta(self.estimated_cost, self.actual.total_cost),
            self.actual.input_tokens,
            self.actual.output_tokens
        )
    }
}

/// A fully prepared action handed to [`CostGate::submit`].
#[derive(Debug, Clone)]
pub struct BillableAction<R> {
    pub kind: ActionKind,
    /// Text the input estimate is derived from
    pub input_text: String,
    pub payload: R,
}

#[derive(Debug)]
struct PendingAction<R> {
    estimate: CostEstimate,
    payload: R,
}

/// Single-slot confirmation gate.
#[derive(Debug)]
pub struct CostGate<R> {
    pricing: PricingModel,
    estimator: TokenEstimator,
    outputs: OutputEstimates,
    pending: Option<PendingAction<R>>,
    in_flight: Arc<AtomicUsize>,
}

/// Counts a confirmed action as executing until dropped.
#[derive(Debug)]
struct InFlight(Arc<AtomicUsize>);

impl InFlight {
    fn begin(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(counter))
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl<R> Default for CostGate<R> {
    fn default() -> Self {
        Self::new(
            PricingModel::default(),
            TokenEstimator::default(),
            OutputEstimates::default(),
        )
    }
}

impl<R> CostGate<R> {
    pub fn new(pricing: PricingModel, estimator: TokenEstimator, outputs: OutputEstimates) -> Self {
        Self {
            pricing,
            estimator,
            outputs,
            pending: None,
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn pricing(&self) -> &PricingModel {
        &self.pricing
    }

    /// Estimate the cost of an action without queueing it.
    pub fn estimate(&self, kind: ActionKind, input_text: &str) -> CostEstimate {
        let input_tokens = self.estimator.estimate(input_text);
        let output_tokens = self.outputs.for_kind(kind);
        CostEstimate {
            action: kind,
            model: kind.model().to_string(),
            input_tokens,
            output_tokens,
            total_cost: self.pricing.cost(input_tokens, output_tokens),
        }
    }

    /// Queue an action for confirmation.
    ///
    /// The credential is checked before `prepare` runs, so nothing is
    /// estimated for an action that could not execute. A previously pending
    /// action is discarded.
    pub fn submit<F>(&mut self, credential: Option<&Credential>, prepare: F) -> StudioResult<CostEstimate>
    where
        F: FnOnce() -> StudioResult<BillableAction<R>>,
    {
        if credential.is_none() {
            warn!("billable action rejected: no credential");
            return Err(StudioError::CredentialMissing);
        }

        let action = prepare()?;
        let estimate = self.estimate(action.kind, &action.input_text);
        info!(
            action = %estimate.action,
            model = %estimate.model,
            input_tokens = estimate.input_tokens,
            output_tokens = estimate.output_tokens,
            phase = ?GatePhase::AwaitingConfirmation,
            "cost estimated"
        );

        if let Some(replaced) = self.pending.take() {
            info!(action = %replaced.estimate.action, "pending action replaced");
        }
        self.pending = Some(PendingAction {
            estimate: estimate.clone(),
            payload: action.payload,
        });
        Ok(estimate)
    }

    /// A pending confirmation takes precedence over a call still executing.
    pub fn phase(&self) -> GatePhase {
        if self.pending.is_some() {
            GatePhase::AwaitingConfirmation
        } else if self.in_flight.load(Ordering::SeqCst) > 0 {
            GatePhase::Executing
        } else {
            GatePhase::Idle
        }
    }

    pub fn pending(&self) -> Option<&CostEstimate> {
        self.pending.as_ref().map(|pending| &pending.estimate)
    }

    pub fn pending_payload(&self) -> Option<&R> {
        self.pending.as_ref().map(|pending| &pending.payload)
    }

    /// Drop the pending action. Returns its estimate, if any.
    pub fn cancel(&mut self) -> Option<CostEstimate> {
        let cancelled = self.pending.take().map(|pending| pending.estimate);
        if let Some(estimate) = &cancelled {
            info!(action = %estimate.action, phase = ?GatePhase::Idle, "billable action cancelled");
        }
        cancelled
    }

    /// Take the pending action for execution.
    pub fn confirm(&mut self) -> StudioResult<ConfirmedAction<R>> {
        let pending = self.pending.take().ok_or(StudioError::NoPendingAction)?;
        Ok(ConfirmedAction {
            estimate: pending.estimate,
            payload: pending.payload,
            pricing: self.pricing,
            _in_flight: InFlight::begin(&self.in_flight),
        })
    }
}

/// An action the user agreed to pay for.
#[derive(Debug)]
pub struct ConfirmedAction<R> {
    estimate: CostEstimate,
    payload: R,
    pricing: PricingModel,
    _in_flight: InFlight,
}

impl<R> ConfirmedAction<R> {
    pub fn estimate(&self) -> &CostEstimate {
        &self.estimate
    }

    pub fn payload(&self) -> &R {
        &self.payload
    }

    /// Invoke the capability once and reconcile the outcome.
    ///
    /// On failure the document is left untouched and nothing is accrued.
    /// On success `commit` stores the artifact and the reported usage is
    /// accrued in the same store update, producing one undo entry. If the
    /// store's document was replaced while the call ran, neither is
    /// committed and `ProjectReplaced` is returned.
    pub async fn execute<T, I, Fut, C>(
        self,
        store: &ProjectStore,
        invoke: I,
        commit: C,
    ) -> StudioResult<CostReceipt>
    where
        I: FnOnce(R) -> Fut,
        Fut: Future<Output = Result<Generated<T>, CapabilityError>>,
        C: FnOnce(&mut ProjectDocument, T),
    {
        let action = self.estimate.action;
        let epoch = store.epoch();
        info!(action = %action, phase = ?GatePhase::Executing, "invoking generation");

        let generated = invoke(self.payload).await.map_err(|err| {
            warn!(action = %action, error = %err, "generation failed");
            StudioError::GenerationFailed {
                action,
                message: err.to_string(),
            }
        })?;

        let usage: TokenCount = generated.usage;
        let pricing = self.pricing;
        let committed = store.update_in_epoch(epoch, |doc| {
            commit(doc, generated.output);
            Ok(doc.usage_stats.accrue_priced(usage, &pricing))
        })?;
        let Some(actual_cost) = committed else {
            warn!(
                action = %action,
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                "project replaced during generation; result and usage discarded"
            );
            return Err(StudioError::ProjectReplaced(action));
        };

        let receipt = CostReceipt {
            action,
            actual: ActualUsage {
                input_tokens: usage.input_tokens,
                output_tokens: usage.output_tokens,
                total_cost: actual_cost,
            },
            estimated_cost: self.estimate.total_cost,
        };
        info!(
            action = %action,
            phase = ?GatePhase::Reconciling,
            actual = %format_currency(actual_cost),
            estimated = %format_currency(receipt.estimated_cost),
            "usage reconciled"
        );
        Ok(receipt)
    }
}
