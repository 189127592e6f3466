//! Update orchestrator
//!
//! Owns the current `FinancialData` of every user session and threads it
//! through generation and reconciliation:
//!
//! INTENT → DRAFT → PROMPT → GENERATE → RECONCILE → COMMIT
//!
//! Each session is a single-writer state container. A request holds the
//! session lock until it has reconciled or failed, so a second submission
//! for the same user is rejected instead of racing on stale fallback data.

use crate::error::PlannerError;
use crate::extractor::extract;
use crate::generator::{parse_generator_response, Generator};
use crate::intents::{FieldChange, FieldEdits, ItemKind, ItemRequest};
use crate::models::{Allocation, Expense, FinancialData, Portfolio};
use crate::prompts;
use crate::reconcile::{reconcile, Fallback};
use crate::state::{user_id_for_key, PlanStore, StoredPlan};
use crate::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Lifecycle of the latest request on a session
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UpdateStatus {
    Idle,
    Submitted,
    Reconciled,
    Failed,
}

/// Per-user state. Only the orchestrator mutates it, and only while
/// holding the session lock.
#[derive(Debug, Clone)]
pub struct PlanSession {
    user_id: Uuid,
    input_text: String,
    current: Option<FinancialData>,
    last_update_prompt: Option<String>,
    status: UpdateStatus,
    last_error: Option<String>,
}

impl PlanSession {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            input_text: String::new(),
            current: None,
            last_update_prompt: None,
            status: UpdateStatus::Idle,
            last_error: None,
        }
    }

    fn from_stored(stored: StoredPlan) -> Self {
        Self {
            user_id: stored.user_id,
            input_text: stored.input_text,
            current: Some(stored.data),
            last_update_prompt: stored.last_update_prompt,
            status: UpdateStatus::Idle,
            last_error: None,
        }
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn current(&self) -> Option<&FinancialData> {
        self.current.as_ref()
    }

    pub fn status(&self) -> UpdateStatus {
        self.status
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_updating(&self) -> bool {
        self.status == UpdateStatus::Submitted
    }

    fn require_current(&self) -> Result<FinancialData> {
        self.current.clone().ok_or(PlannerError::NoPlan)
    }
}

/// Coordinates generator, reconciler and store for all sessions
pub struct PlanOrchestrator {
    generator: Box<dyn Generator>,
    store: Box<dyn PlanStore>,
    sessions: RwLock<HashMap<Uuid, Arc<Mutex<PlanSession>>>>,
}

impl PlanOrchestrator {
    pub fn new(generator: Box<dyn Generator>, store: Box<dyn PlanStore>) -> Self {
        Self {
            generator,
            store,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    //
    // ================= Operations =================
    //

    /// Build a new plan from free text, replacing any existing one.
    pub async fn generate(&self, user_key: &str, text: &str) -> Result<FinancialData> {
        if text.trim().is_empty() {
            return Err(PlannerError::InvalidInput(
                "Describe your income and expenses first".to_string(),
            ));
        }

        let session = self.open_session(user_id_for_key(user_key)).await?;
        let mut session = lock(session)?;
        info!(user_id = %session.user_id, "Generating plan");

        // The extractor needs no I/O; its output is only read once the
        // generator has answered.
        let fallback = Fallback::from(extract(text));
        let prompt = prompts::generation_prompt(text);

        let generated = self.request(&mut session, &prompt).await?;
        let data = reconcile(&generated, &fallback);

        session.input_text = text.to_string();
        self.commit(&mut session, data, None).await
    }

    /// Apply batched field edits. A batch that changes nothing is never sent.
    pub async fn update_fields(&self, user_key: &str, edits: &FieldEdits) -> Result<FinancialData> {
        let mut session = self.acquire_existing(user_key).await?;
        let current = session.require_current()?;

        let changes = edits.changes(&current)?;
        let notes = edits.notes();
        if changes.is_empty() && notes.is_none() {
            debug!(user_id = %session.user_id, "Field update skipped: no changes");
            return Err(PlannerError::NothingToUpdate);
        }

        info!(
            user_id = %session.user_id,
            changes = changes.len(),
            has_notes = notes.is_some(),
            "Updating plan fields"
        );

        // Edited values are authoritative even when the generator omits them
        let mut draft = current.clone();
        for change in &changes {
            apply_change(&mut draft, change);
        }

        let prompt = prompts::field_update_prompt(&current, &changes, notes)?;
        let generated = self.request(&mut session, &prompt).await?;
        let data = reconcile(&generated, &Fallback::from(&draft));

        self.commit(&mut session, data, Some(prompt)).await
    }

    /// Remix or complete one strategy, action item, expense recommendation
    /// or the weekly check-in.
    pub async fn update_item(&self, user_key: &str, request: &ItemRequest) -> Result<FinancialData> {
        let mut session = self.acquire_existing(user_key).await?;
        let current = session.require_current()?;

        let target = request.resolve(&current).ok_or_else(|| {
            PlannerError::ItemNotFound(format!(
                "{:?} \"{}\"",
                request.kind,
                request.target.as_deref().unwrap_or_default()
            ))
        })?;

        info!(
            user_id = %session.user_id,
            kind = ?request.kind,
            action = ?request.action,
            item = %target,
            "Updating plan item"
        );

        let prompt = prompts::item_update_prompt(&current, request.kind, request.action, &target)?;
        let generated = self.request(&mut session, &prompt).await?;
        let mut data = reconcile(&generated, &Fallback::from(&current));

        if request.kind == ItemKind::Expense {
            data.expenses = pin_expenses(&current, &data, &target);
        }

        self.commit(&mut session, data, Some(prompt)).await
    }

    /// Replace the full portfolio allocation list
    pub async fn update_portfolio(
        &self,
        user_key: &str,
        allocations: &[Allocation],
    ) -> Result<FinancialData> {
        validate_allocations(allocations)?;

        let mut session = self.acquire_existing(user_key).await?;
        let current = session.require_current()?;
        info!(
            user_id = %session.user_id,
            allocations = allocations.len(),
            "Updating portfolio"
        );

        let mut draft = current.clone();
        draft.plan.portfolio = Some(Portfolio {
            allocations: allocations.to_vec(),
            quality_summary: None,
        });

        let prompt = prompts::portfolio_update_prompt(&current, allocations)?;
        let generated = self.request(&mut session, &prompt).await?;
        let data = reconcile(&generated, &Fallback::from(&draft));

        self.commit(&mut session, data, Some(prompt)).await
    }

    /// Ask for a prose quality summary of an allocation list
    pub async fn check_portfolio_quality(
        &self,
        user_key: &str,
        allocations: &[Allocation],
    ) -> Result<FinancialData> {
        validate_allocations(allocations)?;

        let mut session = self.acquire_existing(user_key).await?;
        let current = session.require_current()?;
        info!(user_id = %session.user_id, "Checking portfolio quality");

        let mut draft = current.clone();
        let previous_summary = current
            .plan
            .portfolio
            .as_ref()
            .and_then(|p| p.quality_summary.clone());
        draft.plan.portfolio = Some(Portfolio {
            allocations: allocations.to_vec(),
            quality_summary: previous_summary,
        });

        let prompt = prompts::portfolio_quality_prompt(&current, allocations)?;
        let generated = self.request(&mut session, &prompt).await?;
        let data = reconcile(&generated, &Fallback::from(&draft));

        self.commit(&mut session, data, Some(prompt)).await
    }

    /// Latest reconciled plan for a user
    pub async fn load(&self, user_key: &str) -> Result<FinancialData> {
        let session = self
            .find_session(user_id_for_key(user_key))
            .await?
            .ok_or(PlannerError::NoPlan)?;
        let session = session.lock().await;
        session.require_current()
    }

    /// Status of the user's latest request, `Submitted` while one is in flight
    pub async fn status(&self, user_key: &str) -> Result<(UpdateStatus, Option<String>)> {
        let Some(session) = self.find_session(user_id_for_key(user_key)).await? else {
            return Ok((UpdateStatus::Idle, None));
        };
        let status = match session.try_lock() {
            Ok(session) => (session.status, session.last_error.clone()),
            Err(_) => (UpdateStatus::Submitted, None),
        };
        Ok(status)
    }

    //
    // ================= Session plumbing =================
    //

    /// Registered session, or one restored from the store. Unknown users
    /// are not registered.
    async fn find_session(&self, user_id: Uuid) -> Result<Option<Arc<Mutex<PlanSession>>>> {
        if let Some(session) = self.sessions.read().await.get(&user_id) {
            return Ok(Some(session.clone()));
        }

        // Store read happens outside the registry lock
        let Some(stored) = self.store.load(user_id).await? else {
            return Ok(None);
        };

        let mut sessions = self.sessions.write().await;
        let session = sessions
            .entry(user_id)
            .or_insert_with(|| {
                debug!(user_id = %user_id, "Restored plan session from store");
                Arc::new(Mutex::new(PlanSession::from_stored(stored)))
            })
            .clone();
        Ok(Some(session))
    }

    /// Existing session or a fresh one. Only generation registers new users.
    async fn open_session(&self, user_id: Uuid) -> Result<Arc<Mutex<PlanSession>>> {
        if let Some(session) = self.find_session(user_id).await? {
            return Ok(session);
        }

        let mut sessions = self.sessions.write().await;
        Ok(sessions
            .entry(user_id)
            .or_insert_with(|| Arc::new(Mutex::new(PlanSession::new(user_id))))
            .clone())
    }

    /// Lock the session of a user who already has a plan
    async fn acquire_existing(&self, user_key: &str) -> Result<OwnedMutexGuard<PlanSession>> {
        let session = self
            .find_session(user_id_for_key(user_key))
            .await?
            .ok_or(PlannerError::NoPlan)?;
        lock(session)
    }

    /// Call the generator. On failure the session keeps its last good plan.
    async fn request(&self, session: &mut PlanSession, prompt: &str) -> Result<Value> {
        session.status = UpdateStatus::Submitted;

        let outcome = match self.generator.generate(prompt).await {
            Ok(raw) => parse_generator_response(&raw),
            Err(e) => Err(e),
        };

        outcome.map_err(|e| {
            warn!(user_id = %session.user_id, error = %e, "Plan request failed");
            session.status = UpdateStatus::Failed;
            session.last_error = Some(e.to_string());
            e
        })
    }

    /// Replace the session's plan and persist a snapshot
    async fn commit(
        &self,
        session: &mut PlanSession,
        data: FinancialData,
        update_prompt: Option<String>,
    ) -> Result<FinancialData> {
        session.current = Some(data.clone());
        session.last_update_prompt = update_prompt;
        session.status = UpdateStatus::Reconciled;
        session.last_error = None;

        let snapshot = StoredPlan::new(
            session.user_id,
            data.clone(),
            session.input_text.clone(),
            session.last_update_prompt.clone(),
        );

        // The reconciled plan stands even if the snapshot cannot be written
        if let Err(e) = self.store.save(&snapshot).await {
            warn!(user_id = %session.user_id, error = %e, "Failed to persist plan snapshot");
        }

        info!(
            user_id = %session.user_id,
            income = data.income,
            expenses = data.expenses.len(),
            "Plan reconciled"
        );

        Ok(data)
    }
}

/// Lock a session for one request. Fails fast while another is in flight.
fn lock(session: Arc<Mutex<PlanSession>>) -> Result<OwnedMutexGuard<PlanSession>> {
    session.try_lock_owned().map_err(|_| {
        warn!("Rejected submission: update already in progress");
        PlannerError::UpdateInProgress
    })
}

fn apply_change(draft: &mut FinancialData, change: &FieldChange) {
    match change {
        FieldChange::Income(value) => draft.income = *value,
        FieldChange::CurrentSavings(value) => draft.current_savings = *value,
        FieldChange::SavingsGoal(value) => draft.savings_goal = *value,
        FieldChange::Expenses(expenses) => draft.expenses = expenses.clone(),
    }
}

/// Expense item updates may only touch the target's recommendation; list
/// membership, names, amounts and priorities stay as they were.
fn pin_expenses(
    previous: &FinancialData,
    reconciled: &FinancialData,
    target: &str,
) -> Vec<Expense> {
    let new_recommendation = reconciled
        .expenses
        .iter()
        .find(|e| e.name.eq_ignore_ascii_case(target))
        .map(|e| e.recommendation.clone());

    previous
        .expenses
        .iter()
        .cloned()
        .map(|mut expense| {
            if expense.name == target {
                if let Some(recommendation) = &new_recommendation {
                    expense.recommendation = recommendation.clone();
                }
            }
            expense
        })
        .collect()
}

fn validate_allocations(allocations: &[Allocation]) -> Result<()> {
    if allocations.is_empty() {
        return Err(PlannerError::InvalidInput(
            "Portfolio needs at least one allocation".to_string(),
        ));
    }
    if let Some(bad) = allocations
        .iter()
        .find(|a| a.name.trim().is_empty() || !a.percentage.is_finite() || a.percentage < 0.0)
    {
        return Err(PlannerError::InvalidInput(format!(
            "Invalid allocation: {}",
            bad
        )));
    }
    Ok(())
}
