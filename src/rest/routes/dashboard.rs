// rest/routes/dashboard.rs — operations-dashboard reads: leads, advisors,
// accounts, broker task lists, investment proposals.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::warn;

use crate::error::OnboardError;
use crate::AppContext;

// ─── Leads ────────────────────────────────────────────────────────────────────

pub async fn list_leads(State(ctx): State<Arc<AppContext>>) -> Result<Json<Value>, OnboardError> {
    let rows = ctx.storage.list_leads().await?;
    Ok(Json(json!({ "leads": rows })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLeadRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub advisor_id: Option<String>,
}

pub async fn create_lead(
    State(ctx): State<Arc<AppContext>>,
    Json(body): Json<CreateLeadRequest>,
) -> Result<Json<Value>, OnboardError> {
    if let Some(advisor_id) = body.advisor_id.as_deref() {
        ctx.storage
            .get_advisor(advisor_id)
            .await?
            .ok_or_else(|| OnboardError::NotFound(format!("advisor {advisor_id}")))?;
    }
    let row = ctx
        .storage
        .create_lead(
            &body.name,
            &body.email,
            body.phone.as_deref(),
            body.advisor_id.as_deref(),
        )
        .await?;
    Ok(Json(json!({ "lead": row })))
}

// ─── Advisors ─────────────────────────────────────────────────────────────────

pub async fn list_advisors(
    State(ctx): State<Arc<AppContext>>,
) -> Result<Json<Value>, OnboardError> {
    let rows = ctx.storage.list_advisors().await?;
    Ok(Json(json!({ "advisors": rows })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertAdvisorRequest {
    pub id: String,
    pub name: String,
    pub email: String,
    pub master_account: String,
}

pub async fn upsert_advisor(
    State(ctx): State<Arc<AppContext>>,
    Json(body): Json<UpsertAdvisorRequest>,
) -> Result<Json<Value>, OnboardError> {
    ctx.storage
        .upsert_advisor(&body.id, &body.name, &body.email, &body.master_account)
        .await?;
    Ok(Json(json!({ "advisorId": body.id })))
}

// ─── Accounts ─────────────────────────────────────────────────────────────────

pub async fn list_accounts(
    State(ctx): State<Arc<AppContext>>,
) -> Result<Json<Value>, OnboardError> {
    let rows = ctx.storage.list_accounts().await?;
    Ok(Json(json!({ "accounts": rows })))
}

// ─── Broker task lists ────────────────────────────────────────────────────────

/// Fetch one of the broker's task lists for an account, refreshing the local
/// cache. When the broker is unreachable the cached copy is served instead,
/// marked stale; with no cache either, the broker error surfaces.
async fn task_list(
    ctx: &AppContext,
    account_id: &str,
    kind: &str,
) -> Result<Json<Value>, OnboardError> {
    let account = ctx
        .storage
        .get_account(account_id)
        .await?
        .ok_or_else(|| OnboardError::NotFound(format!("account {account_id}")))?;

    let fetched = match kind {
        "registration" => ctx.broker.registration_tasks(&account.broker_account_id).await,
        _ => ctx.broker.pending_tasks(&account.broker_account_id).await,
    };

    match fetched {
        Ok(tasks) => {
            ctx.storage
                .replace_broker_tasks(account_id, kind, &tasks)
                .await?;
            Ok(Json(json!({ "tasks": tasks, "stale": false })))
        }
        Err(e) => {
            let cached = ctx.storage.list_broker_tasks(account_id, kind).await?;
            if cached.is_empty() {
                return Err(e.into());
            }
            warn!(account_id = %account_id, kind = %kind, err = %e, "broker task fetch failed — serving cache");
            Ok(Json(json!({ "tasks": cached, "stale": true })))
        }
    }
}

pub async fn pending_tasks(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, OnboardError> {
    task_list(&ctx, &id, "pending").await
}

pub async fn registration_tasks(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, OnboardError> {
    task_list(&ctx, &id, "registration").await
}

// ─── Investment proposals ─────────────────────────────────────────────────────

pub async fn list_proposals(
    State(ctx): State<Arc<AppContext>>,
) -> Result<Json<Value>, OnboardError> {
    let rows = ctx.storage.list_proposals().await?;
    Ok(Json(json!({ "proposals": rows })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProposalRequest {
    pub account_id: String,
    pub name: String,
    pub risk_profile: String,
    /// Allocations, fees, notes — stored verbatim.
    pub body: Value,
}

pub async fn create_proposal(
    State(ctx): State<Arc<AppContext>>,
    Json(body): Json<CreateProposalRequest>,
) -> Result<Json<Value>, OnboardError> {
    ctx.storage
        .get_account(&body.account_id)
        .await?
        .ok_or_else(|| OnboardError::NotFound(format!("account {}", body.account_id)))?;
    let body_json = serde_json::to_string(&body.body)
        .map_err(|e| OnboardError::Internal(anyhow::anyhow!("serialize proposal body: {e}")))?;
    let row = ctx
        .storage
        .create_proposal(&body.account_id, &body.name, &body.risk_profile, &body_json)
        .await?;
    Ok(Json(json!({ "proposal": row })))
}
