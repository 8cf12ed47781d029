// rest/routes/apply.rs — public apply-link resolution.
//
// Apply links carry three query parameters: `ma` (master-account selector,
// `br` or `ad`), `ad` (advisor id), and `ld` (lead id). Resolving a link
// validates the referenced records and opens a draft application carrying
// the referrer.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::warn;

use crate::error::OnboardError;
use crate::model::{CustomerType, MasterAccount};
use crate::wizard::Referrer;
use crate::AppContext;

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct ApplyParams {
    pub ma: Option<String>,
    pub ad: Option<String>,
    pub ld: Option<String>,
}

pub async fn apply_link(
    State(ctx): State<Arc<AppContext>>,
    Query(params): Query<ApplyParams>,
) -> Result<Json<Value>, OnboardError> {
    let master_account = match params.ma.as_deref() {
        None | Some("") => None,
        Some(raw) => Some(
            raw.parse::<MasterAccount>()
                .map_err(OnboardError::BusinessRule)?,
        ),
    };

    let advisor = match params.ad.as_deref().filter(|s| !s.is_empty()) {
        Some(id) => Some(
            ctx.storage
                .get_advisor(id)
                .await?
                .ok_or_else(|| OnboardError::NotFound(format!("advisor {id}")))?,
        ),
        None => None,
    };

    let lead = match params.ld.as_deref().filter(|s| !s.is_empty()) {
        Some(id) => Some(
            ctx.storage
                .get_lead(id)
                .await?
                .ok_or_else(|| OnboardError::NotFound(format!("lead {id}")))?,
        ),
        None => None,
    };

    // A lead that opens its apply link has started applying; losing the
    // status update is not worth failing the link for.
    if let Some(lead) = &lead {
        if let Err(e) = ctx.storage.update_lead_status(&lead.id, "applying").await {
            warn!(lead_id = %lead.id, err = %e, "lead status update failed");
        }
    }

    let referrer = Referrer {
        master_account,
        advisor_id: advisor.as_ref().map(|a| a.id.clone()),
        lead_id: lead.as_ref().map(|l| l.id.clone()),
    };
    let session = ctx.wizard.create(CustomerType::default(), referrer).await?;

    Ok(Json(json!({
        "session": session,
        "advisor": advisor.map(|a| json!({ "id": a.id, "name": a.name })),
        "lead": lead.map(|l| json!({ "id": l.id, "name": l.name })),
    })))
}
