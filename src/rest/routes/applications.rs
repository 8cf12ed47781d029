// rest/routes/applications.rs — wizard REST routes.

use axum::{
    extract::{Path, State},
    Json,
};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::error::{FieldError, OnboardError};
use crate::model::{Application, CustomerType, MasterAccount};
use crate::wizard::{Referrer, WizardSession};
use crate::AppContext;

fn session_body(session: &WizardSession) -> Value {
    json!({ "session": session })
}

pub async fn list_applications(
    State(ctx): State<Arc<AppContext>>,
) -> Result<Json<Value>, OnboardError> {
    let rows = ctx.storage.list_applications().await?;
    let list: Vec<Value> = rows
        .iter()
        .map(|row| {
            json!({
                "id": row.id,
                "status": row.status,
                "step": row.step,
                "customerType": row.customer_type,
                "masterAccount": row.master_account,
                "advisorId": row.advisor_id,
                "leadId": row.lead_id,
                "createdAt": row.created_at,
                "updatedAt": row.updated_at,
            })
        })
        .collect();
    Ok(Json(json!({ "applications": list })))
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateApplicationRequest {
    pub customer_type: Option<CustomerType>,
    pub master_account: Option<MasterAccount>,
    pub advisor_id: Option<String>,
    pub lead_id: Option<String>,
}

pub async fn create_application(
    State(ctx): State<Arc<AppContext>>,
    Json(body): Json<CreateApplicationRequest>,
) -> Result<Json<Value>, OnboardError> {
    let referrer = Referrer {
        master_account: body.master_account,
        advisor_id: body.advisor_id,
        lead_id: body.lead_id,
    };
    let session = ctx
        .wizard
        .create(body.customer_type.unwrap_or_default(), referrer)
        .await?;
    Ok(Json(session_body(&session)))
}

pub async fn get_application(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, OnboardError> {
    let session = ctx.wizard.load(&id).await?;
    Ok(Json(session_body(&session)))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateApplicationRequest {
    pub application: Application,
    #[serde(default)]
    pub estimated_deposit: Option<f64>,
    #[serde(default)]
    pub signature: Option<String>,
}

pub async fn update_application(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<String>,
    Json(body): Json<UpdateApplicationRequest>,
) -> Result<Json<Value>, OnboardError> {
    let (session, writes) = ctx
        .wizard
        .apply_edits(&id, body.application, body.estimated_deposit, body.signature)
        .await?;
    Ok(Json(json!({ "session": session, "appliedWrites": writes })))
}

pub async fn advance(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, OnboardError> {
    let session = ctx.wizard.advance(&id).await?;
    Ok(Json(session_body(&session)))
}

pub async fn retreat(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, OnboardError> {
    let session = ctx.wizard.retreat(&id).await?;
    Ok(Json(session_body(&session)))
}

pub async fn list_documents(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, OnboardError> {
    // 404 for unknown applications, not an empty list.
    ctx.wizard.load(&id).await?;
    let rows = ctx.storage.list_documents(&id).await?;
    Ok(Json(json!({ "documents": rows })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadDocumentRequest {
    pub form_number: u32,
    pub file_name: String,
    pub mime_type: String,
    /// Base64-encoded file body.
    pub data: String,
}

pub async fn upload_document(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<String>,
    Json(body): Json<UploadDocumentRequest>,
) -> Result<Json<Value>, OnboardError> {
    let bytes = BASE64.decode(body.data.as_bytes()).map_err(|_| {
        OnboardError::Validation(vec![FieldError::new("data", "file body is not valid base64")])
    })?;
    let (session, row) = ctx
        .wizard
        .attach_document(&id, body.form_number, &body.file_name, &body.mime_type, &bytes)
        .await?;
    Ok(Json(json!({ "session": session, "document": row })))
}
