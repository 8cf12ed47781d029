//! The account-opening wizard: step controller over the synchronization
//! rules engine, persisting progress after every transition and handing the
//! finished application to the clearing broker.

pub mod rules;
pub mod steps;
pub mod validate;

pub use rules::{settle, RuleWrite};
pub use steps::WizardStep;
pub use validate::{signature_matches, validate_step};

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::broker::{BrokerGateway, DocumentSubmissionRequest};
use crate::config::OnboardConfig;
use crate::documents::{broker_timestamp, prepare_attachment};
use crate::error::OnboardError;
use crate::model::{Application, ApplicationStatus, CustomerType, Document, MasterAccount};
use crate::storage::audit_log::{AuditEntry, AuditLog};
use crate::storage::{ApplicationRow, DocumentRow, Storage};

// ─── Session ──────────────────────────────────────────────────────────────────

/// Where an application came from: the apply-link query parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Referrer {
    pub master_account: Option<MasterAccount>,
    pub advisor_id: Option<String>,
    pub lead_id: Option<String>,
}

/// One in-progress wizard run: the form tree plus step and auxiliary state.
/// Auxiliary state (estimated deposit, referrer, signature) is cleared when
/// the user retreats all the way back to the first step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WizardSession {
    pub application: Application,
    pub step: WizardStep,
    pub estimated_deposit: Option<f64>,
    pub signature: Option<String>,
    pub referrer: Referrer,
}

impl WizardSession {
    /// Rehydrate a session from its storage row.
    pub fn from_row(row: &ApplicationRow) -> Result<Self, OnboardError> {
        let application: Application = serde_json::from_str(&row.payload)
            .map_err(|e| OnboardError::Internal(anyhow::anyhow!("corrupt application payload: {e}")))?;
        let step = row
            .step
            .parse::<WizardStep>()
            .map_err(|e| OnboardError::Internal(anyhow::anyhow!(e)))?;
        let master_account = row
            .master_account
            .as_deref()
            .and_then(|s| s.parse::<MasterAccount>().ok());
        Ok(Self {
            application,
            step,
            estimated_deposit: row.estimated_deposit,
            signature: row.signature.clone(),
            referrer: Referrer {
                master_account,
                advisor_id: row.advisor_id.clone(),
                lead_id: row.lead_id.clone(),
            },
        })
    }
}

// ─── Controller ───────────────────────────────────────────────────────────────

/// Step controller. Every operation loads the session row, applies the
/// transition, and persists before the in-memory step moves — a failed
/// persistence or broker call leaves the user on the current step.
pub struct Wizard {
    storage: Arc<Storage>,
    broker: Arc<dyn BrokerGateway>,
    audit: Arc<AuditLog>,
    config: Arc<OnboardConfig>,
    service_id: String,
}

impl Wizard {
    pub fn new(
        storage: Arc<Storage>,
        broker: Arc<dyn BrokerGateway>,
        audit: Arc<AuditLog>,
        config: Arc<OnboardConfig>,
        service_id: String,
    ) -> Self {
        Self {
            storage,
            broker,
            audit,
            config,
            service_id,
        }
    }

    /// Create a draft application at the first step.
    pub async fn create(
        &self,
        kind: CustomerType,
        referrer: Referrer,
    ) -> Result<WizardSession, OnboardError> {
        let mut application = Application::fresh(uuid::Uuid::new_v4().to_string(), kind);
        rules::settle(&mut application);

        let payload = to_payload(&application)?;
        self.storage
            .create_application(
                &application.id,
                &WizardStep::AccountType.to_string(),
                &kind.to_string(),
                &payload,
                referrer.master_account.map(|m| m.to_string()).as_deref(),
                referrer.advisor_id.as_deref(),
                referrer.lead_id.as_deref(),
            )
            .await?;

        info!(application_id = %application.id, customer_type = %kind, "application created");
        let session = WizardSession {
            application,
            step: WizardStep::AccountType,
            estimated_deposit: None,
            signature: None,
            referrer,
        };
        self.record(&session, "create", "ok").await;
        Ok(session)
    }

    /// Load a session by application id.
    pub async fn load(&self, id: &str) -> Result<WizardSession, OnboardError> {
        let row = self
            .storage
            .get_application(id)
            .await?
            .ok_or_else(|| OnboardError::NotFound(id.to_string()))?;
        WizardSession::from_row(&row)
    }

    /// Apply an edited form tree: server-owned fields are pinned, explicit
    /// tax-residency overrides are detected, the rules engine settles the
    /// tree, and the result is persisted. Returns the settled session and
    /// the writes the rules applied.
    pub async fn apply_edits(
        &self,
        id: &str,
        mut incoming: Application,
        estimated_deposit: Option<f64>,
        signature: Option<String>,
    ) -> Result<(WizardSession, Vec<RuleWrite>), OnboardError> {
        let mut session = self.load(id).await?;
        self.ensure_editable(&session)?;

        // The row id and lifecycle status are owned by this service.
        incoming.id = session.application.id.clone();
        incoming.status = session.application.status;

        detect_tax_overrides(&session.application, &mut incoming);
        let writes = rules::settle(&mut incoming);
        session.application = incoming;

        if let Some(deposit) = estimated_deposit {
            session.estimated_deposit = Some(deposit);
        }
        if let Some(sig) = signature {
            session.signature = if sig.trim().is_empty() { None } else { Some(sig) };
        }

        self.persist(&session, session.step).await?;
        self.record(&session, "edit", "ok").await;
        Ok((session, writes))
    }

    /// Validate the current step and move forward. The final transition
    /// (Agreements → Success) additionally checks the typed signature and
    /// submits the application to the clearing broker.
    pub async fn advance(&self, id: &str) -> Result<WizardSession, OnboardError> {
        let mut session = self.load(id).await?;
        let step = session.step;
        if step.is_terminal() {
            return Err(OnboardError::business_rule(
                "the application is already complete",
            ));
        }

        let errors = validate::validate_step(&session.application, step);
        if !errors.is_empty() {
            self.record(&session, "advance", "validation_failed").await;
            return Err(OnboardError::Validation(errors));
        }

        if step == WizardStep::Agreements {
            if let Err(e) = self.finalize(&mut session).await {
                self.record(&session, "finalize", "rejected").await;
                return Err(e);
            }
        }

        let next = step
            .next()
            .ok_or_else(|| OnboardError::business_rule("cannot advance past the final step"))?;
        self.persist(&session, next).await?;
        session.step = next;

        info!(application_id = %session.application.id, step = %next, "wizard advanced");
        let action = if next.is_terminal() { "finalize" } else { "advance" };
        self.record(&session, action, "ok").await;
        Ok(session)
    }

    /// Move one step back. Returning to the first step resets the form to
    /// defaults and clears the auxiliary state.
    pub async fn retreat(&self, id: &str) -> Result<WizardSession, OnboardError> {
        let mut session = self.load(id).await?;
        self.ensure_editable(&session)?;

        let prev = session
            .step
            .prev()
            .ok_or_else(|| OnboardError::business_rule("already at the first step"))?;

        if prev.is_first() {
            session.application =
                Application::fresh(session.application.id.clone(), CustomerType::default());
            session.estimated_deposit = None;
            session.signature = None;
            session.referrer = Referrer::default();
        }

        self.persist(&session, prev).await?;
        session.step = prev;
        self.record(&session, "retreat", "ok").await;
        Ok(session)
    }

    /// Attach an uploaded file to the form entry with the given number:
    /// checksum + base64 packaging, signer re-sync, persistence. The raw
    /// bytes never touch the database — only metadata and the in-tree
    /// payload survive.
    pub async fn attach_document(
        &self,
        id: &str,
        form_number: u32,
        file_name: &str,
        mime_type: &str,
        bytes: &[u8],
    ) -> Result<(WizardSession, DocumentRow), OnboardError> {
        let mut session = self.load(id).await?;
        self.ensure_editable(&session)?;

        let max = self.config.limits.max_document_bytes;
        if bytes.len() as u64 > max {
            return Err(OnboardError::business_rule(format!(
                "document exceeds the upload size limit of {max} bytes"
            )));
        }

        let prepared = prepare_attachment(file_name, mime_type, bytes);
        let valid_address = primary_address_complete(&session.application);

        let doc = match session
            .application
            .documents
            .iter_mut()
            .find(|d| d.form_number == form_number)
        {
            Some(doc) => doc,
            None => {
                session.application.documents.push(Document::form(form_number));
                session
                    .application
                    .documents
                    .last_mut()
                    .ok_or_else(|| OnboardError::Internal(anyhow::anyhow!("document vanished")))?
            }
        };
        doc.attached_file = Some(prepared.file.clone());
        doc.payload = Some(prepared.payload);
        doc.valid_address = valid_address;

        rules::settle(&mut session.application);

        let row = self
            .storage
            .record_document(
                &session.application.id,
                form_number,
                &prepared.file.file_name,
                prepared.file.file_length,
                &prepared.file.sha1_checksum,
            )
            .await?;

        self.persist(&session, session.step).await?;
        self.record(&session, "document", "ok").await;
        Ok((session, row))
    }

    // ─── Internals ──────────────────────────────────────────────────────────

    fn ensure_editable(&self, session: &WizardSession) -> Result<(), OnboardError> {
        if session.application.status == ApplicationStatus::Completed {
            return Err(OnboardError::business_rule(
                "a completed application can no longer be edited",
            ));
        }
        Ok(())
    }

    /// Final submission: signature gate, execution timestamps, broker
    /// account creation, document submission, local account record. Runs
    /// before the step moves — any failure leaves the session on
    /// Agreements with its attachments intact for re-submission.
    async fn finalize(&self, session: &mut WizardSession) -> Result<(), OnboardError> {
        let signature = session.signature.as_deref().unwrap_or("");
        if !validate::signature_matches(signature, &session.application) {
            return Err(OnboardError::SignatureMismatch);
        }

        let ts = broker_timestamp(Utc::now());
        for doc in session
            .application
            .documents
            .iter_mut()
            .filter(|d| d.attached_file.is_some())
        {
            doc.exec_login_timestamp.get_or_insert(ts);
            doc.exec_timestamp = Some(ts);
        }

        let account = self.broker.create_account(&session.application).await?;

        let request = DocumentSubmissionRequest::from_application(
            &session.application,
            &account.account_id,
            &self.config.broker.input_language,
            self.config.broker.translation,
        );
        if !request.documents.is_empty() {
            self.broker.submit_documents(&request).await?;
        }

        self.storage
            .record_account(&session.application.id, &account.account_id)
            .await?;
        self.storage
            .mark_documents_submitted(&session.application.id)
            .await?;

        session.application.status = ApplicationStatus::Completed;
        info!(
            application_id = %session.application.id,
            broker_account_id = %account.account_id,
            "application finalized"
        );
        Ok(())
    }

    /// Write the session to its row with the given step. The caller only
    /// moves the in-memory step after this succeeds.
    async fn persist(
        &self,
        session: &WizardSession,
        step: WizardStep,
    ) -> Result<(), OnboardError> {
        let payload = to_payload(&session.application)?;
        self.storage
            .update_application(
                &session.application.id,
                &session.application.status.to_string(),
                &step.to_string(),
                &session.application.customer.kind.to_string(),
                &payload,
                session.estimated_deposit,
                session.signature.as_deref(),
                session
                    .referrer
                    .master_account
                    .map(|m| m.to_string())
                    .as_deref(),
                session.referrer.advisor_id.as_deref(),
                session.referrer.lead_id.as_deref(),
            )
            .await?;
        Ok(())
    }

    async fn record(&self, session: &WizardSession, action: &str, outcome: &str) {
        let payload = serde_json::to_string(&session.application).unwrap_or_default();
        let entry = AuditEntry::new(
            &self.service_id,
            &session.application.id,
            session.step.to_string(),
            action,
            outcome,
            &payload,
        );
        self.audit.append(&entry).await;
    }
}

fn to_payload(application: &Application) -> Result<String, OnboardError> {
    serde_json::to_string(application)
        .map_err(|e| OnboardError::Internal(anyhow::anyhow!("serialize application: {e}")))
}

/// A direct edit that moves `taxResidencies[0].country` away from both its
/// stored value and the mirrored residence country is an explicit override;
/// an edit back to the mirrored value re-enables mirroring.
fn detect_tax_overrides(stored: &Application, incoming: &mut Application) {
    for (i, holder) in incoming.holders.iter_mut().enumerate() {
        let Some(prev) = stored.holders.get(i) else {
            continue;
        };
        holder.tax_residency_overridden = prev.tax_residency_overridden;

        let (Some(prev_res), Some(new_res)) =
            (prev.tax_residencies.first(), holder.tax_residencies.first())
        else {
            continue;
        };
        if new_res.country == prev_res.country {
            continue;
        }
        // The user touched the country directly.
        let mirrored = holder.residence_country().map(String::from);
        holder.tax_residency_overridden = mirrored.as_deref() != Some(new_res.country.as_str());
    }
}

fn primary_address_complete(app: &Application) -> bool {
    app.holders
        .first()
        .map(|h| {
            let a = &h.residence_address;
            a.street.as_deref().is_some_and(|s| !s.is_empty())
                && a.city.as_deref().is_some_and(|s| !s.is_empty())
                && a.country.as_deref().is_some_and(|s| !s.is_empty())
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TaxResidency;

    fn stored_with_residency(country: &str) -> Application {
        let mut app = Application::fresh("app-1", CustomerType::Individual);
        app.holders[0].legal_residence_country = Some("PT".to_string());
        app.holders[0].tax_residencies = vec![TaxResidency {
            country: country.to_string(),
            tin: "AB1234".to_string(),
            tin_type: Default::default(),
        }];
        app
    }

    #[test]
    fn test_direct_country_edit_sets_override() {
        let stored = stored_with_residency("PT");
        let mut incoming = stored_with_residency("ES");
        incoming.holders[0].legal_residence_country = Some("PT".to_string());
        detect_tax_overrides(&stored, &mut incoming);
        assert!(incoming.holders[0].tax_residency_overridden);
    }

    #[test]
    fn test_edit_back_to_mirror_clears_override() {
        let mut stored = stored_with_residency("ES");
        stored.holders[0].tax_residency_overridden = true;
        let mut incoming = stored_with_residency("PT");
        incoming.holders[0].legal_residence_country = Some("PT".to_string());
        detect_tax_overrides(&stored, &mut incoming);
        assert!(!incoming.holders[0].tax_residency_overridden);
    }

    #[test]
    fn test_untouched_residency_keeps_stored_flag() {
        let mut stored = stored_with_residency("ES");
        stored.holders[0].tax_residency_overridden = true;
        let mut incoming = stored_with_residency("ES");
        // Client blanking the flag must not clear the server's decision.
        incoming.holders[0].tax_residency_overridden = false;
        detect_tax_overrides(&stored, &mut incoming);
        assert!(incoming.holders[0].tax_residency_overridden);
    }
}
