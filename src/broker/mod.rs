//! Clearing-broker gateway.
//!
//! The wizard talks to the broker through the [`BrokerGateway`] trait so
//! tests can substitute a mock; [`IbkrClient`] is the production reqwest
//! implementation. Calls are fire-and-await with a fixed timeout and no
//! automatic retry — a failure surfaces to the user, who re-triggers the
//! action explicitly.

pub mod payload;

use async_trait::async_trait;
use tracing::info;

use crate::config::BrokerConfig;
use crate::error::BrokerError;
use crate::model::Application;

pub use payload::{
    BrokerAccount, BrokerTask, DocumentSubmissionAck, DocumentSubmissionRequest, SubmittedDocument,
};

#[async_trait]
pub trait BrokerGateway: Send + Sync {
    /// Create the brokerage account for a finalized application.
    async fn create_account(&self, app: &Application) -> Result<BrokerAccount, BrokerError>;

    /// Submit the application's signed documents to the broker.
    async fn submit_documents(
        &self,
        request: &DocumentSubmissionRequest,
    ) -> Result<DocumentSubmissionAck, BrokerError>;

    /// Outstanding pending tasks for an account (missing info, reviews).
    async fn pending_tasks(&self, account_id: &str) -> Result<Vec<BrokerTask>, BrokerError>;

    /// Outstanding registration tasks for an account (forms still owed).
    async fn registration_tasks(&self, account_id: &str) -> Result<Vec<BrokerTask>, BrokerError>;
}

// ─── Production client ────────────────────────────────────────────────────────

pub struct IbkrClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl IbkrClient {
    pub fn new(config: &BrokerConfig) -> Result<Self, BrokerError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut builder = self.http.request(method, url);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    /// Map a non-2xx response to [`BrokerError::Rejected`], carrying the
    /// server's message when the body has one.
    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, BrokerError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let message = resp
            .json::<serde_json::Value>()
            .await
            .ok()
            .and_then(|v| {
                v.get("error")
                    .or_else(|| v.get("message"))
                    .and_then(|m| m.as_str())
                    .map(String::from)
            })
            .unwrap_or_else(|| "request rejected".to_string());
        Err(BrokerError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl BrokerGateway for IbkrClient {
    async fn create_account(&self, app: &Application) -> Result<BrokerAccount, BrokerError> {
        let resp = self
            .request(reqwest::Method::POST, "/accounts")
            .json(app)
            .send()
            .await?;
        let resp = Self::check(resp).await?;
        let account: BrokerAccount = resp
            .json()
            .await
            .map_err(|e| BrokerError::Decode(e.to_string()))?;
        info!(application_id = %app.id, account_id = %account.account_id, "broker account created");
        Ok(account)
    }

    async fn submit_documents(
        &self,
        request: &DocumentSubmissionRequest,
    ) -> Result<DocumentSubmissionAck, BrokerError> {
        let resp = self
            .request(reqwest::Method::POST, "/documents")
            .json(request)
            .send()
            .await?;
        let resp = Self::check(resp).await?;
        let ack: DocumentSubmissionAck = resp
            .json()
            .await
            .map_err(|e| BrokerError::Decode(e.to_string()))?;
        info!(
            account_id = %request.account_id,
            documents = request.documents.len(),
            "documents submitted to broker"
        );
        Ok(ack)
    }

    async fn pending_tasks(&self, account_id: &str) -> Result<Vec<BrokerTask>, BrokerError> {
        let resp = self
            .request(
                reqwest::Method::GET,
                &format!("/accounts/{account_id}/tasks/pending"),
            )
            .send()
            .await?;
        let resp = Self::check(resp).await?;
        resp.json()
            .await
            .map_err(|e| BrokerError::Decode(e.to_string()))
    }

    async fn registration_tasks(&self, account_id: &str) -> Result<Vec<BrokerTask>, BrokerError> {
        let resp = self
            .request(
                reqwest::Method::GET,
                &format!("/accounts/{account_id}/tasks/registration"),
            )
            .send()
            .await?;
        let resp = Self::check(resp).await?;
        resp.json()
            .await
            .map_err(|e| BrokerError::Decode(e.to_string()))
    }
}
