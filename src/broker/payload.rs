//! Wire payload types for the clearing-broker gateway. Field names follow
//! the broker's `camelCase` JSON exactly; timestamps are the broker's
//! integer `yyyyMMddHHmm` convention.

use serde::{Deserialize, Serialize};

use crate::model::{Application, AttachedFile, DocumentPayload};

/// One form in a document submission batch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedDocument {
    pub signed_by: Vec<String>,
    pub attached_file: AttachedFile,
    pub form_number: u32,
    pub valid_address: bool,
    pub exec_login_timestamp: i64,
    pub exec_timestamp: i64,
    pub payload: DocumentPayload,
}

/// `POST /documents` request body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSubmissionRequest {
    pub documents: Vec<SubmittedDocument>,
    pub account_id: String,
    pub input_language: String,
    pub translation: bool,
}

impl DocumentSubmissionRequest {
    /// Collect every fully uploaded document on the application into a
    /// submission batch. Entries without an attached file are skipped —
    /// they have nothing to submit yet.
    pub fn from_application(
        app: &Application,
        account_id: &str,
        input_language: &str,
        translation: bool,
    ) -> Self {
        let documents = app
            .documents
            .iter()
            .filter_map(|doc| {
                let attached_file = doc.attached_file.clone()?;
                let payload = doc.payload.clone()?;
                Some(SubmittedDocument {
                    signed_by: doc.signed_by.clone(),
                    attached_file,
                    form_number: doc.form_number,
                    valid_address: doc.valid_address,
                    exec_login_timestamp: doc.exec_login_timestamp.unwrap_or_default(),
                    exec_timestamp: doc.exec_timestamp.unwrap_or_default(),
                    payload,
                })
            })
            .collect();
        Self {
            documents,
            account_id: account_id.to_string(),
            input_language: input_language.to_string(),
            translation,
        }
    }
}

/// Broker acknowledgement of an account-creation call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BrokerAccount {
    pub account_id: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// Broker acknowledgement of a document submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSubmissionAck {
    #[serde(default)]
    pub accepted: u32,
    #[serde(default)]
    pub rejected: u32,
}

/// A unit of outstanding paperwork before the account becomes operational.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BrokerTask {
    pub task_id: String,
    #[serde(default)]
    pub form_number: Option<u32>,
    pub description: String,
    #[serde(default)]
    pub required: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CustomerType, Document, FORM_W8BEN};

    #[test]
    fn test_submission_skips_documents_without_files() {
        let mut app = Application::fresh("app-1", CustomerType::Individual);
        app.documents.push(Document::form(FORM_W8BEN));
        let req = DocumentSubmissionRequest::from_application(&app, "U100", "en", false);
        assert!(req.documents.is_empty());
        assert_eq!(req.account_id, "U100");
    }

    #[test]
    fn test_submission_wire_shape() {
        let req = DocumentSubmissionRequest {
            documents: vec![SubmittedDocument {
                signed_by: vec!["Jane Doe".to_string()],
                attached_file: AttachedFile {
                    file_name: "w8.pdf".to_string(),
                    file_length: 3,
                    sha1_checksum: "aa".to_string(),
                },
                form_number: FORM_W8BEN,
                valid_address: true,
                exec_login_timestamp: 202608061200,
                exec_timestamp: 202608061201,
                payload: DocumentPayload {
                    mime_type: "application/pdf".to_string(),
                    data: "YWJj".to_string(),
                },
            }],
            account_id: "U100".to_string(),
            input_language: "en".to_string(),
            translation: false,
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["documents"][0]["attachedFile"]["fileName"], "w8.pdf");
        assert_eq!(v["documents"][0]["payload"]["mimeType"], "application/pdf");
        assert_eq!(v["accountId"], "U100");
        assert_eq!(v["inputLanguage"], "en");
    }
}
