use serde::{Deserialize, Serialize};

/// Broker form number for the W-8BEN certificate. The rules engine keeps
/// this form's signer list equal to the current holder names.
pub const FORM_W8BEN: u32 = 5001;

/// Checksum + size metadata for an uploaded file, computed by the document
/// upload helper before submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AttachedFile {
    pub file_name: String,
    pub file_length: u64,
    pub sha1_checksum: String,
}

/// The file body as the broker expects it: base64 data plus its MIME type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentPayload {
    pub mime_type: String,
    pub data: String,
}

/// One document entry on the application: a numbered broker form, who signs
/// it, and (once uploaded) the attached file and its payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Document {
    pub form_number: u32,
    pub signed_by: Vec<String>,
    pub attached_file: Option<AttachedFile>,
    pub payload: Option<DocumentPayload>,
    pub valid_address: bool,
    pub exec_login_timestamp: Option<i64>,
    pub exec_timestamp: Option<i64>,
}

impl Document {
    pub fn form(form_number: u32) -> Self {
        Self {
            form_number,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_wire_shape() {
        let doc = Document {
            form_number: FORM_W8BEN,
            signed_by: vec!["Jane Doe".to_string()],
            attached_file: Some(AttachedFile {
                file_name: "w8ben.pdf".to_string(),
                file_length: 3,
                sha1_checksum: "abc".to_string(),
            }),
            payload: None,
            valid_address: true,
            exec_login_timestamp: Some(202608061200),
            exec_timestamp: Some(202608061201),
        };
        let v = serde_json::to_value(&doc).unwrap();
        assert_eq!(v["formNumber"], 5001);
        assert_eq!(v["signedBy"][0], "Jane Doe");
        assert_eq!(v["attachedFile"]["sha1Checksum"], "abc");
        assert_eq!(v["execLoginTimestamp"], 202608061200i64);
    }
}
