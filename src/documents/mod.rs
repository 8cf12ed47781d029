//! Document upload helper.
//!
//! Computes the SHA-1 checksum and base64 payload the clearing broker
//! expects for an attached file, whole-file in memory — uploads are form
//! scans and ID photos, capped by `limits.max_document_bytes`.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use sha1::{Digest, Sha1};

use crate::model::{AttachedFile, DocumentPayload};

/// File metadata plus encoded body, ready to hang on a document entry.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedAttachment {
    pub file: AttachedFile,
    pub payload: DocumentPayload,
}

/// Package raw file bytes for submission: SHA-1 checksum (lowercase hex),
/// length, and base64 body.
pub fn prepare_attachment(file_name: &str, mime_type: &str, bytes: &[u8]) -> PreparedAttachment {
    let mut hasher = Sha1::new();
    hasher.update(bytes);
    let sha1_checksum = hex::encode(hasher.finalize());

    PreparedAttachment {
        file: AttachedFile {
            file_name: file_name.to_string(),
            file_length: bytes.len() as u64,
            sha1_checksum,
        },
        payload: DocumentPayload {
            mime_type: mime_type.to_string(),
            data: BASE64.encode(bytes),
        },
    }
}

/// The broker's integer timestamp convention: `yyyyMMddHHmm`.
pub fn broker_timestamp(at: DateTime<Utc>) -> i64 {
    at.format("%Y%m%d%H%M")
        .to_string()
        .parse()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_prepare_attachment_known_vector() {
        let prepared = prepare_attachment("scan.pdf", "application/pdf", b"abc");
        assert_eq!(prepared.file.file_name, "scan.pdf");
        assert_eq!(prepared.file.file_length, 3);
        assert_eq!(
            prepared.file.sha1_checksum,
            "a9993e364706816aba3e25717850c26c9cd0d89d"
        );
        assert_eq!(prepared.payload.mime_type, "application/pdf");
        assert_eq!(prepared.payload.data, "YWJj");
    }

    #[test]
    fn test_prepare_attachment_empty_file() {
        let prepared = prepare_attachment("empty.png", "image/png", b"");
        assert_eq!(prepared.file.file_length, 0);
        assert_eq!(
            prepared.file.sha1_checksum,
            "da39a3ee5e6b4b0d3255bfef95601890afd80709"
        );
        assert_eq!(prepared.payload.data, "");
    }

    #[test]
    fn test_broker_timestamp_format() {
        let at = Utc.with_ymd_and_hms(2026, 8, 6, 14, 35, 59).unwrap();
        assert_eq!(broker_timestamp(at), 202608061435);
    }

    #[test]
    fn test_broker_timestamp_zero_pads() {
        let at = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 0).unwrap();
        assert_eq!(broker_timestamp(at), 202601020304);
    }
}
