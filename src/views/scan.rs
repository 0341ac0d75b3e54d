//! Receipt upload.

use crate::api::{self, Backend, FetchFailure, Fetched, Identity, PROCESS_RECEIPT};
use crate::utils;
use crate::views::{Navigation, Route};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info};

/// File extensions accepted as receipt images, compared case-insensitively.
const IMAGE_EXTENSIONS: [&str; 9] = [
    "jpg", "jpeg", "png", "gif", "webp", "heic", "bmp", "tif", "tiff",
];

const PROCESSED: &str = "Receipt processed successfully!";
const PROCESSING_ERROR: &str = "Error processing receipt";
const NOT_AN_IMAGE: &str = "Please choose an image file";

/// Whether `path` looks like an image, judged by its extension.
pub fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

/// Standard-alphabet base64 with padding and no `data:` prefix.
pub fn encode_image(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProcessReceiptRequest<'a> {
    image_base64: &'a str,
}

/// The backend's answer to a receipt upload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessReceiptResponse {
    #[serde(default)]
    success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ProcessReceiptResponse {
    pub fn success(&self) -> bool {
        self.success
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum ScanOutcome {
    /// The receipt was stored; the dashboard should be reloaded to show it.
    Processed {
        message: String,
        navigation: Navigation,
    },
    /// Something went wrong and the user is told so. Nothing else happens.
    Alert { message: String },
}

impl ScanOutcome {
    pub fn message(&self) -> &str {
        match self {
            ScanOutcome::Processed { message, .. } | ScanOutcome::Alert { message } => message,
        }
    }

    pub fn navigation(&self) -> Option<Navigation> {
        match self {
            ScanOutcome::Processed { navigation, .. } => Some(*navigation),
            ScanOutcome::Alert { .. } => None,
        }
    }

    fn alert(message: impl Into<String>) -> Self {
        ScanOutcome::Alert {
            message: message.into(),
        }
    }
}

pub struct ScanView {
    identity: Arc<dyn Identity>,
    backend: Arc<dyn Backend>,
    busy: bool,
}

impl ScanView {
    /// Shown while a receipt is being processed.
    pub const BUSY_MESSAGE: &'static str = "Analyzing & Assessing Leakage Risk...";

    pub fn new(identity: Arc<dyn Identity>, backend: Arc<dyn Backend>) -> Self {
        Self {
            identity,
            backend,
            busy: false,
        }
    }

    pub fn busy(&self) -> bool {
        self.busy
    }

    /// Reads the image at `path` and uploads it.
    pub async fn upload(&mut self, path: &Path) -> ScanOutcome {
        if !is_image(path) {
            return ScanOutcome::alert(NOT_AN_IMAGE);
        }
        match utils::read_bytes(path).await {
            Ok(bytes) => self.upload_bytes(&bytes).await,
            Err(e) => {
                error!("Error: {e:?}");
                ScanOutcome::alert(PROCESSING_ERROR)
            }
        }
    }

    /// Uploads an image that is already in memory.
    pub async fn upload_bytes(&mut self, bytes: &[u8]) -> ScanOutcome {
        self.busy = true;
        let outcome = self.process(bytes).await;
        self.busy = false;
        outcome
    }

    async fn process(&self, bytes: &[u8]) -> ScanOutcome {
        let session = match self.identity.get_session().await {
            Ok(Some(session)) => session,
            Ok(None) => {
                error!("Error: {}", FetchFailure::Unauthenticated);
                return ScanOutcome::alert(PROCESSING_ERROR);
            }
            Err(e) => {
                error!("Error: {e:?}");
                return ScanOutcome::alert(PROCESSING_ERROR);
            }
        };

        let image = encode_image(bytes);
        debug!("Uploading a receipt of {} bytes", bytes.len());
        let request = ProcessReceiptRequest {
            image_base64: &image,
        };
        let fetched: Fetched<ProcessReceiptResponse> =
            api::post_json(self.backend.as_ref(), &session, PROCESS_RECEIPT, &request).await;

        let response = match fetched {
            Fetched::Ok(response) => response,
            // Logical failures often come with an error status; the body still says what happened.
            Fetched::Failed(FetchFailure::Status { status, body }) => {
                match serde_json::from_str::<ProcessReceiptResponse>(&body) {
                    Ok(response) => response,
                    Err(_) => {
                        error!("Error: receipt upload failed with status {status}: {body}");
                        return ScanOutcome::alert(PROCESSING_ERROR);
                    }
                }
            }
            Fetched::Failed(failure) => {
                error!("Error: {failure}");
                return ScanOutcome::alert(PROCESSING_ERROR);
            }
        };

        if response.success() {
            info!("{PROCESSED}");
            ScanOutcome::Processed {
                message: PROCESSED.to_string(),
                navigation: Navigation::reload(Route::Dashboard),
            }
        } else {
            ScanOutcome::alert(format!(
                "Failed to process receipt: {}",
                response.error().unwrap_or("unknown error")
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{TestBackend, TestIdentity, EXPENSES};
    use serde_json::json;
    use tempfile::TempDir;

    fn view(identity: TestIdentity, backend: &Arc<TestBackend>) -> ScanView {
        ScanView::new(Arc::new(identity), backend.clone())
    }

    #[test]
    fn test_is_image() {
        assert!(is_image(Path::new("receipt.jpg")));
        assert!(is_image(Path::new("/tmp/RECEIPT.PNG")));
        assert!(is_image(Path::new("scan.heic")));
        assert!(!is_image(Path::new("receipt.pdf")));
        assert!(!is_image(Path::new("receipt")));
    }

    #[test]
    fn test_encode_image_has_no_prefix() {
        assert_eq!(encode_image(b"hello"), "aGVsbG8=");
    }

    #[tokio::test]
    async fn test_success_reloads_dashboard() {
        let backend = Arc::new(TestBackend::default());
        let mut view = view(TestIdentity::signed_in(), &backend);
        let outcome = view.upload_bytes(b"hello").await;
        assert_eq!(outcome.message(), PROCESSED);
        assert_eq!(
            outcome.navigation(),
            Some(Navigation::reload(Route::Dashboard))
        );
        assert!(!view.busy());

        let requests = backend.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].path, PROCESS_RECEIPT);
        assert_eq!(requests[0].body, Some(json!({ "imageBase64": "aGVsbG8=" })));
    }

    #[tokio::test]
    async fn test_logical_failure_alerts_with_server_text() {
        let backend = Arc::new(TestBackend::default());
        backend.respond(
            PROCESS_RECEIPT,
            json!({ "success": false, "error": "Image too blurry" }),
        );
        let mut view = view(TestIdentity::signed_in(), &backend);
        let outcome = view.upload_bytes(b"hello").await;
        assert_eq!(
            outcome,
            ScanOutcome::alert("Failed to process receipt: Image too blurry")
        );
        assert!(outcome.navigation().is_none());
    }

    #[tokio::test]
    async fn test_error_status_body_is_read() {
        let backend = Arc::new(TestBackend::default());
        backend.fail(
            PROCESS_RECEIPT,
            FetchFailure::Status {
                status: 500,
                body: json!({ "success": false, "error": "OCR failed" }).to_string(),
            },
        );
        let mut view = view(TestIdentity::signed_in(), &backend);
        let outcome = view.upload_bytes(b"hello").await;
        assert_eq!(outcome.message(), "Failed to process receipt: OCR failed");
    }

    #[tokio::test]
    async fn test_missing_error_text() {
        let backend = Arc::new(TestBackend::default());
        backend.respond(PROCESS_RECEIPT, json!({ "success": false }));
        let mut view = view(TestIdentity::signed_in(), &backend);
        let outcome = view.upload_bytes(b"hello").await;
        assert_eq!(outcome.message(), "Failed to process receipt: unknown error");
    }

    #[tokio::test]
    async fn test_transport_failure_is_generic() {
        let backend = Arc::new(TestBackend::default());
        backend.fail(
            PROCESS_RECEIPT,
            FetchFailure::Transport("connection refused".to_string()),
        );
        let mut view = view(TestIdentity::signed_in(), &backend);
        let outcome = view.upload_bytes(b"hello").await;
        assert_eq!(outcome, ScanOutcome::alert(PROCESSING_ERROR));
    }

    #[tokio::test]
    async fn test_no_session_sends_nothing() {
        let backend = Arc::new(TestBackend::default());
        let mut view = view(TestIdentity::default(), &backend);
        let outcome = view.upload_bytes(b"hello").await;
        assert_eq!(outcome, ScanOutcome::alert(PROCESSING_ERROR));
        assert!(backend.requests().is_empty());
    }

    #[tokio::test]
    async fn test_non_image_is_rejected_before_request() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("notes.txt");
        std::fs::write(&path, "not a receipt").unwrap();
        let backend = Arc::new(TestBackend::default());
        let mut view = view(TestIdentity::signed_in(), &backend);
        let outcome = view.upload(&path).await;
        assert_eq!(outcome, ScanOutcome::alert(NOT_AN_IMAGE));
        assert!(backend.requests().is_empty());
    }

    #[tokio::test]
    async fn test_upload_from_file_adds_transaction() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("receipt.jpg");
        std::fs::write(&path, [0xff, 0xd8, 0xff, 0xe0]).unwrap();
        let backend = Arc::new(TestBackend::default());
        let mut view = view(TestIdentity::signed_in(), &backend);
        let outcome = view.upload(&path).await;
        assert!(outcome.navigation().is_some());

        let listed = backend.get(EXPENSES, "t").await.ok().unwrap();
        assert_eq!(listed.as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_missing_file_is_generic() {
        let tmp = TempDir::new().unwrap();
        let backend = Arc::new(TestBackend::default());
        let mut view = view(TestIdentity::signed_in(), &backend);
        let outcome = view.upload(&tmp.path().join("gone.png")).await;
        assert_eq!(outcome, ScanOutcome::alert(PROCESSING_ERROR));
    }
}
