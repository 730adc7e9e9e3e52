//! Calls the classification service, degrading to text-only once when media is rejected.

use crate::llm::{ChatBackend, ClassificationRequest, LlmError};

pub struct ClassificationClient<B> {
    backend: B,
}

impl<B: ChatBackend> ClassificationClient<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Send the full request. On [`LlmError::MediaRejected`] retry exactly once without media;
    /// any other error, or a failure of the retry, is returned as is.
    pub async fn classify(&self, request: &ClassificationRequest) -> Result<String, LlmError> {
        match self.backend.complete(request).await {
            Err(LlmError::MediaRejected(reason)) if request.has_media() => {
                log::warn!(
                    "classify: media rejected ({}), retrying without {} media part(s)",
                    reason,
                    request.media.len()
                );
                self.backend.complete(&request.text_only()).await
            }
            other => other,
        }
    }
}
