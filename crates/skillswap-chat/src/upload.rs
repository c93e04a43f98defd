//! Attachment upload seam
//!
//! File storage is an external collaborator: the client hands it raw bytes
//! and gets back the server-created message already carrying the stored
//! attachment reference.

use async_trait::async_trait;
use skillswap_core::{ConversationId, Credential, Result};
use skillswap_im_sdk::Message;

#[async_trait]
pub trait AttachmentUploader: Send + Sync {
    /// Store the binary, classify it by mime type, and return the resulting
    /// attachment message. `PayloadTooLarge` / `UnsupportedType` follow the
    /// storage service's policy; any failure leaves no partial client state.
    async fn upload(
        &self,
        credential: &Credential,
        conversation_id: &ConversationId,
        bytes: Vec<u8>,
        file_name: &str,
        mime_type: &str,
    ) -> Result<Message>;
}
