//! HTTP message store client
//!
//! Speaks the `/chat/v1` REST contract: bearer-authenticated,
//! envelope-shaped responses, upstream statuses mapped onto the shared error
//! taxonomy.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use skillswap_core::{ConversationId, Credential, MessageId, Result, SkillSwapError};
use skillswap_im_sdk::{Conversation, Message};

use crate::config::ChatConfig;
use crate::store::{CreateConversationRequest, MessageStore};
use crate::upload::AttachmentUploader;

#[derive(Debug, Deserialize)]
struct ConversationsEnvelope {
    conversations: Vec<Conversation>,
}

#[derive(Debug, Deserialize)]
struct ConversationEnvelope {
    conversation: Conversation,
}

#[derive(Debug, Deserialize)]
struct MessagesEnvelope {
    messages: Vec<Message>,
}

#[derive(Debug, Deserialize)]
struct MessageEnvelope {
    message: Message,
}

#[derive(Debug, Serialize)]
struct SendMessageBody<'a> {
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to: Option<&'a MessageId>,
}

#[derive(Debug, Serialize)]
struct EditMessageBody<'a> {
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct MeetingBody<'a> {
    meeting_url: &'a str,
    meeting_title: &'a str,
}

pub struct HttpMessageStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpMessageStore {
    pub fn new(api_base_url: impl Into<String>) -> Self {
        let base_url = api_base_url.into().trim_end_matches('/').to_string();
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    pub fn from_config(config: &ChatConfig) -> Self {
        Self::new(config.api_base_url.clone())
    }

    fn url(&self, path: &str) -> String {
        format!("{}/chat/v1/{}", self.base_url, path)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let detail = response.text().await.unwrap_or_default();
        Err(SkillSwapError::from_status(status.as_u16(), detail))
    }
}

pub(crate) fn transport(err: reqwest::Error) -> SkillSwapError {
    SkillSwapError::Transport(err.to_string())
}

#[async_trait]
impl MessageStore for HttpMessageStore {
    async fn list_conversations(&self, credential: &Credential) -> Result<Vec<Conversation>> {
        let response = self
            .client
            .get(self.url("conversations"))
            .bearer_auth(credential.token())
            .send()
            .await
            .map_err(transport)?;
        let envelope: ConversationsEnvelope =
            Self::check(response).await?.json().await.map_err(transport)?;
        Ok(envelope.conversations)
    }

    async fn get_conversation(
        &self,
        credential: &Credential,
        conversation_id: &ConversationId,
    ) -> Result<Conversation> {
        let response = self
            .client
            .get(self.url(&format!("conversations/{conversation_id}")))
            .bearer_auth(credential.token())
            .send()
            .await
            .map_err(transport)?;
        let envelope: ConversationEnvelope =
            Self::check(response).await?.json().await.map_err(transport)?;
        Ok(envelope.conversation)
    }

    async fn list_messages(
        &self,
        credential: &Credential,
        conversation_id: &ConversationId,
        page: u32,
        page_size: usize,
    ) -> Result<Vec<Message>> {
        let response = self
            .client
            .get(self.url(&format!("conversations/{conversation_id}/messages")))
            .query(&[("page", page.to_string()), ("limit", page_size.to_string())])
            .bearer_auth(credential.token())
            .send()
            .await
            .map_err(transport)?;
        let envelope: MessagesEnvelope =
            Self::check(response).await?.json().await.map_err(transport)?;
        Ok(envelope.messages)
    }

    async fn send_message(
        &self,
        credential: &Credential,
        conversation_id: &ConversationId,
        content: &str,
        reply_to: Option<&MessageId>,
    ) -> Result<Message> {
        let response = self
            .client
            .post(self.url(&format!("conversations/{conversation_id}/messages")))
            .bearer_auth(credential.token())
            .json(&SendMessageBody { content, reply_to })
            .send()
            .await
            .map_err(transport)?;
        let envelope: MessageEnvelope =
            Self::check(response).await?.json().await.map_err(transport)?;
        Ok(envelope.message)
    }

    async fn edit_message(
        &self,
        credential: &Credential,
        message_id: &MessageId,
        new_content: &str,
    ) -> Result<Message> {
        let response = self
            .client
            .put(self.url(&format!("messages/{message_id}")))
            .bearer_auth(credential.token())
            .json(&EditMessageBody { content: new_content })
            .send()
            .await
            .map_err(transport)?;
        let envelope: MessageEnvelope =
            Self::check(response).await?.json().await.map_err(transport)?;
        Ok(envelope.message)
    }

    async fn delete_message(
        &self,
        credential: &Credential,
        message_id: &MessageId,
    ) -> Result<MessageId> {
        let response = self
            .client
            .delete(self.url(&format!("messages/{message_id}")))
            .bearer_auth(credential.token())
            .send()
            .await
            .map_err(transport)?;
        Self::check(response).await?;
        Ok(message_id.clone())
    }

    async fn send_meeting_link(
        &self,
        credential: &Credential,
        conversation_id: &ConversationId,
        meeting_url: &str,
        title: &str,
    ) -> Result<Message> {
        let response = self
            .client
            .post(self.url(&format!("conversations/{conversation_id}/meeting")))
            .bearer_auth(credential.token())
            .json(&MeetingBody {
                meeting_url,
                meeting_title: title,
            })
            .send()
            .await
            .map_err(transport)?;
        let envelope: MessageEnvelope =
            Self::check(response).await?.json().await.map_err(transport)?;
        Ok(envelope.message)
    }

    async fn create_conversation(
        &self,
        credential: &Credential,
        request: CreateConversationRequest,
    ) -> Result<Conversation> {
        let response = self
            .client
            .post(self.url("conversations"))
            .bearer_auth(credential.token())
            .json(&request)
            .send()
            .await
            .map_err(transport)?;
        let envelope: ConversationEnvelope =
            Self::check(response).await?.json().await.map_err(transport)?;
        Ok(envelope.conversation)
    }
}

#[async_trait]
impl AttachmentUploader for HttpMessageStore {
    async fn upload(
        &self,
        credential: &Credential,
        conversation_id: &ConversationId,
        bytes: Vec<u8>,
        file_name: &str,
        mime_type: &str,
    ) -> Result<Message> {
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mime_type)
            .map_err(|err| SkillSwapError::UnsupportedType(err.to_string()))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(self.url(&format!("conversations/{conversation_id}/files")))
            .bearer_auth(credential.token())
            .multipart(form)
            .send()
            .await
            .map_err(transport)?;
        let envelope: MessageEnvelope =
            Self::check(response).await?.json().await.map_err(transport)?;
        Ok(envelope.message)
    }
}
