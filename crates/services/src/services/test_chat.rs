use std::sync::Arc;

use backend::{Backend, BackendError, GenerateTextRequest, TextGenerator};
use chrono::{DateTime, Utc};
use db::{
    RecordStore, StoreError, new_record_id,
    models::{chatbot::Chatbot, document::Document},
};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;
use ts_rs::TS;

/// Assistant message appended when a reply cannot be produced.
pub const FALLBACK_REPLY: &str = "Sorry, I encountered an error while processing your request.";

#[derive(Debug, Error)]
pub enum TestChatError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ChatMessage {
    pub id: String,
    pub role: ChatRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            id: new_record_id("msg"),
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "snake_case")]
pub enum ChatState {
    #[default]
    Idle,
    AwaitingResponse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "snake_case")]
pub enum IgnoreReason {
    BlankInput,
    NoChatbot,
    ResponsePending,
}

/// What a call to [`TestChat::send`] did.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[serde(tag = "outcome", rename_all = "snake_case")]
#[ts(export)]
pub enum SendOutcome {
    Ignored { reason: IgnoreReason },
    Replied { message: ChatMessage },
    Fallback { message: ChatMessage },
    /// The conversation was switched before the reply arrived.
    Discarded,
}

/// Concatenated document contents used as prompt context.
pub fn build_context(documents: &[Document]) -> String {
    documents
        .iter()
        .map(|doc| doc.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn build_prompt(system_prompt: &str, context: &str, input: &str) -> String {
    format!("{system_prompt}\n\nKnowledge Base Context:\n{context}\n\nUser Question:\n{input}")
}

#[derive(Debug, Default)]
struct Conversation {
    chatbot: Option<Chatbot>,
    messages: Vec<ChatMessage>,
    state: ChatState,
    // Bumped on every switch so stale replies can be recognised.
    generation: u64,
}

impl Conversation {
    fn switch_to(&mut self, chatbot: Option<Chatbot>) {
        self.chatbot = chatbot;
        self.messages.clear();
        self.state = ChatState::Idle;
        self.generation += 1;
    }
}

/// Session-local conversation with the selected chatbot. Nothing is persisted.
pub struct TestChat {
    records: Arc<dyn RecordStore>,
    generator: Arc<dyn TextGenerator>,
    context_limit: usize,
    conversation: Mutex<Conversation>,
}

impl TestChat {
    pub fn new(backend: &Backend, context_limit: usize) -> Self {
        Self {
            records: backend.records.clone(),
            generator: backend.generator.clone(),
            context_limit,
            conversation: Mutex::new(Conversation::default()),
        }
    }

    /// Switches the conversation to `chatbot`, or closes it with `None`.
    pub async fn select(&self, chatbot: Option<Chatbot>) {
        self.conversation.lock().await.switch_to(chatbot);
    }

    /// Closes the conversation if it is with one of `user_id`'s chatbots.
    pub async fn release_user(&self, user_id: &str) {
        let mut conversation = self.conversation.lock().await;
        if conversation
            .chatbot
            .as_ref()
            .is_some_and(|chatbot| chatbot.user_id == user_id)
        {
            conversation.switch_to(None);
        }
    }

    pub async fn selected(&self) -> Option<Chatbot> {
        self.conversation.lock().await.chatbot.clone()
    }

    pub async fn messages(&self) -> Vec<ChatMessage> {
        self.conversation.lock().await.messages.clone()
    }

    pub async fn state(&self) -> ChatState {
        self.conversation.lock().await.state
    }

    pub async fn send(&self, input: &str) -> SendOutcome {
        let (chatbot, generation) = {
            let mut conversation = self.conversation.lock().await;
            if input.trim().is_empty() {
                return SendOutcome::Ignored {
                    reason: IgnoreReason::BlankInput,
                };
            }
            let Some(chatbot) = conversation.chatbot.clone() else {
                return SendOutcome::Ignored {
                    reason: IgnoreReason::NoChatbot,
                };
            };
            if conversation.state == ChatState::AwaitingResponse {
                return SendOutcome::Ignored {
                    reason: IgnoreReason::ResponsePending,
                };
            }
            conversation
                .messages
                .push(ChatMessage::new(ChatRole::User, input));
            conversation.state = ChatState::AwaitingResponse;
            (chatbot, conversation.generation)
        };

        let reply = self.generate_reply(&chatbot, input).await;

        let mut conversation = self.conversation.lock().await;
        if conversation.generation != generation {
            tracing::debug!(bot_id = %chatbot.id, "Dropping reply for a closed conversation");
            return SendOutcome::Discarded;
        }
        conversation.state = ChatState::Idle;
        match reply {
            Ok(text) => {
                let message = ChatMessage::new(ChatRole::Assistant, text);
                conversation.messages.push(message.clone());
                SendOutcome::Replied { message }
            }
            Err(e) => {
                tracing::error!(bot_id = %chatbot.id, error = %e, "Test chat reply failed");
                let message = ChatMessage::new(ChatRole::Assistant, FALLBACK_REPLY);
                conversation.messages.push(message.clone());
                SendOutcome::Fallback { message }
            }
        }
    }

    async fn generate_reply(&self, chatbot: &Chatbot, input: &str) -> Result<String, TestChatError> {
        let documents = Document::find_by_knowledge_base(
            self.records.as_ref(),
            &chatbot.knowledge_base_id,
            Some(self.context_limit),
        )
        .await?;
        let context = build_context(&documents);

        let request = GenerateTextRequest {
            prompt: build_prompt(&chatbot.system_prompt, &context, input),
            model: chatbot.model.clone(),
            max_tokens: chatbot.max_tokens,
            temperature: chatbot.temperature,
        };
        let response = self.generator.generate_text(&request).await?;
        Ok(response.text)
    }
}
