//! The conversation loop: memory context in, model reply out, exchange
//! recorded.

use crate::chat::client::{ChatBackend, ChatMessage};
use crate::chat::personality::{Personality, PersonalityInfo};
use crate::chat::session::ChatSession;
use crate::errors::{NovaError, Result};
use crate::memory::{MemoryManager, TurnId, DEFAULT_CONTEXT_ITEMS};
use std::sync::{Arc, RwLock};
use tokio::task::spawn_blocking;
use tracing::{debug, error};

/// Reply used when the model cannot be reached
pub const FALLBACK_REPLY: &str = "Lo siento, no puedo responder en este momento.";

/// Result of one conversational turn
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub text: String,
    pub turn_id: TurnId,
    /// The model failed and `text` is the fallback apology
    pub degraded: bool,
}

pub struct Assistant {
    backend: Arc<dyn ChatBackend>,
    memory: Arc<MemoryManager>,
    personality: RwLock<Personality>,
    context_items: usize,
}

impl Assistant {
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        memory: Arc<MemoryManager>,
        personality: Personality,
    ) -> Self {
        Self {
            backend,
            memory,
            personality: RwLock::new(personality),
            context_items: DEFAULT_CONTEXT_ITEMS,
        }
    }

    /// Number of related past turns included in the context block
    pub fn with_context_items(mut self, context_items: usize) -> Self {
        self.context_items = context_items;
        self
    }

    pub fn memory(&self) -> &Arc<MemoryManager> {
        &self.memory
    }

    pub fn model(&self) -> &str {
        self.backend.model()
    }

    pub fn personality_info(&self) -> PersonalityInfo {
        self.read_personality().info()
    }

    /// Mutate the persona in place
    pub fn update_personality(&self, update: impl FnOnce(&mut Personality)) {
        let mut personality = self
            .personality
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        update(&mut personality);
    }

    /// Persona prompt, plus the memory block when there is one
    pub fn system_prompt(&self, text: &str) -> String {
        let context = self.memory.build_context(text, self.context_items);
        self.prompt_with_context(&context)
    }

    fn prompt_with_context(&self, context: &str) -> String {
        let (mut prompt, user_name) = {
            let personality = self.read_personality();
            (personality.system_prompt(), personality.user_name().to_string())
        };
        if !context.is_empty() {
            prompt.push_str(&format!(
                "\n\nRecuerda esta información sobre {}:\n{}",
                user_name, context
            ));
        }
        prompt
    }

    /// System prompt, then the session so far, then the new message
    pub fn build_messages(
        &self,
        session: &ChatSession,
        system_prompt: String,
        text: &str,
    ) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(session.len() * 2 + 2);
        messages.push(ChatMessage::system(system_prompt));
        for exchange in session.history() {
            messages.push(ChatMessage::user(exchange.user.as_str()));
            messages.push(ChatMessage::assistant(exchange.assistant.as_str()));
        }
        messages.push(ChatMessage::user(text));
        messages
    }

    /// Answer `text` within `session`.
    ///
    /// Model failures do not surface as errors: the fallback reply is
    /// returned (and remembered) with `degraded` set.
    pub async fn respond(&self, session: &mut ChatSession, text: &str) -> Result<Reply> {
        self.respond_with(session, text, &mut |_: &str| {}).await
    }

    /// Like [`Assistant::respond`], streaming reply fragments to
    /// `on_fragment` while the model produces them
    pub async fn respond_with(
        &self,
        session: &mut ChatSession,
        text: &str,
        on_fragment: &mut (dyn for<'s> FnMut(&'s str) + Send),
    ) -> Result<Reply> {
        let text = text.trim();
        if text.is_empty() {
            return Err(NovaError::EmptyMessage);
        }

        let memory = self.memory.clone();
        let (query, items) = (text.to_string(), self.context_items);
        let context = spawn_blocking(move || memory.build_context(&query, items))
            .await
            .map_err(|e| NovaError::Generic(format!("Memory lookup failed: {}", e)))?;

        let system_prompt = self.prompt_with_context(&context);
        let messages = self.build_messages(session, system_prompt, text);
        debug!(session_id = %session.id, messages = messages.len(), "Asking model");

        let (reply_text, degraded) = match self.backend.chat_streaming(&messages, on_fragment).await
        {
            Ok(reply) => (reply, false),
            Err(e) => {
                error!(error = %e, model = self.backend.model(), "Model request failed");
                (FALLBACK_REPLY.to_string(), true)
            }
        };

        let memory = self.memory.clone();
        let (user_text, assistant_text) = (text.to_string(), reply_text.clone());
        let turn_id = spawn_blocking(move || memory.record_exchange(&user_text, &assistant_text))
            .await
            .map_err(|e| NovaError::Generic(format!("Memory write failed: {}", e)))?;
        session.push(text, &reply_text);

        Ok(Reply {
            text: reply_text,
            turn_id,
            degraded,
        })
    }

    fn read_personality(&self) -> std::sync::RwLockReadGuard<'_, Personality> {
        self.personality
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
