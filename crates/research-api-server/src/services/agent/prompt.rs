use super::wire::ChatMessage;
use crate::models::{Role, Turn};

pub const SYSTEM_PROMPT: &str = "You are a research assistant that helps find accurate information by searching the web.

Important Instructions:
1. Break down complex queries into specific searches for key information
2. Verify information from multiple sources when possible
3. Be skeptical of unreliable sources
4. If you need more information, use the search tool again
5. Stream your findings as you discover them
6. Use bullets, sections, and other formatting to make your responses more readable

Format your responses in markdown with proper citations.";

pub const CITATION_REMINDER: &str = "Always mention website links in response";

/// System prompt, prior turns, the query, then the citation reminder.
pub fn build_messages(query: &str, history: &[Turn]) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 3);
    messages.push(ChatMessage::system(SYSTEM_PROMPT));

    messages.extend(history.iter().map(|turn| match turn.role {
        Role::User => ChatMessage::user(turn.content.clone()),
        Role::Assistant => ChatMessage::assistant(turn.content.clone()),
    }));

    messages.push(ChatMessage::user(query));
    messages.push(ChatMessage::system(CITATION_REMINDER));
    messages
}
