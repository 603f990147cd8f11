use super::{non_empty, require_user, AppState};
use crate::error::Result;
use crate::llm::ChatMessage;
use crate::responder::Prompt;
use crate::session::Session;

/// Curabot symptom chat: the whole conversation is replayed as role-tagged
/// turns on every message.
pub async fn send_symptoms(state: &AppState, session: &mut Session, content: &str) -> Result<String> {
    let user_id = require_user(session)?.id;
    let content = non_empty(content)?;

    // 1. Save user message
    session.general.push(ChatMessage::user(content));

    // 2. Replay full history
    session.general.begin();
    let reply = state
        .responder
        .respond(Prompt::Conversation {
            history: session.general.messages(),
        })
        .await;
    session.general.finish();
    let reply = reply?;

    // 3. Save assistant message
    session.general.push(ChatMessage::assistant(reply.clone()));
    tracing::debug!(session = %session.id(), user_id, turns = session.general.len(), "symptom chat turn");
    Ok(reply)
}
