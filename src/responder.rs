//! Prompt assembly and the single LLM call behind every chat surface.

use crate::llm::{ChatMessage, ChatRequest, LanguageModel, LlmError, Role};

pub const SYSTEM_INSTRUCTION: &str = "\
Your name is Curabot.
You are a professional medical doctor.

Responsibilities:
1. Identify possible diseases from symptoms.
2. Suggest medication if appropriate.
3. Provide prevention methods.
4. Maintain natural, human-like conversation.
5. Politely refuse non-medical or abusive queries.
6. If the condition appears serious or life-threatening, suggest seeking professional medical attention.

Be accurate. Do not hallucinate.
";

/// The request shapes sent to the model.
#[derive(Debug, Clone, Copy)]
pub enum Prompt<'a> {
    /// Retrieved context, prior turns and the new question flattened into a
    /// single user turn after the system instruction.
    Grounded {
        context: &'a [String],
        history: &'a [ChatMessage],
        query: &'a str,
    },
    /// The system instruction followed by every turn, role-tagged.
    Conversation { history: &'a [ChatMessage] },
    /// First-pass analysis of a freshly uploaded report. No persona.
    ReportSummary { report: &'a str },
}

impl Prompt<'_> {
    pub fn into_messages(self) -> Vec<ChatMessage> {
        match self {
            Prompt::Grounded {
                context,
                history,
                query,
            } => {
                let history_text = history
                    .iter()
                    .map(history_line)
                    .collect::<Vec<_>>()
                    .join("\n");
                let body = format!(
                    "Context:\n{}\n\nConversation History:\n{}\n\nUser Question:\n{}\n\nProvide a professional medical response.",
                    context.join("\n"),
                    history_text,
                    query
                );
                vec![ChatMessage::system(SYSTEM_INSTRUCTION), ChatMessage::user(body)]
            }
            Prompt::Conversation { history } => {
                let mut messages = Vec::with_capacity(history.len() + 1);
                messages.push(ChatMessage::system(SYSTEM_INSTRUCTION));
                messages.extend(history.iter().filter(|m| m.role != Role::System).cloned());
                messages
            }
            Prompt::ReportSummary { report } => vec![ChatMessage::user(format!(
                "Analyze this medical report and summarize key findings:\n{}",
                report
            ))],
        }
    }
}

fn history_line(message: &ChatMessage) -> String {
    let speaker = match message.role {
        Role::User => "User",
        Role::Assistant => "Assistant",
        Role::System => "System",
    };
    format!("{}: {}", speaker, message.content)
}

/// Sends prompts to one configured model. One blocking round-trip per call;
/// errors are returned as-is.
pub struct Responder {
    model: Box<dyn LanguageModel>,
    model_id: String,
    temperature: f32,
}

impl Responder {
    pub fn new(model: Box<dyn LanguageModel>, model_id: impl Into<String>, temperature: f32) -> Self {
        Self {
            model,
            model_id: model_id.into(),
            temperature,
        }
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub async fn respond(&self, prompt: Prompt<'_>) -> Result<String, LlmError> {
        let request = ChatRequest {
            messages: prompt.into_messages(),
            model: self.model_id.clone(),
            temperature: self.temperature,
        };
        let response = self.model.chat(&request).await?;
        tracing::debug!(model = %response.model, chars = response.content.len(), "model replied");
        Ok(response.content)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::llm::ChatResponse;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    /// Replies with a fixed prefix plus the turn count, or fails on demand.
    /// Every request is recorded.
    #[derive(Clone, Default)]
    pub struct ScriptedModel {
        pub requests: Arc<Mutex<Vec<ChatRequest>>>,
        pub fail: Arc<Mutex<bool>>,
    }

    impl ScriptedModel {
        pub fn last_request(&self) -> ChatRequest {
            self.requests.lock().unwrap().last().cloned().expect("no request sent")
        }

        pub fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        pub fn set_failing(&self, fail: bool) {
            *self.fail.lock().unwrap() = fail;
        }
    }

    #[async_trait]
    impl LanguageModel for ScriptedModel {
        async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, LlmError> {
            self.requests.lock().unwrap().push(request.clone());
            if *self.fail.lock().unwrap() {
                return Err(LlmError::Api {
                    status: 429,
                    message: "quota exceeded".into(),
                });
            }
            Ok(ChatResponse {
                content: format!("reply to {} turns", request.messages.len()),
                model: request.model.clone(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::ScriptedModel;
    use super::*;

    #[test]
    fn test_grounded_prompt_layout() {
        let context = vec!["Hb 9.1 g/dL".to_string(), "Ferritin low".to_string()];
        let history = vec![
            ChatMessage::assistant("The report shows anemia."),
            ChatMessage::user("Is it serious?"),
            ChatMessage::assistant("Usually treatable."),
        ];
        let messages = Prompt::Grounded {
            context: &context,
            history: &history,
            query: "What should I eat?",
        }
        .into_messages();

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], ChatMessage::system(SYSTEM_INSTRUCTION));
        assert_eq!(messages[1].role, Role::User);
        assert_eq!(
            messages[1].content,
            "Context:\nHb 9.1 g/dL\nFerritin low\n\n\
             Conversation History:\nAssistant: The report shows anemia.\nUser: Is it serious?\nAssistant: Usually treatable.\n\n\
             User Question:\nWhat should I eat?\n\n\
             Provide a professional medical response."
        );
    }

    #[test]
    fn test_grounded_prompt_with_empty_context() {
        let messages = Prompt::Grounded {
            context: &[],
            history: &[],
            query: "Anything wrong?",
        }
        .into_messages();
        assert!(messages[1].content.starts_with("Context:\n\n\nConversation History:\n\n\n"));
    }

    #[test]
    fn test_conversation_prompt_replays_turns() {
        let history = vec![
            ChatMessage::user("I have a fever"),
            ChatMessage::assistant("How high?"),
            ChatMessage::user("39C"),
        ];
        let messages = Prompt::Conversation { history: &history }.into_messages();
        let roles: Vec<Role> = messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant, Role::User]);
        assert_eq!(messages[0].content, SYSTEM_INSTRUCTION);
        assert_eq!(&messages[1..], &history[..]);
    }

    #[test]
    fn test_report_summary_has_no_persona() {
        let messages = Prompt::ReportSummary { report: "WBC 12k" }.into_messages();
        assert_eq!(
            messages,
            vec![ChatMessage::user(
                "Analyze this medical report and summarize key findings:\nWBC 12k"
            )]
        );
    }

    #[test]
    fn test_system_instruction_covers_policy() {
        assert!(SYSTEM_INSTRUCTION.contains("Curabot"));
        assert!(SYSTEM_INSTRUCTION.contains("refuse non-medical or abusive"));
        assert!(SYSTEM_INSTRUCTION.contains("professional medical attention"));
        assert!(SYSTEM_INSTRUCTION.contains("Do not hallucinate"));
    }

    #[tokio::test]
    async fn test_respond_sends_model_and_temperature() {
        let model = ScriptedModel::default();
        let responder = Responder::new(Box::new(model.clone()), "gemini-2.5-flash", 0.3);
        let reply = responder
            .respond(Prompt::ReportSummary { report: "x" })
            .await
            .unwrap();

        assert_eq!(reply, "reply to 1 turns");
        let sent = model.last_request();
        assert_eq!(sent.model, "gemini-2.5-flash");
        assert!((sent.temperature - 0.3).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_respond_propagates_failure() {
        let model = ScriptedModel::default();
        model.set_failing(true);
        let responder = Responder::new(Box::new(model), "m", 0.3);
        let err = responder
            .respond(Prompt::Conversation { history: &[] })
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Api { status: 429, .. }));
    }
}
