use super::{non_empty, require_user, AppState};
use crate::doc_processor::{self, DocumentError};
use crate::error::{Error, Result};
use crate::index::VectorIndex;
use crate::llm::ChatMessage;
use crate::responder::Prompt;
use crate::session::{ActiveReport, Session};
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Clone, Serialize)]
pub struct ReportUpload {
    pub file_name: String,
    pub file_path: String,
    pub chunks: usize,
    /// Automatic first analysis; `None` when the PDF had no readable text.
    pub summary: Option<String>,
}

/// Store a PDF report, index it for this session and summarize it.
///
/// A new upload replaces the session's previous report and its chat.
pub async fn upload_report(
    state: &AppState,
    session: &mut Session,
    file_name: &str,
    bytes: &[u8],
) -> Result<ReportUpload> {
    let user_id = require_user(session)?.id;
    doc_processor::ensure_pdf(file_name)?;
    let file_name = Path::new(file_name)
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| DocumentError::UnsupportedType(file_name.to_string()))?
        .to_string();

    // 1. Parse and index before anything is written
    let text = doc_processor::extract_pdf_text(bytes)?;
    let chunks = state.splitter.split(&text);
    let chunk_count = chunks.len();
    let index = VectorIndex::build(state.embedder.as_ref(), chunks).await?;

    // 2. Keep the file and its record; a re-upload replaces the old row
    let dir = state.upload_dir.join(user_id.to_string());
    tokio::fs::create_dir_all(&dir).await?;
    let path = dir.join(&file_name);
    tokio::fs::write(&path, bytes).await?;
    let file_path = path.to_string_lossy().into_owned();
    state.db.delete_file(user_id, &file_name)?;
    state.db.record_file(user_id, &file_name, &file_path)?;

    tracing::info!(
        session = %session.id(),
        user_id,
        file = %file_name,
        chars = text.len(),
        chunks = chunk_count,
        "report ingested"
    );

    session.start_report(ActiveReport {
        file_name: file_name.clone(),
        text,
        index,
    });

    // 3. Automatic first analysis
    let summary = match session.report.as_ref() {
        Some(report) if !report.text.trim().is_empty() => {
            session.report_chat.begin();
            let reply = state
                .responder
                .respond(Prompt::ReportSummary {
                    report: &report.text,
                })
                .await;
            session.report_chat.finish();
            let reply = reply?;
            session.report_chat.push(ChatMessage::assistant(reply.clone()));
            Some(reply)
        }
        _ => None,
    };

    Ok(ReportUpload {
        file_name,
        file_path,
        chunks: chunk_count,
        summary,
    })
}

/// Answer a follow-up question from the top-k report chunks.
pub async fn ask_report(state: &AppState, session: &mut Session, question: &str) -> Result<String> {
    require_user(session)?;
    let question = non_empty(question)?;
    let report = session.report.as_ref().ok_or(Error::NoReport)?;

    // History is everything before this question
    let prior = session.report_chat.len();
    session.report_chat.push(ChatMessage::user(question));
    session.report_chat.begin();

    let answer = async {
        let context = report
            .index
            .query(state.embedder.as_ref(), question, state.top_k)
            .await?;
        tracing::debug!(session = %session.id(), retrieved = context.len(), "report context");
        let reply = state
            .responder
            .respond(Prompt::Grounded {
                context: &context,
                history: &session.report_chat.messages()[..prior],
                query: question,
            })
            .await?;
        Ok::<_, Error>(reply)
    }
    .await;

    session.report_chat.finish();
    let answer = answer?;
    session.report_chat.push(ChatMessage::assistant(answer.clone()));
    Ok(answer)
}

pub fn list_reports(state: &AppState, session: &Session) -> Result<Vec<(String, String)>> {
    let user_id = require_user(session)?.id;
    Ok(state.db.list_files(user_id)?)
}

/// Remove a stored report. Returns how many records were deleted.
pub async fn delete_report(state: &AppState, session: &mut Session, file_name: &str) -> Result<usize> {
    let user_id = require_user(session)?.id;
    let paths: Vec<String> = state
        .db
        .list_files(user_id)?
        .into_iter()
        .filter(|(name, _)| name == file_name)
        .map(|(_, path)| path)
        .collect();

    let removed = state.db.delete_file(user_id, file_name)?;
    for path in paths {
        if let Err(e) = tokio::fs::remove_file(&path).await {
            tracing::warn!(path = %path, error = %e, "stored report could not be removed");
        }
    }

    if session
        .report
        .as_ref()
        .is_some_and(|r| r.file_name == file_name)
    {
        session.clear_report();
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{harness, logged_in};
    use crate::db::models::Stats;
    use crate::doc_processor::testing::pdf_bytes;
    use crate::embedding::{Embedder, EmbeddingError};
    use crate::llm::Role;
    use crate::responder::SYSTEM_INSTRUCTION;

    const REPORT: &str = "diabetes causes high blood sugar";

    #[tokio::test]
    async fn test_upload_stores_indexes_and_summarizes() {
        let h = harness();
        let mut session = logged_in(&h);

        let upload = upload_report(&h.state, &mut session, "report.pdf", &pdf_bytes(Some(REPORT)))
            .await
            .unwrap();

        assert_eq!(upload.file_name, "report.pdf");
        assert_eq!(upload.chunks, 1);
        assert_eq!(upload.summary.as_deref(), Some("reply to 1 turns"));
        assert!(Path::new(&upload.file_path).exists());
        assert_eq!(
            list_reports(&h.state, &session).unwrap(),
            vec![("report.pdf".to_string(), upload.file_path.clone())]
        );

        let sent = h.model.last_request();
        assert_eq!(sent.messages.len(), 1);
        assert!(sent.messages[0]
            .content
            .starts_with("Analyze this medical report and summarize key findings:\n"));
        assert!(sent.messages[0].content.contains(REPORT));
        assert_eq!(session.report_chat.len(), 1);
    }

    #[tokio::test]
    async fn test_ask_uses_retrieved_context_and_flat_history() {
        let h = harness();
        let mut session = logged_in(&h);
        upload_report(&h.state, &mut session, "report.pdf", &pdf_bytes(Some(REPORT)))
            .await
            .unwrap();

        let answer = ask_report(&h.state, &mut session, "Is my sugar level high?")
            .await
            .unwrap();
        assert_eq!(answer, "reply to 2 turns");

        let sent = h.model.last_request();
        assert_eq!(sent.messages[0].content, SYSTEM_INSTRUCTION);
        let body = &sent.messages[1].content;
        assert!(body.starts_with("Context:\n"));
        assert!(body.contains(REPORT));
        assert!(body.contains("Conversation History:\nAssistant: reply to 1 turns\n\nUser Question:\nIs my sugar level high?"));

        let roles: Vec<Role> = session.report_chat.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::Assistant, Role::User, Role::Assistant]);
    }

    #[tokio::test]
    async fn test_ask_without_report() {
        let h = harness();
        let mut session = logged_in(&h);
        let err = ask_report(&h.state, &mut session, "anything?").await.unwrap_err();
        assert!(matches!(err, Error::NoReport));
        assert!(session.report_chat.is_empty());
    }

    #[tokio::test]
    async fn test_blank_pdf_gives_empty_context_without_summary() {
        let h = harness();
        let mut session = logged_in(&h);
        let upload = upload_report(&h.state, &mut session, "blank.pdf", &pdf_bytes(None))
            .await
            .unwrap();
        assert_eq!(upload.chunks, 0);
        assert!(upload.summary.is_none());
        assert_eq!(h.model.request_count(), 0);

        ask_report(&h.state, &mut session, "What does it say?").await.unwrap();
        let body = &h.model.last_request().messages[1].content;
        assert!(body.starts_with("Context:\n\n\nConversation History:"));
    }

    #[tokio::test]
    async fn test_rejects_non_pdf_and_garbage() {
        let h = harness();
        let mut session = logged_in(&h);
        let err = upload_report(&h.state, &mut session, "notes.txt", b"hello")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Document(DocumentError::UnsupportedType(_))));

        let err = upload_report(&h.state, &mut session, "fake.pdf", b"not a pdf")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Document(DocumentError::Pdf(_))));
        assert!(list_reports(&h.state, &session).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_new_upload_replaces_previous_report() {
        let h = harness();
        let mut session = logged_in(&h);
        upload_report(&h.state, &mut session, "a.pdf", &pdf_bytes(Some(REPORT)))
            .await
            .unwrap();
        ask_report(&h.state, &mut session, "sugar?").await.unwrap();
        assert_eq!(session.report_chat.len(), 3);

        upload_report(&h.state, &mut session, "b.pdf", &pdf_bytes(Some("flu causes fever")))
            .await
            .unwrap();
        assert_eq!(session.report.as_ref().unwrap().file_name, "b.pdf");
        assert_eq!(session.report_chat.len(), 1);
        assert_eq!(list_reports(&h.state, &session).unwrap().len(), 2);

        upload_report(&h.state, &mut session, "b.pdf", &pdf_bytes(Some("flu causes fever")))
            .await
            .unwrap();
        assert_eq!(list_reports(&h.state, &session).unwrap().len(), 2);
    }

    struct DownEmbedder;

    #[async_trait::async_trait]
    impl Embedder for DownEmbedder {
        async fn embed_batch(&self, _texts: &[String]) -> std::result::Result<Vec<Vec<f32>>, EmbeddingError> {
            Err(EmbeddingError::Api {
                status: 503,
                message: "model not loaded".into(),
            })
        }

        fn dimensions(&self) -> usize {
            384
        }

        fn name(&self) -> &str {
            "down"
        }
    }

    #[tokio::test]
    async fn test_failed_indexing_stores_nothing() {
        let mut h = harness();
        let mut session = logged_in(&h);
        upload_report(&h.state, &mut session, "a.pdf", &pdf_bytes(Some(REPORT)))
            .await
            .unwrap();

        h.state.embedder = Box::new(DownEmbedder);
        let err = upload_report(&h.state, &mut session, "b.pdf", &pdf_bytes(Some("flu causes fever")))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Embedding(EmbeddingError::Api { status: 503, .. })));

        let stored = list_reports(&h.state, &session).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].0, "a.pdf");
        let user_dir = h.state.upload_dir.join(session.user().unwrap().id.to_string());
        assert!(!user_dir.join("b.pdf").exists());
        assert_eq!(session.report.as_ref().unwrap().file_name, "a.pdf");
        assert_eq!(session.report_chat.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_report_removes_record_file_and_active_report() {
        let h = harness();
        let mut session = logged_in(&h);
        let upload = upload_report(&h.state, &mut session, "report.pdf", &pdf_bytes(Some(REPORT)))
            .await
            .unwrap();

        assert_eq!(delete_report(&h.state, &mut session, "report.pdf").await.unwrap(), 1);
        assert!(list_reports(&h.state, &session).unwrap().is_empty());
        assert!(!Path::new(&upload.file_path).exists());
        assert!(session.report.is_none());
        assert_eq!(crate::commands::auth::stats(&h.state).unwrap(), Stats { users: 1, files: 0 });

        assert_eq!(delete_report(&h.state, &mut session, "report.pdf").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_upload_requires_login() {
        let h = harness();
        let mut session = Session::new();
        let err = upload_report(&h.state, &mut session, "report.pdf", &pdf_bytes(Some(REPORT)))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotLoggedIn));
        assert!(!h.dir.path().join("uploads").exists());
    }
}
