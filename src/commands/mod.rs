//! Interaction handlers. Each takes the shared [`AppState`] plus the caller's
//! own [`Session`](crate::session::Session) and runs one request to
//! completion.

pub mod auth;
pub mod chat;
pub mod report;

use crate::config::Config;
use crate::db::models::User;
use crate::db::Database;
use crate::doc_processor::TextSplitter;
use crate::embedding::{Embedder, HttpEmbedder};
use crate::error::{Error, Result};
use crate::responder::Responder;
use crate::session::Session;
use std::path::PathBuf;

pub struct AppState {
    pub db: Database,
    pub responder: Responder,
    pub embedder: Box<dyn Embedder>,
    pub splitter: TextSplitter,
    pub upload_dir: PathBuf,
    pub top_k: usize,
}

impl AppState {
    pub fn from_config(config: &Config) -> Result<Self> {
        let db = Database::new(&config.database_path)?;
        let responder = Responder::new(
            Box::new(config.provider()),
            config.llm.model.clone(),
            config.llm.temperature,
        );
        let splitter = TextSplitter::new(config.chunk_size, config.chunk_overlap)?;
        Ok(Self {
            db,
            responder,
            embedder: Box::new(HttpEmbedder::new(config.embedding.clone())),
            splitter,
            upload_dir: config.upload_dir.clone(),
            top_k: config.top_k,
        })
    }
}

fn require_user(session: &Session) -> Result<&User> {
    session.user().ok_or(Error::NotLoggedIn)
}

fn non_empty(text: &str) -> Result<&str> {
    let text = text.trim();
    if text.is_empty() {
        Err(Error::EmptyInput)
    } else {
        Ok(text)
    }
}
