pub mod commands;
pub mod config;
pub mod db;
pub mod doc_processor;
pub mod embedding;
pub mod error;
pub mod index;
pub mod llm;
pub mod repl;
pub mod responder;
pub mod session;

pub use commands::AppState;
pub use config::Config;
pub use error::{Error, Result};
pub use session::{Page, Session};
