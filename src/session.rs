//! Per-user interaction state.
//!
//! Everything a front end would otherwise keep in globals lives here and is
//! handed to each handler as `&mut Session`, so two users never share logs,
//! login state or report indexes.

use crate::db::models::User;
use crate::index::VectorIndex;
use crate::llm::ChatMessage;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Page {
    #[default]
    Login,
    SignUp,
    /// Curabot symptom chat.
    Consult,
    /// Medical report bot.
    Report,
}

/// Lifecycle of one chat surface. While `InFlight` the surface accepts no
/// other input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SurfaceState {
    #[default]
    Idle,
    AwaitingInput,
    InFlight,
}

/// Append-only message history. No truncation or windowing.
#[derive(Debug, Clone, Default)]
pub struct ChatLog {
    messages: Vec<ChatMessage>,
    state: SurfaceState,
}

impl ChatLog {
    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn state(&self) -> SurfaceState {
        self.state
    }

    /// Surface is shown and waiting for the user.
    pub fn open(&mut self) {
        if self.state == SurfaceState::Idle {
            self.state = SurfaceState::AwaitingInput;
        }
    }

    pub(crate) fn begin(&mut self) {
        self.state = SurfaceState::InFlight;
    }

    pub(crate) fn finish(&mut self) {
        self.state = SurfaceState::Idle;
    }

    fn clear(&mut self) {
        self.messages.clear();
        self.state = SurfaceState::Idle;
    }
}

/// The uploaded report currently under discussion.
#[derive(Debug, Clone)]
pub struct ActiveReport {
    pub file_name: String,
    pub text: String,
    pub index: VectorIndex,
}

#[derive(Debug)]
pub struct Session {
    id: Uuid,
    user: Option<User>,
    page: Page,
    pub general: ChatLog,
    pub report_chat: ChatLog,
    pub report: Option<ActiveReport>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            user: None,
            page: Page::Login,
            general: ChatLog::default(),
            report_chat: ChatLog::default(),
            report: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn is_logged_in(&self) -> bool {
        self.user.is_some()
    }

    pub fn page(&self) -> Page {
        self.page
    }

    /// Chat pages are only reachable once logged in; other requests are
    /// ignored and the current page is returned.
    pub fn navigate(&mut self, page: Page) -> Page {
        let allowed = match page {
            Page::Consult | Page::Report => self.is_logged_in(),
            Page::Login | Page::SignUp => true,
        };
        if allowed {
            self.page = page;
            match page {
                Page::Consult => self.general.open(),
                Page::Report => self.report_chat.open(),
                _ => {}
            }
        }
        self.page
    }

    /// Binds `user`. Anything left by a previous login is dropped first.
    pub(crate) fn log_in(&mut self, user: User) {
        if self.user.is_some() {
            self.log_out();
        }
        tracing::info!(session = %self.id, user_id = user.id, "logged in");
        self.user = Some(user);
        self.navigate(Page::Consult);
    }

    /// Make `report` the document under discussion. The previous report's
    /// conversation is discarded.
    pub(crate) fn start_report(&mut self, report: ActiveReport) {
        self.report_chat.clear();
        self.report = Some(report);
    }

    pub(crate) fn clear_report(&mut self) {
        self.report_chat.clear();
        self.report = None;
    }

    /// Drop the user and everything gathered during the login.
    pub fn log_out(&mut self) {
        if let Some(user) = self.user.take() {
            tracing::info!(session = %self.id, user_id = user.id, "logged out");
        }
        self.general.clear();
        self.report_chat.clear();
        self.report = None;
        self.page = Page::Login;
    }
}
