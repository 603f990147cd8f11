use super::AppState;
use crate::db::models::{NewUser, Stats, User};
use crate::error::{Error, Result};
use crate::session::Session;

pub const SIGN_UP_OK: &str = "Account created successfully.";

/// Create an account. Returns the message shown to the user.
pub fn sign_up(state: &AppState, form: &NewUser) -> Result<&'static str> {
    state.db.register(form)?;
    Ok(SIGN_UP_OK)
}

/// Unknown email and wrong password are reported the same way.
pub fn login(state: &AppState, session: &mut Session, email: &str, password: &str) -> Result<User> {
    match state.db.authenticate(email, password)? {
        Some(user) => {
            session.log_in(user.clone());
            Ok(user)
        }
        None => {
            tracing::info!(session = %session.id(), "login rejected");
            Err(Error::InvalidCredentials)
        }
    }
}

pub fn logout(session: &mut Session) {
    session.log_out();
}

pub fn stats(state: &AppState) -> Result<Stats> {
    Ok(state.db.stats()?)
}
