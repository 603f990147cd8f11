//! Line-oriented front end. Lines starting with `/` are commands; anything
//! else is a chat message for the current page.

use crate::commands::{auth, chat, report, AppState};
use crate::db::models::NewUser;
use crate::error::{Error, Result};
use crate::session::{Page, Session};
use std::path::Path;

pub const HELP: &str = "\
commands:
  /signup <first> <last> <date-of-birth> <email> <password>
  /login <email> <password>
  /logout
  /page <login|signup|consult|report>
  /upload <path-to-pdf>     analyze a report and switch to the report page
  /files                    list your stored reports
  /rm <file-name>           delete a stored report
  /stats                    registered users and stored files
  /help
  /quit
any other line is sent to the chat on the current page";

#[derive(Debug, PartialEq, Eq)]
pub enum Input<'a> {
    Help,
    SignUp([&'a str; 5]),
    Login { email: &'a str, password: &'a str },
    Logout,
    Page(&'a str),
    Upload(&'a str),
    Files,
    Remove(&'a str),
    Stats,
    Quit,
    Chat(&'a str),
    /// A `/command` that is unknown or has the wrong arguments.
    Unknown(&'a str),
}

pub fn parse(line: &str) -> Input<'_> {
    let line = line.trim();
    let Some(command_line) = line.strip_prefix('/') else {
        return Input::Chat(line);
    };
    let (command, rest) = command_line.split_once(' ').unwrap_or((command_line, ""));
    let rest = rest.trim();
    let args: Vec<&str> = rest.split_whitespace().collect();

    match (command, args.as_slice()) {
        ("help", []) => Input::Help,
        ("signup", [first, last, born, email, password]) => {
            Input::SignUp([*first, *last, *born, *email, *password])
        }
        ("login", [email, password]) => Input::Login {
            email: *email,
            password: *password,
        },
        ("logout", []) => Input::Logout,
        ("page", [name]) => Input::Page(*name),
        ("upload", [_, ..]) => Input::Upload(rest),
        ("files", []) => Input::Files,
        ("rm", [_, ..]) => Input::Remove(rest),
        ("stats", []) => Input::Stats,
        ("quit" | "exit", []) => Input::Quit,
        _ => Input::Unknown(line),
    }
}

pub fn prompt(session: &Session) -> String {
    let page = match session.page() {
        Page::Login => "login",
        Page::SignUp => "signup",
        Page::Consult => "consult",
        Page::Report => "report",
    };
    format!("[{}]> ", page)
}

/// Run one input line against the session and return the text to print.
pub async fn dispatch(state: &AppState, session: &mut Session, line: &str) -> Result<String> {
    match parse(line) {
        Input::Help => Ok(HELP.to_string()),
        Input::SignUp([first, last, born, email, password]) => {
            let form = NewUser {
                first_name: first.to_string(),
                last_name: last.to_string(),
                date_of_birth: born.to_string(),
                email: email.to_string(),
                password: password.to_string(),
            };
            let message = auth::sign_up(state, &form)?;
            session.navigate(Page::Login);
            Ok(message.to_string())
        }
        Input::Login { email, password } => {
            let user = auth::login(state, session, email, password)?;
            Ok(format!("Welcome, {} {}.", user.first_name, user.last_name))
        }
        Input::Logout => {
            auth::logout(session);
            Ok("Logged out.".to_string())
        }
        Input::Page(name) => {
            let wanted = match name {
                "login" => Page::Login,
                "signup" => Page::SignUp,
                "consult" => Page::Consult,
                "report" => Page::Report,
                _ => return Ok(format!("unknown page `{}`", name)),
            };
            if session.navigate(wanted) != wanted {
                return Err(Error::NotLoggedIn);
            }
            Ok(String::new())
        }
        Input::Upload(path) => {
            let path = Path::new(path);
            let bytes = tokio::fs::read(path).await?;
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let upload = report::upload_report(state, session, &file_name, &bytes).await?;
            session.navigate(Page::Report);
            Ok(match upload.summary {
                Some(summary) => format!("{} ({} chunks)\n\n{}", upload.file_name, upload.chunks, summary),
                None => format!("{}: no readable text found", upload.file_name),
            })
        }
        Input::Files => {
            let files = report::list_reports(state, session)?;
            if files.is_empty() {
                return Ok("no stored reports".to_string());
            }
            Ok(files
                .into_iter()
                .map(|(name, path)| format!("{}\t{}", name, path))
                .collect::<Vec<_>>()
                .join("\n"))
        }
        Input::Remove(name) => {
            let removed = report::delete_report(state, session, name).await?;
            Ok(format!("{} record(s) removed", removed))
        }
        Input::Stats => {
            let stats = auth::stats(state)?;
            Ok(format!("users: {}  files: {}", stats.users, stats.files))
        }
        Input::Quit => Ok(String::new()),
        Input::Unknown(line) => Ok(format!("unknown command `{}`, try /help", line)),
        Input::Chat(text) => match session.page() {
            Page::Consult => chat::send_symptoms(state, session, text).await,
            Page::Report => report::ask_report(state, session, text).await,
            Page::Login | Page::SignUp => Ok("log in to chat, or try /help".to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{harness, logged_in};
    use crate::doc_processor::testing::pdf_bytes;

    #[test]
    fn test_bare_words_are_chat() {
        assert_eq!(parse("help me my chest hurts"), Input::Chat("help me my chest hurts"));
        assert_eq!(parse("rm is what my doctor wrote"), Input::Chat("rm is what my doctor wrote"));
        assert_eq!(parse("/help"), Input::Help);
        assert_eq!(parse("/rm old report.pdf"), Input::Remove("old report.pdf"));
        assert_eq!(
            parse("/login a@x.com pw1"),
            Input::Login {
                email: "a@x.com",
                password: "pw1"
            }
        );
        assert_eq!(parse("/help me"), Input::Unknown("/help me"));
        assert_eq!(parse("/login a@x.com"), Input::Unknown("/login a@x.com"));
    }

    #[tokio::test]
    async fn test_chat_line_reaches_symptom_chat() {
        let h = harness();
        let mut session = logged_in(&h);

        let reply = dispatch(&h.state, &mut session, "help me my chest hurts").await.unwrap();
        assert_eq!(reply, "reply to 2 turns");
        assert_eq!(h.model.request_count(), 1);
        assert_eq!(session.general.messages()[0].content, "help me my chest hurts");
    }

    #[tokio::test]
    async fn test_rm_word_on_report_page_does_not_delete() {
        let h = harness();
        let mut session = logged_in(&h);
        report::upload_report(
            &h.state,
            &mut session,
            "report.pdf",
            &pdf_bytes(Some("diabetes causes high blood sugar")),
        )
        .await
        .unwrap();
        session.navigate(Page::Report);

        dispatch(&h.state, &mut session, "rm report.pdf").await.unwrap();
        assert_eq!(report::list_reports(&h.state, &session).unwrap().len(), 1);
        assert_eq!(session.report_chat.len(), 3);

        let out = dispatch(&h.state, &mut session, "/rm report.pdf").await.unwrap();
        assert_eq!(out, "1 record(s) removed");
        assert!(report::list_reports(&h.state, &session).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_chat_pages_need_login() {
        let h = harness();
        let mut session = Session::new();
        let err = dispatch(&h.state, &mut session, "/page consult").await.unwrap_err();
        assert!(matches!(err, Error::NotLoggedIn));

        let out = dispatch(&h.state, &mut session, "I have a fever").await.unwrap();
        assert_eq!(out, "log in to chat, or try /help");
        assert_eq!(h.model.request_count(), 0);
    }

    #[tokio::test]
    async fn test_signup_then_login() {
        let h = harness();
        let mut session = Session::new();
        let out = dispatch(&h.state, &mut session, "/signup Grace Hopper 1906-12-09 g@x.com pw")
            .await
            .unwrap();
        assert_eq!(out, auth::SIGN_UP_OK);

        let out = dispatch(&h.state, &mut session, "/login g@x.com pw").await.unwrap();
        assert_eq!(out, "Welcome, Grace Hopper.");
        assert_eq!(session.page(), Page::Consult);
        assert_eq!(prompt(&session), "[consult]> ");
    }
}
