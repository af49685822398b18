//! Message dispatch.
//!
//! Pure mapping from one framed message to a respond-or-terminate
//! decision. Response and farewell writes belong to the session;
//! termination-worthy events carry a note for the client log instead of
//! logging from inside the dispatch branches.

use chrono::Local;

/// Format for the `/time` response.
const TIME_FORMAT: &str = "%a %b %e %H:%M:%S %Y";

/// Decision produced for one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Write the text (with line terminator) and keep the session open.
    Respond(String),
    /// Close the connection.
    Terminate {
        /// Written to the peer before closing, if present.
        farewell: Option<String>,
        /// Recorded to the client log before closing, if present.
        note: Option<&'static str>,
    },
}

impl Action {
    /// Terminate silently: no farewell, nothing logged.
    fn terminate() -> Self {
        Action::Terminate {
            farewell: None,
            note: None,
        }
    }
}

/// Map one framed message to an [`Action`].
///
/// Messages starting with `/` are commands, split on the first space into
/// a name and an optional argument. Anything that is neither a command
/// nor a personality keyword is echoed back unchanged.
pub fn dispatch(message: &str) -> Action {
    if message.is_empty() {
        return Action::Respond("Tell me something...".to_string());
    }

    if message.starts_with('/') {
        let (name, arg) = match message.split_once(' ') {
            Some((name, arg)) => (name, Some(arg)),
            None => (message, None),
        };

        return match name {
            "/time" => Action::Respond(Local::now().format(TIME_FORMAT).to_string()),
            "/quit" => Action::Terminate {
                farewell: None,
                note: Some("Client requested quit"),
            },
            "/echo" => match arg {
                Some(arg) => Action::Respond(arg.to_string()),
                // Nothing to echo; the connection closes instead.
                None => Action::terminate(),
            },
            _ => Action::Respond(format!("Unknown command: {name}")),
        };
    }

    if message.eq_ignore_ascii_case("hello") {
        Action::Respond("Greetings!".to_string())
    } else if message.eq_ignore_ascii_case("bye") {
        Action::Terminate {
            farewell: Some("Goodbye!".to_string()),
            note: Some("Client said bye"),
        }
    } else {
        Action::Respond(message.to_string())
    }
}
