use thiserror::Error;

/// Failure taxonomy for library operations.
///
/// Empty search results are not represented here; they surface as
/// [`crate::search::PageOutcome::NoMatches`].
#[derive(Debug, Error)]
pub enum Error {
    /// The action requires a logged-in user and none is present.
    #[error("authentication required")]
    Unauthenticated,

    /// The backend rejected the credentials mid-session and the silent
    /// refresh could not recover them.
    #[error("session expired")]
    AuthExpired,

    /// A non-401 failure response from a remote service.
    #[error("request failed with status {status}: {message}")]
    Api { status: u16, message: String },

    /// The request never produced a response (DNS, connect, timeout, ...).
    #[error("network error: {0}")]
    Network(String),

    /// Client-side validation rejected the input before any network call.
    #[error("{0}")]
    Validation(String),

    /// A favorites toggle was attempted while another one is in flight.
    #[error("another favorites update is already in flight")]
    ToggleInFlight,

    /// The local state file could not be read or written.
    #[error("state store error: {0}")]
    Store(String),

    /// A payload could not be interpreted as a displayable media item.
    #[error("invalid media payload: {0}")]
    InvalidMedia(String),

    /// A configured base URL or joined path is not a valid URL.
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

impl Error {
    /// Short, user-facing rendition for CLI output.
    pub fn user_message(&self) -> String {
        match self {
            Error::Unauthenticated => "Please log in first.".to_string(),
            Error::AuthExpired => "Your session has expired; please log in again.".to_string(),
            Error::Api { status, message } if message.is_empty() => {
                format!("The server returned an error (HTTP {status}).")
            }
            Error::Api { message, .. } => message.clone(),
            Error::Network(_) => "Could not reach the server. Check your connection.".to_string(),
            Error::Validation(msg) => msg.clone(),
            Error::ToggleInFlight => "Hold on, the previous update is still running.".to_string(),
            other => other.to_string(),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
