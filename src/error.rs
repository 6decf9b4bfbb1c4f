use thiserror::Error;

/// Library-level errors.
///
/// `User` is the one variant safe to show verbatim: it marks a mistake the
/// user can fix (empty text, oversized emoji). Everything else is logged
/// server-side and rendered as a generic failure.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    User(String),

    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// A user-visible error message.
    pub fn user(msg: impl Into<String>) -> Self {
        Self::User(msg.into())
    }

    pub fn is_user(&self) -> bool {
        matches!(self, Self::User(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
