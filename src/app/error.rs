use thiserror::Error;

use crate::session::LoginStep;

#[derive(Error, Debug)]
pub enum WatchpostError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Login failed at step `{step}`: {source}")]
    Login {
        step: LoginStep,
        #[source]
        source: Box<WatchpostError>,
    },

    #[error("Navigation error: {0}")]
    Navigation(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl WatchpostError {
    /// Wrap a step-local failure with the login step it happened in.
    pub fn login_step(step: LoginStep, source: WatchpostError) -> Self {
        WatchpostError::Login {
            step,
            source: Box::new(source),
        }
    }
}

pub type Result<T> = std::result::Result<T, WatchpostError>;
