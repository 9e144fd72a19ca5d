use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Unexpected HTTP status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Decode error: {0}")]
    DecodeError(String),

    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("could not obtain an XSRF token from the login page or cookies")]
    NoToken,

    #[error("login rejected: {0}")]
    LoginRejected(String),
}

pub type Result<T> = std::result::Result<T, ScanError>;
