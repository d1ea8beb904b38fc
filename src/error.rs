use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;
pub type SignResult<T> = std::result::Result<T, SignError>;
pub type DecodeResult<T> = std::result::Result<T, DecodeError>;

/// Longest slice of a response body kept inside a [`DecodeError`].
const FRAGMENT_LIMIT: usize = 128;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid configuration : {0}")]
    Config(#[from] ConfigError),
    #[error("OAuth sign failed : {0}")]
    Encoding(#[from] SignError),
    #[error("authentication rejected with status {status} : {body}")]
    Auth { status: u16, body: String },
    #[error("request failed : {0}")]
    Transport(#[from] TransportError),
    #[error("response decoding failed : {0}")]
    Decode(#[from] DecodeError),
    #[error("dispatch failed : {0}")]
    Dispatch(#[from] DispatchError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("required credential field {0} is empty")]
    MissingField(&'static str),
    #[error("invalid api base url {0}")]
    InvalidBaseUrl(String),
    #[error("worker pool needs at least one thread")]
    NoWorkers,
    #[cfg(feature = "multipart")]
    #[error("{0} requests cannot carry files")]
    FilesWithoutBody(crate::HttpMethod),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignError {
    #[error("target url {0} is not an absolute url")]
    InvalidUrl(String),
    #[error("parameter {0} is reserved for the OAuth protocol")]
    ReservedParameter(String),
    #[error("authorization header {0} is not a valid header value")]
    InvalidHeader(String),
    #[error("signing key rejected : {0}")]
    InvalidKey(String),
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("transport i/o error : {0}")]
    Io(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("unexpected status {status} : {body}")]
    Status { status: u16, body: String },
}

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("malformed json near {fragment:?} : {source}")]
    Json {
        #[source]
        source: serde_json::Error,
        fragment: String,
    },
    #[error("expected {expected} but got {fragment:?}")]
    UnexpectedShape {
        expected: &'static str,
        fragment: String,
    },
    #[error("response has malformed key=value pair {0:?}")]
    MalformedPair(String),
    #[error("response has malformed format: not found {0} in {1}")]
    TokenKeyNotFound(&'static str, String),
}

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("worker pool has been shut down")]
    ShutDown,
    #[error("worker pool could not be started : {0}")]
    Runtime(#[from] std::io::Error),
}

/// Clips a response body to something short enough to carry in an error.
pub(crate) fn fragment(text: &str) -> String {
    match text.char_indices().nth(FRAGMENT_LIMIT) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_string(),
    }
}
