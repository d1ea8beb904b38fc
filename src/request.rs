use std::collections::{BTreeMap, HashMap};
use std::fmt;
#[cfg(feature = "multipart")]
use std::path::PathBuf;

use serde_json::Value;

use crate::error::fragment;
use crate::token_reader::read_token_map;
use crate::{Credentials, DecodeError, DecodeResult};

/// One JSON object from a response.
pub type Record = serde_json::Map<String, Value>;

const X_AUTH_MODE_KEY: &str = "x_auth_mode";
const X_AUTH_MODE_CLIENT_AUTH: &str = "client_auth";
const X_AUTH_USERNAME_KEY: &str = "x_auth_username";
const X_AUTH_PASSWORD_KEY: &str = "x_auth_password";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_method(self) -> http::Method {
        match self {
            HttpMethod::Get => http::Method::GET,
            HttpMethod::Post => http::Method::POST,
            HttpMethod::Put => http::Method::PUT,
            HttpMethod::Delete => http::Method::DELETE,
        }
    }

    /// POST and PUT send their parameters as a form body, the rest in the query.
    pub fn has_body(self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_method().as_str())
    }
}

/// Turns a raw response body into one of the result shapes.
pub trait ResponseDecoder: Send + 'static {
    type Output: Send + 'static;

    fn decode(&self, body: &[u8]) -> DecodeResult<Self::Output>;

    /// The output as a single record, for post-decode hooks that read one.
    fn as_record(_output: &Self::Output) -> Option<&Record> {
        None
    }

    /// The output as a flat map, for post-decode hooks that read one.
    fn as_token_map(_output: &Self::Output) -> Option<&HashMap<String, String>> {
        None
    }
}

/// JSON array of objects. `[]` is a valid, empty result.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListDecoder;

/// A single JSON object.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectDecoder;

/// The body as text, untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextDecoder;

/// A form-encoded `key=value&...` body, as the token endpoints return.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenMapDecoder;

fn parse_json(body: &[u8]) -> DecodeResult<Value> {
    serde_json::from_slice(body).map_err(|source| DecodeError::Json {
        source,
        fragment: fragment(&String::from_utf8_lossy(body)),
    })
}

fn unexpected(expected: &'static str, value: &Value) -> DecodeError {
    DecodeError::UnexpectedShape {
        expected,
        fragment: fragment(&value.to_string()),
    }
}

impl ResponseDecoder for ListDecoder {
    type Output = Vec<Record>;

    fn decode(&self, body: &[u8]) -> DecodeResult<Vec<Record>> {
        match parse_json(body)? {
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::Object(record) => Ok(record),
                    other => Err(unexpected("array of objects", &other)),
                })
                .collect(),
            other => Err(unexpected("array", &other)),
        }
    }
}

impl ResponseDecoder for ObjectDecoder {
    type Output = Record;

    fn decode(&self, body: &[u8]) -> DecodeResult<Record> {
        match parse_json(body)? {
            Value::Object(record) => Ok(record),
            other => Err(unexpected("object", &other)),
        }
    }

    fn as_record(output: &Record) -> Option<&Record> {
        Some(output)
    }
}

impl ResponseDecoder for TextDecoder {
    type Output = String;

    fn decode(&self, body: &[u8]) -> DecodeResult<String> {
        Ok(String::from_utf8_lossy(body).into_owned())
    }
}

impl ResponseDecoder for TokenMapDecoder {
    type Output = HashMap<String, String>;

    fn decode(&self, body: &[u8]) -> DecodeResult<HashMap<String, String>> {
        read_token_map(&String::from_utf8_lossy(body))
    }

    fn as_token_map(output: &HashMap<String, String>) -> Option<&HashMap<String, String>> {
        Some(output)
    }
}

/// A file sent with a multipart call.
#[cfg(feature = "multipart")]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub name: String,
    pub source: FileSource,
}

#[cfg(feature = "multipart")]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSource {
    /// Read by the transport when the call is sent.
    Path(PathBuf),
    Bytes { file_name: String, bytes: Vec<u8> },
}

#[cfg(feature = "multipart")]
impl FilePart {
    pub fn path(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        FilePart {
            name: name.into(),
            source: FileSource::Path(path.into()),
        }
    }

    pub fn bytes(
        name: impl Into<String>,
        file_name: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        FilePart {
            name: name.into(),
            source: FileSource::Bytes {
                file_name: file_name.into(),
                bytes: bytes.into(),
            },
        }
    }
}

/// Side effects the executor runs after a successful decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostDecodeHook {
    /// Store the token pair from an access token exchange.
    AccessToken,
    /// Store the account identity from verify-credentials.
    VerifiedIdentity,
}

/// A snapshot of one call, ready for the executor. Consumed on execution.
#[derive(Debug)]
pub struct Request<D> {
    method: HttpMethod,
    url: String,
    parameters: BTreeMap<String, String>,
    #[cfg(feature = "multipart")]
    files: Vec<FilePart>,
    decoder: D,
    hook: Option<PostDecodeHook>,
}

impl<D> Request<D>
where
    D: ResponseDecoder,
{
    pub fn new(
        method: HttpMethod,
        url: impl Into<String>,
        parameters: BTreeMap<String, String>,
        decoder: D,
    ) -> Self {
        Request {
            method,
            url: url.into(),
            parameters,
            #[cfg(feature = "multipart")]
            files: Vec::new(),
            decoder,
            hook: None,
        }
    }

    /// Adds endpoint defaults underneath the caller's parameters.
    pub fn with_defaults<I, K, V>(mut self, defaults: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in defaults {
            self.parameters.entry(key.into()).or_insert_with(|| value.into());
        }
        self
    }

    pub fn with_hook(self, hook: PostDecodeHook) -> Self {
        Request {
            hook: Some(hook),
            ..self
        }
    }

    #[cfg(feature = "multipart")]
    pub fn with_files(self, files: Vec<FilePart>) -> Self {
        Request { files, ..self }
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn parameters(&self) -> &BTreeMap<String, String> {
        &self.parameters
    }

    #[cfg(feature = "multipart")]
    pub fn files(&self) -> &[FilePart] {
        &self.files
    }

    /// Whether the call goes out as `multipart/form-data`. Its parameters
    /// are then body fields and are left out of the signature.
    #[cfg(feature = "multipart")]
    pub fn is_multipart(&self) -> bool {
        !self.files.is_empty()
    }

    #[cfg(not(feature = "multipart"))]
    pub fn is_multipart(&self) -> bool {
        false
    }

    pub fn hook(&self) -> Option<PostDecodeHook> {
        self.hook
    }

    pub fn decode(&self, body: &[u8]) -> DecodeResult<D::Output> {
        self.decoder.decode(body)
    }
}

impl Request<TokenMapDecoder> {
    /// The token exchange: always a POST to `url`. Password credentials add
    /// the xAuth fields, which explicit `parameters` override.
    pub fn access_token(
        url: impl Into<String>,
        credentials: &Credentials,
        parameters: BTreeMap<String, String>,
    ) -> Self {
        let mut defaults = Vec::new();
        if let Some((username, password)) = credentials.password_pair() {
            defaults.push((X_AUTH_MODE_KEY, X_AUTH_MODE_CLIENT_AUTH));
            defaults.push((X_AUTH_USERNAME_KEY, username));
            defaults.push((X_AUTH_PASSWORD_KEY, password));
        }
        Request::new(HttpMethod::Post, url, parameters, TokenMapDecoder)
            .with_defaults(defaults)
            .with_hook(PostDecodeHook::AccessToken)
    }
}
