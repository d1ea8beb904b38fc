use std::time::Duration;

use http::header::HeaderMap;
use http::Method;
#[cfg(feature = "multipart")]
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::Client as ReqwestClient;
use url::Url;

#[cfg(feature = "multipart")]
use crate::{FilePart, FileSource};
use crate::{ClientConfig, TransportError};

/// A fully built, signed request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<HttpBody>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpBody {
    /// Encoded `application/x-www-form-urlencoded` pairs.
    Form(String),
    /// Text fields and files for `multipart/form-data`. The transport picks
    /// the boundary and the content type.
    #[cfg(feature = "multipart")]
    Multipart {
        fields: Vec<(String, String)>,
        files: Vec<FilePart>,
    },
}

impl HttpBody {
    pub fn as_form(&self) -> Option<&str> {
        match self {
            HttpBody::Form(body) => Some(body),
            #[cfg(feature = "multipart")]
            HttpBody::Multipart { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Moves one request over the wire. Redirects, TLS and connection reuse are
/// the implementation's business.
pub trait Transport: Send + Sync + 'static {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// [`Transport`] backed by `reqwest::blocking`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    inner: ReqwestClient,
}

impl ReqwestTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        let mut builder = ReqwestClient::builder().user_agent(config.user_agent.clone());
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let inner = builder.build().map_err(io)?;
        Ok(ReqwestTransport { inner })
    }
}

impl From<ReqwestClient> for ReqwestTransport {
    fn from(client: ReqwestClient) -> Self {
        ReqwestTransport { inner: client }
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self
            .inner
            .request(request.method, request.url)
            .headers(request.headers);
        match request.body {
            Some(HttpBody::Form(body)) => builder = builder.body(body),
            #[cfg(feature = "multipart")]
            Some(HttpBody::Multipart { fields, files }) => {
                builder = builder.multipart(multipart_form(fields, files)?)
            }
            None => {}
        }
        let response = builder.send().map_err(io)?;
        let status = response.status().as_u16();
        let body = response.bytes().map_err(io)?.to_vec();
        Ok(HttpResponse { status, body })
    }
}

fn io(err: reqwest::Error) -> TransportError {
    TransportError::Io(Box::new(err))
}

#[cfg(feature = "multipart")]
fn multipart_form(
    fields: Vec<(String, String)>,
    files: Vec<FilePart>,
) -> Result<Form, TransportError> {
    let mut form = Form::new();
    for (name, value) in fields {
        form = form.text(name, value);
    }
    for file in files {
        form = match file.source {
            FileSource::Path(path) => form
                .file(file.name, path)
                .map_err(|e| TransportError::Io(Box::new(e)))?,
            FileSource::Bytes { file_name, bytes } => {
                form.part(file.name, Part::bytes(bytes).file_name(file_name))
            }
        };
    }
    Ok(form)
}
