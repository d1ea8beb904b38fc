use std::collections::BTreeMap;
use std::sync::Arc;

use http::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use url::Url;

use crate::request::{PostDecodeHook, Request, ResponseDecoder};
use crate::signer::percent_encode;
use crate::token_reader::require_token_pair;
#[cfg(feature = "multipart")]
use crate::ConfigError;
use crate::{
    Error, HttpBody, HttpRequest, OAuthParameters, Result, SharedCredentials, SignError, Signer,
    Transport, TransportError,
};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Signs, sends and decodes [`Request`]s. One attempt per request, no retries.
#[derive(Debug)]
pub struct Executor<T> {
    transport: Arc<T>,
    credentials: SharedCredentials,
}

impl<T> Clone for Executor<T> {
    fn clone(&self) -> Self {
        Executor {
            transport: Arc::clone(&self.transport),
            credentials: self.credentials.clone(),
        }
    }
}

impl<T> Executor<T>
where
    T: Transport,
{
    pub fn new(transport: Arc<T>, credentials: SharedCredentials) -> Self {
        Executor {
            transport,
            credentials,
        }
    }

    pub fn credentials(&self) -> &SharedCredentials {
        &self.credentials
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn execute<D: ResponseDecoder>(&self, request: Request<D>) -> Result<D::Output> {
        self.execute_with(request, OAuthParameters::new())
    }

    /// Like [`execute`](Executor::execute), with explicit OAuth parameters
    /// (fixed nonce or timestamp, callback, verifier, realm).
    pub fn execute_with<D: ResponseDecoder>(
        &self,
        request: Request<D>,
        oauth: OAuthParameters<'_>,
    ) -> Result<D::Output> {
        let http_request = self.prepare(&request, oauth)?;
        tracing::debug!(method = %request.method(), url = %request.url(), "sending request");
        let response = self.transport.send(http_request)?;
        tracing::debug!(url = %request.url(), status = response.status, "response received");

        if !response.is_success() {
            let body = String::from_utf8_lossy(&response.body).into_owned();
            return Err(match response.status {
                401 | 403 => Error::Auth {
                    status: response.status,
                    body,
                },
                status => TransportError::Status { status, body }.into(),
            });
        }

        let output = request.decode(&response.body)?;
        if let Some(hook) = request.hook() {
            self.run_hook::<D>(hook, &output, &response.body)?;
        }
        Ok(output)
    }

    /// Builds the signed wire request: query string for GET and DELETE, form
    /// body for POST and PUT.
    pub fn prepare<D: ResponseDecoder>(
        &self,
        request: &Request<D>,
        oauth: OAuthParameters<'_>,
    ) -> Result<HttpRequest> {
        #[cfg(feature = "multipart")]
        {
            if request.is_multipart() && !request.method().has_body() {
                return Err(ConfigError::FilesWithoutBody(request.method()).into());
            }
        }
        let credentials = self.credentials.snapshot();
        let method = request.method().as_method();
        // multipart fields are not part of the signature base string
        let signed = if request.is_multipart() {
            None
        } else {
            Some(request.parameters())
        };
        let context = Signer::new(&credentials, oauth).sign(
            &method,
            request.url(),
            signed
                .into_iter()
                .flatten()
                .map(|(k, v)| (k.as_str(), v.as_str())),
        )?;

        let mut url =
            Url::parse(request.url()).map_err(|_| SignError::InvalidUrl(request.url().to_string()))?;
        let mut headers = HeaderMap::new();
        let authorization = context.authorization_header();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&authorization)
                .map_err(|_| SignError::InvalidHeader(authorization.clone()))?,
        );

        let body = if request.method().has_body() {
            Some(body_of(request, &mut headers))
        } else {
            let encoded = encode_form(request.parameters());
            if !encoded.is_empty() {
                let query = match url.query() {
                    Some(existing) if !existing.is_empty() => format!("{}&{}", existing, encoded),
                    _ => encoded,
                };
                url.set_query(Some(&query));
            }
            None
        };

        Ok(HttpRequest {
            method,
            url,
            headers,
            body,
        })
    }

    fn run_hook<D: ResponseDecoder>(
        &self,
        hook: PostDecodeHook,
        output: &D::Output,
        body: &[u8],
    ) -> Result<()> {
        match hook {
            PostDecodeHook::VerifiedIdentity => {
                if let Some(record) = D::as_record(output) {
                    self.credentials
                        .update(|c| c.apply_verified_identity(record))?;
                    tracing::debug!("account identity stored");
                }
            }
            PostDecodeHook::AccessToken => {
                if let Some(map) = D::as_token_map(output) {
                    require_token_pair(map, &String::from_utf8_lossy(body))?;
                    self.credentials.update(|c| c.apply_access_token_result(map));
                    tracing::debug!("access token stored");
                }
            }
        }
        Ok(())
    }
}

fn body_of<D: ResponseDecoder>(request: &Request<D>, headers: &mut HeaderMap) -> HttpBody {
    #[cfg(feature = "multipart")]
    {
        if request.is_multipart() {
            return multipart_body(request);
        }
    }
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE));
    HttpBody::Form(encode_form(request.parameters()))
}

/// Parameters become text fields. The transport sets the content type.
#[cfg(feature = "multipart")]
fn multipart_body<D: ResponseDecoder>(request: &Request<D>) -> HttpBody {
    HttpBody::Multipart {
        fields: request
            .parameters()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
        files: request.files().to_vec(),
    }
}

/// `k=v&k2=v2` with the same encoding the signature uses.
fn encode_form(parameters: &BTreeMap<String, String>) -> String {
    parameters
        .iter()
        .map(|(k, v)| format!("{}={}", percent_encode(k), percent_encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}
