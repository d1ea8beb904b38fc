use std::borrow::Cow;
use std::collections::BTreeMap;

use base64::{engine::general_purpose::STANDARD, Engine};
use hmac::{Hmac, Mac};
use http::Method;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use rand::distributions::Alphanumeric;
use rand::Rng;
use sha1::Sha1;
use url::Url;

use crate::{SecretsProvider, SignError, SignResult};

const SIGNATURE_METHOD: &str = "HMAC-SHA1";
const VERSION: &str = "1.0";
const NONCE_LEN: usize = 32;

/// Everything except the RFC 3986 unreserved characters.
const OAUTH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Protocol parameters the signer generates itself; callers may not set them.
const RESERVED_KEYS: [&str; 7] = [
    crate::OAUTH_CONSUMER_KEY,
    crate::OAUTH_NONCE_KEY,
    crate::OAUTH_SIGNATURE_KEY,
    crate::OAUTH_SIGNATURE_METHOD_KEY,
    crate::OAUTH_TIMESTAMP_KEY,
    crate::OAUTH_TOKEN_KEY,
    crate::OAUTH_VERSION_KEY,
];

/// Percent-encodes a string the way OAuth 1.0a requires.
pub fn percent_encode(src: &str) -> String {
    utf8_percent_encode(src, OAUTH_ENCODE_SET).to_string()
}

#[derive(Debug, Clone)]
pub struct Signer<'a, TSecretsProvider>
where
    TSecretsProvider: SecretsProvider,
{
    secrets: &'a TSecretsProvider,
    parameters: OAuthParameters<'a>,
}

impl<'a, TSecretsProvider> Signer<'a, TSecretsProvider>
where
    TSecretsProvider: SecretsProvider,
{
    pub fn new(secrets: &'a TSecretsProvider, parameters: OAuthParameters<'a>) -> Self {
        Signer {
            secrets,
            parameters,
        }
    }

    /// Signs a request and returns the protocol parameters with
    /// `oauth_signature` filled in.
    ///
    /// `params` are the call parameters: the query for GET and DELETE, the
    /// form body for POST and PUT. A query embedded in `url` is signed too.
    pub fn sign<'p, I>(self, method: &Method, url: &str, params: I) -> SignResult<SignatureContext>
    where
        I: IntoIterator<Item = (&'p str, &'p str)>,
    {
        let (consumer_key, consumer_secret) = self.secrets.get_consumer_key_pair();
        let (token, token_secret) = self.secrets.get_token_option_pair();
        let (base_url, embedded) = split_url(url)?;

        let oauth_params = self.parameters.build(consumer_key, token);
        let call_params: Vec<(String, String)> = embedded
            .into_iter()
            .chain(params.into_iter().map(|(k, v)| (k.to_string(), v.to_string())))
            .collect();

        // encoded (key, value) pairs, protocol and call parameters together
        let mut pairs: Vec<(String, String)> = Vec::new();
        for (key, value) in call_params.iter() {
            if RESERVED_KEYS.contains(&key.as_str()) {
                return Err(SignError::ReservedParameter(key.clone()));
            }
            pairs.push((percent_encode(key), percent_encode(value)));
        }
        for (key, value) in oauth_params.iter() {
            pairs.push((percent_encode(key), percent_encode(value)));
        }
        pairs.sort();

        let param_string = pairs
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");
        let base_string = format!(
            "{}&{}&{}",
            method.as_str().to_uppercase(),
            percent_encode(base_url.as_str()),
            percent_encode(&param_string)
        );
        let signing_key = format!(
            "{}&{}",
            percent_encode(consumer_secret),
            percent_encode(token_secret.unwrap_or_default())
        );

        let mut parameters = oauth_params;
        parameters.insert(
            crate::OAUTH_SIGNATURE_KEY.to_string(),
            hmac_sha1(&signing_key, &base_string)?,
        );
        Ok(SignatureContext {
            parameters,
            realm: self.parameters.realm.map(Cow::into_owned),
        })
    }
}

/// The signed protocol parameters of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureContext {
    parameters: BTreeMap<String, String>,
    realm: Option<String>,
}

impl SignatureContext {
    pub fn signature(&self) -> &str {
        self.parameters
            .get(crate::OAUTH_SIGNATURE_KEY)
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn parameters(&self) -> &BTreeMap<String, String> {
        &self.parameters
    }

    /// Renders the `Authorization` header value.
    pub fn authorization_header(&self) -> String {
        let realm = self
            .realm
            .iter()
            .map(|r| format!("{}=\"{}\"", crate::REALM_KEY, percent_encode(r)));
        let params = self
            .parameters
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", percent_encode(k), percent_encode(v)));
        format!("OAuth {}", realm.chain(params).collect::<Vec<_>>().join(","))
    }
}

#[derive(Debug, Clone)]
pub struct OAuthParameters<'a> {
    callback: Option<Cow<'a, str>>,
    nonce: Option<Cow<'a, str>>,
    realm: Option<Cow<'a, str>>,
    timestamp: Option<u64>,
    verifier: Option<Cow<'a, str>>,
    version: bool,
}

impl Default for OAuthParameters<'static> {
    fn default() -> Self {
        OAuthParameters {
            callback: None,
            nonce: None,
            realm: None,
            timestamp: None,
            verifier: None,
            version: true,
        }
    }
}

impl<'a> OAuthParameters<'a> {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn callback<T>(self, callback: T) -> Self
    where
        T: Into<Cow<'a, str>>,
    {
        OAuthParameters {
            callback: Some(callback.into()),
            ..self
        }
    }

    /// set the oauth_nonce value, otherwise a random one is generated
    pub fn nonce<T>(self, nonce: T) -> Self
    where
        T: Into<Cow<'a, str>>,
    {
        OAuthParameters {
            nonce: Some(nonce.into()),
            ..self
        }
    }

    /// set the realm value (header only, never signed)
    pub fn realm<T>(self, realm: T) -> Self
    where
        T: Into<Cow<'a, str>>,
    {
        OAuthParameters {
            realm: Some(realm.into()),
            ..self
        }
    }

    /// set the oauth_timestamp value, otherwise the current time is used
    pub fn timestamp<T>(self, timestamp: T) -> Self
    where
        T: Into<u64>,
    {
        OAuthParameters {
            timestamp: Some(timestamp.into()),
            ..self
        }
    }

    /// set the oauth_verifier value
    pub fn verifier<T>(self, verifier: T) -> Self
    where
        T: Into<Cow<'a, str>>,
    {
        OAuthParameters {
            verifier: Some(verifier.into()),
            ..self
        }
    }

    /// set the oauth_version value (boolean)
    ///
    /// # Note
    /// `true` (the default) sends oauth_version="1.0". `false` leaves it out,
    /// which OAuth 1.0a also accepts.
    pub fn version<T>(self, version: T) -> Self
    where
        T: Into<bool>,
    {
        OAuthParameters {
            version: version.into(),
            ..self
        }
    }

    fn build(&self, consumer_key: &str, token: Option<&str>) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        map.insert(crate::OAUTH_CONSUMER_KEY.to_string(), consumer_key.to_string());
        map.insert(
            crate::OAUTH_NONCE_KEY.to_string(),
            self.nonce
                .as_ref()
                .map(|n| n.to_string())
                .unwrap_or_else(generate_nonce),
        );
        map.insert(
            crate::OAUTH_SIGNATURE_METHOD_KEY.to_string(),
            SIGNATURE_METHOD.to_string(),
        );
        map.insert(
            crate::OAUTH_TIMESTAMP_KEY.to_string(),
            self.timestamp
                .unwrap_or_else(|| chrono::Utc::now().timestamp().max(0) as u64)
                .to_string(),
        );
        if self.version {
            map.insert(crate::OAUTH_VERSION_KEY.to_string(), VERSION.to_string());
        }
        if let Some(token) = token {
            map.insert(crate::OAUTH_TOKEN_KEY.to_string(), token.to_string());
        }
        if let Some(ref callback) = self.callback {
            map.insert(crate::OAUTH_CALLBACK_KEY.to_string(), callback.to_string());
        }
        if let Some(ref verifier) = self.verifier {
            map.insert(crate::OAUTH_VERIFIER_KEY.to_string(), verifier.to_string());
        }
        map
    }
}

/// Splits a target into its normalized base URL and the query pairs it carries.
fn split_url(url: &str) -> SignResult<(Url, Vec<(String, String)>)> {
    let mut parsed = Url::parse(url).map_err(|_| SignError::InvalidUrl(url.to_string()))?;
    if parsed.cannot_be_a_base() {
        return Err(SignError::InvalidUrl(url.to_string()));
    }
    let embedded = parsed
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    parsed.set_query(None);
    parsed.set_fragment(None);
    Ok((parsed, embedded))
}

fn generate_nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(NONCE_LEN)
        .map(char::from)
        .collect()
}

fn hmac_sha1(key: &str, data: &str) -> SignResult<String> {
    let mut mac = Hmac::<Sha1>::new_from_slice(key.as_bytes())
        .map_err(|e| SignError::InvalidKey(e.to_string()))?;
    mac.update(data.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}
