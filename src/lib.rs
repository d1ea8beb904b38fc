/*!
twitter-oauth1: OAuth 1.0a signed calls against the Twitter REST API.

# Overview

A [`Client`] collects a method, a target URL and parameters through a fluent
builder. A terminal call (`fetch_list`, `fetch_object`, `fetch_text`,
`fetch_access_token`, or their `_async` forms) signs the request with
HMAC-SHA1, sends it through a [`Transport`], and decodes the body into a list
of records, one record, raw text, or a flat key/value map. The call state then
goes back to a GET of the home timeline with no parameters.

With the `multipart` feature (on by default) a POST or PUT can carry files
through `Client::file` and `Client::file_bytes`. Such a call goes out as
`multipart/form-data`, and only the OAuth protocol parameters are signed.

# How to use

## Basic usecase 1 - reading the timeline

```no_run
use twitter_oauth1::{Client, Endpoint, Param};

# fn run() -> twitter_oauth1::Result<()> {
let mut client = Client::with_access_token(
    "[CONSUMER_KEY]",
    "[CONSUMER_SECRET]",
    "[ACCESS_TOKEN]",
    "[TOKEN_SECRET]",
)?;

let tweets = client
    .endpoint(Endpoint::HomeTimeline)
    .param(Param::Count, "20")
    .fetch_list()?;

// post a tweet
let tweet = client
    .endpoint(Endpoint::UpdateStatus)
    .method(twitter_oauth1::HttpMethod::Post)
    .param(Param::Status, "Hello, Twitter!")
    .fetch_object()?;
# Ok(())
# }
```

## Basic usecase 2 - xAuth token exchange

```no_run
use twitter_oauth1::Client;

# fn run() -> twitter_oauth1::Result<()> {
let mut client = Client::with_password(
    "[CONSUMER_KEY]",
    "[CONSUMER_SECRET]",
    "[USERNAME]",
    "[PASSWORD]",
)?;

// stores the token pair, screen name and user id in the client's credentials
client.fetch_access_token()?;
// stores name and statuses count as well
client.verify_credentials()?;

let me = client.credentials().snapshot();
println!("{:?} {:?}", me.screen_name, me.user_id);
# Ok(())
# }
```

## Basic usecase 3 - asynchronous calls

```no_run
use twitter_oauth1::{Client, Endpoint};

# fn run() -> twitter_oauth1::Result<()> {
let mut client = Client::with_access_token("ck", "cs", "token", "secret")?;
client
    .endpoint(Endpoint::MentionsTimeline)
    .param("page", "2")
    .fetch_list_async(|result| match result {
        Ok(mentions) => println!("{} mentions", mentions.len()),
        Err(err) => eprintln!("failed: {}", err),
    })?;
// waits for the callback
client.shutdown();
# Ok(())
# }
```
*/
mod client;
mod config;
mod dispatcher;
mod endpoint;
mod error;
mod executor;
#[cfg(test)]
mod mock;
mod request;
mod secrets;
mod signer;
mod token_reader;
mod transport;

// exposed to external program
pub use client::{CallState, Client};
pub use config::ClientConfig;
pub use endpoint::{interpolate, Endpoint, Param};
pub use error::{
    ConfigError, DecodeError, DecodeResult, DispatchError, Error, Result, SignError, SignResult,
    TransportError,
};
pub use executor::Executor;
#[cfg(feature = "multipart")]
pub use request::{FilePart, FileSource};
pub use request::{
    HttpMethod, ListDecoder, ObjectDecoder, PostDecodeHook, Record, Request, ResponseDecoder,
    TextDecoder, TokenMapDecoder,
};
pub use secrets::{Credentials, SecretsProvider, SharedCredentials};
pub use signer::{percent_encode, OAuthParameters, SignatureContext, Signer};
pub use transport::{HttpBody, HttpRequest, HttpResponse, ReqwestTransport, Transport};

// exposed constant variables
/// Represents `oauth_callback`.
pub const OAUTH_CALLBACK_KEY: &str = "oauth_callback";
/// Represents `oauth_nonce`.
pub const OAUTH_NONCE_KEY: &str = "oauth_nonce";
/// Represents `oauth_timestamp`.
pub const OAUTH_TIMESTAMP_KEY: &str = "oauth_timestamp";
/// Represents `oauth_verifier`.
pub const OAUTH_VERIFIER_KEY: &str = "oauth_verifier";
/// Represents `oauth_version`.
pub const OAUTH_VERSION_KEY: &str = "oauth_version";
/// Represents `oauth_token`.
pub const OAUTH_TOKEN_KEY: &str = "oauth_token";
/// Represents `oauth_token_secret`.
pub const OAUTH_TOKEN_SECRET_KEY: &str = "oauth_token_secret";
/// Represents `realm`.
pub const REALM_KEY: &str = "realm";

// crate-private constant variables
pub(crate) const OAUTH_SIGNATURE_KEY: &str = "oauth_signature";
pub(crate) const OAUTH_SIGNATURE_METHOD_KEY: &str = "oauth_signature_method";
pub(crate) const OAUTH_CONSUMER_KEY: &str = "oauth_consumer_key";
