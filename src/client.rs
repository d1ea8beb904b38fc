use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::mem;
#[cfg(feature = "multipart")]
use std::path::PathBuf;
use std::sync::Arc;

use crate::dispatcher::WorkerPool;
use crate::request::{
    HttpMethod, ListDecoder, ObjectDecoder, PostDecodeHook, Record, Request, ResponseDecoder,
    TextDecoder, TokenMapDecoder,
};
#[cfg(feature = "multipart")]
use crate::FilePart;
use crate::{
    endpoint, ClientConfig, Credentials, Endpoint, Executor, ReqwestTransport, Result,
    SharedCredentials, Transport,
};

/// Parameter value that means "not set"; like the empty string it is never stored.
const UNSET_SENTINEL: &str = "-1";

const NO_ARGS: [&str; 0] = [];

/// What the next terminal call will send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallState {
    pub method: HttpMethod,
    pub url: String,
    pub parameters: BTreeMap<String, String>,
    #[cfg(feature = "multipart")]
    pub files: Vec<FilePart>,
}

impl CallState {
    fn new(home: &str) -> Self {
        CallState {
            method: HttpMethod::Get,
            url: home.to_string(),
            parameters: BTreeMap::new(),
            #[cfg(feature = "multipart")]
            files: Vec::new(),
        }
    }
}

/// A session against the API: fluent call state plus sync and async
/// terminal calls.
///
/// Every terminal call resets the state to a GET of the home timeline with no
/// parameters, whether it succeeds or not.
///
/// ```no_run
/// use twitter_oauth1::{Client, Endpoint, Param};
///
/// # fn run() -> twitter_oauth1::Result<()> {
/// let mut client = Client::with_access_token("ck", "cs", "token", "secret")?;
/// let timeline = client
///     .endpoint(Endpoint::HomeTimeline)
///     .param(Param::Count, "50")
///     .param(Param::SinceId, "-1") // ignored
///     .fetch_list()?;
/// println!("{} tweets", timeline.len());
/// # Ok(())
/// # }
/// ```
pub struct Client<T = ReqwestTransport> {
    executor: Executor<T>,
    config: ClientConfig,
    home: String,
    state: CallState,
    pool: WorkerPool,
}

impl Client<ReqwestTransport> {
    /// A client that still has to run [`fetch_access_token`](Client::fetch_access_token).
    pub fn with_password(
        consumer_key: impl Into<String>,
        consumer_secret: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self> {
        let credentials =
            Credentials::with_password(consumer_key, consumer_secret, username, password)?;
        Self::with_config(credentials, ClientConfig::default())
    }

    pub fn with_access_token(
        consumer_key: impl Into<String>,
        consumer_secret: impl Into<String>,
        access_token: impl Into<String>,
        access_token_secret: impl Into<String>,
    ) -> Result<Self> {
        let credentials = Credentials::with_token(
            consumer_key,
            consumer_secret,
            access_token,
            access_token_secret,
        )?;
        Self::with_config(credentials, ClientConfig::default())
    }

    pub fn with_config(
        credentials: impl Into<SharedCredentials>,
        config: ClientConfig,
    ) -> Result<Self> {
        config.validate()?;
        let transport = ReqwestTransport::new(&config)?;
        Self::with_transport(credentials, transport, config)
    }
}

impl<T> Client<T>
where
    T: Transport,
{
    /// Passing a [`SharedCredentials`] handle lets several clients act for
    /// one account.
    pub fn with_transport(
        credentials: impl Into<SharedCredentials>,
        transport: T,
        config: ClientConfig,
    ) -> Result<Self> {
        Self::from_parts(Executor::new(Arc::new(transport), credentials.into()), config)
    }

    fn from_parts(executor: Executor<T>, config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let home = Endpoint::HomeTimeline.url(&config.api_base, &NO_ARGS);
        Ok(Client {
            executor,
            state: CallState::new(&home),
            home,
            pool: WorkerPool::new(config.worker_threads),
            config,
        })
    }

    /// Another session for the same account and transport, with its own call
    /// state and worker pool.
    pub fn new_session(&self) -> Result<Self> {
        Self::from_parts(self.executor.clone(), self.config.clone())
    }

    pub fn credentials(&self) -> &SharedCredentials {
        self.executor.credentials()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn state(&self) -> &CallState {
        &self.state
    }

    /// Sets the target URL. A path starting with `/` is resolved against the
    /// configured API base.
    pub fn from(&mut self, url: impl Into<String>) -> &mut Self {
        self.state.url = self.resolve(url.into());
        self
    }

    /// Sets the target URL from a template with positional `{}` arguments.
    pub fn from_template<A: fmt::Display>(&mut self, template: &str, args: &[A]) -> &mut Self {
        self.from(endpoint::interpolate(template, args))
    }

    pub fn endpoint(&mut self, endpoint: Endpoint) -> &mut Self {
        self.endpoint_with(endpoint, &NO_ARGS)
    }

    pub fn endpoint_with<A: fmt::Display>(&mut self, endpoint: Endpoint, args: &[A]) -> &mut Self {
        self.state.url = endpoint.url(&self.config.api_base, args);
        self
    }

    pub fn method(&mut self, method: HttpMethod) -> &mut Self {
        self.state.method = method;
        self
    }

    /// Adds a parameter. Empty values and `"-1"` mean "not set" and are skipped.
    pub fn param(&mut self, key: impl AsRef<str>, value: impl Into<String>) -> &mut Self {
        let value = value.into();
        if !value.is_empty() && value != UNSET_SENTINEL {
            self.state
                .parameters
                .insert(key.as_ref().to_string(), value);
        }
        self
    }

    /// Adds several parameters under the same rules as [`param`](Client::param).
    pub fn params<I, K, V>(&mut self, params: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (key, value) in params {
            self.param(key, value);
        }
        self
    }

    /// Attaches a file, read from `path` when the call is sent. A call with
    /// files goes out as `multipart/form-data` and must be a POST or PUT.
    #[cfg(feature = "multipart")]
    pub fn file(&mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> &mut Self {
        self.state.files.push(FilePart::path(name, path));
        self
    }

    /// Attaches in-memory file content under `file_name`.
    #[cfg(feature = "multipart")]
    pub fn file_bytes(
        &mut self,
        name: impl Into<String>,
        file_name: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> &mut Self {
        self.state.files.push(FilePart::bytes(name, file_name, bytes));
        self
    }

    /// Drops every parameter and attached file.
    pub fn clear_param(&mut self) -> &mut Self {
        self.state.parameters.clear();
        #[cfg(feature = "multipart")]
        {
            self.state.files.clear();
        }
        self
    }

    fn resolve(&self, url: String) -> String {
        if url.starts_with('/') {
            format!("{}{}", self.config.api_base.trim_end_matches('/'), url)
        } else {
            url
        }
    }

    /// Moves the call state into a request and leaves the defaults behind.
    fn take_request<D: ResponseDecoder>(&mut self, decoder: D) -> Request<D> {
        let state = mem::replace(&mut self.state, CallState::new(&self.home));
        tracing::trace!(method = %state.method, url = %state.url, "call state taken");
        let request = Request::new(state.method, state.url, state.parameters, decoder);
        #[cfg(feature = "multipart")]
        let request = request.with_files(state.files);
        request
    }

    fn take_object_request(&mut self) -> Request<ObjectDecoder> {
        let verify = Endpoint::VerifyCredentials.url(&self.config.api_base, &NO_ARGS);
        let request = self.take_request(ObjectDecoder);
        if request.url() == verify {
            request.with_hook(PostDecodeHook::VerifiedIdentity)
        } else {
            request
        }
    }

    /// The token exchange ignores the configured URL and method.
    fn take_access_token_request(&mut self) -> Request<TokenMapDecoder> {
        let state = mem::replace(&mut self.state, CallState::new(&self.home));
        Request::access_token(
            Endpoint::AccessToken.url(&self.config.api_base, &NO_ARGS),
            &self.credentials().snapshot(),
            state.parameters,
        )
    }

    pub fn fetch_list(&mut self) -> Result<Vec<Record>> {
        let request = self.take_request(ListDecoder);
        self.executor.execute(request)
    }

    /// Fetching the verify-credentials endpoint also stores the account
    /// identity in the shared credentials.
    pub fn fetch_object(&mut self) -> Result<Record> {
        let request = self.take_object_request();
        self.executor.execute(request)
    }

    pub fn fetch_text(&mut self) -> Result<String> {
        let request = self.take_request(TextDecoder);
        self.executor.execute(request)
    }

    /// Runs the access token exchange and stores the resulting token pair.
    pub fn fetch_access_token(&mut self) -> Result<HashMap<String, String>> {
        let request = self.take_access_token_request();
        self.executor.execute(request)
    }

    /// Fetches and stores the authenticated account's identity. Any pending
    /// call state is discarded.
    pub fn verify_credentials(&mut self) -> Result<Record> {
        self.method(HttpMethod::Get)
            .endpoint(Endpoint::VerifyCredentials)
            .clear_param()
            .fetch_object()
    }

    // Each returns once the call is queued. The callback runs exactly once,
    // on a worker thread, with the result or the error. After `shutdown` they
    // fail with `Error::Dispatch` and the callback is dropped unused.

    pub fn fetch_list_async<F>(&mut self, callback: F) -> Result<()>
    where
        F: FnOnce(Result<Vec<Record>>) + Send + 'static,
    {
        let request = self.take_request(ListDecoder);
        self.dispatch(request, callback)
    }

    pub fn fetch_object_async<F>(&mut self, callback: F) -> Result<()>
    where
        F: FnOnce(Result<Record>) + Send + 'static,
    {
        let request = self.take_object_request();
        self.dispatch(request, callback)
    }

    pub fn fetch_text_async<F>(&mut self, callback: F) -> Result<()>
    where
        F: FnOnce(Result<String>) + Send + 'static,
    {
        let request = self.take_request(TextDecoder);
        self.dispatch(request, callback)
    }

    pub fn fetch_access_token_async<F>(&mut self, callback: F) -> Result<()>
    where
        F: FnOnce(Result<HashMap<String, String>>) + Send + 'static,
    {
        let request = self.take_access_token_request();
        self.dispatch(request, callback)
    }

    fn dispatch<D, F>(&mut self, request: Request<D>, callback: F) -> Result<()>
    where
        D: ResponseDecoder,
        F: FnOnce(Result<D::Output>) + Send + 'static,
    {
        let executor = self.executor.clone();
        self.pool
            .submit(move || callback(executor.execute(request)))?;
        Ok(())
    }

    /// Waits for queued asynchronous calls and stops the worker pool. Also
    /// runs on drop.
    pub fn shutdown(&mut self) {
        self.pool.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    use http::header::AUTHORIZATION;

    use super::*;
    use crate::mock::ScriptedTransport;
    use crate::{DispatchError, Error, Param};

    const API_BASE: &str = "https://api.example.com";
    const HOME: &str = "https://api.example.com/1.1/statuses/home_timeline.json";
    const VERIFY: &str = "https://api.example.com/1.1/account/verify_credentials.json";

    fn config() -> ClientConfig {
        ClientConfig::default().api_base(API_BASE).worker_threads(2)
    }

    fn client(transport: ScriptedTransport) -> Client<ScriptedTransport> {
        let credentials = Credentials::with_token("ck", "cs", "token", "secret").unwrap();
        Client::with_transport(credentials, transport, config()).unwrap()
    }

    fn default_state() -> CallState {
        CallState {
            method: HttpMethod::Get,
            url: HOME.to_string(),
            parameters: BTreeMap::new(),
            #[cfg(feature = "multipart")]
            files: Vec::new(),
        }
    }

    #[test]
    fn empty_and_sentinel_values_are_never_stored() {
        let mut client = client(ScriptedTransport::new());
        for key in &["page", "count", "since_id", ""] {
            client.param(key, "").param(key, "-1");
        }
        client.params(vec![("max_id", ""), ("cursor", "-1")]);
        assert!(client.state().parameters.is_empty());

        client.param(Param::Page, "2").param(Param::Page, "-1");
        assert_eq!(client.state().parameters["page"], "2");
    }

    #[test]
    fn builder_accumulates_state() {
        let mut client = client(ScriptedTransport::new());
        client
            .endpoint_with(Endpoint::DestroyStatus, &[123])
            .method(HttpMethod::Post)
            .param("trim_user", "true")
            .params(vec![("a", "1"), ("a", "2")]);
        assert_eq!(client.state().method, HttpMethod::Post);
        assert_eq!(client.state().url, "https://api.example.com/1.1/statuses/destroy/123.json");
        assert_eq!(client.state().parameters["a"], "2");
        client.clear_param();
        assert!(client.state().parameters.is_empty());
        assert_eq!(client.state().method, HttpMethod::Post);
    }

    #[test]
    fn from_resolves_paths_and_templates() {
        let mut client = client(ScriptedTransport::new());
        client.from("/1.1/lists/list.json");
        assert_eq!(client.state().url, "https://api.example.com/1.1/lists/list.json");
        client.from("https://upload.example.com/1.1/media/upload.json");
        assert_eq!(client.state().url, "https://upload.example.com/1.1/media/upload.json");
        client.from_template("https://api.example.com/1.1/users/{}/{}.json", &["a", "b"]);
        assert_eq!(client.state().url, "https://api.example.com/1.1/users/a/b.json");
    }

    #[test]
    fn terminal_call_resets_after_success() {
        let mut client = client(ScriptedTransport::new().respond(200, "[]"));
        let records = client
            .from("/1.1/statuses/user_timeline.json")
            .method(HttpMethod::Get)
            .param("page", "2")
            .fetch_list()
            .unwrap();
        assert!(records.is_empty());
        assert_eq!(client.state(), &default_state());
    }

    #[test]
    fn terminal_call_resets_after_failure() {
        let mut client = client(
            ScriptedTransport::new()
                .respond(401, "denied")
                .respond(200, "{not json")
                .fail("reset"),
        );
        let auth = client.method(HttpMethod::Post).param("status", "hi").fetch_object();
        assert!(matches!(auth, Err(Error::Auth { status: 401, .. })));
        assert_eq!(client.state(), &default_state());

        let decode = client.from("/1.1/x.json").param("a", "b").fetch_object();
        assert!(matches!(decode, Err(Error::Decode(_))));
        assert_eq!(client.state(), &default_state());

        let io = client.method(HttpMethod::Delete).fetch_text();
        assert!(matches!(io, Err(Error::Transport(_))));
        assert_eq!(client.state(), &default_state());
    }

    #[test]
    fn terminal_call_resets_after_signing_failure() {
        let mut client = client(ScriptedTransport::new());
        let result = client.from("not a url").param("page", "1").fetch_text();
        assert!(matches!(result, Err(Error::Encoding(_))));
        assert_eq!(client.state(), &default_state());
    }

    #[test]
    fn fetch_text_returns_body() {
        let mut client = client(ScriptedTransport::new().respond(200, "plain body"));
        assert_eq!(client.fetch_text().unwrap(), "plain body");
        let sent = client.executor.transport().last_request();
        assert_eq!(sent.url.as_str(), HOME);
    }

    #[test]
    fn fetch_object_on_verify_endpoint_stores_identity() {
        let mut client = client(ScriptedTransport::new().respond(
            200,
            r#"{"screen_name":"hk","name":"H K","id":42,"statuses_count":3}"#,
        ));
        let record = client.from(VERIFY).fetch_object().unwrap();
        assert_eq!(record["id"], 42);
        let credentials = client.credentials().snapshot();
        assert_eq!(credentials.screen_name.as_deref(), Some("hk"));
        assert_eq!(credentials.user_name.as_deref(), Some("H K"));
        assert_eq!(credentials.statuses_count, Some(3));
    }

    #[test]
    fn verify_credentials_discards_pending_state() {
        let mut client = client(
            ScriptedTransport::new().respond(200, r#"{"screen_name":"hk","id":42}"#),
        );
        client.method(HttpMethod::Post).param("page", "9");
        client.verify_credentials().unwrap();
        let sent = client.executor.transport().last_request();
        assert_eq!(sent.method, http::Method::GET);
        assert_eq!(sent.url.as_str(), VERIFY);
        assert_eq!(client.credentials().snapshot().user_id, Some(42));
    }

    #[test]
    fn password_flow_then_signed_call() {
        let credentials = Credentials::with_password("ck", "cs", "user", "pass").unwrap();
        let transport = ScriptedTransport::new()
            .respond(200, "oauth_token=T&oauth_token_secret=S&screen_name=n&user_id=abc")
            .respond(200, "[]");
        let mut client = Client::with_transport(credentials, transport, config()).unwrap();

        let map = client.param("x_auth_mode", "client_auth").fetch_access_token().unwrap();
        assert_eq!(map["screen_name"], "n");
        let stored = client.credentials().snapshot();
        assert_eq!(stored.access_token(), Some("T"));
        assert_eq!(stored.user_id, None);
        assert_eq!(client.state(), &default_state());

        let exchange = client.executor.transport().last_request();
        assert_eq!(exchange.method, http::Method::POST);
        assert_eq!(exchange.url.as_str(), "https://api.example.com/oauth/access_token");

        client.fetch_list().unwrap();
        let sent = client.executor.transport().last_request();
        let header = sent.headers[AUTHORIZATION].to_str().unwrap().to_string();
        assert!(header.contains("oauth_token=\"T\""));
    }

    #[test]
    fn async_fetch_delivers_exactly_once() {
        let mut client = client(ScriptedTransport::new().respond(200, r#"[{"id":1},{"id":2}]"#));
        let calls = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = mpsc::channel();
        let caller = thread::current().id();
        {
            let calls = Arc::clone(&calls);
            client
                .endpoint(Endpoint::HomeTimeline)
                .param("page", "2")
                .fetch_list_async(move |result| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tx.send((thread::current().id(), result)).unwrap();
                })
                .unwrap();
        }
        assert_eq!(client.state(), &default_state());

        let (worker, result) = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_ne!(worker, caller);
        assert_eq!(result.unwrap().len(), 2);
        client.shutdown();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(rx.try_recv().is_err());

        let sent = client.executor.transport().last_request();
        assert_eq!(sent.url.query(), Some("page=2"));
    }

    #[test]
    fn async_failure_goes_through_callback() {
        let mut client = client(ScriptedTransport::new().respond(403, "suspended"));
        let (tx, rx) = mpsc::channel();
        client
            .fetch_object_async(move |result| tx.send(result).unwrap())
            .unwrap();
        match rx.recv_timeout(Duration::from_secs(5)).unwrap() {
            Err(Error::Auth { status, body }) => {
                assert_eq!(status, 403);
                assert_eq!(body, "suspended");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn pool_outlives_first_async_call() {
        let mut client = client(
            ScriptedTransport::new()
                .respond(200, "a")
                .respond(200, "b")
                .respond(200, "oauth_token=T&oauth_token_secret=S"),
        );
        let (tx, rx) = mpsc::channel();
        for _ in 0..2 {
            let tx = tx.clone();
            client
                .fetch_text_async(move |result| tx.send(result.unwrap()).unwrap())
                .unwrap();
        }
        client.shutdown();
        let mut bodies: Vec<String> = rx.try_iter().collect();
        bodies.sort();
        assert_eq!(bodies, vec!["a", "b"]);
    }

    #[test]
    fn async_after_shutdown_is_dispatch_error() {
        let mut client = client(ScriptedTransport::new());
        client.shutdown();
        let called = Arc::new(AtomicUsize::new(0));
        let flag = Arc::clone(&called);
        let result = client.param("page", "2").fetch_list_async(move |_| {
            flag.fetch_add(1, Ordering::SeqCst);
        });
        assert!(matches!(result, Err(Error::Dispatch(DispatchError::ShutDown))));
        assert_eq!(called.load(Ordering::SeqCst), 0);
        assert_eq!(client.state(), &default_state());
        // blocking calls still work
        assert!(client.fetch_list().is_ok());
    }

    #[test]
    fn async_access_token_stores_token() {
        let credentials = Credentials::with_password("ck", "cs", "user", "pass").unwrap();
        let transport = ScriptedTransport::new().respond(200, "oauth_token=T&oauth_token_secret=S");
        let mut client = Client::with_transport(credentials, transport, config()).unwrap();
        let (tx, rx) = mpsc::channel();
        client
            .fetch_access_token_async(move |result| tx.send(result.is_ok()).unwrap())
            .unwrap();
        assert!(rx.recv_timeout(Duration::from_secs(5)).unwrap());
        assert_eq!(client.credentials().snapshot().access_token(), Some("T"));
    }

    #[test]
    fn sessions_keep_separate_call_state() {
        let first = client(ScriptedTransport::new());
        let second = first.new_session().unwrap();
        let workers: Vec<_> = vec![(first, "1"), (second, "2")]
            .into_iter()
            .map(|(mut session, page)| {
                thread::spawn(move || {
                    for _ in 0..50 {
                        session
                            .from(format!("/1.1/page{}.json", page))
                            .param("page", page)
                            .fetch_list()
                            .unwrap();
                    }
                    session
                })
            })
            .collect();
        let sessions: Vec<_> = workers.into_iter().map(|w| w.join().unwrap()).collect();

        let requests = sessions[0].executor.transport().requests();
        assert_eq!(requests.len(), 100);
        for request in requests {
            let page = request.url.query().unwrap().trim_start_matches("page=").to_string();
            assert_eq!(request.url.path(), format!("/1.1/page{}.json", page));
        }
    }

    #[test]
    fn invalid_config_is_rejected() {
        let credentials = Credentials::with_token("ck", "cs", "token", "secret").unwrap();
        let result = Client::with_transport(
            credentials,
            ScriptedTransport::new(),
            ClientConfig::default().worker_threads(0),
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn missing_credentials_are_config_errors() {
        assert!(matches!(
            Client::with_password("ck", "cs", "", "pass"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn dropping_client_inside_async_runtime_delivers_pending_callback() {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let (tx, rx) = mpsc::channel();
        runtime.block_on(async move {
            let mut client = client(ScriptedTransport::new().respond(200, "late"));
            client
                .fetch_text_async(move |result| tx.send(result.unwrap()).unwrap())
                .unwrap();
            drop(client);
        });
        assert_eq!(rx.try_recv().unwrap(), "late");
    }

    #[cfg(feature = "multipart")]
    #[test]
    fn files_are_sent_as_multipart_and_reset() {
        let mut client = client(ScriptedTransport::new().respond(200, r#"{"id":1}"#));
        client
            .endpoint(Endpoint::UpdateWithMedia)
            .method(HttpMethod::Post)
            .param(Param::Status, "with a picture")
            .file_bytes("media[]", "cat.png", vec![137u8, 80, 78, 71]);
        assert_eq!(client.state().files.len(), 1);
        client.fetch_object().unwrap();
        assert_eq!(client.state(), &default_state());

        let sent = client.executor.transport().last_request();
        match sent.body {
            Some(crate::HttpBody::Multipart { fields, files }) => {
                assert_eq!(fields, vec![("status".to_string(), "with a picture".to_string())]);
                assert_eq!(files, vec![FilePart::bytes("media[]", "cat.png", vec![137u8, 80, 78, 71])]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[cfg(feature = "multipart")]
    #[test]
    fn clear_param_drops_files() {
        let mut client = client(ScriptedTransport::new());
        client.file("media", "/tmp/cat.png").clear_param();
        assert!(client.state().files.is_empty());
    }
}
