use std::collections::VecDeque;

use parking_lot::Mutex;

use crate::{HttpRequest, HttpResponse, Transport, TransportError};

/// Replays queued responses in order and records every request it is sent.
/// Once the queue runs dry it answers `200 []`.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Default::default()
    }

    pub(crate) fn respond(self, status: u16, body: &str) -> Self {
        self.responses.lock().push_back(Ok(HttpResponse {
            status,
            body: body.as_bytes().to_vec(),
        }));
        self
    }

    pub(crate) fn fail(self, message: &str) -> Self {
        let err = std::io::Error::new(std::io::ErrorKind::ConnectionReset, message.to_string());
        self.responses
            .lock()
            .push_back(Err(TransportError::Io(Box::new(err))));
        self
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    pub(crate) fn last_request(&self) -> HttpRequest {
        self.requests
            .lock()
            .last()
            .cloned()
            .expect("no request was sent")
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().push(request);
        self.responses.lock().pop_front().unwrap_or_else(|| {
            Ok(HttpResponse {
                status: 200,
                body: b"[]".to_vec(),
            })
        })
    }
}
