use http::{HeaderMap, Method, Request};
use std::cell::{Ref, RefCell};
use std::collections::VecDeque;
use std::io::Read;

use crate::transport::{Body, CallOptions, RawResponse, Transport};
use crate::{Error, Result};

pub(crate) struct Sent {
  pub method: Method,
  pub url: String,
  pub headers: HeaderMap,
  pub declared_length: u64,
  pub body: Vec<u8>,
}

/// Records requests and replays canned responses in order.
#[derive(Default)]
pub(crate) struct MockTransport {
  responses: RefCell<VecDeque<Result<RawResponse>>>,
  sent: RefCell<Vec<Sent>>,
}

impl MockTransport {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn respond(self, status: u16, body: &str) -> Self {
    self.responses.borrow_mut().push_back(Ok(RawResponse {
      status,
      body: body.to_owned(),
    }));
    self
  }

  pub fn fail(self, err: Error) -> Self {
    self.responses.borrow_mut().push_back(Err(err));
    self
  }

  pub fn sent(&self) -> Ref<'_, Vec<Sent>> {
    self.sent.borrow()
  }
}

impl Transport for MockTransport {
  fn send(&self, request: Request<Body>, options: &CallOptions) -> Result<RawResponse> {
    options.check_cancelled()?;

    let (parts, body) = request.into_parts();
    let declared_length = body.len();
    let body = match body {
      Body::Empty => Vec::new(),
      Body::Bytes(bytes) => bytes,
      Body::Stream { mut reader, .. } => {
        let mut buf = Vec::new();
        reader
          .read_to_end(&mut buf)
          .map_err(|e| Error::Transport(e.to_string()))?;
        buf
      }
    };

    self.sent.borrow_mut().push(Sent {
      method: parts.method,
      url: parts.uri.to_string(),
      headers: parts.headers,
      declared_length,
      body,
    });

    self
      .responses
      .borrow_mut()
      .pop_front()
      .unwrap_or_else(|| panic!("no canned response left"))
  }
}
