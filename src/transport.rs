//! The one place that touches the network.

use http::Request;
use std::io::{self, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::{Error, Result};

/// Request body handed to a [`Transport`].
pub enum Body {
  Empty,
  Bytes(Vec<u8>),
  /// Streamed body whose exact length is known before the first byte is sent.
  Stream {
    reader: Box<dyn Read + Send>,
    length: u64,
  },
}

impl Body {
  pub fn len(&self) -> u64 {
    match self {
      Body::Empty => 0,
      Body::Bytes(b) => b.len() as u64,
      Body::Stream { length, .. } => *length,
    }
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

impl std::fmt::Debug for Body {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Body::Empty => f.write_str("Empty"),
      Body::Bytes(b) => write!(f, "Bytes({} bytes)", b.len()),
      Body::Stream { length, .. } => write!(f, "Stream({} bytes)", length),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
  pub status: u16,
  pub body: String,
}

impl RawResponse {
  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.status)
  }
}

/// Shared flag a caller flips to abandon in-flight work.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn cancel(&self) {
    self.0.store(true, Ordering::SeqCst);
  }

  pub fn is_cancelled(&self) -> bool {
    self.0.load(Ordering::SeqCst)
  }
}

/// Per-call knobs threaded down to the transport.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
  /// Overrides the client-wide timeout for this call.
  pub timeout: Option<Duration>,
  /// Checked before dispatch and on every read of a streamed body. A request
  /// without a streamed body that is already on the wire is not interrupted;
  /// pair the token with a timeout to bound it.
  pub cancel: Option<CancelToken>,
}

impl CallOptions {
  pub fn with_timeout(mut self, timeout: Duration) -> Self {
    self.timeout = Some(timeout);
    self
  }

  pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
    self.cancel = Some(cancel);
    self
  }

  pub fn is_cancelled(&self) -> bool {
    self.cancel.as_ref().map_or(false, CancelToken::is_cancelled)
  }

  pub fn check_cancelled(&self) -> Result<()> {
    if self.is_cancelled() {
      Err(Error::Cancelled)
    } else {
      Ok(())
    }
  }
}

/// Sends one fully-formed request and reads the whole response body.
/// Implementations never retry.
pub trait Transport {
  fn send(&self, request: Request<Body>, options: &CallOptions) -> Result<RawResponse>;
}

impl<T: Transport + ?Sized> Transport for &T {
  fn send(&self, request: Request<Body>, options: &CallOptions) -> Result<RawResponse> {
    (**self).send(request, options)
  }
}

/// Blocking `reqwest` transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
  client: reqwest::blocking::Client,
}

impl HttpTransport {
  /// `None` disables the deadline altogether.
  pub fn new(timeout: Option<Duration>) -> Result<Self> {
    let client = reqwest::blocking::Client::builder()
      .timeout(timeout)
      .build()?;
    Ok(Self { client })
  }
}

impl Transport for HttpTransport {
  fn send(&self, request: Request<Body>, options: &CallOptions) -> Result<RawResponse> {
    options.check_cancelled()?;

    let (parts, body) = request.into_parts();
    let mut builder = self
      .client
      .request(parts.method, parts.uri.to_string())
      .headers(parts.headers);

    if let Some(timeout) = options.timeout {
      builder = builder.timeout(timeout);
    }

    builder = match body {
      Body::Empty => builder,
      Body::Bytes(bytes) => builder.body(bytes),
      Body::Stream { reader, length } => {
        let reader = CancellableReader {
          inner: reader,
          cancel: options.cancel.clone(),
        };
        builder.body(reqwest::blocking::Body::sized(reader, length))
      }
    };

    let response = builder.send().map_err(|e| {
      if options.is_cancelled() {
        Error::Cancelled
      } else {
        Error::from(e)
      }
    })?;

    let status = response.status().as_u16();
    let body = response.text()?;

    Ok(RawResponse { status, body })
  }
}

struct CancellableReader {
  inner: Box<dyn Read + Send>,
  cancel: Option<CancelToken>,
}

impl Read for CancellableReader {
  fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
    if self.cancel.as_ref().map_or(false, CancelToken::is_cancelled) {
      return Err(io::Error::new(io::ErrorKind::Other, "upload cancelled"));
    }
    self.inner.read(buf)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_cancel_token_is_shared() {
    let token = CancelToken::new();
    let options = CallOptions::default().with_cancel(token.clone());
    assert!(options.check_cancelled().is_ok());

    token.cancel();
    assert!(matches!(options.check_cancelled(), Err(Error::Cancelled)));
  }

  #[test]
  fn test_cancellable_reader_stops() {
    let token = CancelToken::new();
    let mut reader = CancellableReader {
      inner: Box::new(io::Cursor::new(vec![1u8; 16])),
      cancel: Some(token.clone()),
    };

    let mut buf = [0u8; 8];
    assert_eq!(reader.read(&mut buf).unwrap(), 8);
    token.cancel();
    assert!(reader.read(&mut buf).is_err());
  }

  #[test]
  fn test_http_transport_respects_cancel_before_dispatch() {
    let transport = HttpTransport::new(None).unwrap();
    let token = CancelToken::new();
    token.cancel();

    // unroutable; never contacted because the token is already set
    let req = Request::get("http://192.0.2.1/").body(Body::Empty).unwrap();
    let err = transport
      .send(req, &CallOptions::default().with_cancel(token))
      .unwrap_err();
    assert!(matches!(err, Error::Cancelled));
  }
}
