use http::header::{CONTENT_TYPE, USER_AGENT};
use http::{Method, Request};
use std::str::FromStr;
use tracing::{debug, warn};

use crate::consts;
use crate::sign::Signer;
use crate::transport::{Body, CallOptions, Transport};
use crate::{Error, Result};

/// HTTP verbs the API is reached with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
  Get,
  Post,
  Delete,
}

impl Verb {
  pub fn method(&self) -> Method {
    match self {
      Verb::Get => Method::GET,
      Verb::Post => Method::POST,
      Verb::Delete => Method::DELETE,
    }
  }

  /// POST and DELETE must come back with HTTP 200. GET bodies go to the
  /// decoder whatever the status, unless the executor runs in strict mode.
  pub fn requires_status_check(&self) -> bool {
    !matches!(self, Verb::Get)
  }
}

impl FromStr for Verb {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s.to_ascii_uppercase().as_str() {
      "GET" => Ok(Verb::Get),
      "POST" => Ok(Verb::Post),
      "DELETE" => Ok(Verb::Delete),
      _ => Err(Error::UnsupportedMethod(s.to_owned())),
    }
  }
}

/// Signs and dispatches single API calls.
pub struct RequestExecutor<'a, T> {
  signer: &'a Signer,
  transport: &'a T,
  strict_status: bool,
}

impl<'a, T: Transport> RequestExecutor<'a, T> {
  pub fn new(signer: &'a Signer, transport: &'a T) -> Self {
    Self {
      signer,
      transport,
      strict_status: false,
    }
  }

  pub fn strict_status(mut self, strict: bool) -> Self {
    self.strict_status = strict;
    self
  }

  /// Unsupported methods are refused before anything is signed or sent.
  pub fn execute(
    &self,
    method: &str,
    url: &str,
    body: Option<String>,
    options: &CallOptions,
  ) -> Result<String> {
    let verb: Verb = method.parse()?;
    self.dispatch(verb, url, body, options)
  }

  pub fn dispatch(
    &self,
    verb: Verb,
    url: &str,
    body: Option<String>,
    options: &CallOptions,
  ) -> Result<String> {
    options.check_cancelled()?;

    let builder = Request::builder().method(verb.method()).uri(url);
    let (builder, body) = match (verb, body) {
      (Verb::Get, None) => (builder, Body::Empty),
      (Verb::Get, Some(_)) => {
        return Err(Error::configuration("GET requests carry no body"));
      }
      (Verb::Post, body) | (Verb::Delete, body) => (
        builder
          .header(CONTENT_TYPE, consts::XML_CONTENT_TYPE)
          .header(USER_AGENT, consts::USER_AGENT),
        Body::Bytes(body.unwrap_or_default().into_bytes()),
      ),
    };

    let mut request = builder
      .body(body)
      .map_err(|e| Error::configuration(format!("invalid request to {}: {}", url, e)))?;
    self.signer.sign(&mut request)?;

    debug!(method = ?verb, url, bytes = request.body().len(), "dispatching request");
    let response = self.transport.send(request, options)?;
    debug!(method = ?verb, url, status = response.status, "response received");

    if (verb.requires_status_check() || self.strict_status) && response.status != 200 {
      warn!(method = ?verb, url, status = response.status, "request rejected");
      return Err(Error::Remote {
        status: response.status,
        body: response.body,
      });
    }

    Ok(response.body)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::MockTransport;
  use crate::Credentials;
  use http::header::AUTHORIZATION;

  fn signer() -> Signer {
    Signer::new(Credentials::new("alice", "token"))
  }

  #[test]
  fn test_unsupported_method_never_dispatches() {
    let transport = MockTransport::new();
    let signer = signer();
    let executor = RequestExecutor::new(&signer, &transport);

    for method in ["PATCH", "PUT", "HEAD", ""] {
      let err = executor
        .execute(method, "https://vzaar.com/api/videos/1.xml", None, &CallOptions::default())
        .unwrap_err();
      assert!(matches!(err, Error::UnsupportedMethod(ref m) if m == method));
    }
    assert!(transport.sent().is_empty());
  }

  #[test]
  fn test_verb_parsing_is_case_insensitive() {
    assert_eq!("get".parse::<Verb>().unwrap(), Verb::Get);
    assert_eq!("Delete".parse::<Verb>().unwrap(), Verb::Delete);
  }

  #[test]
  fn test_post_headers_and_body() {
    let transport = MockTransport::new().respond(200, "<vzaar-api><video>7</video></vzaar-api>");
    let signer = signer();
    let executor = RequestExecutor::new(&signer, &transport);

    let body = executor
      .execute(
        "POST",
        "https://vzaar.com/api/videos",
        Some("<vzaar-api/>".to_owned()),
        &CallOptions::default(),
      )
      .unwrap();
    assert_eq!(body, "<vzaar-api><video>7</video></vzaar-api>");

    let sent = transport.sent();
    assert_eq!(sent[0].method, Method::POST);
    assert_eq!(sent[0].headers[CONTENT_TYPE], "application/xml");
    assert_eq!(sent[0].headers[USER_AGENT], consts::USER_AGENT);
    assert!(sent[0].headers[AUTHORIZATION].to_str().unwrap().starts_with("OAuth "));
    assert_eq!(sent[0].body, b"<vzaar-api/>");
  }

  #[test]
  fn test_post_requires_200() {
    let transport = MockTransport::new().respond(201, "created");
    let signer = signer();
    let err = RequestExecutor::new(&signer, &transport)
      .execute("POST", "https://vzaar.com/api/videos", None, &CallOptions::default())
      .unwrap_err();
    assert_eq!(err.status(), Some(201));
  }

  #[test]
  fn test_get_status_quirk() {
    let signer = signer();

    let transport = MockTransport::new().respond(401, "{\"error\":\"denied\"}");
    let body = RequestExecutor::new(&signer, &transport)
      .execute("GET", "https://vzaar.com/api/test/whoami.json", None, &CallOptions::default())
      .unwrap();
    assert_eq!(body, "{\"error\":\"denied\"}");

    let transport = MockTransport::new().respond(401, "{\"error\":\"denied\"}");
    let err = RequestExecutor::new(&signer, &transport)
      .strict_status(true)
      .execute("GET", "https://vzaar.com/api/test/whoami.json", None, &CallOptions::default())
      .unwrap_err();
    assert_eq!(err.status(), Some(401));
  }

  #[test]
  fn test_get_refuses_body() {
    let transport = MockTransport::new();
    let signer = signer();
    let err = RequestExecutor::new(&signer, &transport)
      .execute("GET", "https://vzaar.com/", Some("x".to_owned()), &CallOptions::default())
      .unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
    assert!(transport.sent().is_empty());
  }

  #[test]
  fn test_unsigned_request_never_sent() {
    let transport = MockTransport::new();
    let signer = Signer::new(Credentials::new("alice", ""));
    let err = RequestExecutor::new(&signer, &transport)
      .execute("GET", "https://vzaar.com/", None, &CallOptions::default())
      .unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
    assert!(transport.sent().is_empty());
  }
}
