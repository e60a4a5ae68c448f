//! OAuth 1.0 request signing (RFC 5849, HMAC flavours).
//!
//! Only the method, the URL and its query parameters are covered by the
//! signature. Request bodies are XML, not form-encoded, so they never take
//! part in the base string.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use http::header::{HeaderValue, AUTHORIZATION};
use http::Request;
use rand::Rng;
use sha1::Sha1;
use sha2::Sha256;
use std::sync::atomic::{AtomicU64, Ordering};
use time::OffsetDateTime;
use url::Url;

use crate::consts::*;
use crate::{Credentials, Error, Result};

type HmacSha1 = Hmac<Sha1>;
type HmacSha256 = Hmac<Sha256>;

static HEX_UPPER: &[u8; 16] = b"0123456789ABCDEF";

/// Mixed into every nonce so two signatures issued within the same clock
/// tick still differ.
static NONCE_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignatureMethod {
  #[default]
  HmacSha1,
  HmacSha256,
}

impl SignatureMethod {
  pub fn as_str(&self) -> &'static str {
    match self {
      SignatureMethod::HmacSha1 => "HMAC-SHA1",
      SignatureMethod::HmacSha256 => "HMAC-SHA256",
    }
  }

  fn parse(s: &str) -> Option<Self> {
    match s {
      "HMAC-SHA1" => Some(SignatureMethod::HmacSha1),
      "HMAC-SHA256" => Some(SignatureMethod::HmacSha256),
      _ => None,
    }
  }
}

#[derive(Debug, Clone)]
pub struct Signer {
  credentials: Credentials,
  consumer_key: String,
  consumer_secret: String,
  method: SignatureMethod,
}

impl Signer {
  /// vzaar signs with an empty consumer pair; only the token pair matters.
  pub fn new(credentials: Credentials) -> Self {
    Self {
      credentials,
      consumer_key: String::new(),
      consumer_secret: String::new(),
      method: SignatureMethod::default(),
    }
  }

  pub fn with_consumer(mut self, key: impl Into<String>, secret: impl Into<String>) -> Self {
    self.consumer_key = key.into();
    self.consumer_secret = secret.into();
    self
  }

  pub fn with_method(mut self, method: SignatureMethod) -> Self {
    self.method = method;
    self
  }

  /// Adds an `Authorization: OAuth ...` header bound to a fresh nonce and
  /// timestamp.
  pub fn sign<T>(&self, req: &mut Request<T>) -> Result<()> {
    let timestamp = OffsetDateTime::now_utc().unix_timestamp();
    self.sign_with(req, &next_nonce(), timestamp)
  }

  pub(crate) fn sign_with<T>(&self, req: &mut Request<T>, nonce: &str, timestamp: i64) -> Result<()> {
    if !self.credentials.is_complete() {
      return Err(Error::configuration("identity and secret must not be empty"));
    }

    let mut params = self.oauth_params(nonce, timestamp);
    let base = base_string(req.method().as_str(), &req.uri().to_string(), &params)?;
    params.push((OAUTH_SIGNATURE.to_owned(), self.signature(&base)));
    params.sort();

    let header = format!(
      "OAuth {}",
      params
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, encode(v)))
        .collect::<Vec<_>>()
        .join(", ")
    );
    let value = HeaderValue::from_str(&header)
      .map_err(|e| Error::configuration(format!("unusable authorization header: {}", e)))?;
    req.headers_mut().insert(AUTHORIZATION, value);

    Ok(())
  }

  /// Recomputes the signature carried by a signed request's `Authorization`
  /// header with this signer's secrets.
  pub fn verify<T>(&self, req: &Request<T>) -> Result<bool> {
    let header = req
      .headers()
      .get(AUTHORIZATION)
      .and_then(|v| v.to_str().ok())
      .and_then(|v| v.strip_prefix("OAuth "))
      .ok_or_else(|| Error::Decode("missing OAuth authorization header".to_owned()))?;

    let mut params = Vec::new();
    let mut signature = None;
    for item in header.split(", ") {
      let (k, v) = item
        .split_once('=')
        .ok_or_else(|| Error::Decode(format!("malformed OAuth parameter {}", item)))?;
      let v = decode(v.trim_matches('"'));
      if k == OAUTH_SIGNATURE {
        signature = Some(v);
      } else {
        params.push((k.to_owned(), v));
      }
    }

    let method = params
      .iter()
      .find(|(k, _)| k == OAUTH_SIGNATURE_METHOD)
      .and_then(|(_, v)| SignatureMethod::parse(v))
      .ok_or_else(|| Error::Decode("unknown OAuth signature method".to_owned()))?;

    let base = base_string(req.method().as_str(), &req.uri().to_string(), &params)?;
    let expected = self.clone().with_method(method).signature(&base);
    Ok(signature.as_deref() == Some(expected.as_str()))
  }

  fn oauth_params(&self, nonce: &str, timestamp: i64) -> Vec<(String, String)> {
    vec![
      (OAUTH_CONSUMER_KEY.to_owned(), self.consumer_key.clone()),
      (OAUTH_NONCE.to_owned(), nonce.to_owned()),
      (OAUTH_SIGNATURE_METHOD.to_owned(), self.method.as_str().to_owned()),
      (OAUTH_TIMESTAMP.to_owned(), timestamp.to_string()),
      (OAUTH_TOKEN.to_owned(), self.credentials.identity().to_owned()),
      (OAUTH_VERSION_PARAM.to_owned(), OAUTH_VERSION.to_owned()),
    ]
  }

  fn signature(&self, base: &str) -> String {
    let key = format!(
      "{}&{}",
      encode(&self.consumer_secret),
      encode(self.credentials.secret())
    );

    let digest = match self.method {
      SignatureMethod::HmacSha1 => {
        let mut mac = HmacSha1::new_from_slice(key.as_bytes()).expect("HMAC can take key of any size");
        mac.update(base.as_bytes());
        mac.finalize().into_bytes().to_vec()
      }
      SignatureMethod::HmacSha256 => {
        let mut mac = HmacSha256::new_from_slice(key.as_bytes()).expect("HMAC can take key of any size");
        mac.update(base.as_bytes());
        mac.finalize().into_bytes().to_vec()
      }
    };

    STANDARD.encode(digest)
  }
}

fn next_nonce() -> String {
  let random: u64 = rand::thread_rng().gen();
  let count = NONCE_COUNTER.fetch_add(1, Ordering::Relaxed);
  format!("{:016x}{:x}", random, count)
}

/// `METHOD&enc(base URL)&enc(sorted params)`; `params` must not contain
/// `oauth_signature`.
fn base_string(method: &str, url: &str, oauth: &[(String, String)]) -> Result<String> {
  let url = Url::parse(url)?;
  let host = url
    .host_str()
    .ok_or_else(|| Error::configuration(format!("URL {} has no host", url)))?;

  // the url crate already drops default ports
  let base_url = match url.port() {
    Some(port) => format!("{}://{}:{}{}", url.scheme(), host, port, url.path()),
    None => format!("{}://{}{}", url.scheme(), host, url.path()),
  };

  let mut params: Vec<(String, String)> = url
    .query_pairs()
    .map(|(k, v)| (encode(&k), encode(&v)))
    .chain(oauth.iter().map(|(k, v)| (encode(k), encode(v))))
    .collect();
  params.sort();

  let normalized = params
    .iter()
    .map(|(k, v)| format!("{}={}", k, v))
    .collect::<Vec<_>>()
    .join("&");

  Ok(format!(
    "{}&{}&{}",
    method.to_ascii_uppercase(),
    encode(&base_url),
    encode(&normalized)
  ))
}

/// RFC 3986 percent-encoding: everything but the unreserved set.
fn encode(s: &str) -> String {
  let mut result = String::with_capacity(s.len() + 16);
  for byte in s.bytes() {
    match byte {
      b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
        result.push(byte as char);
      }
      _ => {
        result.push('%');
        result.push(HEX_UPPER[(byte >> 4) as usize] as char);
        result.push(HEX_UPPER[(byte & 0xf) as usize] as char);
      }
    }
  }
  result
}

fn decode(s: &str) -> String {
  let bytes = s.as_bytes();
  let mut out = Vec::with_capacity(bytes.len());
  let mut i = 0;
  while i < bytes.len() {
    if bytes[i] == b'%' && i + 2 < bytes.len() {
      let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
      if let Some(b) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
        out.push(b);
        i += 3;
        continue;
      }
    }
    out.push(bytes[i]);
    i += 1;
  }
  String::from_utf8_lossy(&out).into_owned()
}
