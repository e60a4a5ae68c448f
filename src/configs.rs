use anyhow::{anyhow, Result};
use std::env::var;
use std::fs::read_to_string;
use std::path::PathBuf;
use std::time::Duration;

use crate::consts::DEFAULT_API_URL;

const CRED_USERNAME: &str = "username";
const CRED_TOKEN: &str = "token";
const CONF_API_URL: &str = "api_url";

/// vzaar login name plus API token. The login is sent as the OAuth token,
/// the API token is the OAuth token secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
  identity: String,
  secret: String,
}

impl Credentials {
  pub fn new(identity: impl Into<String>, secret: impl Into<String>) -> Self {
    Self {
      identity: identity.into(),
      secret: secret.into(),
    }
  }

  pub fn identity(&self) -> &str {
    &self.identity
  }

  pub fn secret(&self) -> &str {
    &self.secret
  }

  pub fn is_complete(&self) -> bool {
    !self.identity.is_empty() && !self.secret.is_empty()
  }
}

impl std::fmt::Debug for Credentials {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Credentials")
      .field("identity", &self.identity)
      .field("secret", &"<redacted>")
      .finish()
  }
}

#[derive(Debug, Clone)]
pub struct Configuration {
  pub credentials: Credentials,
  pub api_url: String,
  /// Replaces `https://{bucket}.s3.amazonaws.com/` as the upload target.
  pub storage_url: Option<String>,
  /// `None` waits forever.
  pub timeout: Option<Duration>,
  /// Check the HTTP status of GET calls too. Off by default: GET bodies are
  /// handed to the decoder whatever the status.
  pub strict_status: bool,
}

impl Configuration {
  pub fn from_static(username: String, token: String) -> Self {
    Self {
      credentials: Credentials::new(username, token),
      api_url: DEFAULT_API_URL.to_owned(),
      storage_url: None,
      timeout: None,
      strict_status: false,
    }
  }

  pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
    self.api_url = api_url.into().trim_end_matches('/').to_owned();
    self
  }

  pub fn with_storage_url(mut self, storage_url: impl Into<String>) -> Self {
    self.storage_url = Some(storage_url.into());
    self
  }

  pub fn with_timeout(mut self, timeout: Duration) -> Self {
    self.timeout = Some(timeout);
    self
  }

  pub fn with_strict_status(mut self, strict: bool) -> Self {
    self.strict_status = strict;
    self
  }

  /// Precedence:
  ///   env vars (VZAAR_USERNAME, VZAAR_TOKEN) (VZAAR_API_URL)
  ///   profile (VZAAR_PROFILE)
  ///   default profile
  pub fn auto() -> Result<Self> {
    if let Ok(c) = Self::from_env() {
      Ok(c)
    } else if let Ok(c) = Self::from_profile_env() {
      Ok(c)
    } else if let Ok(c) = Self::from_profile_static("default") {
      Ok(c)
    } else {
      Err(anyhow!("failed to find configuration automatically"))
    }
  }

  pub fn from_env() -> Result<Self> {
    let c = Self::from_static(var("VZAAR_USERNAME")?, var("VZAAR_TOKEN")?);

    Ok(match var("VZAAR_API_URL") {
      Ok(url) => c.with_api_url(url),
      Err(_) => c,
    })
  }

  pub fn from_profile_static(profile: &str) -> Result<Self> {
    let raw = read_to_string(credentials_path()?)?;
    Self::parse_profile(&raw, profile)
  }

  pub fn from_profile_env() -> Result<Self> {
    let p = var("VZAAR_PROFILE")?;
    Self::from_profile_static(&p)
  }

  fn parse_profile(raw: &str, profile: &str) -> Result<Self> {
    let profile_line = format!("[{}]", profile);
    let mut profile_found = false;
    let mut username = None;
    let mut token = None;
    let mut api_url = None;

    for line in raw.lines().map(str::trim) {
      if line.starts_with('[') {
        if profile_found {
          // next section
          break;
        }

        if line == profile_line {
          profile_found = true;
        }
        continue;
      }

      if profile_found {
        let lp: Vec<&str> = line.splitn(2, '=').map(|x| x.trim()).collect();
        match lp[..] {
          [CRED_USERNAME, val] => username = Some(val.to_owned()),
          [CRED_TOKEN, val] => token = Some(val.to_owned()),
          [CONF_API_URL, val] => api_url = Some(val.to_owned()),
          _ => {}
        }
      }
    }

    if !profile_found {
      return Err(anyhow!("profile {} not found in credentials", profile));
    }

    let c = Self::from_static(
      username.ok_or_else(|| anyhow!("username not found for profile"))?,
      token.ok_or_else(|| anyhow!("token not found for profile"))?,
    );

    Ok(match api_url {
      Some(url) => c.with_api_url(url),
      None => c,
    })
  }
}

#[cfg(target_os = "windows")]
fn credentials_path() -> Result<PathBuf> {
  let mut path = PathBuf::from(var("HOMEPATH")?);
  path.push(".vzaar");
  path.push("credentials");
  Ok(path)
}

#[cfg(not(target_os = "windows"))]
fn credentials_path() -> Result<PathBuf> {
  let mut path = PathBuf::from(var("HOME")?);
  path.push(".vzaar");
  path.push("credentials");
  Ok(path)
}
