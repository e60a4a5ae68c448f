//! Two-step upload: fetch a signed storage policy from the API, then post the
//! file straight to storage with that policy.
//!
//! ```text
//! Idle -> PolicyRequested -> PolicyReceived -> Uploading -> Completed
//!              |                   |               |
//!              +-------------------+---------------+--> Failed
//! ```
//!
//! There is no retry state. A failed attempt stays failed; a new attempt
//! fetches a new policy, since policies are single-use and expire.

use tracing::debug;

use crate::consts::*;
use crate::multipart::{FilePart, FileSource, MultipartForm, MultipartUploader};
use crate::request::{RequestExecutor, Verb};
use crate::transport::{CallOptions, Transport};
use crate::xml::{leaf, leaves};
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadState {
  Idle,
  PolicyRequested,
  PolicyReceived,
  Uploading,
  Completed,
  /// Carries the description of the error that ended the attempt.
  Failed(String),
}

impl UploadState {
  fn can_become(&self, next: &UploadState) -> bool {
    use UploadState::*;
    matches!(
      (self, next),
      (Idle, PolicyRequested)
        | (PolicyRequested, PolicyReceived)
        | (PolicyReceived, Uploading)
        | (Uploading, Completed)
        | (PolicyRequested, Failed(_))
        | (PolicyReceived, Failed(_))
        | (Uploading, Failed(_))
    )
  }
}

/// Tracks one upload attempt through its states.
#[derive(Debug)]
pub struct UploadAttempt {
  state: UploadState,
}

impl Default for UploadAttempt {
  fn default() -> Self {
    Self::new()
  }
}

impl UploadAttempt {
  pub fn new() -> Self {
    Self {
      state: UploadState::Idle,
    }
  }

  pub fn state(&self) -> &UploadState {
    &self.state
  }

  fn advance(&mut self, next: UploadState) -> Result<()> {
    if !self.state.can_become(&next) {
      return Err(Error::configuration(format!(
        "upload cannot move from {:?} to {:?}",
        self.state, next
      )));
    }
    debug!(from = ?self.state, to = ?next, "upload state");
    self.state = next;
    Ok(())
  }

  fn fail(&mut self, err: Error) -> Error {
    // an illegal failure edge leaves the state untouched; the error still surfaces
    let _ = self.advance(UploadState::Failed(err.to_string()));
    err
  }
}

/// Signed storage policy handed out by `/api/videos/signature`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadPolicy {
  /// Correlates the stored object with the later process call.
  pub guid: String,
  pub key: String,
  pub access_key_id: String,
  pub acl: String,
  pub bucket: String,
  pub policy: String,
  pub signature: String,
  pub expiration_date: Option<String>,
}

impl UploadPolicy {
  /// Absent elements come back as empty strings; see [`validate`](Self::validate).
  pub fn parse(xml: &str) -> Result<Self> {
    let leaves = leaves(xml)?;
    let get = |name: &str| leaf(&leaves, name).unwrap_or_default().to_owned();

    Ok(Self {
      guid: get("guid"),
      key: get("key"),
      access_key_id: get("accesskeyid"),
      acl: get("acl"),
      bucket: get("bucket"),
      policy: get("policy"),
      signature: get("signature"),
      expiration_date: leaf(&leaves, "expirationdate").map(str::to_owned),
    })
  }

  pub fn missing_fields(&self) -> Vec<&'static str> {
    [
      ("guid", &self.guid),
      ("key", &self.key),
      ("accesskeyid", &self.access_key_id),
      ("acl", &self.acl),
      ("bucket", &self.bucket),
      ("policy", &self.policy),
      ("signature", &self.signature),
    ]
    .iter()
    .filter(|(_, v)| v.is_empty())
    .map(|(k, _)| *k)
    .collect()
  }

  pub fn validate(&self) -> Result<()> {
    let missing = self.missing_fields();
    if missing.is_empty() {
      Ok(())
    } else {
      Err(Error::configuration(format!(
        "upload policy is missing {}",
        missing.join(", ")
      )))
    }
  }

  pub fn storage_url(&self) -> String {
    format!("https://{}.s3.amazonaws.com/", self.bucket)
  }

  /// Policy fields in the order the storage service checks them, followed
  /// by the file part.
  pub fn form(&self, file: FilePart) -> MultipartForm {
    MultipartForm::new(file)
      .field(FIELD_KEY, self.key.as_str())
      .field(FIELD_ACCESS_KEY_ID, self.access_key_id.as_str())
      .field(FIELD_ACL, self.acl.as_str())
      .field(FIELD_POLICY, self.policy.as_str())
      .field(FIELD_SIGNATURE, self.signature.as_str())
      .field(FIELD_SUCCESS_ACTION_STATUS, SUCCESS_ACTION_STATUS)
  }
}

/// What storage reported back for a finished upload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadReceipt {
  /// Pass this to `process_video`.
  pub guid: String,
  pub location: Option<String>,
  pub bucket: Option<String>,
  pub key: Option<String>,
  pub etag: Option<String>,
}

impl UploadReceipt {
  fn parse(guid: String, xml: &str) -> Result<Self> {
    if xml.trim().is_empty() {
      return Ok(Self {
        guid,
        ..Self::default()
      });
    }

    let leaves = leaves(xml)?;
    let get = |name: &str| leaf(&leaves, name).map(str::to_owned);
    Ok(Self {
      guid,
      location: get("Location"),
      bucket: get("Bucket"),
      key: get("Key"),
      etag: get("ETag"),
    })
  }
}

pub(crate) struct Upload<'a, T> {
  pub executor: RequestExecutor<'a, T>,
  pub transport: &'a T,
  pub signature_url: &'a str,
  pub storage_url: Option<&'a str>,
}

impl<'a, T: Transport> Upload<'a, T> {
  pub fn run(
    &self,
    attempt: &mut UploadAttempt,
    file: FilePart,
    options: &CallOptions,
  ) -> Result<UploadReceipt> {
    if attempt.state() != &UploadState::Idle {
      return Err(Error::configuration(
        "an upload attempt runs once; start a new one to retry",
      ));
    }

    // held across the policy fetch so an unreadable file never spends a policy
    let source = FileSource::open(&file.path)?;

    attempt.advance(UploadState::PolicyRequested)?;
    let policy = self
      .executor
      .dispatch(Verb::Get, self.signature_url, None, options)
      .and_then(|raw| UploadPolicy::parse(&raw))
      .map_err(|e| attempt.fail(e))?;

    attempt.advance(UploadState::PolicyReceived)?;
    policy.validate().map_err(|e| attempt.fail(e))?;
    options.check_cancelled().map_err(|e| attempt.fail(e))?;

    attempt.advance(UploadState::Uploading)?;
    let url = self
      .storage_url
      .map(str::to_owned)
      .unwrap_or_else(|| policy.storage_url());
    let form = policy.form(file);
    let response = MultipartUploader::new(self.transport)
      .upload_from(&url, form, source, options)
      .map_err(|e| attempt.fail(e))?;

    let receipt = UploadReceipt::parse(policy.guid, &response.body).map_err(|e| attempt.fail(e))?;
    attempt.advance(UploadState::Completed)?;

    Ok(receipt)
  }
}
