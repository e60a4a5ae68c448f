use serde::de::DeserializeOwned;
use tracing::instrument;
use url::Url;

use crate::multipart::FilePart;
use crate::request::{RequestExecutor, Verb};
use crate::sign::{SignatureMethod, Signer};
use crate::transport::{CallOptions, HttpTransport, Transport};
use crate::types::*;
use crate::upload::{Upload, UploadAttempt, UploadPolicy, UploadReceipt};
use crate::{xml, Configuration, Error, Result};

/// vzaar API client. Holds only immutable configuration, so one instance can
/// serve any number of calls; every call is independent.
#[derive(Debug)]
pub struct Client<T = HttpTransport> {
  config: Configuration,
  signer: Signer,
  transport: T,
}

impl Client<HttpTransport> {
  pub fn new(config: Configuration) -> Result<Self> {
    let transport = HttpTransport::new(config.timeout)?;
    Ok(Self::with_transport(config, transport))
  }
}

impl<T: Transport> Client<T> {
  pub fn with_transport(config: Configuration, transport: T) -> Self {
    let signer = Signer::new(config.credentials.clone());
    Self {
      config,
      signer,
      transport,
    }
  }

  pub fn with_signature_method(mut self, method: SignatureMethod) -> Self {
    self.signer = self.signer.with_method(method);
    self
  }

  pub fn configuration(&self) -> &Configuration {
    &self.config
  }

  pub fn transport(&self) -> &T {
    &self.transport
  }

  /// Login name the credentials belong to.
  #[instrument(skip_all)]
  pub fn whoami(&self, options: &CallOptions) -> Result<String> {
    let url = self.endpoint(&["api", "test", "whoami.json"], &[])?;
    let who: WhoAmI = self.get_json(&url, options)?;
    Ok(who.vzaar_api.test.login)
  }

  /// Public details of a user. `login` is the account name, not the email.
  #[instrument(skip(self, options))]
  pub fn user_details(&self, login: &str, options: &CallOptions) -> Result<UserDetails> {
    let file = format!("{}.json", login);
    let url = self.endpoint(&["users", file.as_str()], &[])?;
    self.get_json(&url, options)
  }

  #[instrument(skip(self, options))]
  pub fn account_details(&self, account_id: u32, options: &CallOptions) -> Result<AccountDetails> {
    let file = format!("{}.json", account_id);
    let url = self.endpoint(&["api", "accounts", file.as_str()], &[])?;
    self.get_json(&url, options)
  }

  #[instrument(skip(self, options))]
  pub fn video_details(&self, video_id: u64, options: &CallOptions) -> Result<VideoDetails> {
    let file = format!("{}.json", video_id);
    let url = self.endpoint(&["api", "videos", file.as_str()], &[])?;
    let mut details: VideoDetails = self.get_json(&url, options)?;
    details.poster = format!("http://view.vzaar.com/{}/image", video_id);
    Ok(details)
  }

  /// The authenticated user's videos.
  #[instrument(skip(self, options))]
  pub fn video_list(&self, query: &VideoListQuery, options: &CallOptions) -> Result<Vec<Video>> {
    let login = self.config.credentials.identity();
    let url = self.endpoint(&["api", login, "videos.json"], &query.pairs())?;
    self.get_json(&url, options)
  }

  /// Fetches a fresh storage policy. Each policy is good for one upload.
  #[instrument(skip(self, options))]
  pub fn upload_signature(
    &self,
    signature: &SignatureOptions,
    options: &CallOptions,
  ) -> Result<UploadPolicy> {
    let url = self.endpoint(&["api", "videos", "signature"], &signature.pairs())?;
    let raw = self.executor().dispatch(Verb::Get, &url, None, options)?;
    UploadPolicy::parse(&raw)
  }

  /// Uploads a file to storage. The returned guid feeds [`process_video`](Self::process_video).
  pub fn upload_video(&self, file: FilePart, options: &CallOptions) -> Result<UploadReceipt> {
    self.upload(&mut UploadAttempt::new(), file, options)
  }

  /// [`upload_video`](Self::upload_video) with the attempt's state visible to
  /// the caller afterwards.
  #[instrument(skip(self, attempt, options), fields(path = %file.path.display()))]
  pub fn upload(
    &self,
    attempt: &mut UploadAttempt,
    file: FilePart,
    options: &CallOptions,
  ) -> Result<UploadReceipt> {
    if !self.config.credentials.is_complete() {
      return Err(Error::configuration("identity and secret must not be empty"));
    }

    let signature_url = self.endpoint(&["api", "videos", "signature"], &[])?;
    Upload {
      executor: self.executor(),
      transport: &self.transport,
      signature_url: &signature_url,
      storage_url: self.config.storage_url.as_deref(),
    }
    .run(attempt, file, options)
  }

  /// Turns an uploaded file into a video; returns the new video id.
  #[instrument(skip(self, options))]
  pub fn process_video(&self, query: &ProcessVideoQuery, options: &CallOptions) -> Result<u64> {
    let url = self.endpoint(&["api", "videos"], &[])?;
    let raw = self.executor().dispatch(
      Verb::Post,
      &url,
      Some(xml::process_video_body(query)),
      options,
    )?;
    xml::parse_video_id(&raw)
  }

  #[instrument(skip(self, options))]
  pub fn edit_video(&self, video_id: u64, query: &EditVideoQuery, options: &CallOptions) -> Result<()> {
    let file = format!("{}.xml", video_id);
    let url = self.endpoint(&["api", "videos", file.as_str()], &[])?;
    self
      .executor()
      .dispatch(Verb::Post, &url, Some(xml::edit_video_body(query)), options)?;
    Ok(())
  }

  /// `true` once the service reports the video as deleted.
  #[instrument(skip(self, options))]
  pub fn delete_video(&self, video_id: u64, options: &CallOptions) -> Result<bool> {
    let file = format!("{}.xml", video_id);
    let url = self.endpoint(&["api", "videos", file.as_str()], &[])?;
    let raw = self
      .executor()
      .dispatch(Verb::Delete, &url, Some(xml::delete_body()), options)?;
    xml::parse_deleted(&raw)
  }

  fn executor(&self) -> RequestExecutor<'_, T> {
    RequestExecutor::new(&self.signer, &self.transport).strict_status(self.config.strict_status)
  }

  fn get_json<D: DeserializeOwned>(&self, url: &str, options: &CallOptions) -> Result<D> {
    let raw = self.executor().dispatch(Verb::Get, url, None, options)?;
    Ok(serde_json::from_str(&raw)?)
  }

  fn endpoint(&self, segments: &[&str], query: &[(&str, String)]) -> Result<String> {
    let mut url = Url::parse(&self.config.api_url)?;
    url
      .path_segments_mut()
      .map_err(|_| Error::configuration(format!("{} cannot be a base URL", self.config.api_url)))?
      .pop_if_empty()
      .extend(segments);
    if !query.is_empty() {
      url.query_pairs_mut().extend_pairs(query);
    }
    Ok(url.into())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::MockTransport;

  fn client(transport: MockTransport) -> Client<MockTransport> {
    let config = Configuration::from_static("alice".to_owned(), "token".to_owned());
    Client::with_transport(config, transport)
  }

  #[test]
  fn test_endpoints() {
    let c = client(MockTransport::new());
    assert_eq!(
      c.endpoint(&["api", "test", "whoami.json"], &[]).unwrap(),
      "https://vzaar.com/api/test/whoami.json"
    );
    assert_eq!(
      c.endpoint(&["users", "a b.json"], &[]).unwrap(),
      "https://vzaar.com/users/a%20b.json"
    );
    assert_eq!(
      c.endpoint(&["api", "alice", "videos.json"], &[("title", "cats & dogs".to_owned())])
        .unwrap(),
      "https://vzaar.com/api/alice/videos.json?title=cats+%26+dogs"
    );
  }

  #[test]
  fn test_endpoint_keeps_base_path() {
    let config = Configuration::from_static("a".to_owned(), "b".to_owned())
      .with_api_url("http://localhost:3000/vzaar/");
    let c = Client::with_transport(config, MockTransport::new());
    assert_eq!(
      c.endpoint(&["api", "videos"], &[]).unwrap(),
      "http://localhost:3000/vzaar/api/videos"
    );
  }

  #[test]
  fn test_whoami() {
    let c = client(MockTransport::new().respond(200, r#"{"vzaar_api":{"test":{"login":"alice"}}}"#));
    assert_eq!(c.whoami(&CallOptions::default()).unwrap(), "alice");
  }

  #[test]
  fn test_get_decode_failure() {
    let c = client(MockTransport::new().respond(500, "<html>oops</html>"));
    let err = c.whoami(&CallOptions::default()).unwrap_err();
    assert!(matches!(err, Error::Decode(_)));
  }

  #[test]
  fn test_transport_failure_propagates() {
    let c = client(MockTransport::new().fail(Error::Transport("connection reset".to_owned())));
    let err = c.delete_video(3, &CallOptions::default()).unwrap_err();
    assert!(matches!(err, Error::Transport(ref m) if m == "connection reset"));
    assert_eq!(c.transport().sent().len(), 1);
  }

  #[test]
  fn test_signature_toggles_are_per_call() {
    let c = client(
      MockTransport::new()
        .respond(200, "<vzaar-api><guid>g</guid></vzaar-api>")
        .respond(200, "<vzaar-api><guid>h</guid></vzaar-api>"),
    );
    let flash = SignatureOptions {
      flash_request: true,
      redirect_url: Some("https://example.com/done".to_owned()),
    };
    let policy = c.upload_signature(&flash, &CallOptions::default()).unwrap();
    assert_eq!(policy.guid, "g");
    c.upload_signature(&SignatureOptions::default(), &CallOptions::default())
      .unwrap();

    let sent = c.transport().sent();
    assert_eq!(
      sent[0].url,
      "https://vzaar.com/api/videos/signature?flash_request=true\
       &success_action_redirect=https%3A%2F%2Fexample.com%2Fdone"
    );
    assert_eq!(sent[1].url, "https://vzaar.com/api/videos/signature");
    assert_eq!(c.configuration().api_url, "https://vzaar.com");
  }

  #[test]
  fn test_video_details_poster() {
    let c = client(MockTransport::new().respond(200, r#"{"type":"video","title":"clip","width":640}"#));
    let details = c.video_details(99, &CallOptions::default()).unwrap();
    assert_eq!(details.poster, "http://view.vzaar.com/99/image");
    assert_eq!(details.width, Some(640));
  }
}
