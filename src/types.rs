//! Response records and call queries.

use serde::Deserialize;

use crate::consts::DEFAULT_VIDEO_COUNT;

#[derive(Debug, Deserialize)]
pub(crate) struct WhoAmI {
  pub vzaar_api: WhoAmIApi,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WhoAmIApi {
  pub test: WhoAmITest,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WhoAmITest {
  pub login: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UserDetails {
  pub version: String,
  pub author_id: u64,
  pub author_name: String,
  pub author_url: String,
  pub author_account: u32,
  #[serde(default)]
  pub author_account_title: Option<String>,
  pub created_at: String,
  pub video_count: u64,
  #[serde(default)]
  pub video_total_size: u64,
  #[serde(default)]
  pub max_file_size: u64,
  pub play_count: u64,
  #[serde(default)]
  pub bandwidth_this_month: u64,
  #[serde(default)]
  pub bandwidth: Vec<UserBandwidth>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UserBandwidth {
  pub month: u32,
  pub year: u32,
  pub bandwidth: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AccountDetails {
  pub account_id: u32,
  pub title: String,
  pub bandwidth: u64,
  pub cost: AccountCost,
  pub rights: AccountRights,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AccountCost {
  pub monthly: u32,
  pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AccountRights {
  pub borderless: bool,
  #[serde(rename = "searchEnhancer")]
  pub search_enhancer: bool,
}

/// oEmbed description of a single video.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VideoDetails {
  #[serde(rename = "type")]
  pub kind: String,
  pub version: Option<String>,
  pub title: Option<String>,
  pub description: Option<String>,
  pub duration: Option<f64>,
  pub width: Option<u32>,
  pub height: Option<u32>,
  pub html: Option<String>,
  pub video_url: Option<String>,
  pub play_count: Option<u64>,
  pub total_size: Option<u64>,
  pub video_status_id: Option<u32>,
  pub video_status_description: Option<String>,
  pub author_name: Option<String>,
  pub author_url: Option<String>,
  pub provider_name: Option<String>,
  pub provider_url: Option<String>,
  pub thumbnail_url: Option<String>,
  pub thumbnail_width: Option<u32>,
  pub thumbnail_height: Option<u32>,
  pub framegrab_url: Option<String>,
  pub framegrab_width: Option<u32>,
  pub framegrab_height: Option<u32>,
  /// Not part of the response; filled in from the requested id.
  #[serde(skip)]
  pub poster: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Video {
  pub id: u64,
  pub title: String,
  pub status: Option<String>,
  pub status_id: Option<u32>,
  pub duration: Option<f64>,
  pub width: Option<u32>,
  pub height: Option<u32>,
  pub play_count: Option<u64>,
  pub version: Option<String>,
  pub thumbnail: Option<String>,
  pub url: Option<String>,
  pub user: VideoAuthor,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VideoAuthor {
  pub author_name: String,
  pub author_account: u32,
  pub author_url: String,
  pub video_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VideoListSorting {
  Ascending,
  #[default]
  Descending,
}

/// Filters for a user's video list.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoListQuery {
  pub count: u32,
  pub labels: Vec<String>,
  pub status: String,
  pub sort: VideoListSorting,
  pub title: String,
}

impl Default for VideoListQuery {
  fn default() -> Self {
    Self {
      count: DEFAULT_VIDEO_COUNT,
      labels: Vec::new(),
      status: String::new(),
      sort: VideoListSorting::default(),
      title: String::new(),
    }
  }
}

impl VideoListQuery {
  pub(crate) fn pairs(&self) -> Vec<(&'static str, String)> {
    let mut pairs = vec![("count", self.count.to_string())];
    if !self.labels.is_empty() {
      pairs.push(("labels", self.labels.join(",")));
    }
    if !self.status.is_empty() {
      pairs.push(("status", self.status.clone()));
    }
    let sort = match self.sort {
      VideoListSorting::Ascending => "asc",
      VideoListSorting::Descending => "desc",
    };
    pairs.push(("sort", sort.to_owned()));
    if !self.title.is_empty() {
      pairs.push(("title", self.title.clone()));
    }
    pairs
  }
}

/// Per-call toggles for the upload signature request. They only shape the
/// URL of that one call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignatureOptions {
  pub flash_request: bool,
  pub redirect_url: Option<String>,
}

impl SignatureOptions {
  pub(crate) fn pairs(&self) -> Vec<(&'static str, String)> {
    let mut pairs = Vec::new();
    if self.flash_request {
      pairs.push(("flash_request", "true".to_owned()));
    }
    if let Some(url) = self.redirect_url.as_ref().filter(|u| !u.is_empty()) {
      pairs.push(("success_action_redirect", url.clone()));
    }
    pairs
  }
}

/// Encoding profile requested when processing an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VideoProfile {
  Small,
  #[default]
  Medium,
  Large,
  HighDefinition,
  Original,
}

impl VideoProfile {
  pub fn id(&self) -> u8 {
    match self {
      VideoProfile::Small => 1,
      VideoProfile::Medium => 2,
      VideoProfile::Large => 3,
      VideoProfile::HighDefinition => 4,
      VideoProfile::Original => 5,
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessVideoQuery {
  /// Upload guid returned by the signature call.
  pub guid: String,
  pub title: String,
  pub description: String,
  pub profile: VideoProfile,
  pub transcoding: bool,
  /// Id of an existing video to replace; empty for a new video.
  pub replace_id: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditVideoQuery {
  pub title: String,
  pub description: String,
  pub private: bool,
  pub seo_url: String,
}
