pub const DEFAULT_API_URL: &str = "https://vzaar.com";
pub const USER_AGENT: &str = concat!("vzaar-rs/", env!("CARGO_PKG_VERSION"));
pub const XML_CONTENT_TYPE: &str = "application/xml";

pub const OAUTH_VERSION: &str = "1.0";
pub const OAUTH_CONSUMER_KEY: &str = "oauth_consumer_key";
pub const OAUTH_NONCE: &str = "oauth_nonce";
pub const OAUTH_SIGNATURE: &str = "oauth_signature";
pub const OAUTH_SIGNATURE_METHOD: &str = "oauth_signature_method";
pub const OAUTH_TIMESTAMP: &str = "oauth_timestamp";
pub const OAUTH_TOKEN: &str = "oauth_token";
pub const OAUTH_VERSION_PARAM: &str = "oauth_version";

pub const XML_ROOT: &str = "vzaar-api";
pub const XML_METHOD_OVERRIDE: &str = "_method";

/// `video_status_id` reported for a video that has been removed.
pub const VIDEO_STATUS_DELETED: u32 = 6;

pub const DEFAULT_VIDEO_COUNT: u32 = 20;

pub const FIELD_KEY: &str = "key";
pub const FIELD_ACCESS_KEY_ID: &str = "AWSAccessKeyId";
pub const FIELD_ACL: &str = "acl";
pub const FIELD_POLICY: &str = "policy";
pub const FIELD_SIGNATURE: &str = "signature";
pub const FIELD_SUCCESS_ACTION_STATUS: &str = "success_action_status";
pub const FIELD_FILE: &str = "file";
pub const SUCCESS_ACTION_STATUS: &str = "201";
pub const OCTET_STREAM: &str = "application/octet-stream";
