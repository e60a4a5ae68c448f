//! vzaar API client, synchronously.
//!
//! Requests to the API are OAuth 1.0 signed with the account's login and API
//! token. Uploads skip the API: a signed storage policy is fetched first and
//! the file is posted straight to storage as `multipart/form-data`.

mod client;
mod configs;
mod error;
mod xml;

pub mod consts;
pub mod multipart;
pub mod request;
pub mod sign;
pub mod transport;
pub mod types;
pub mod upload;

#[cfg(test)]
mod testing;

pub use client::Client;
pub use configs::{Configuration, Credentials};
pub use error::{Error, Result};
pub use multipart::{FilePart, MultipartForm, MultipartUploader};
pub use request::{RequestExecutor, Verb};
pub use sign::{SignatureMethod, Signer};
pub use transport::{Body, CallOptions, CancelToken, HttpTransport, RawResponse, Transport};
pub use types::*;
pub use upload::{UploadAttempt, UploadPolicy, UploadReceipt, UploadState};
