//! Hand-built `multipart/form-data` bodies for direct-to-storage uploads.
//!
//! The whole length is computed before the first byte goes out: storage
//! endpoints truncate or reject a body whose `Content-Length` is off by one.
//! Fields are written in the order they were added; the policy signature is
//! checked against that order.

use http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use http::Request;
use rand::Rng;
use std::fs::File;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::consts::{FIELD_FILE, OCTET_STREAM};
use crate::transport::{Body, CallOptions, RawResponse, Transport};
use crate::{Error, Result};

const CRLF: &str = "\r\n";

#[derive(Debug, Clone, PartialEq)]
pub struct FilePart {
  pub field_name: String,
  pub file_name: String,
  pub content_type: String,
  pub path: PathBuf,
}

impl FilePart {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    let path = path.into();
    let file_name = path
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .unwrap_or_default();

    Self {
      field_name: FIELD_FILE.to_owned(),
      file_name,
      content_type: OCTET_STREAM.to_owned(),
      path,
    }
  }

  pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
    self.file_name = file_name.into();
    self
  }

  pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
    self.content_type = content_type.into();
    self
  }
}

#[derive(Debug, Clone)]
pub struct MultipartForm {
  boundary: String,
  fields: Vec<(String, String)>,
  file: FilePart,
}

impl MultipartForm {
  pub fn new(file: FilePart) -> Self {
    Self {
      boundary: new_boundary(),
      fields: Vec::new(),
      file,
    }
  }

  pub fn with_boundary(mut self, boundary: impl Into<String>) -> Self {
    self.boundary = boundary.into();
    self
  }

  pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
    self.fields.push((name.into(), value.into()));
    self
  }

  pub fn boundary(&self) -> &str {
    &self.boundary
  }

  pub fn fields(&self) -> &[(String, String)] {
    &self.fields
  }

  pub fn file(&self) -> &FilePart {
    &self.file
  }

  pub fn content_type(&self) -> String {
    format!("multipart/form-data; boundary={}", self.boundary)
  }

  pub fn encode(&self, file_len: u64) -> EncodedForm {
    encode(&self.fields, &self.file, &self.boundary, file_len)
  }

  /// Opens the file and returns the streamed body with its exact length.
  /// Fails with [`Error::FileAccess`] when the file cannot be read.
  pub fn into_body(self) -> Result<Body> {
    let source = FileSource::open(&self.file.path)?;
    Ok(self.into_body_from(source))
  }

  pub fn into_body_from(self, source: FileSource) -> Body {
    let encoded = self.encode(source.len);
    let length = encoded.content_length;

    let reader = Cursor::new(encoded.head)
      .chain(ExactReader {
        inner: source.file,
        remaining: source.len,
      })
      .chain(Cursor::new(encoded.tail));

    Body::Stream {
      reader: Box::new(reader),
      length,
    }
  }
}

/// Everything around the file bytes, plus the total length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedForm {
  /// Field parts followed by the file part's header.
  pub head: Vec<u8>,
  /// Closing boundary.
  pub tail: Vec<u8>,
  pub content_length: u64,
}

pub fn encode(
  fields: &[(String, String)],
  file: &FilePart,
  boundary: &str,
  file_len: u64,
) -> EncodedForm {
  let mut head = String::with_capacity(128 * (fields.len() + 1));

  for (name, value) in fields {
    head.push_str("--");
    head.push_str(boundary);
    head.push_str(CRLF);
    head.push_str(&format!(
      "Content-Disposition: form-data; name=\"{}\"",
      quote(name)
    ));
    head.push_str(CRLF);
    head.push_str(CRLF);
    head.push_str(value);
    head.push_str(CRLF);
  }

  head.push_str("--");
  head.push_str(boundary);
  head.push_str(CRLF);
  head.push_str(&format!(
    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"",
    quote(&file.field_name),
    quote(&file.file_name)
  ));
  head.push_str(CRLF);
  head.push_str(&format!("Content-Type: {}", file.content_type));
  head.push_str(CRLF);
  head.push_str(CRLF);

  let tail = format!("{}--{}--{}", CRLF, boundary, CRLF);

  let content_length = head.len() as u64 + file_len + tail.len() as u64;
  debug!(
    fields = fields.len(),
    head = head.len(),
    file = file_len,
    tail = tail.len(),
    content_length,
    "encoded multipart form"
  );

  EncodedForm {
    head: head.into_bytes(),
    tail: tail.into_bytes(),
    content_length,
  }
}

fn quote(s: &str) -> String {
  s.replace('"', "%22").replace('\r', "%0D").replace('\n', "%0A")
}

fn new_boundary() -> String {
  let token: u128 = rand::thread_rng().gen();
  format!("------------------------{:032x}", token)
}

/// An opened upload file and the length measured when it was opened. The
/// handle is closed when the body built from it is dropped.
#[derive(Debug)]
pub struct FileSource {
  file: File,
  len: u64,
}

impl FileSource {
  pub fn open(path: &Path) -> Result<Self> {
    let access = |source: io::Error| Error::FileAccess {
      path: path.to_owned(),
      source,
    };

    let file = File::open(path).map_err(access)?;
    let meta = file.metadata().map_err(access)?;
    if !meta.is_file() {
      return Err(access(io::Error::new(
        io::ErrorKind::InvalidInput,
        "not a regular file",
      )));
    }

    Ok(Self {
      file,
      len: meta.len(),
    })
  }

  pub fn len(&self) -> u64 {
    self.len
  }

  pub fn is_empty(&self) -> bool {
    self.len == 0
  }
}

/// Yields exactly `remaining` bytes; a source that ends early is an error
/// rather than a short body.
struct ExactReader<R> {
  inner: R,
  remaining: u64,
}

impl<R: Read> Read for ExactReader<R> {
  fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
    if self.remaining == 0 || buf.is_empty() {
      return Ok(0);
    }

    let max = buf.len().min(self.remaining.min(usize::MAX as u64) as usize);
    let n = self.inner.read(&mut buf[..max])?;
    if n == 0 {
      return Err(io::Error::new(
        io::ErrorKind::UnexpectedEof,
        format!("file ended {} bytes short", self.remaining),
      ));
    }

    self.remaining -= n as u64;
    Ok(n)
  }
}

/// Posts a form straight to a storage endpoint. The endpoint authenticates
/// through the form's policy fields, so nothing here is OAuth-signed.
pub struct MultipartUploader<'a, T> {
  transport: &'a T,
}

impl<'a, T: Transport> MultipartUploader<'a, T> {
  pub fn new(transport: &'a T) -> Self {
    Self { transport }
  }

  /// Single shot: no partial-content retry. Any 2xx is success; everything
  /// else is [`Error::Remote`].
  pub fn upload(&self, url: &str, form: MultipartForm, options: &CallOptions) -> Result<RawResponse> {
    let source = FileSource::open(&form.file().path)?;
    self.upload_from(url, form, source, options)
  }

  /// Like [`upload`](Self::upload) with a file the caller already opened.
  pub fn upload_from(
    &self,
    url: &str,
    form: MultipartForm,
    source: FileSource,
    options: &CallOptions,
  ) -> Result<RawResponse> {
    options.check_cancelled()?;
    let content_type = form.content_type();
    let empty_file = source.is_empty();
    let body = form.into_body_from(source);

    let request = Request::post(url)
      .header(CONTENT_TYPE, content_type)
      .header(CONTENT_LENGTH, body.len())
      .body(body)
      .map_err(|e| Error::configuration(format!("invalid upload URL {}: {}", url, e)))?;

    debug!(url, bytes = request.body().len(), empty_file, "uploading to storage");
    let response = self.transport.send(request, options)?;

    if !response.is_success() {
      warn!(url, status = response.status, "storage rejected upload");
      return Err(Error::Remote {
        status: response.status,
        body: response.body,
      });
    }

    Ok(response)
  }
}
