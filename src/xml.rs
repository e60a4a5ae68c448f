//! `<vzaar-api>` request documents and the handful of XML responses the
//! client reads back. Payload bytes are fixed by the server: element names,
//! order and nesting must stay exactly as written here.

use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::consts::{VIDEO_STATUS_DELETED, XML_METHOD_OVERRIDE, XML_ROOT};
use crate::types::{EditVideoQuery, ProcessVideoQuery};
use crate::{Error, Result};

struct Document {
  buf: String,
}

impl Document {
  fn new() -> Self {
    let mut buf = String::with_capacity(256);
    buf.push('<');
    buf.push_str(XML_ROOT);
    buf.push('>');
    Self { buf }
  }

  fn open(&mut self, name: &str) -> &mut Self {
    self.buf.push('<');
    self.buf.push_str(name);
    self.buf.push('>');
    self
  }

  fn close(&mut self, name: &str) -> &mut Self {
    self.buf.push_str("</");
    self.buf.push_str(name);
    self.buf.push('>');
    self
  }

  fn element(&mut self, name: &str, text: &str) -> &mut Self {
    self.open(name);
    self.buf.push_str(&escape(text));
    self.close(name)
  }

  fn finish(mut self) -> String {
    self.close(XML_ROOT);
    self.buf
  }
}

pub(crate) fn process_video_body(q: &ProcessVideoQuery) -> String {
  let mut doc = Document::new();
  doc
    .open("video")
    .element("guid", &q.guid)
    .element("title", &q.title)
    .element("description", &q.description)
    .element("profile", &q.profile.id().to_string());
  if q.transcoding {
    doc.element("transcoding", "true");
  }
  if !q.replace_id.is_empty() {
    doc.element("replace_id", &q.replace_id);
  }
  doc.close("video");
  doc.finish()
}

pub(crate) fn edit_video_body(q: &EditVideoQuery) -> String {
  let mut doc = Document::new();
  doc
    .element(XML_METHOD_OVERRIDE, "put")
    .open("video")
    .element("title", &q.title)
    .element("description", &q.description)
    .element("private", if q.private { "true" } else { "false" });
  if !q.seo_url.is_empty() {
    doc.element("seo_url", &q.seo_url);
  }
  doc.close("video");
  doc.finish()
}

pub(crate) fn delete_body() -> String {
  let mut doc = Document::new();
  doc.element(XML_METHOD_OVERRIDE, "delete");
  doc.finish()
}

/// Every `(element, text)` pair of the document's leaf elements, in document
/// order. Empty elements are skipped.
pub(crate) fn leaves(xml: &str) -> Result<Vec<(String, String)>> {
  let mut reader = Reader::from_str(xml);
  reader.config_mut().trim_text_start = true;
  reader.config_mut().trim_text_end = true;

  let mut out = Vec::new();
  let mut current_text = String::new();

  loop {
    match reader.read_event()? {
      Event::Start(_) => current_text.clear(),
      Event::Text(e) => {
        let text = e.unescape().map_err(|e| Error::Decode(e.to_string()))?;
        current_text.push_str(&text);
      }
      Event::CData(e) => current_text.push_str(&String::from_utf8_lossy(&e.into_inner())),
      Event::End(e) => {
        if !current_text.is_empty() {
          let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
          out.push((name, std::mem::take(&mut current_text)));
        }
      }
      Event::Eof => break,
      _ => {}
    }
  }

  Ok(out)
}

pub(crate) fn leaf<'a>(leaves: &'a [(String, String)], name: &str) -> Option<&'a str> {
  leaves
    .iter()
    .find(|(k, _)| k == name)
    .map(|(_, v)| v.as_str())
}

/// Whether a delete confirmation reports the video as deleted.
pub(crate) fn parse_deleted(xml: &str) -> Result<bool> {
  let leaves = leaves(xml)?;
  let status = leaf(&leaves, "video_status_id")
    .ok_or_else(|| Error::Decode("video_status_id missing from response".to_owned()))?;
  let status: u32 = status
    .parse()
    .map_err(|_| Error::Decode(format!("video_status_id {:?} is not a number", status)))?;
  Ok(status == VIDEO_STATUS_DELETED)
}

/// The id assigned to a freshly processed video.
pub(crate) fn parse_video_id(xml: &str) -> Result<u64> {
  let leaves = leaves(xml)?;
  let id = leaf(&leaves, "video")
    .or_else(|| leaf(&leaves, "id"))
    .ok_or_else(|| Error::Decode("video id missing from response".to_owned()))?;
  id.parse()
    .map_err(|_| Error::Decode(format!("video id {:?} is not a number", id)))
}
