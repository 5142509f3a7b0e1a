//! Parsing and rendering of the `PostResponse` body.

use std::io;
use std::sync::LazyLock;

use quick_xml::Writer;
use quick_xml::escape::partial_escape;
use quick_xml::events::{BytesDecl, BytesText, Event};
use regex::Regex;

static KEY_RE: LazyLock<Regex> = LazyLock::new(|| compile(r"<Key>(.*)</Key>"));
static ETAG_RE: LazyLock<Regex> = LazyLock::new(|| compile(r#"<ETag>"?([^"]*)"?</ETag>"#));
static BUCKET_RE: LazyLock<Regex> = LazyLock::new(|| compile(r"<Bucket>(.*)</Bucket>"));
static LOCATION_RE: LazyLock<Regex> = LazyLock::new(|| compile(r"<Location>(.*)</Location>"));

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("PostResponse patterns are valid")
}

/// The four fields read from a POST upload response.
///
/// A field is `None` when its element does not appear in the text.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PostResponse {
    /// The object key as stored.
    pub key: Option<String>,
    /// The entity tag, without surrounding quotes.
    pub etag: Option<String>,
    /// The bucket the object was stored in.
    pub bucket: Option<String>,
    /// The URL of the stored object.
    pub location: Option<String>,
}

impl PostResponse {
    /// Extract the four fields from a response body.
    ///
    /// Values are returned exactly as they appear between the tags; entities
    /// are not decoded.
    ///
    /// # Examples
    ///
    /// ```
    /// use s3post_xml::PostResponse;
    ///
    /// let parsed = PostResponse::parse("<PostResponse><Key>a.txt</Key><ETag>\"abc\"</ETag></PostResponse>");
    /// assert_eq!(parsed.key.as_deref(), Some("a.txt"));
    /// assert_eq!(parsed.etag.as_deref(), Some("abc"));
    /// assert_eq!(parsed.bucket, None);
    /// ```
    #[must_use]
    pub fn parse(text: &str) -> Self {
        Self {
            key: capture(&KEY_RE, text),
            etag: capture(&ETAG_RE, text),
            bucket: capture(&BUCKET_RE, text),
            location: capture(&LOCATION_RE, text),
        }
    }

    /// Parse an optional response body; no text means no parsed body.
    #[must_use]
    pub fn parse_body(text: Option<&str>) -> Option<Self> {
        text.map(Self::parse)
    }

    /// Render this response as S3 does, with a quoted ETag.
    ///
    /// Missing fields are omitted.
    #[must_use]
    pub fn to_xml(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(256);
        if let Err(e) = self.write_xml(&mut buf) {
            tracing::error!(error = %e, "failed to serialize PostResponse XML");
            buf.clear();
        }
        buf
    }

    fn write_xml(&self, buf: &mut Vec<u8>) -> io::Result<()> {
        let mut writer = Writer::new(buf);

        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

        let etag = self.etag.as_ref().map(|etag| format!("\"{etag}\""));
        let elements = [
            ("Location", self.location.as_deref()),
            ("Bucket", self.bucket.as_deref()),
            ("Key", self.key.as_deref()),
            ("ETag", etag.as_deref()),
        ];

        writer
            .create_element("PostResponse")
            .write_inner_content(|w| {
                for (name, value) in elements {
                    if let Some(value) = value {
                        w.create_element(name)
                            .write_text_content(BytesText::from_escaped(partial_escape(value)))?;
                    }
                }
                Ok(())
            })?;

        Ok(())
    }
}

/// Format an S3 `<Error>` body.
///
/// ```xml
/// <?xml version="1.0" encoding="UTF-8"?>
/// <Error>
///   <Code>AccessDenied</Code>
///   <Message>Invalid according to Policy: Policy expired.</Message>
/// </Error>
/// ```
#[must_use]
pub fn error_to_xml(code: &str, message: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(256);
    if let Err(e) = write_error_xml(&mut buf, code, message) {
        tracing::error!(error = %e, "failed to serialize S3 error XML");
        buf.clear();
    }
    buf
}

fn write_error_xml(buf: &mut Vec<u8>, code: &str, message: &str) -> io::Result<()> {
    let mut writer = Writer::new(buf);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    writer.create_element("Error").write_inner_content(|w| {
        w.create_element("Code")
            .write_text_content(BytesText::new(code))?;
        w.create_element("Message")
            .write_text_content(BytesText::new(message))?;
        Ok(())
    })?;

    Ok(())
}

fn capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_owned())
}
