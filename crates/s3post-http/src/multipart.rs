//! `multipart/form-data` decoding for POST uploads.
//!
//! [`parse_multipart`] reads a form body back into text fields and a file
//! payload; local endpoints use it to check what a client actually sent.

use bytes::Bytes;

/// Errors raised while decoding a multipart body.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MultipartError {
    /// The content type is not `multipart/form-data`.
    #[error("POST requires Content-Type multipart/form-data, got: {0}")]
    NotMultipart(String),
    /// The content type has no usable boundary parameter.
    #[error("missing boundary in Content-Type")]
    MissingBoundary,
    /// No part carried the file.
    #[error("missing file field in multipart form data")]
    MissingFile,
}

/// A decoded POST form.
#[derive(Debug, Clone, Default)]
pub struct MultipartForm {
    /// Text fields in the order they were sent.
    pub fields: Vec<(String, String)>,
    /// File name given for the file part.
    pub file_name: Option<String>,
    /// Content type of the file part.
    pub file_content_type: Option<String>,
    /// File payload.
    pub file_data: Bytes,
}

impl MultipartForm {
    /// Look up a text field; names compare case-insensitively.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Extract the boundary from a `multipart/form-data; boundary=...` content type.
pub fn extract_boundary(content_type: &str) -> Result<String, MultipartError> {
    if !content_type
        .to_ascii_lowercase()
        .starts_with("multipart/form-data")
    {
        return Err(MultipartError::NotMultipart(content_type.to_owned()));
    }

    content_type
        .split(';')
        .filter_map(|part| part.trim().strip_prefix("boundary="))
        .map(|val| val.trim_matches('"'))
        .find(|val| !val.is_empty())
        .map(str::to_owned)
        .ok_or(MultipartError::MissingBoundary)
}

/// Decode a multipart body into text fields and the file payload.
///
/// A part named `file`, or any part with a `filename`, is the file.
pub fn parse_multipart(body: &[u8], boundary: &str) -> Result<MultipartForm, MultipartError> {
    let delimiter = format!("--{boundary}");
    let end_delimiter = format!("--{boundary}--");

    let mut form = MultipartForm::default();
    let mut file_data = None;

    for part in split_parts(body, delimiter.as_bytes(), end_delimiter.as_bytes()) {
        let Some((headers, part_body)) = split_headers_body(part) else {
            continue;
        };
        let headers = String::from_utf8_lossy(headers);
        let disposition = ContentDisposition::parse(&headers);
        let Some(name) = disposition.name else {
            continue;
        };

        if name == "file" || disposition.filename.is_some() {
            form.file_name = disposition.filename;
            form.file_content_type = header_value(&headers, "content-type");
            file_data = Some(Bytes::copy_from_slice(part_body));
        } else {
            form.fields
                .push((name, String::from_utf8_lossy(part_body).into_owned()));
        }
    }

    form.file_data = file_data.ok_or(MultipartError::MissingFile)?;
    Ok(form)
}

fn split_parts<'a>(body: &'a [u8], delimiter: &[u8], end_delimiter: &[u8]) -> Vec<&'a [u8]> {
    let mut parts = Vec::new();

    let Some(pos) = find_bytes(body, delimiter) else {
        return parts;
    };
    let mut remaining = skip_crlf(&body[pos + delimiter.len()..]);

    loop {
        if remaining.starts_with(end_delimiter)
            || remaining
                .strip_prefix(b"\r\n")
                .is_some_and(|r| r.starts_with(end_delimiter))
        {
            break;
        }

        match find_bytes(remaining, delimiter) {
            Some(pos) => {
                parts.push(strip_trailing_crlf(&remaining[..pos]));
                remaining = skip_crlf(&remaining[pos + delimiter.len()..]);
            }
            None => {
                let part = strip_trailing_crlf(remaining);
                if !part.is_empty() {
                    parts.push(part);
                }
                break;
            }
        }
    }

    parts
}

fn split_headers_body(part: &[u8]) -> Option<(&[u8], &[u8])> {
    let separator = b"\r\n\r\n";
    find_bytes(part, separator).map(|pos| (&part[..pos], &part[pos + separator.len()..]))
}

struct ContentDisposition {
    name: Option<String>,
    filename: Option<String>,
}

impl ContentDisposition {
    fn parse(headers: &str) -> Self {
        let line = headers
            .split("\r\n")
            .find(|line| line.to_ascii_lowercase().starts_with("content-disposition:"));
        Self {
            name: line.and_then(|l| quoted_param(l, "name")),
            filename: line.and_then(|l| quoted_param(l, "filename")),
        }
    }
}

fn header_value(headers: &str, name: &str) -> Option<String> {
    headers.split("\r\n").find_map(|line| {
        let (header, value) = line.split_once(':')?;
        header
            .trim()
            .eq_ignore_ascii_case(name)
            .then(|| value.trim().to_owned())
    })
}

/// Value of `param="value"` (or unquoted) on a header line.
fn quoted_param(line: &str, param: &str) -> Option<String> {
    line.split(';').skip(1).find_map(|segment| {
        let (key, value) = segment.split_once('=')?;
        if !key.trim().eq_ignore_ascii_case(param) {
            return None;
        }
        let value = value.trim();
        let value = value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .unwrap_or(value);
        Some(value.to_owned())
    })
}

fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn skip_crlf(data: &[u8]) -> &[u8] {
    data.strip_prefix(b"\r\n").unwrap_or(data)
}

fn strip_trailing_crlf(data: &[u8]) -> &[u8] {
    data.strip_suffix(b"\r\n").unwrap_or(data)
}
