//! Outgoing HTTP response type.
//!
//! Build a [`Response`] in a resolver or a handler and return it. Everything
//! else (error pages, not-found, default serialization) is produced by the
//! dispatcher with the same type.

use bytes::Bytes;
use http::StatusCode;
use http_body_util::Full;
use tracing::error;

// ── ContentType ───────────────────────────────────────────────────────────────

/// Common content-type values for use with [`ResponseBuilder::bytes`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ContentType {
    Html,         // text/html; charset=utf-8
    Json,         // application/json
    OctetStream,  // application/octet-stream
    Text,         // text/plain; charset=utf-8
    Xml,          // application/xml
}

impl ContentType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Html        => "text/html; charset=utf-8",
            Self::Json        => "application/json",
            Self::OctetStream => "application/octet-stream",
            Self::Text        => "text/plain; charset=utf-8",
            Self::Xml         => "application/xml",
        }
    }
}

// ── Response ─────────────────────────────────────────────────────────────────

/// An outgoing HTTP response.
///
/// ```rust
/// use http::StatusCode;
/// use trellis::{ContentType, Response};
///
/// Response::json(br#"{"id":1}"#.to_vec());
/// Response::text("hello");
/// Response::status(StatusCode::NO_CONTENT);
///
/// Response::builder()
///     .status(StatusCode::CREATED)
///     .header("location", "/users/42")
///     .bytes(ContentType::Xml, b"<ok/>".to_vec());
/// ```
#[derive(Clone, Debug)]
pub struct Response {
    pub(crate) body: Vec<u8>,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) status: StatusCode,
}

impl Response {
    /// `200 OK` with `application/json`.
    pub fn json(body: Vec<u8>) -> Self {
        Self::builder().bytes(ContentType::Json, body)
    }

    /// `200 OK` with `text/plain; charset=utf-8`.
    pub fn text(body: impl Into<String>) -> Self {
        Self::builder().text(body)
    }

    /// Response with no body.
    pub fn status(code: StatusCode) -> Self {
        Self { body: Vec::new(), headers: Vec::new(), status: code }
    }

    pub fn builder() -> ResponseBuilder {
        ResponseBuilder { headers: Vec::new(), status: StatusCode::OK }
    }

    /// The plain `404` sent when no route matches.
    pub fn not_found() -> Self {
        Self::builder()
            .status(StatusCode::NOT_FOUND)
            .header("x-content-type-options", "nosniff")
            .text("404 page not found\n")
    }

    /// Minimal HTML error page: status line, escaped message and, when
    /// `trace` is given, one `<div>` per call-stack line.
    pub fn error_page(code: StatusCode, message: &str, trace: Option<&str>) -> Self {
        let callers: String = trace
            .map(|t| {
                t.lines()
                    .filter(|l| !l.trim().is_empty())
                    .map(|l| format!("<div>{}</div>\n", escape_html(l.trim())))
                    .collect()
            })
            .unwrap_or_default();

        let html = format!(
            "<h1>{} {}</h1><h2>{}</h2><p>{}</p>\n",
            code.as_u16(),
            code.canonical_reason().unwrap_or(""),
            escape_html(message),
            callers,
        );

        Self::builder()
            .status(code)
            .header("x-content-type-options", "nosniff")
            .bytes(ContentType::Html, html.into_bytes())
    }

    pub fn status_code(&self) -> StatusCode {
        self.status
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Converts into the hyper response type.
    ///
    /// A header that is not a valid HTTP header turns the whole response into
    /// a bare `500`; the handler's bytes are never sent with half its headers.
    pub fn into_inner(self) -> http::Response<Full<Bytes>> {
        let mut builder = http::Response::builder().status(self.status);
        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        match builder.body(Full::new(Bytes::from(self.body))) {
            Ok(res) => res,
            Err(e) => {
                error!("invalid response: {e}");
                let mut res = http::Response::new(Full::new(Bytes::new()));
                *res.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                res
            }
        }
    }
}

// ── ResponseBuilder ───────────────────────────────────────────────────────────

/// Fluent builder for [`Response`].
///
/// Obtain via [`Response::builder()`]. Defaults to `200 OK`. Terminated by a
/// typed body method.
pub struct ResponseBuilder {
    headers: Vec<(String, String)>,
    status: StatusCode,
}

impl ResponseBuilder {
    pub fn status(mut self, code: StatusCode) -> Self {
        self.status = code;
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    pub fn json(self, body: Vec<u8>) -> Response {
        self.bytes(ContentType::Json, body)
    }

    pub fn text(self, body: impl Into<String>) -> Response {
        self.bytes(ContentType::Text, body.into().into_bytes())
    }

    pub fn bytes(self, content_type: ContentType, body: Vec<u8>) -> Response {
        let mut headers = vec![("content-type".to_owned(), content_type.as_str().to_owned())];
        headers.extend(self.headers);
        Response { body, headers, status: self.status }
    }

    pub fn no_body(self) -> Response {
        Response { body: Vec::new(), headers: self.headers, status: self.status }
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_page_escapes_the_message() {
        let res = Response::error_page(StatusCode::INTERNAL_SERVER_ERROR, "<script>", None);
        let body = String::from_utf8(res.body).unwrap();
        assert_eq!(body, "<h1>500 Internal Server Error</h1><h2>&lt;script&gt;</h2><p></p>\n");
        assert_eq!(res.headers[0].1, "text/html; charset=utf-8");
    }

    #[test]
    fn error_page_lists_trace_lines() {
        let res = Response::error_page(StatusCode::BAD_GATEWAY, "x", Some("a.rs:1\n\n b.rs:2"));
        let body = String::from_utf8(res.body).unwrap();
        assert!(body.contains("<div>a.rs:1</div>\n<div>b.rs:2</div>"));
    }

    #[test]
    fn invalid_header_becomes_500() {
        let res = Response::builder().header("bad header", "v").no_body().into_inner();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
