//! Per-request context.
//!
//! Created by the dispatcher after a route matched and dropped when the
//! request ends. Interceptors get it by `&mut` and may stash typed values in
//! its property bag for the handler; the handler then takes it by value.

use std::collections::HashMap;

use bytes::Bytes;
use http::request::Parts;
use http::{Extensions, HeaderMap, Method, Uri};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::info;

use crate::error::Error;
use crate::session::SessionHandle;
use crate::tree::Params;

/// Everything a handler knows about its request.
pub struct RequestContext {
    head: Parts,
    body: Bytes,
    params: Params,
    query: HashMap<String, Vec<String>>,
    properties: Extensions,
    session: Option<SessionHandle>,
}

impl RequestContext {
    pub(crate) fn new(
        req: http::Request<Bytes>,
        params: Params,
        session: Option<SessionHandle>,
    ) -> Self {
        let (head, body) = req.into_parts();
        let query = head.uri.query().map(parse_query).unwrap_or_default();
        Self {
            head,
            body,
            params,
            query,
            properties: Extensions::new(),
            session,
        }
    }

    pub fn method(&self) -> &Method {
        &self.head.method
    }

    pub fn uri(&self) -> &Uri {
        &self.head.uri
    }

    pub fn path(&self) -> &str {
        self.head.uri.path()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.head.headers
    }

    /// Header value as text. Non-UTF-8 values read as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.head.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// A captured path variable.
    ///
    /// For a route `/users/:id`, `ctx.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Every value given for a query key, in order.
    pub fn query(&self, key: &str) -> Option<&[String]> {
        self.query.get(key).map(Vec::as_slice)
    }

    pub fn query_first(&self, key: &str) -> Option<&str> {
        self.query(key).and_then(<[String]>::first).map(String::as_str)
    }

    pub fn query_map(&self) -> &HashMap<String, Vec<String>> {
        &self.query
    }

    /// Typed values left by interceptors.
    pub fn properties(&self) -> &Extensions {
        &self.properties
    }

    pub fn properties_mut(&mut self) -> &mut Extensions {
        &mut self.properties
    }

    /// The request's session, if a session source is configured.
    pub fn session(&self) -> Option<&SessionHandle> {
        self.session.as_ref()
    }

    /// Decodes the body according to its `content-type`.
    ///
    /// `application/json` goes through serde_json.
    /// `application/x-www-form-urlencoded` is decoded into an object first: a
    /// key given once maps to a string, a repeated key to an array of strings.
    /// Any other content type is logged and yields `Ok(None)`.
    pub fn parse_body<T: DeserializeOwned>(&self) -> Result<Option<T>, Error> {
        let raw = self.header("content-type").unwrap_or_default();
        let content_type = raw.split(';').next().unwrap_or_default().trim();

        if content_type.eq_ignore_ascii_case("application/json") {
            return serde_json::from_slice(&self.body)
                .map(Some)
                .map_err(|e| Error::Body(e.to_string()));
        }

        if content_type.eq_ignore_ascii_case("application/x-www-form-urlencoded") {
            let form = form_object(&self.body);
            return serde_json::from_value(form)
                .map(Some)
                .map_err(|e| Error::Body(e.to_string()));
        }

        info!(content_type = raw, "content type not supported, body left unparsed");
        Ok(None)
    }
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("method", &self.head.method)
            .field("uri", &self.head.uri)
            .field("params", &self.params)
            .field("session", &self.session.is_some())
            .finish_non_exhaustive()
    }
}

fn parse_query(query: &str) -> HashMap<String, Vec<String>> {
    let mut out: HashMap<String, Vec<String>> = HashMap::new();
    for (k, v) in url::form_urlencoded::parse(query.as_bytes()) {
        out.entry(k.into_owned()).or_default().push(v.into_owned());
    }
    out
}

fn form_object(body: &[u8]) -> Value {
    let mut map = Map::new();
    for (k, v) in url::form_urlencoded::parse(body) {
        let v = Value::String(v.into_owned());
        match map.get_mut(&*k) {
            None => {
                map.insert(k.into_owned(), v);
            }
            Some(Value::Array(values)) => values.push(v),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, v]);
            }
        }
    }
    Value::Object(map)
}
