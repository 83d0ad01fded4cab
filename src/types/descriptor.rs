// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Request and response descriptors.
//!
//! These are the transport-neutral shapes the engine persists. The HTTP
//! adapter converts to and from them; the program only ever sees these.

use alloc::string::String;
use alloc::vec::Vec;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

impl Header {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// An incoming request as recorded in the event log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestDescriptor {
    pub method: String,
    /// Path plus optional query, e.g. `/kv/a?x=1`.
    pub uri: String,
    /// Lower-cased names, sorted by (name, value).
    pub headers: Vec<Header>,
    pub body: Vec<u8>,
}

impl RequestDescriptor {
    pub fn new(method: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            uri: uri.into(),
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Adds a header and keeps the list in canonical order.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push(Header::new(name.to_ascii_lowercase(), value));
        self.headers.sort();
        self
    }

    /// The uri without its query string.
    pub fn path(&self) -> &str {
        match self.uri.find('?') {
            Some(idx) => &self.uri[..idx],
            None => &self.uri,
        }
    }

    pub fn query(&self) -> Option<&str> {
        self.uri.find('?').map(|idx| &self.uri[idx + 1..])
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }
}

/// The program's answer to a request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseDescriptor {
    pub status: u16,
    pub headers: Vec<Header>,
    pub body: Vec<u8>,
}

impl ResponseDescriptor {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// `200` with a `text/plain` body.
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self::text(200, body)
    }

    pub fn text(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self::new(status)
            .with_header("content-type", "text/plain; charset=utf-8")
            .with_body(body)
    }

    pub fn not_found() -> Self {
        Self::text(404, "not found")
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push(Header::new(name.to_ascii_lowercase(), value));
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_and_query_split() {
        let req = RequestDescriptor::new("GET", "/kv/a?verbose=1");
        assert_eq!(req.path(), "/kv/a");
        assert_eq!(req.query(), Some("verbose=1"));

        let plain = RequestDescriptor::new("GET", "/kv/a");
        assert_eq!(plain.path(), "/kv/a");
        assert_eq!(plain.query(), None);
    }

    #[test]
    fn test_headers_are_canonical() {
        let a = RequestDescriptor::new("POST", "/")
            .with_header("X-B", "2")
            .with_header("X-A", "1");
        let b = RequestDescriptor::new("POST", "/")
            .with_header("x-a", "1")
            .with_header("x-b", "2");
        assert_eq!(a, b);
        assert_eq!(a.header("X-A"), Some("1"));
    }
}
