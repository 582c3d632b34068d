//! Request description accepted by `Client::request`

use std::collections::HashMap;
use std::path::PathBuf;

use crate::{Error, Result};

/// A browser-kit style request
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: String,
    pub uri: String,
    pub parameters: Vec<(String, String)>,
    pub files: Vec<(String, PathBuf)>,
    pub server: HashMap<String, String>,
    pub content: Option<String>,
    pub change_history: bool,
}

impl Request {
    pub fn new<M: Into<String>, U: Into<String>>(method: M, uri: U) -> Self {
        Self {
            method: method.into(),
            uri: uri.into(),
            parameters: Vec::new(),
            files: Vec::new(),
            server: HashMap::new(),
            content: None,
            change_history: true,
        }
    }

    pub fn get<U: Into<String>>(uri: U) -> Self {
        Self::new("GET", uri)
    }

    pub fn parameter<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.parameters.push((key.into(), value.into()));
        self
    }

    pub fn file<K: Into<String>, P: Into<PathBuf>>(mut self, key: K, path: P) -> Self {
        self.files.push((key.into(), path.into()));
        self
    }

    pub fn server<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.server.insert(key.into(), value.into());
        self
    }

    pub fn content<S: Into<String>>(mut self, content: S) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn change_history(mut self, change: bool) -> Self {
        self.change_history = change;
        self
    }

    /// A browser can only replay a plain navigation
    pub(crate) fn ensure_navigable(&self) -> Result<()> {
        if !self.method.eq_ignore_ascii_case("GET") {
            return Err(Error::unsupported(format!(
                "Only GET requests are supported, got {}",
                self.method
            )));
        }
        if !self.parameters.is_empty() {
            return Err(Error::unsupported("Request parameters are not supported"));
        }
        if !self.files.is_empty() {
            return Err(Error::unsupported("File uploads through requests are not supported"));
        }
        if !self.server.is_empty() {
            return Err(Error::unsupported("Custom server parameters and headers are not supported"));
        }
        if self.content.is_some() {
            return Err(Error::unsupported("Request content is not supported"));
        }
        if !self.change_history {
            return Err(Error::unsupported("Requests must change the browser history"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_plain_get_is_navigable() {
        assert!(Request::get("/").ensure_navigable().is_ok());
        assert!(Request::new("get", "/").ensure_navigable().is_ok());

        let rejected = [
            Request::new("POST", "/"),
            Request::get("/").parameter("q", "rust"),
            Request::get("/").file("upload", "/tmp/a.txt"),
            Request::get("/").server("HTTP_ACCEPT", "text/html"),
            Request::get("/").content("{}"),
            Request::get("/").change_history(false),
        ];
        for request in rejected {
            assert!(request.ensure_navigable().unwrap_err().is_unsupported(), "{:?}", request);
        }
    }
}
