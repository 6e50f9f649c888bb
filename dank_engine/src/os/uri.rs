use std::fmt;
use std::str::FromStr;
use crate::error::Error;

/// `protocol://host:port/path?query`
///
/// Missing parts are empty strings. Without a `://` separator there is no
/// protocol and the text up to the first `/` is taken as the host, so
/// `textures/a.png` parses as host `textures`, path `/a.png`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Uri {
    pub protocol: String,
    pub host: String,
    pub port: String,
    pub path: String,
    /// Query string without the leading `?`
    pub query: String,
}

impl Uri {
    pub fn parse(text: &str) -> Self {
        let mut uri = Uri::default();
        if text.is_empty() {
            return uri;
        }

        let (before_query, query) = match text.find('?') {
            Some(i) => (&text[..i], &text[i + 1..]),
            None => (text, ""),
        };
        uri.query = query.to_string();

        let rest = match before_query.find("://") {
            Some(i) => {
                uri.protocol = before_query[..i].to_string();
                &before_query[i + 3..]
            }
            None => before_query,
        };

        let (authority, path) = match rest.find('/') {
            Some(i) => (&rest[..i], &rest[i..]),
            None => (rest, ""),
        };
        uri.path = path.to_string();

        match authority.find(':') {
            Some(i) => {
                uri.host = authority[..i].to_string();
                uri.port = authority[i + 1..].to_string();
            }
            None => uri.host = authority.to_string(),
        }

        uri
    }

    pub fn with_path(protocol: &str, path: &str) -> Self {
        Self {
            protocol: protocol.to_string(),
            path: path.to_string(),
            ..Default::default()
        }
    }

    /// Host and path joined, as used by file-like loaders
    pub fn resource_path(&self) -> String {
        format!("{}{}", self.host, self.path)
    }

    pub fn is_empty(&self) -> bool {
        self.protocol.is_empty() && self.host.is_empty() && self.path.is_empty()
    }
}

impl FromStr for Uri {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let uri = Uri::parse(s);
        if uri.is_empty() {
            return Err(Error::InvalidUri(s.to_string()));
        }
        Ok(uri)
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.protocol.is_empty() {
            write!(f, "{}://", self.protocol)?;
        }
        write!(f, "{}", self.host)?;
        if !self.port.is_empty() {
            write!(f, ":{}", self.port)?;
        }
        write!(f, "{}", self.path)?;
        if !self.query.is_empty() {
            write!(f, "?{}", self.query)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "uri_tests.rs"]
mod tests;
