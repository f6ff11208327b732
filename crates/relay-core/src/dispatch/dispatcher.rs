use super::errors::PoolError;
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    hash::{Hash, Hasher},
    str::FromStr,
    sync::Arc,
};
use url::Url;

/// A bootstrap endpoint (`scheme://host:port`).
///
/// Identity is the canonical string form, so `https://node.example` and
/// `https://node.example:443/` are the same dispatcher.
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Dispatcher {
    url: Url,
    canonical: Arc<str>,
}

impl Dispatcher {
    /// Parses a dispatcher endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::InvalidAddress`] if the input is not an absolute
    /// `http`/`https` URL with a host.
    pub fn parse(input: &str) -> Result<Self, PoolError> {
        let invalid = |reason: &str| PoolError::InvalidAddress {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        let url = Url::parse(input).map_err(|e| invalid(&e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid("scheme must be http or https"));
        }
        let Some(host) = url.host_str() else {
            return Err(invalid("missing host"));
        };
        let Some(port) = url.port_or_known_default() else {
            return Err(invalid("missing port"));
        };

        let canonical: Arc<str> = format!("{}://{}:{}", url.scheme(), host, port).into();
        Ok(Self { url, canonical })
    }

    /// Returns the canonical `scheme://host:port` form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.canonical
    }

    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Returns `host:port`, ignoring the scheme.
    #[must_use]
    pub fn authority(&self) -> String {
        match (self.url.host_str(), self.url.port_or_known_default()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            _ => String::new(),
        }
    }

    /// Returns `true` if both endpoints address the same host and port.
    #[must_use]
    pub fn same_host(&self, other: &Dispatcher) -> bool {
        self.authority() == other.authority()
    }
}

impl PartialEq for Dispatcher {
    fn eq(&self, other: &Self) -> bool {
        self.canonical == other.canonical
    }
}

impl Eq for Dispatcher {}

impl Hash for Dispatcher {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical.hash(state);
    }
}

impl fmt::Display for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical)
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Dispatcher").field(&self.canonical).finish()
    }
}

impl FromStr for Dispatcher {
    type Err = PoolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Dispatcher {
    type Error = PoolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Dispatcher> for String {
    fn from(dispatcher: Dispatcher) -> Self {
        dispatcher.canonical.to_string()
    }
}
