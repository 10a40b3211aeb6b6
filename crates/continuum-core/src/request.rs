//! Request model for remote JSON calls
//!
//! An [`ApiRequest`] is a plain value: base URL, path, query and headers.
//! Query and headers live in sorted maps so equal requests always
//! serialize to the same URL and header set.

use std::collections::BTreeMap;
use std::fmt;

/// Query parameter value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryValue {
    Text(String),
    Number(i64),
}

impl fmt::Display for QueryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryValue::Text(text) => f.write_str(text),
            QueryValue::Number(number) => write!(f, "{}", number),
        }
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        QueryValue::Text(value.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        QueryValue::Text(value)
    }
}

impl From<i64> for QueryValue {
    fn from(value: i64) -> Self {
        QueryValue::Number(value)
    }
}

impl From<u32> for QueryValue {
    fn from(value: u32) -> Self {
        QueryValue::Number(i64::from(value))
    }
}

/// Description of one remote call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    base_url: String,
    path: String,
    query: BTreeMap<String, QueryValue>,
    headers: BTreeMap<String, String>,
}

impl ApiRequest {
    /// Create a request for `path` relative to `base_url`
    ///
    /// # Example
    /// ```
    /// use continuum_core::ApiRequest;
    /// let request = ApiRequest::new("https://api.vimeo.com/", "/videos/42");
    /// assert_eq!(request.url(), "https://api.vimeo.com/videos/42");
    /// ```
    pub fn new(base_url: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            path: path.into(),
            query: BTreeMap::new(),
            headers: BTreeMap::new(),
        }
    }

    /// Add or replace a query parameter
    pub fn query(mut self, key: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// Add or replace a header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query_value(&self, key: &str) -> Option<&QueryValue> {
        self.query.get(key)
    }

    /// Headers in sorted name order
    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Full request URL
    ///
    /// Base and path are joined with exactly one `/`. Query keys and values
    /// are percent-encoded and emitted in key order.
    ///
    /// # Example
    /// ```
    /// use continuum_core::ApiRequest;
    /// let request = ApiRequest::new("https://api.vimeo.com", "channels/staffpicks/videos")
    ///     .query("per_page", 10u32)
    ///     .query("page", 2u32);
    /// assert_eq!(
    ///     request.url(),
    ///     "https://api.vimeo.com/channels/staffpicks/videos?page=2&per_page=10"
    /// );
    /// ```
    pub fn url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        let path = self.path.trim_start_matches('/');
        let mut url = format!("{}/{}", base, path);

        if !self.query.is_empty() {
            let encoded: Vec<String> = self
                .query
                .iter()
                .map(|(key, value)| {
                    format!(
                        "{}={}",
                        urlencoding::encode(key),
                        urlencoding::encode(&value.to_string())
                    )
                })
                .collect();
            url.push('?');
            url.push_str(&encoded.join("&"));
        }

        url
    }

    /// Build the wire request on a reqwest client
    pub fn to_reqwest(&self, client: &reqwest::Client) -> reqwest::RequestBuilder {
        self.headers()
            .fold(client.get(self.url()), |builder, (name, value)| {
                builder.header(name, value)
            })
    }
}
