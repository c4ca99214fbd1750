//! Response classifier — decides VALID/INVALID from status and body text.
//!
//! Vendors answer a bad key in many shapes: JSON with a numeric status,
//! JSONP-wrapped JSON, XML, or a localized message. Rather than parse each
//! shape, the body is scanned as raw text for known rejection markers.
//!
//! Known limitation: the heuristic is plain substring presence, and the
//! default list includes ordinary words such as `error`. A valid response
//! that happens to contain one (a POI named "error", an address field) is
//! classified INVALID. The list is kept as-is for breadth of vendor coverage.

/// Rejection markers observed in AMap, Baidu and Tencent responses.
pub const DEFAULT_ERROR_MARKERS: &[&str] = &[
    "key格式错误",
    "INVALID_KEY",
    "密钥错误",
    "authentication error",
    "invalid key",
    "AK有误",
    "key error",
    "INVALID_REQUEST",
    "REQUEST_DENIED",
    "ERROR",
    "error",
    "密钥无效",
    "key 错误",
    "INVALID_USER_KEY",
    "infocode\":\"10001\"",
    "status\":\"0\"",
];

pub fn default_markers() -> Vec<String> {
    DEFAULT_ERROR_MARKERS.iter().map(|m| m.to_string()).collect()
}

/// Substring-marker classifier. Matching is case-sensitive.
#[derive(Debug, Clone)]
pub struct Classifier {
    markers: Vec<String>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(default_markers())
    }
}

impl Classifier {
    pub fn new(markers: Vec<String>) -> Self {
        let markers = markers.into_iter().filter(|m| !m.is_empty()).collect();
        Self { markers }
    }

    pub fn markers(&self) -> &[String] {
        &self.markers
    }

    /// `true` only for HTTP 200 with no marker anywhere in the body.
    pub fn classify(&self, http_status: u16, body: &str) -> bool {
        http_status == 200 && self.matched_marker(body).is_none()
    }

    /// First marker (in list order) contained in `body`.
    pub fn matched_marker(&self, body: &str) -> Option<&str> {
        self.markers
            .iter()
            .find(|m| body.contains(m.as_str()))
            .map(String::as_str)
    }
}
