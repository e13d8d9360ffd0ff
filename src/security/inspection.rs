//! Defensive input inspection.
//!
//! Flags requests whose path, query or identity-bearing headers carry
//! injection or traversal patterns. Such requests are rejected with 400 and
//! logged as suspicious activity.

use axum::http::Request;

/// Headers whose values are inspected.
const INSPECTED_HEADERS: [&str; 5] = ["user-agent", "referer", "x-forwarded-for", "x-real-ip", "forwarded"];

/// Why a request was judged malformed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finding {
    /// A configured pattern matched in `location`.
    Pattern { location: String, pattern: String },
    /// A header value is not visible ASCII.
    OpaqueHeader { name: &'static str },
}

impl std::fmt::Display for Finding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Finding::Pattern { location, pattern } => write!(f, "pattern '{}' in {}", pattern, location),
            Finding::OpaqueHeader { name } => write!(f, "non-text value in header {}", name),
        }
    }
}

/// Case-insensitive pattern scanner.
#[derive(Debug, Clone)]
pub struct Inspector {
    patterns: Vec<String>,
}

impl Inspector {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            patterns: patterns
                .into_iter()
                .map(|p| p.as_ref().trim().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    /// Return the first suspicious finding, if any.
    pub fn inspect<B>(&self, req: &Request<B>) -> Option<Finding> {
        let target = req
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or_else(|| req.uri().path());
        if let Some(pattern) = self.matching(target) {
            return Some(Finding::Pattern {
                location: "path".to_string(),
                pattern,
            });
        }

        for name in INSPECTED_HEADERS {
            for value in req.headers().get_all(name) {
                let Ok(text) = value.to_str() else {
                    return Some(Finding::OpaqueHeader { name });
                };
                if let Some(pattern) = self.matching(text) {
                    return Some(Finding::Pattern {
                        location: format!("header {}", name),
                        pattern,
                    });
                }
            }
        }
        None
    }

    fn matching(&self, text: &str) -> Option<String> {
        if self.patterns.is_empty() {
            return None;
        }
        let text = text.to_lowercase();
        self.patterns.iter().find(|p| text.contains(p.as_str())).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::HeaderValue;

    fn inspector() -> Inspector {
        Inspector::new(["<script", "../", "%00", "union select"])
    }

    #[test]
    fn test_clean_request_passes() {
        let req = Request::builder()
            .uri("/api/products?page=2")
            .header("user-agent", "Mozilla/5.0")
            .header("x-forwarded-for", "203.0.113.7")
            .body(Body::empty())
            .unwrap();
        assert_eq!(inspector().inspect(&req), None);
    }

    #[test]
    fn test_traversal_in_path() {
        let req = Request::builder().uri("/static/../etc/passwd").body(Body::empty()).unwrap();
        let finding = inspector().inspect(&req).unwrap();
        assert_eq!(
            finding,
            Finding::Pattern {
                location: "path".to_string(),
                pattern: "../".to_string()
            }
        );
    }

    #[test]
    fn test_query_is_case_insensitive() {
        let req = Request::builder()
            .uri("/api/orders?id=1%20UNION%20SELECT")
            .body(Body::empty())
            .unwrap();
        // Encoded spaces do not match; the raw form does
        assert_eq!(inspector().inspect(&req), None);

        let req = Request::builder()
            .uri("/api/orders?name=%3CScRiPt")
            .header("referer", "https://x/<SCRIPT>alert(1)")
            .body(Body::empty())
            .unwrap();
        let finding = inspector().inspect(&req).unwrap();
        assert!(finding.to_string().contains("header referer"));
    }

    #[test]
    fn test_forwarded_header_injection() {
        let req = Request::builder()
            .uri("/")
            .header("x-forwarded-for", "1.2.3.4%00")
            .body(Body::empty())
            .unwrap();
        assert!(inspector().inspect(&req).is_some());
    }

    #[test]
    fn test_opaque_header_value() {
        let mut req = Request::builder().uri("/").body(Body::empty()).unwrap();
        req.headers_mut()
            .insert("user-agent", HeaderValue::from_bytes(b"agent\xff").unwrap());
        assert_eq!(
            inspector().inspect(&req),
            Some(Finding::OpaqueHeader { name: "user-agent" })
        );
    }

    #[test]
    fn test_no_patterns_only_checks_encoding() {
        let req = Request::builder().uri("/a/../b").body(Body::empty()).unwrap();
        assert_eq!(Inspector::new(Vec::<String>::new()).inspect(&req), None);
    }
}
