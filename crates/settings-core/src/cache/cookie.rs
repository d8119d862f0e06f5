//! Request and response views of the cookie channel
//!
//! The HTTP stack stays outside this crate. It describes the inbound request
//! with a [`RequestContext`] and applies the returned [`CookieInstruction`] to
//! its response, typically as a `Set-Cookie` header.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

const COOKIE_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// What the cache needs to know about the inbound request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    main_request: bool,
    cookies: HashMap<String, String>,
}

impl RequestContext {
    /// A top-level request
    pub fn main() -> Self {
        Self {
            main_request: true,
            cookies: HashMap::new(),
        }
    }

    /// A request issued while handling another one (fragments, forwards)
    pub fn sub_request() -> Self {
        Self::default()
    }

    /// Top-level request carrying the cookies of a `Cookie` header
    pub fn from_cookie_header(header: &str) -> Self {
        let cookies = header
            .split(';')
            .filter_map(|pair| {
                let (name, value) = pair.split_once('=')?;
                let name = name.trim();
                if name.is_empty() {
                    return None;
                }
                Some((name.to_string(), value.trim().trim_matches('"').to_string()))
            })
            .collect();

        Self {
            main_request: true,
            cookies,
        }
    }

    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    pub fn is_main_request(&self) -> bool {
        self.main_request
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub fn has_cookie(&self, name: &str) -> bool {
        self.cookies.contains_key(name)
    }
}

/// A cookie to set on the response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCookie {
    pub name: String,
    pub value: String,
    pub expires: DateTime<Utc>,
    /// Lifetime in seconds
    pub max_age: u32,
    pub path: String,
    pub domain: Option<String>,
}

/// Cookie change to apply to the response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CookieInstruction {
    Set(SetCookie),
    /// Expire a cookie the client currently holds
    Clear {
        name: String,
        path: String,
        domain: Option<String>,
    },
}

impl CookieInstruction {
    pub fn name(&self) -> &str {
        match self {
            CookieInstruction::Set(cookie) => &cookie.name,
            CookieInstruction::Clear { name, .. } => name,
        }
    }

    /// Render as a `Set-Cookie` header value
    pub fn to_header_value(&self) -> String {
        let (mut header, path, domain) = match self {
            CookieInstruction::Set(cookie) => (
                format!(
                    "{}={}; Expires={}; Max-Age={}",
                    cookie.name,
                    cookie.value,
                    cookie.expires.format(COOKIE_DATE_FORMAT),
                    cookie.max_age
                ),
                &cookie.path,
                &cookie.domain,
            ),
            CookieInstruction::Clear { name, path, domain } => (
                format!("{}=; Expires=Thu, 01 Jan 1970 00:00:00 GMT; Max-Age=0", name),
                path,
                domain,
            ),
        };

        header.push_str("; Path=");
        header.push_str(path);
        if let Some(domain) = domain {
            header.push_str("; Domain=");
            header.push_str(domain);
        }
        header.push_str("; HttpOnly");
        header
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_cookie_header() {
        let request = RequestContext::from_cookie_header("stn=st1.local.abc; theme=\"dark\"; =skip; broken");
        assert!(request.is_main_request());
        assert_eq!(request.cookie("stn"), Some("st1.local.abc"));
        assert_eq!(request.cookie("theme"), Some("dark"));
        assert!(!request.has_cookie("broken"));
    }

    #[test]
    fn test_sub_request() {
        let request = RequestContext::sub_request().with_cookie("stn", "x");
        assert!(!request.is_main_request());
        assert!(request.has_cookie("stn"));
    }

    #[test]
    fn test_set_header() {
        let instruction = CookieInstruction::Set(SetCookie {
            name: "stn".to_string(),
            value: "st1.local.abc".to_string(),
            expires: Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap(),
            max_age: 86400,
            path: "/".to_string(),
            domain: Some("example.com".to_string()),
        });

        assert_eq!(instruction.name(), "stn");
        assert_eq!(
            instruction.to_header_value(),
            "stn=st1.local.abc; Expires=Sun, 18 Oct 2026 12:00:00 GMT; Max-Age=86400; Path=/; Domain=example.com; HttpOnly"
        );
    }

    #[test]
    fn test_clear_header() {
        let instruction = CookieInstruction::Clear {
            name: "stn".to_string(),
            path: "/app".to_string(),
            domain: None,
        };

        assert_eq!(
            instruction.to_header_value(),
            "stn=; Expires=Thu, 01 Jan 1970 00:00:00 GMT; Max-Age=0; Path=/app; HttpOnly"
        );
    }
}
