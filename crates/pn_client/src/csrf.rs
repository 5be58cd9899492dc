use std::collections::HashMap;

use tracing::warn;

/// Anti-forgery token sources a rendered portal page exposes.
///
/// Resolution order mirrors the portal pages: session cookie first,
/// then the `csrf-token` meta tag, then the hidden form field. A
/// missing token is reportable but non-fatal: state-changing requests
/// go out with an empty token and the server rejects them.
#[derive(Debug, Clone, Default)]
pub struct PageContext {
    cookies: HashMap<String, String>,
    meta_tags: HashMap<String, String>,
    form_fields: HashMap<String, String>,
}

const CSRF_COOKIE: &str = "csrftoken";
const CSRF_META: &str = "csrf-token";
const CSRF_FORM_FIELD: &str = "csrfmiddlewaretoken";

impl PageContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    pub fn with_meta(mut self, name: impl Into<String>, content: impl Into<String>) -> Self {
        self.meta_tags.insert(name.into(), content.into());
        self
    }

    pub fn with_form_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.form_fields.insert(name.into(), value.into());
        self
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// Cookie header value for requests that carry the page session,
    /// or `None` when the page has no cookies at all.
    pub fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        let mut pairs: Vec<_> = self
            .cookies
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect();
        pairs.sort();
        Some(pairs.join("; "))
    }

    /// Resolve the CSRF token, or an empty string when no source has one.
    pub fn csrf_token(&self) -> String {
        if let Some(token) = self.cookies.get(CSRF_COOKIE) {
            return token.clone();
        }
        if let Some(token) = self.meta_tags.get(CSRF_META) {
            return token.clone();
        }
        if let Some(token) = self.form_fields.get(CSRF_FORM_FIELD) {
            return token.clone();
        }
        warn!("CSRF token not found in cookies, meta tags or form fields");
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_wins_over_meta_and_form() {
        let page = PageContext::new()
            .with_cookie("csrftoken", "from-cookie")
            .with_meta("csrf-token", "from-meta")
            .with_form_field("csrfmiddlewaretoken", "from-form");
        assert_eq!(page.csrf_token(), "from-cookie");
    }

    #[test]
    fn meta_wins_over_form() {
        let page = PageContext::new()
            .with_meta("csrf-token", "from-meta")
            .with_form_field("csrfmiddlewaretoken", "from-form");
        assert_eq!(page.csrf_token(), "from-meta");
    }

    #[test]
    fn form_field_is_the_last_resort() {
        let page = PageContext::new().with_form_field("csrfmiddlewaretoken", "from-form");
        assert_eq!(page.csrf_token(), "from-form");
    }

    #[test]
    fn missing_token_degrades_to_empty() {
        assert_eq!(PageContext::new().csrf_token(), "");
    }

    #[test]
    fn cookie_header_is_stable_and_joined() {
        let page = PageContext::new()
            .with_cookie("sessionid", "abc")
            .with_cookie("csrftoken", "tok");
        assert_eq!(
            page.cookie_header().as_deref(),
            Some("csrftoken=tok; sessionid=abc")
        );
        assert_eq!(PageContext::new().cookie_header(), None);
    }

    #[test]
    fn unrelated_cookies_are_ignored() {
        let page = PageContext::new().with_cookie("sessionid", "abc");
        assert_eq!(page.csrf_token(), "");
        assert_eq!(page.cookie("sessionid"), Some("abc"));
    }
}
