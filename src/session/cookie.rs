//! Session cookie parsing and `Set-Cookie` emission.
//!
//! Request metadata may carry the cookies split over several `cookie`
//! entries (HTTP/2 does this), so every entry is scanned.

use cookie::Cookie;
use cookie::time::Duration as CookieDuration;
use http::header::{HeaderName, HeaderValue};
use http::HeaderMap;

use super::SessionConfig;
use crate::SessionError;

/// Extracts the session id from the request cookies.
///
/// Returns `None` when no cookie named `config.session_name` with a non-empty
/// value is present. Malformed cookie pairs are skipped.
pub fn extract_session_id(headers: &HeaderMap, config: &SessionConfig) -> Option<String> {
    headers
        .get_all(config.request_header.as_str())
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|raw| Cookie::split_parse(raw).filter_map(Result::ok))
        .find(|c| c.name() == config.session_name && !c.value().is_empty())
        .map(|c| c.value().to_owned())
}

/// Builds the cookie that hands `session_id` to the client.
pub fn build_session_cookie(session_id: &str, config: &SessionConfig) -> Cookie<'static> {
    let mut cookie = Cookie::build((config.session_name.clone(), session_id.to_owned()))
        .path(config.cookie_path.clone())
        .secure(config.cookie_secure)
        .http_only(config.cookie_http_only)
        .max_age(CookieDuration::seconds(config.expires_secs()))
        .build();

    if let Some(same_site) = config.cookie_same_site {
        cookie.set_same_site(cookie::SameSite::from(same_site));
    }
    if let Some(ref domain) = config.cookie_domain {
        cookie.set_domain(domain.clone());
    }

    cookie
}

/// Builds a cookie that makes the client drop its session id.
pub fn build_removal_cookie(config: &SessionConfig) -> Cookie<'static> {
    let mut cookie = Cookie::build((config.session_name.clone(), String::new()))
        .path(config.cookie_path.clone())
        .max_age(CookieDuration::ZERO)
        .build();

    if let Some(ref domain) = config.cookie_domain {
        cookie.set_domain(domain.clone());
    }

    cookie
}

/// Writes `cookie` into the response metadata, replacing an earlier value.
///
/// # Errors
///
/// Returns `SessionError::Configuration` when the header name or the
/// serialized cookie isn't valid header text.
pub fn write_cookie(
    headers: &mut HeaderMap,
    cookie: &Cookie<'_>,
    config: &SessionConfig,
) -> Result<(), SessionError> {
    let name = HeaderName::from_bytes(config.response_header.as_bytes()).map_err(|e| {
        SessionError::Configuration(format!("invalid response_header: {e}"))
    })?;
    let value = HeaderValue::from_str(&cookie.to_string())
        .map_err(|e| SessionError::Configuration(format!("invalid cookie value: {e}")))?;

    headers.insert(name, value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::session::SameSite;

    fn request(cookies: &[&'static str]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for &raw in cookies {
            headers.append("cookie", HeaderValue::from_static(raw));
        }
        headers
    }

    #[test]
    fn test_extract_session_id() {
        let config = SessionConfig::default();
        let headers = request(&["theme=dark; _SID=abc123; lang=en"]);
        assert_eq!(extract_session_id(&headers, &config), Some("abc123".to_owned()));
    }

    #[test]
    fn test_extract_across_split_headers() {
        let config = SessionConfig::default();
        let headers = request(&["theme=dark", "_SID=abc123"]);
        assert_eq!(extract_session_id(&headers, &config), Some("abc123".to_owned()));
    }

    #[test]
    fn test_extract_missing() {
        let config = SessionConfig::default();
        assert_eq!(extract_session_id(&HeaderMap::new(), &config), None);
        assert_eq!(extract_session_id(&request(&["theme=dark"]), &config), None);
        assert_eq!(extract_session_id(&request(&["_SID="]), &config), None);
    }

    #[test]
    fn test_extract_custom_names() {
        let config = SessionConfig {
            session_name: "sid".to_owned(),
            request_header: "cookies".to_owned(),
            ..Default::default()
        };
        let mut headers = HeaderMap::new();
        headers.insert("cookies", HeaderValue::from_static("sid=xyz"));
        headers.insert("cookie", HeaderValue::from_static("sid=wrong"));

        assert_eq!(extract_session_id(&headers, &config), Some("xyz".to_owned()));
    }

    #[test]
    fn test_extract_skips_malformed_pairs() {
        let config = SessionConfig::default();
        let headers = request(&["=novalue; _SID=abc123"]);
        assert_eq!(extract_session_id(&headers, &config), Some("abc123".to_owned()));
    }

    #[test]
    fn test_session_cookie_defaults() {
        let cookie = build_session_cookie("abc123", &SessionConfig::default());

        assert_eq!(cookie.name(), "_SID");
        assert_eq!(cookie.value(), "abc123");
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.max_age(), Some(CookieDuration::seconds(72_000)));
        assert_eq!(cookie.same_site(), None);

        let rendered = cookie.to_string();
        assert!(rendered.starts_with("_SID=abc123"));
        assert!(rendered.contains("HttpOnly"));
        assert!(rendered.contains("Path=/"));
        assert!(rendered.contains("Max-Age=72000"));
        assert!(!rendered.contains("Secure"));
    }

    #[test]
    fn test_session_cookie_attributes() {
        let config = SessionConfig {
            expires: Some(Duration::minutes(5)),
            cookie_path: "/rpc".to_owned(),
            cookie_domain: Some("example.com".to_owned()),
            cookie_secure: true,
            cookie_http_only: false,
            cookie_same_site: Some(SameSite::Lax),
            ..Default::default()
        };
        let rendered = build_session_cookie("abc123", &config).to_string();

        assert!(rendered.contains("Path=/rpc"));
        assert!(rendered.contains("Domain=example.com"));
        assert!(rendered.contains("Secure"));
        assert!(rendered.contains("SameSite=Lax"));
        assert!(rendered.contains("Max-Age=300"));
        assert!(!rendered.contains("HttpOnly"));
    }

    #[test]
    fn test_session_cookie_without_expiry() {
        let config = SessionConfig {
            expires: None,
            ..Default::default()
        };
        let cookie = build_session_cookie("abc123", &config);
        assert_eq!(cookie.max_age(), Some(CookieDuration::ZERO));
    }

    #[test]
    fn test_removal_cookie() {
        let cookie = build_removal_cookie(&SessionConfig::default());
        assert_eq!(cookie.name(), "_SID");
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(CookieDuration::ZERO));
    }

    #[test]
    fn test_write_cookie_replaces_previous() {
        let config = SessionConfig::default();
        let mut headers = HeaderMap::new();

        write_cookie(&mut headers, &build_session_cookie("first", &config), &config).unwrap();
        write_cookie(&mut headers, &build_session_cookie("second", &config), &config).unwrap();

        let values: Vec<_> = headers.get_all("set-cookie").iter().collect();
        assert_eq!(values.len(), 1);
        assert!(values[0].to_str().unwrap().starts_with("_SID=second"));
    }

    #[test]
    fn test_write_cookie_rejects_bad_header_name() {
        let config = SessionConfig {
            response_header: "set cookie".to_owned(),
            ..Default::default()
        };
        let cookie = build_session_cookie("abc", &config);
        let result = write_cookie(&mut HeaderMap::new(), &cookie, &config);
        assert!(matches!(result, Err(SessionError::Configuration(_))));
    }
}
