//! Session cookie parsing and shaping
//!
//! The session id travels as an opaque cookie value. Parsing is a plain
//! `name=value; other=...` split — the gateway never interprets the value
//! beyond handing it to the coordinator. Outgoing cookies are HttpOnly
//! (script must never read the id) and SameSite=Lax so the provider's
//! redirect back to /callback still carries them.

/// Extract a cookie value from a `Cookie` request header.
pub fn session_id_from_header(header: Option<&str>, cookie_name: &str) -> Option<String> {
    let header = header?;
    for pair in header.split(';') {
        let Some((name, value)) = pair.trim().split_once('=') else {
            continue;
        };
        if name == cookie_name && !value.is_empty() {
            return Some(value.to_string());
        }
    }
    None
}

/// Build a `Set-Cookie` header value carrying the session id.
///
/// `max_age_secs` mirrors the record's TTL so the browser drops the
/// cookie around the time the server forgets the session.
pub fn set_cookie(cookie_name: &str, session_id: &str, max_age_secs: u64, secure: bool) -> String {
    let mut cookie = format!(
        "{cookie_name}={session_id}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_secs}"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_named_cookie() {
        let header = Some("sessid=abc123; theme=dark");
        assert_eq!(
            session_id_from_header(header, "sessid"),
            Some("abc123".into())
        );
    }

    #[test]
    fn extracts_among_other_cookies() {
        let header = Some("theme=dark; sessid=abc123; lang=en");
        assert_eq!(
            session_id_from_header(header, "sessid"),
            Some("abc123".into())
        );
    }

    #[test]
    fn missing_header_or_cookie_is_none() {
        assert_eq!(session_id_from_header(None, "sessid"), None);
        assert_eq!(session_id_from_header(Some("theme=dark"), "sessid"), None);
        assert_eq!(session_id_from_header(Some(""), "sessid"), None);
    }

    #[test]
    fn empty_value_is_none() {
        assert_eq!(session_id_from_header(Some("sessid="), "sessid"), None);
    }

    #[test]
    fn malformed_segment_does_not_hide_later_cookies() {
        let header = Some("garbage; sessid=abc123");
        assert_eq!(
            session_id_from_header(header, "sessid"),
            Some("abc123".into())
        );
    }

    #[test]
    fn custom_cookie_name() {
        let header = Some("login=xyz; sessid=abc");
        assert_eq!(session_id_from_header(header, "login"), Some("xyz".into()));
    }

    #[test]
    fn set_cookie_shape() {
        let cookie = set_cookie("sessid", "abc123", 900, false);
        assert_eq!(
            cookie,
            "sessid=abc123; Path=/; HttpOnly; SameSite=Lax; Max-Age=900"
        );
    }

    #[test]
    fn set_cookie_secure_flag() {
        let cookie = set_cookie("sessid", "abc123", 900, true);
        assert!(cookie.ends_with("; Secure"));
    }
}
