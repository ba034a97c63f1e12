//! Request cookie parsing.

use http::{header, HeaderMap};

/// One `name=value` pair from a `Cookie` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    /// Cookie name.
    pub name: String,
    /// Cookie value with surrounding quotes removed.
    pub value: String,
}

impl Cookie {
    /// Creates a cookie.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Parses every `Cookie` header, preserving order and duplicates.
///
/// ```
/// use http::{header, HeaderMap, HeaderValue};
/// use portico_codec::cookie::parse_cookies;
///
/// let mut headers = HeaderMap::new();
/// headers.append(header::COOKIE, HeaderValue::from_static("theme=dark; tag=a"));
/// headers.append(header::COOKIE, HeaderValue::from_static("tag=\"b\""));
///
/// let cookies = parse_cookies(&headers);
/// let tags: Vec<_> = cookies.iter().filter(|c| c.name == "tag").map(|c| c.value.as_str()).collect();
/// assert_eq!(tags, vec!["a", "b"]);
/// ```
pub fn parse_cookies(headers: &HeaderMap) -> Vec<Cookie> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
        .flat_map(|line| {
            line.split(';')
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some(Cookie::new(name, value.trim().trim_matches('"')))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn test_parse_skips_malformed_pairs() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("a=1; junk; =2; b = 3 "));

        let cookies = parse_cookies(&headers);
        assert_eq!(cookies, vec![Cookie::new("a", "1"), Cookie::new("b", "3")]);
    }

    #[test]
    fn test_non_ascii_cookie_value_kept() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_bytes(b"city=Z\xc3\xbcrich; old=caf\xe9").unwrap(),
        );

        let cookies = parse_cookies(&headers);
        assert_eq!(
            cookies,
            vec![Cookie::new("city", "Zürich"), Cookie::new("old", "caf\u{fffd}")]
        );
    }

    #[test]
    fn test_no_cookie_header() {
        assert!(parse_cookies(&HeaderMap::new()).is_empty());
    }
}
