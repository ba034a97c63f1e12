//! Location-addressable access to an inbound request.
//!
//! The decoder reads everything through [`RequestDataSource`], so it stays
//! agnostic of the transport. [`HttpRequestDataSource`] is the
//! implementation over `http` request parts and a buffered body.

use crate::content::{
    ContentOptions, MEDIA_TYPE_FORM_URLENCODED, MEDIA_TYPE_MULTIPART_FORM,
};
use crate::cookie::{parse_cookies, Cookie};
use crate::form::{parse_multipart, parse_urlencoded, FormData, MultiValues, MultipartConfig};
use crate::{CodecError, CodecResult};
use bytes::Bytes;
use http::{header, HeaderMap, Method, Uri};
use portico_core::PathParams;

/// Request data consumed by the decoder.
pub trait RequestDataSource: Send + Sync {
    /// Returns the request method.
    fn method(&self) -> &Method;

    /// Returns the request path.
    fn path(&self) -> &str;

    /// Returns all cookies in header order.
    fn cookies(&self) -> &[Cookie];

    /// Returns the request headers.
    fn headers(&self) -> &HeaderMap;

    /// Returns the query parameters.
    fn query(&self) -> &MultiValues;

    /// Returns the path template parameters.
    fn path_parameters(&self) -> &PathParams;

    /// Returns the parsed form body.
    fn form(&self) -> CodecResult<&FormData>;

    /// Returns the raw body, `None` when the request has none.
    fn body(&self) -> Option<Bytes>;

    /// Returns the body content options, falling back to the defaults when
    /// `Content-Type` or `Content-Encoding` are absent.
    fn body_content_options(&self, default_type: &str, default_encoding: &str) -> ContentOptions;
}

#[derive(Debug, Clone)]
enum FormState {
    NotForm,
    Parsed(FormData),
    PendingMultipart,
    Failed(String),
}

/// [`RequestDataSource`] over `http` request parts and a buffered body.
///
/// Urlencoded forms are parsed on construction; multipart forms are parsed
/// by [`HttpRequestDataSource::load`] because multipart parsing is async.
#[derive(Debug, Clone)]
pub struct HttpRequestDataSource {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Option<Bytes>,
    path_params: PathParams,
    query: MultiValues,
    cookies: Vec<Cookie>,
    form: FormState,
    multipart: MultipartConfig,
}

impl HttpRequestDataSource {
    /// Creates a data source, parsing query, cookies and urlencoded forms.
    ///
    /// An empty body is treated as absent.
    pub fn new(
        method: Method,
        uri: Uri,
        headers: HeaderMap,
        body: Bytes,
        path_params: PathParams,
        multipart: MultipartConfig,
    ) -> Self {
        let query = uri
            .query()
            .and_then(|query| parse_urlencoded(query.as_bytes()).ok())
            .unwrap_or_default();
        let cookies = parse_cookies(&headers);
        let body = (!body.is_empty()).then_some(body);

        let mut source = Self {
            method,
            uri,
            headers,
            body,
            path_params,
            query,
            cookies,
            form: FormState::NotForm,
            multipart,
        };
        source.form = source.initial_form_state();
        source
    }

    /// Creates a data source from request parts.
    pub fn from_parts(
        parts: &http::request::Parts,
        body: Bytes,
        path_params: PathParams,
        multipart: MultipartConfig,
    ) -> Self {
        Self::new(
            parts.method.clone(),
            parts.uri.clone(),
            parts.headers.clone(),
            body,
            path_params,
            multipart,
        )
    }

    /// Creates a data source and parses any multipart form body.
    pub async fn load(
        method: Method,
        uri: Uri,
        headers: HeaderMap,
        body: Bytes,
        path_params: PathParams,
        multipart: MultipartConfig,
    ) -> Self {
        let mut source = Self::new(method, uri, headers, body, path_params, multipart);
        source.load_multipart().await;
        source
    }

    /// Parses a pending multipart body. No-op for other bodies.
    pub async fn load_multipart(&mut self) {
        if !matches!(self.form, FormState::PendingMultipart) {
            return;
        }

        let content_type = self.content_type().unwrap_or_default().to_string();
        let result = match self.decoded_body() {
            Ok(body) => parse_multipart(&content_type, body, &self.multipart).await,
            Err(err) => Err(err),
        };

        self.form = match result {
            Ok(mut form) => {
                form.append_values(&self.query);
                FormState::Parsed(form)
            }
            Err(err) => {
                tracing::debug!(error = %err, "multipart form rejected");
                FormState::Failed(err.to_string())
            }
        };
    }

    /// Returns the request URI.
    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Returns the `Content-Type` header value.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
    }

    fn media_type(&self) -> Option<String> {
        self.content_type()
            .and_then(|value| value.parse::<mime::Mime>().ok())
            .map(|mime| mime.essence_str().to_ascii_lowercase())
    }

    fn decoded_body(&self) -> CodecResult<Bytes> {
        let Some(body) = &self.body else {
            return Ok(Bytes::new());
        };
        let options = self.body_content_options(MEDIA_TYPE_FORM_URLENCODED, "");
        if options.encodings.is_empty() {
            return Ok(body.clone());
        }
        options.decode_bytes(body).map(Bytes::from)
    }

    fn initial_form_state(&self) -> FormState {
        match self.media_type().as_deref() {
            Some(MEDIA_TYPE_MULTIPART_FORM) => FormState::PendingMultipart,
            Some(MEDIA_TYPE_FORM_URLENCODED) => {
                let parsed = self
                    .decoded_body()
                    .and_then(|body| parse_urlencoded(&body));
                match parsed {
                    Ok(values) => {
                        let mut form = FormData {
                            values,
                            ..FormData::default()
                        };
                        form.append_values(&self.query);
                        FormState::Parsed(form)
                    }
                    Err(err) => FormState::Failed(err.to_string()),
                }
            }
            _ => FormState::NotForm,
        }
    }
}

impl RequestDataSource for HttpRequestDataSource {
    fn method(&self) -> &Method {
        &self.method
    }

    fn path(&self) -> &str {
        self.uri.path()
    }

    fn cookies(&self) -> &[Cookie] {
        &self.cookies
    }

    fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn query(&self) -> &MultiValues {
        &self.query
    }

    fn path_parameters(&self) -> &PathParams {
        &self.path_params
    }

    fn form(&self) -> CodecResult<&FormData> {
        static EMPTY: std::sync::OnceLock<FormData> = std::sync::OnceLock::new();

        match &self.form {
            FormState::Parsed(form) => Ok(form),
            FormState::NotForm => Ok(EMPTY.get_or_init(FormData::default)),
            FormState::PendingMultipart => Err(CodecError::Form(
                "multipart form has not been loaded".to_string(),
            )),
            FormState::Failed(message) => Err(CodecError::Form(message.clone())),
        }
    }

    fn body(&self) -> Option<Bytes> {
        self.body.clone()
    }

    fn body_content_options(&self, default_type: &str, default_encoding: &str) -> ContentOptions {
        let header_value = |name: header::HeaderName| {
            self.headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .filter(|value| !value.is_empty())
        };

        let content_type = header_value(header::CONTENT_TYPE).unwrap_or(default_type);
        let encoding = header_value(header::CONTENT_ENCODING).unwrap_or(default_encoding);

        ContentOptions::new(content_type).with_encodings(encoding.split(','))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::tests::multipart_body;
    use http::HeaderValue;

    fn source(uri: &'static str, headers: HeaderMap, body: &'static [u8]) -> HttpRequestDataSource {
        HttpRequestDataSource::new(
            Method::POST,
            Uri::from_static(uri),
            headers,
            Bytes::from_static(body),
            PathParams::new(),
            MultipartConfig::default(),
        )
    }

    #[test]
    fn test_query_and_cookies() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("sid=abc"));
        let source = source("/devices?color=blue&color=black", headers, b"");

        assert_eq!(source.query()["color"], vec!["blue", "black"]);
        assert_eq!(source.cookies()[0], Cookie::new("sid", "abc"));
        assert_eq!(source.path(), "/devices");
        assert!(source.body().is_none());
    }

    #[test]
    fn test_urlencoded_form_includes_query_values() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        let source = source("/forms?name=fallback", headers, b"name=primary&age=3");

        let form = source.form().unwrap();
        assert_eq!(form.values("name"), ["primary".to_string(), "fallback".to_string()]);
        assert_eq!(form.values("age"), ["3".to_string()]);
    }

    #[test]
    fn test_non_form_body_has_empty_form() {
        let source = source("/x", HeaderMap::new(), b"{}");
        assert!(source.form().unwrap().values.is_empty());
    }

    #[test]
    fn test_body_content_options_defaults() {
        let source = source("/x", HeaderMap::new(), b"{}");
        let options = source.body_content_options("application/json", "");
        assert_eq!(options.mime_type, "application/json");
        assert!(options.encodings.is_empty());

        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        headers.insert(header::CONTENT_ENCODING, HeaderValue::from_static("gzip, base64"));
        let source = self::source("/x", headers, b"x");
        let options = source.body_content_options("application/json", "");
        assert_eq!(options.mime_type, "text/plain");
        assert_eq!(options.encodings, vec!["gzip", "base64"]);
    }

    #[tokio::test]
    async fn test_multipart_requires_load() {
        let body = multipart_body("bnd", &[("doc", Some("a.txt"), b"hello")]);
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("multipart/form-data; boundary=bnd"),
        );

        let mut source = HttpRequestDataSource::new(
            Method::POST,
            Uri::from_static("/upload"),
            headers,
            Bytes::from(body),
            PathParams::new(),
            MultipartConfig::default(),
        );
        assert!(source.form().is_err());

        source.load_multipart().await;
        let form = source.form().unwrap();
        assert_eq!(form.files("doc")[0].text().unwrap(), "hello");
    }
}
