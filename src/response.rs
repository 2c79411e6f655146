//! Handler payloads and the response boundary.
//!
//! A handler returns a value; the router turns it into a [`Payload`] and
//! stops there. Turning a payload into bytes and headers is the job of a
//! [`ResponseFormatter`], chosen by configuration.

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use http::StatusCode;
use http_body_util::Full;
use serde::Serialize;

use crate::error::DispatchError;

/// The value a handler produced, before formatting.
pub type Payload = serde_json::Value;

// ── IntoPayload ───────────────────────────────────────────────────────────────

/// Conversion into a [`Payload`].
///
/// Implemented for strings, numbers, `bool`, `()`, `Option<T>` (where `None`
/// is an empty payload) and `Result<T, DispatchError>`, so handlers can use
/// `?` on argument lookups. Wrap any `Serialize` type in [`Json`].
pub trait IntoPayload {
    fn into_payload(self) -> Result<Payload, DispatchError>;
}

impl IntoPayload for Payload {
    fn into_payload(self) -> Result<Payload, DispatchError> { Ok(self) }
}

impl IntoPayload for String {
    fn into_payload(self) -> Result<Payload, DispatchError> { Ok(Payload::String(self)) }
}

impl IntoPayload for &str {
    fn into_payload(self) -> Result<Payload, DispatchError> { Ok(Payload::String(self.to_owned())) }
}

impl IntoPayload for () {
    fn into_payload(self) -> Result<Payload, DispatchError> { Ok(Payload::Null) }
}

macro_rules! into_payload_via_from {
    ($($ty:ty),*) => {
        $(
            impl IntoPayload for $ty {
                fn into_payload(self) -> Result<Payload, DispatchError> { Ok(Payload::from(self)) }
            }
        )*
    };
}

into_payload_via_from!(bool, i32, i64, u32, u64, usize, f64);

impl<T: IntoPayload> IntoPayload for Option<T> {
    fn into_payload(self) -> Result<Payload, DispatchError> {
        self.map_or(Ok(Payload::Null), IntoPayload::into_payload)
    }
}

impl<T: IntoPayload> IntoPayload for Result<T, DispatchError> {
    fn into_payload(self) -> Result<Payload, DispatchError> {
        self?.into_payload()
    }
}

/// Serializes any `Serialize` value into the payload.
///
/// ```rust
/// use serde::Serialize;
/// use switchyard::{IntoPayload, Json};
///
/// #[derive(Serialize)]
/// struct User { id: u32 }
///
/// let payload = Json(User { id: 1 }).into_payload().unwrap();
/// assert_eq!(payload, serde_json::json!({ "id": 1 }));
/// ```
pub struct Json<T>(pub T);

impl<T: Serialize> IntoPayload for Json<T> {
    fn into_payload(self) -> Result<Payload, DispatchError> {
        Ok(serde_json::to_value(self.0)?)
    }
}

// ── ContentType ───────────────────────────────────────────────────────────────

/// Content types the built-in formatters emit.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ContentType {
    Html, // text/html; charset=utf-8
    Json, // application/json; charset=utf-8
    Text, // text/plain; charset=utf-8
}

impl ContentType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Html => "text/html; charset=utf-8",
            Self::Json => "application/json; charset=utf-8",
            Self::Text => "text/plain; charset=utf-8",
        }
    }
}

// ── Response ──────────────────────────────────────────────────────────────────

/// A formatted response, ready to hand to the transport.
#[derive(Clone, Debug)]
pub struct Response {
    pub(crate) status: StatusCode,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) body: Bytes,
}

impl Response {
    /// `200 OK` with a typed body.
    pub fn bytes(content_type: ContentType, body: impl Into<Bytes>) -> Self {
        Self {
            status: StatusCode::OK,
            headers: vec![("content-type".to_owned(), content_type.as_str().to_owned())],
            body: body.into(),
        }
    }

    /// Response with no body.
    pub fn status(code: StatusCode) -> Self {
        Self { status: code, headers: Vec::new(), body: Bytes::new() }
    }

    pub fn status_code(&self) -> StatusCode { self.status }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }
    pub fn body(&self) -> &Bytes { &self.body }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Converts into an `http` response. Headers that are not valid HTTP
    /// tokens are dropped.
    pub fn into_http(self) -> http::Response<Full<Bytes>> {
        let mut res = http::Response::new(Full::new(self.body));
        *res.status_mut() = self.status;
        for (name, value) in self.headers {
            if let (Ok(name), Ok(value)) = (HeaderName::try_from(name), HeaderValue::try_from(value)) {
                res.headers_mut().append(name, value);
            }
        }
        res
    }
}

impl From<DispatchError> for Response {
    fn from(err: DispatchError) -> Self {
        Self::status(err.status())
    }
}

// ── Formatters ────────────────────────────────────────────────────────────────

/// Turns a payload into a response.
pub trait ResponseFormatter: Send + Sync + 'static {
    fn format(&self, payload: &Payload) -> Response;
}

/// Strings go out as plain text and `null` as an empty body. Numbers and
/// booleans are written as text; arrays and objects as JSON.
#[derive(Clone, Copy, Debug, Default)]
pub struct RawFormatter;

impl ResponseFormatter for RawFormatter {
    fn format(&self, payload: &Payload) -> Response {
        match payload {
            Payload::Null      => Response::status(StatusCode::OK),
            Payload::String(s) => Response::bytes(ContentType::Text, s.clone()),
            Payload::Array(_) | Payload::Object(_) => Response::bytes(ContentType::Json, payload.to_string()),
            other              => Response::bytes(ContentType::Text, other.to_string()),
        }
    }
}

/// Every payload goes out as JSON. `null` stays an empty body.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonFormatter {
    pub pretty: bool,
}

impl ResponseFormatter for JsonFormatter {
    fn format(&self, payload: &Payload) -> Response {
        if payload.is_null() {
            return Response::status(StatusCode::OK);
        }
        let encoded = if self.pretty {
            serde_json::to_vec_pretty(payload)
        } else {
            serde_json::to_vec(payload)
        };
        match encoded {
            Ok(body) => Response::bytes(ContentType::Json, body),
            Err(_)   => Response::status(StatusCode::INTERNAL_SERVER_ERROR),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn results_and_options_convert() {
        assert_eq!(Some(5_i64).into_payload().unwrap(), json!(5));
        assert_eq!(None::<String>.into_payload().unwrap(), Payload::Null);

        let ok: Result<&str, DispatchError> = Ok("fine");
        assert_eq!(ok.into_payload().unwrap(), json!("fine"));

        let err: Result<i64, DispatchError> = Err(DispatchError::NotFound("/x".into()));
        assert!(err.into_payload().unwrap_err().is_not_found());
    }

    #[test]
    fn raw_formatter_types_each_payload_kind() {
        let res = RawFormatter.format(&json!("ok"));
        assert_eq!(res.status_code(), StatusCode::OK);
        assert_eq!(res.body().as_ref(), b"ok");
        assert_eq!(res.header("content-type"), Some(ContentType::Text.as_str()));

        let res = RawFormatter.format(&json!(5));
        assert_eq!(res.body().as_ref(), b"5");
        assert_eq!(res.header("content-type"), Some(ContentType::Text.as_str()));

        let res = RawFormatter.format(&json!({ "id": 1 }));
        assert_eq!(res.body().as_ref(), br#"{"id":1}"#);
        assert_eq!(res.header("content-type"), Some(ContentType::Json.as_str()));

        let res = RawFormatter.format(&Payload::Null);
        assert!(res.body().is_empty());
    }

    #[test]
    fn json_formatter_encodes_everything() {
        let res = JsonFormatter::default().format(&json!("ok"));
        assert_eq!(res.body().as_ref(), br#""ok""#);
        assert_eq!(res.header("content-type"), Some(ContentType::Json.as_str()));
    }

    #[test]
    fn dispatch_errors_render_as_empty_statuses() {
        let res: Response = DispatchError::NotFound("/nope".into()).into();
        assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
        assert!(res.body().is_empty());

        let http = res.into_http();
        assert_eq!(http.status(), StatusCode::NOT_FOUND);
    }
}
