use axum::{
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
};

/// An already-encoded JSON body.
pub struct JsonBytes(pub Vec<u8>);

impl IntoResponse for JsonBytes {
    fn into_response(self) -> Response {
        ([(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))], self.0).into_response()
    }
}

/// A `text/plain` body without a charset parameter.
pub struct PlainText(pub &'static str);

impl IntoResponse for PlainText {
    fn into_response(self) -> Response {
        ([(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"))], self.0).into_response()
    }
}
