use axum::http::StatusCode;
use serde_json::Value;
use std::collections::HashMap;

/// Generic HTTP response wrapper with status, headers and a JSON body.
///
/// The body is held as a `serde_json::Value` and only turned into wire
/// bytes by the projector's serialization hook.
///
/// # Example
/// ```
/// use trellis::ResponseEntity;
/// use serde_json::json;
///
/// let entity = ResponseEntity::ok().body(json!({ "success": true }));
/// assert_eq!(entity.status_code().as_u16(), 200);
/// ```
#[derive(Debug)]
pub struct ResponseEntity {
    status: StatusCode,
    headers: HashMap<String, String>,
    body: Value,
}

impl ResponseEntity {
    pub fn new(body: Value, headers: HashMap<String, String>, status: StatusCode) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Start building a 200 OK response.
    pub fn ok() -> ResponseEntityBuilder {
        ResponseEntityBuilder::new(StatusCode::OK)
    }

    /// Start building a response with a custom status code.
    pub fn status(status: StatusCode) -> ResponseEntityBuilder {
        ResponseEntityBuilder::new(status)
    }

    pub fn status_code(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    pub fn into_parts(self) -> (StatusCode, HashMap<String, String>, Value) {
        (self.status, self.headers, self.body)
    }
}

/// Builder for [`ResponseEntity`]: status first, then headers, then body.
pub struct ResponseEntityBuilder {
    status: StatusCode,
    headers: HashMap<String, String>,
}

impl ResponseEntityBuilder {
    fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HashMap::new(),
        }
    }

    /// Replace all headers.
    pub fn headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    /// Add or override a single header.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Set the body and finish the entity.
    pub fn body(self, body: Value) -> ResponseEntity {
        ResponseEntity::new(body, self.headers, self.status)
    }

    /// Finish the entity with an empty body.
    pub fn empty(self) -> ResponseEntity {
        self.body(Value::Null)
    }
}

/// An HTTP redirect produced by a handler.
#[derive(Debug, Clone)]
pub struct RedirectView {
    url: String,
}

impl RedirectView {
    /// Redirect to the given URL.
    pub fn to(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn into_url(self) -> String {
        self.url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builder_sets_status_headers_and_body() {
        let entity = ResponseEntity::status(StatusCode::CREATED)
            .header("x-request-id", "abc")
            .body(json!({ "id": 7 }));

        assert_eq!(entity.status_code(), StatusCode::CREATED);
        assert_eq!(entity.headers().get("x-request-id").unwrap(), "abc");
        assert_eq!(entity.body()["id"], 7);
    }

    #[test]
    fn header_overrides_previous_value() {
        let entity = ResponseEntity::ok()
            .header("x-flag", "one")
            .header("x-flag", "two")
            .empty();
        assert_eq!(entity.headers().get("x-flag").unwrap(), "two");
    }
}
