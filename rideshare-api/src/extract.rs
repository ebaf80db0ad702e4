//! Request extractors
//!
//! - [`ValidatedJson<T>`]: a JSON body decoded into `T`, then checked with
//!   `validator::Validate::validate()`
//! - [`ResourceId`]: the integer ID segment of a detail route
//!
//! Every rejection is an [`ApiError`], so clients always get a JSON body.
//! A body that isn't JSON at all is a `bad_request`. A body that is JSON but
//! doesn't fit `T` (missing field, wrong type, unknown enum value) is a
//! `validation_error` naming the field, like a failed `validate()`.

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Path, Request},
    http::{header, request::Parts, HeaderMap},
};
use serde::de::DeserializeOwned;
use serde_json::error::Category;
use serde_path_to_error::Segment;
use validator::{Validate, ValidationErrors};

use crate::error::{ApiError, ValidationErrorDetail};

/// Field name used when an error isn't tied to one field
const NON_FIELD_ERRORS: &str = "non_field_errors";

/// JSON body that passed `validator` checks
#[derive(Debug)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if !has_json_content_type(req.headers()) {
            return Err(ApiError::BadRequest(
                "Expected request with `Content-Type: application/json`".to_string(),
            ));
        }

        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;

        let value: T = decode_json(&bytes)?;
        value.validate().map_err(validation_errors)?;

        Ok(ValidatedJson(value))
    }
}

fn has_json_content_type(headers: &HeaderMap) -> bool {
    let Some(content_type) = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
    else {
        return false;
    };

    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    essence == "application/json"
        || (essence.starts_with("application/") && essence.ends_with("+json"))
}

/// Decodes a JSON body, reporting shape errors against the failing field
pub(crate) fn decode_json<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ApiError> {
    let mut deserializer = serde_json::Deserializer::from_slice(bytes);

    let value = serde_path_to_error::deserialize(&mut deserializer).map_err(deserialize_error)?;
    deserializer
        .end()
        .map_err(|e| ApiError::BadRequest(format!("Invalid JSON: {}", e)))?;

    Ok(value)
}

fn deserialize_error(err: serde_path_to_error::Error<serde_json::Error>) -> ApiError {
    let path: Vec<String> = err
        .path()
        .iter()
        .filter_map(|segment| match segment {
            Segment::Seq { index } => Some(index.to_string()),
            Segment::Map { key } => Some(key.clone()),
            Segment::Enum { variant } => Some(variant.clone()),
            _ => None,
        })
        .collect();

    let inner = err.into_inner();
    if inner.classify() != Category::Data {
        return ApiError::BadRequest(format!("Invalid JSON: {}", inner));
    }

    let message = inner.to_string();
    let message = match message.rfind(" at line ") {
        Some(end) => &message[..end],
        None => message.as_str(),
    };

    let (field, message) = match missing_field(message) {
        Some(missing) => {
            let mut field = path;
            field.push(missing.to_string());
            (field.join("."), "This field is required.".to_string())
        }
        None if path.is_empty() => (NON_FIELD_ERRORS.to_string(), message.to_string()),
        None => (path.join("."), message.to_string()),
    };

    ApiError::ValidationError(vec![ValidationErrorDetail::new(field, message)])
}

/// Field name out of serde's "missing field `name`" message
fn missing_field(message: &str) -> Option<&str> {
    message
        .strip_prefix("missing field `")
        .and_then(|rest| rest.split('`').next())
}

/// Integer ID taken from a detail route's path
///
/// A segment that isn't an integer can't name any row, so it is a 404 like
/// an unknown ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceId(pub i64);

#[async_trait]
impl<S> FromRequestParts<S> for ResourceId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| {
                tracing::debug!(error = %rejection.body_text(), "Unreadable path parameter");
                ApiError::NotFound("Not found.".to_string())
            })?;

        raw.trim()
            .parse::<i64>()
            .map(ResourceId)
            .map_err(|_| ApiError::NotFound("Not found.".to_string()))
    }
}

/// Flattens `validator` errors into per-field details, sorted by field
pub(crate) fn validation_errors(errors: ValidationErrors) -> ApiError {
    let mut details: Vec<ValidationErrorDetail> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                ValidationErrorDetail::new(
                    field.to_string(),
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value ({})", e.code)),
                )
            })
        })
        .collect();

    details.sort_by(|a, b| a.field.cmp(&b.field));

    ApiError::ValidationError(details)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::response::IntoResponse;
    use axum::routing::{get, post};
    use axum::Router;
    use serde::Deserialize;
    use tower::ServiceExt;

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "lowercase")]
    enum Colour {
        Red,
        Blue,
    }

    #[derive(Debug, Deserialize, Validate)]
    struct Body1 {
        #[validate(length(min = 1, max = 10, message = "Ensure this field has 1 to 10 characters"))]
        name: String,
        #[validate(email(message = "Enter a valid email address"))]
        email: String,
        colour: Option<Colour>,
        score: Option<f64>,
    }

    async fn handler(ValidatedJson(body): ValidatedJson<Body1>) -> impl IntoResponse {
        let _ = (body.colour, body.score);
        body.name
    }

    async fn item(ResourceId(id): ResourceId) -> impl IntoResponse {
        id.to_string()
    }

    fn app() -> Router {
        Router::new()
            .route("/test", post(handler))
            .route("/items/:id", get(item))
    }

    async fn call(request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app().oneshot(request).await.unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, value)
    }

    async fn send(json: &str) -> (StatusCode, serde_json::Value) {
        call(
            Request::builder()
                .method("POST")
                .uri("/test")
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
        )
        .await
    }

    async fn get_item(id: &str) -> (StatusCode, serde_json::Value) {
        call(
            Request::builder()
                .uri(format!("/items/{}", id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    #[tokio::test]
    async fn valid_body_passes() {
        let (status, _) =
            send(r#"{"name": "alice", "email": "alice@example.com", "colour": "red", "score": 1.5}"#)
                .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn malformed_json_is_bad_request() {
        let (status, json) = send("not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "bad_request");

        let (status, json) = send(r#"{"name": "alice", "email": "a@example.com"} trailing"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "bad_request");
    }

    #[tokio::test]
    async fn missing_content_type_is_bad_request() {
        let (status, json) = call(
            Request::builder()
                .method("POST")
                .uri("/test")
                .body(Body::from(r#"{"name": "alice", "email": "a@example.com"}"#))
                .unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "bad_request");
    }

    #[tokio::test]
    async fn missing_field_names_the_field() {
        let (status, json) = send(r#"{"name": "alice"}"#).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "validation_error");
        assert_eq!(json["details"][0]["field"], "email");
        assert_eq!(json["details"][0]["message"], "This field is required.");
    }

    #[tokio::test]
    async fn unknown_enum_value_names_the_field() {
        let (status, json) =
            send(r#"{"name": "alice", "email": "a@example.com", "colour": "green"}"#).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "validation_error");
        assert_eq!(json["details"][0]["field"], "colour");
        assert!(json["details"][0]["message"]
            .as_str()
            .unwrap()
            .contains("unknown variant `green`"));
    }

    #[tokio::test]
    async fn wrong_type_names_the_field() {
        let (status, json) =
            send(r#"{"name": "alice", "email": "a@example.com", "score": "north"}"#).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "validation_error");
        assert_eq!(json["details"][0]["field"], "score");
        assert!(!json["details"][0]["message"]
            .as_str()
            .unwrap()
            .contains(" at line "));
    }

    #[tokio::test]
    async fn non_object_body_is_a_non_field_error() {
        let (status, json) = send("[1, 2]").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["details"][0]["field"], NON_FIELD_ERRORS);
    }

    #[tokio::test]
    async fn validation_failure_lists_fields_in_order() {
        let (status, json) = send(r#"{"name": "", "email": "nope"}"#).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "validation_error");
        assert_eq!(json["details"][0]["field"], "email");
        assert_eq!(json["details"][0]["message"], "Enter a valid email address");
        assert_eq!(json["details"][1]["field"], "name");
    }

    #[tokio::test]
    async fn integer_resource_id_is_extracted() {
        let (status, _) = get_item("42").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn non_integer_resource_id_is_json_404() {
        for id in ["abc", "1.5", "99999999999999999999"] {
            let (status, json) = get_item(id).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{}", id);
            assert_eq!(json["error"], "not_found");
        }
    }

    #[test]
    fn test_missing_field_parsing() {
        assert_eq!(missing_field("missing field `id_rider`"), Some("id_rider"));
        assert_eq!(missing_field("invalid type: string"), None);
    }
}
