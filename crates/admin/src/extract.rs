//! Body and query extractors whose rejections use the [`AppError`] envelope.
//!
//! axum's own `Json` and `Query` reject with a plain-text 4xx. These wrappers
//! turn a malformed body or query string into a 400
//! `{ "statusCode", "message", "error" }` response like every other error.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::error::AppError;

/// JSON request body or response.
#[derive(Debug, Clone, Copy, Default, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

/// Query string.
#[derive(Debug, Clone, Copy, Default, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct Query<T>(pub T);

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(error = %rejection, "Rejected request body");
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        tracing::debug!(error = %rejection, "Rejected query string");
        Self::BadRequest(rejection.body_text())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct CheckoutBody {
        customer_name: String,
    }

    #[derive(Debug, Deserialize)]
    struct Paging {
        page: u32,
    }

    async fn error_body(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_missing_field_is_a_json_bad_request() {
        let request = Request::post("/")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"customerEmail":"ayse@example.com"}"#))
            .unwrap();
        let err = Json::<CheckoutBody>::from_request(request, &()).await.unwrap_err();

        let (status, body) = error_body(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["statusCode"], 400);
        assert_eq!(body["error"], "Bad Request");
        assert!(body["message"].as_str().unwrap().contains("customerName"));
    }

    #[tokio::test]
    async fn test_wrong_content_type_is_a_json_bad_request() {
        let request = Request::post("/")
            .body(Body::from(r#"{"customerName":"Ayse"}"#))
            .unwrap();
        let err = Json::<CheckoutBody>::from_request(request, &()).await.unwrap_err();

        let (status, body) = error_body(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["statusCode"], 400);
    }

    #[tokio::test]
    async fn test_valid_body_is_extracted() {
        let request = Request::post("/")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"customerName":"Ayse"}"#))
            .unwrap();
        let Json(body) = Json::<CheckoutBody>::from_request(request, &()).await.unwrap();
        assert_eq!(body.customer_name, "Ayse");
    }

    #[tokio::test]
    async fn test_bad_query_is_a_json_bad_request() {
        let (mut parts, ()) = Request::get("/?page=first").body(()).unwrap().into_parts();
        let err = Query::<Paging>::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();

        let (status, body) = error_body(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Bad Request");

        let (mut parts, ()) = Request::get("/?page=2").body(()).unwrap().into_parts();
        let Query(paging) = Query::<Paging>::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(paging.page, 2);
    }
}
