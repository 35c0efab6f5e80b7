//! JSON body extractors whose rejections use the API error shape.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationErrors};

use abdullahhub_core::error::AppError;

use crate::error::ApiError;

/// Like `axum::Json`, but malformed bodies become 400 `{success: false, error}`.
#[derive(Debug, Clone)]
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(reject(rejection).into()),
        }
    }
}

/// [`ApiJson`] followed by the body's `Validate` rules.
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let ApiJson(value) = ApiJson::<T>::from_request(req, state).await?;
        value.validate().map_err(invalid)?;
        Ok(Self(value))
    }
}

fn reject(rejection: JsonRejection) -> AppError {
    AppError::validation(format!("Invalid request body: {}", rejection.body_text()))
}

/// One message per failing field, in field order.
pub fn invalid(errors: ValidationErrors) -> AppError {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    let messages: Vec<String> = fields
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(message) => message.to_string(),
                None => format!("Invalid value for '{field}'"),
            })
        })
        .collect();

    if messages.is_empty() {
        AppError::validation("Invalid request body")
    } else {
        AppError::validation(messages.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::header::CONTENT_TYPE;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Validate)]
    struct Score {
        #[validate(range(min = 1, max = 5, message = "Score must be between 1 and 5"))]
        score: u8,
        #[validate(length(max = 4))]
        tag: Option<String>,
    }

    fn request(body: &str) -> Request {
        axum::http::Request::builder()
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_validated_json_accepts_valid_body() {
        let ValidatedJson(score) =
            ValidatedJson::<Score>::from_request(request(r#"{"score":3}"#), &())
                .await
                .unwrap();
        assert_eq!(score.score, 3);
    }

    #[tokio::test]
    async fn test_validated_json_reports_rule_messages() {
        let err = ValidatedJson::<Score>::from_request(
            request(r#"{"score":9,"tag":"toolong"}"#),
            &(),
        )
        .await
        .unwrap_err();
        assert_eq!(err.0.kind, abdullahhub_core::error::ErrorKind::Validation);
        assert_eq!(
            err.0.message,
            "Score must be between 1 and 5; Invalid value for 'tag'"
        );
    }

    #[tokio::test]
    async fn test_malformed_body_rejected() {
        let err = ValidatedJson::<Score>::from_request(request("{"), &())
            .await
            .unwrap_err();
        assert!(err.0.message.starts_with("Invalid request body"));
    }
}
