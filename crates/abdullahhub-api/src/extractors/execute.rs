//! Execution payload: a JSON object, or multipart form fields and files.

use std::collections::BTreeMap;

use axum::body::Bytes;
use axum::extract::{FromRequest, Multipart, Request};
use axum::http::header::CONTENT_TYPE;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Map, Value};

use abdullahhub_core::error::AppError;
use abdullahhub_plugin::InputFile;
use abdullahhub_service::ExecutionRequest;

use crate::error::ApiError;

/// Body of `POST /plugins/execute/{id}`.
///
/// JSON bodies become the input object as-is; an empty body is `{}`.
/// Multipart text fields become input entries and file fields are
/// forwarded base64-encoded.
#[derive(Debug, Clone)]
pub struct ExecutePayload(pub ExecutionRequest);

impl<S> FromRequest<S> for ExecutePayload
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("multipart/form-data"));

        if is_multipart {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| AppError::validation(format!("Invalid form data: {}", e.body_text())))?;
            return Ok(Self(read_form(multipart).await?));
        }

        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| AppError::validation(format!("Invalid request body: {}", e.body_text())))?;
        Ok(Self(ExecutionRequest {
            input: parse_json_input(&bytes)?,
            files: BTreeMap::new(),
        }))
    }
}

/// Parse a JSON body into an input value. Blank bodies are `{}`.
pub fn parse_json_input(bytes: &[u8]) -> Result<Value, AppError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }
    serde_json::from_slice(bytes)
        .map_err(|e| AppError::validation(format!("Invalid JSON body: {e}")))
}

async fn read_form(mut multipart: Multipart) -> Result<ExecutionRequest, AppError> {
    let mut input = Map::new();
    let mut files = BTreeMap::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(format!("Invalid form data: {}", e.body_text())))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        match field.file_name().map(str::to_string) {
            Some(filename) => {
                let content_type = field.content_type().map(str::to_string);
                let data = field.bytes().await.map_err(|e| {
                    AppError::validation(format!("Failed to read file '{name}': {}", e.body_text()))
                })?;
                // Browsers send an empty part for an untouched file input.
                if filename.is_empty() && data.is_empty() {
                    continue;
                }
                files.insert(
                    name,
                    InputFile {
                        filename,
                        content_type,
                        data: STANDARD.encode(&data),
                    },
                );
            }
            None => {
                let text = field.text().await.map_err(|e| {
                    AppError::validation(format!("Failed to read field '{name}': {}", e.body_text()))
                })?;
                input.insert(name, Value::String(text));
            }
        }
    }

    Ok(ExecutionRequest {
        input: Value::Object(input),
        files,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn test_blank_body_is_empty_object() {
        assert_eq!(parse_json_input(b"").unwrap(), serde_json::json!({}));
        assert_eq!(parse_json_input(b"  \n").unwrap(), serde_json::json!({}));
    }

    #[test]
    fn test_invalid_json_rejected() {
        let err = parse_json_input(b"{not json").unwrap_err();
        assert_eq!(err.kind, abdullahhub_core::error::ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_json_body() {
        let req = axum::http::Request::builder()
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"image_url":"https://example.com/a.png"}"#))
            .unwrap();
        let ExecutePayload(payload) = ExecutePayload::from_request(req, &()).await.unwrap();
        assert_eq!(payload.input["image_url"], "https://example.com/a.png");
        assert!(payload.files.is_empty());
    }

    #[tokio::test]
    async fn test_multipart_fields_and_files() {
        let boundary = "XBOUNDARYX";
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"size\"\r\n\r\npreview\r\n\
             --{b}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"cat.png\"\r\n\
             Content-Type: image/png\r\n\r\nPNGDATA\r\n--{b}--\r\n",
            b = boundary
        );
        let req = axum::http::Request::builder()
            .header(CONTENT_TYPE, format!("multipart/form-data; boundary={boundary}"))
            .body(Body::from(body))
            .unwrap();

        let ExecutePayload(payload) = ExecutePayload::from_request(req, &()).await.unwrap();
        assert_eq!(payload.input["size"], "preview");
        let file = &payload.files["image"];
        assert_eq!(file.filename, "cat.png");
        assert_eq!(file.content_type.as_deref(), Some("image/png"));
        assert_eq!(file.data, STANDARD.encode(b"PNGDATA"));
    }
}
