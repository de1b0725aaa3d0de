//! Request handlers

use crate::AppState;
use crate::error::ApiError;
use crate::extract::FormOrJson;
use axum::extract::State;
use axum::http::{HeaderValue, header};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use listcraft_core::{RewriteMode, TemplateKey, XLSX_CONTENT_TYPE};
use serde::{Deserialize, Deserializer};
use std::sync::Arc;
use tracing::info;

/// Body of `POST /create-upload-file`
#[derive(Debug, Default, Deserialize)]
pub struct CreateUploadFileRequest {
    #[serde(default, deserialize_with = "scalar_text")]
    pub pazaryeri: Option<String>,
    #[serde(default, deserialize_with = "scalar_text")]
    pub kategori: Option<String>,
    #[serde(default, deserialize_with = "scalar_text")]
    pub barkod_on_ek: Option<String>,
    #[serde(default, deserialize_with = "scalar_text")]
    pub marka_adi: Option<String>,
}

/// Body of `POST /stok-guncelle`
#[derive(Debug, Default, Deserialize)]
pub struct StockUpdateRequest {
    #[serde(default, deserialize_with = "scalar_text")]
    pub barkod_on_ek: Option<String>,
}

/// Any JSON scalar a client may send for a text field
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Bool(bool),
    Integer(i64),
    Unsigned(u64),
    Float(f64),
}

/// Read a string, number or boolean field as text.
///
/// `null`, `false` and zero count as absent, like an empty string.
fn scalar_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Scalar>::deserialize(deserializer)?;
    Ok(value.and_then(|scalar| match scalar {
        Scalar::Text(text) => Some(text),
        Scalar::Bool(true) => Some("true".to_string()),
        Scalar::Bool(false) => None,
        Scalar::Integer(0) | Scalar::Unsigned(0) => None,
        Scalar::Integer(n) => Some(n.to_string()),
        Scalar::Unsigned(n) => Some(n.to_string()),
        Scalar::Float(n) if n == 0.0 || n.is_nan() => None,
        Scalar::Float(n) => Some(n.to_string()),
    }))
}

pub async fn create_upload_file(
    State(state): State<AppState>,
    FormOrJson(body): FormOrJson<CreateUploadFileRequest>,
) -> Result<Response, ApiError> {
    let marketplace = required("pazaryeri", body.pazaryeri)?;
    let category = required("kategori", body.kategori)?;
    let prefix = required("barkod_on_ek", body.barkod_on_ek)?;
    let brand_name = required("marka_adi", body.marka_adi)?;

    render(
        &state,
        TemplateKey::listing(marketplace, category),
        RewriteMode::ListingTemplate { brand_name },
        prefix,
    )
    .await
}

pub async fn stock_update(
    State(state): State<AppState>,
    FormOrJson(body): FormOrJson<StockUpdateRequest>,
) -> Result<Response, ApiError> {
    let prefix = required("barkod_on_ek", body.barkod_on_ek)?;
    render(&state, TemplateKey::Stock, RewriteMode::StockUpdate, prefix).await
}

pub async fn health() -> &'static str {
    "ok"
}

fn required(field: &str, value: Option<String>) -> Result<String, ApiError> {
    match value {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(ApiError::Validation(format!(
            "missing required field: {}",
            field
        ))),
    }
}

/// Load, rewrite and return a template as a download
async fn render(
    state: &AppState,
    key: TemplateKey,
    mode: RewriteMode,
    prefix: String,
) -> Result<Response, ApiError> {
    let template = state.store.load(&key).await?;
    let mode_name = mode.name();

    let rewriter = Arc::clone(&state.rewriter);
    let token = prefix.clone();
    let output = tokio::task::spawn_blocking(move || rewriter.rewrite(&template, &mode, &token))
        .await
        .map_err(|e| ApiError::Unexpected(format!("rewrite task failed: {}", e)))??;

    let filename = key.download_name(&prefix, Utc::now().timestamp_millis());
    info!(mode = mode_name, file = %filename, size = output.len(), "template generated");
    attachment(output, &filename)
}

fn attachment(bytes: Vec<u8>, filename: &str) -> Result<Response, ApiError> {
    let disposition = HeaderValue::try_from(format!("attachment; filename=\"{}\"", filename))
        .map_err(|e| ApiError::Unexpected(format!("invalid download name: {}", e)))?;

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(XLSX_CONTENT_TYPE)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stock_body(json: &str) -> StockUpdateRequest {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_scalar_fields_read_as_text() {
        assert_eq!(stock_body(r#"{"barkod_on_ek": "ABC"}"#).barkod_on_ek.as_deref(), Some("ABC"));
        assert_eq!(stock_body(r#"{"barkod_on_ek": 123}"#).barkod_on_ek.as_deref(), Some("123"));
        assert_eq!(stock_body(r#"{"barkod_on_ek": -7}"#).barkod_on_ek.as_deref(), Some("-7"));
        assert_eq!(stock_body(r#"{"barkod_on_ek": 1.5}"#).barkod_on_ek.as_deref(), Some("1.5"));
        assert_eq!(stock_body(r#"{"barkod_on_ek": true}"#).barkod_on_ek.as_deref(), Some("true"));

        for absent in [r#"{}"#, r#"{"barkod_on_ek": null}"#, r#"{"barkod_on_ek": false}"#, r#"{"barkod_on_ek": 0}"#] {
            assert_eq!(stock_body(absent).barkod_on_ek, None, "{absent}");
        }
    }

    #[test]
    fn test_required_rejects_missing_and_empty() {
        assert_eq!(required("x", Some("v".to_string())).unwrap(), "v");
        for value in [None, Some(String::new())] {
            let err = required("barkod_on_ek", value).unwrap_err();
            assert_eq!(err.to_string(), "missing required field: barkod_on_ek");
        }
    }
}
