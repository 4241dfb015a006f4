//! OCR provider abstraction.
//!
//! The pipeline consumes OCR output; it does not own an OCR engine. This
//! module defines the provider trait plus an HTTP implementation that
//! posts base64 images to an OCR sidecar service and maps its corner-point
//! boxes to axis-aligned bounding rects.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{BoundingBox, OcrFragment};

/// Hard bound on one OCR request.
pub const OCR_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("OCR request failed: {0}")]
    RequestFailed(String),

    #[error("OCR service returned error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Failed to parse OCR response: {0}")]
    ParseError(String),

    #[error("OCR provider not configured: {0}")]
    NotConfigured(String),
}

/// Trait for OCR providers: image bytes in, text fragments out.
#[async_trait]
pub trait OcrProvider: Send + Sync + fmt::Debug {
    async fn recognize(&self, image: &[u8]) -> Result<Vec<OcrFragment>, OcrError>;
}

/// HTTP OCR client talking to a sidecar recognition service.
#[derive(Debug)]
pub struct HttpOcrProvider {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Serialize)]
struct ImageRequest {
    image_base64: String,
}

/// One detected text box: 4 corner points, text, and a confidence score.
#[derive(Debug, Deserialize)]
struct TextBox {
    #[serde(rename = "box")]
    corners: Vec<Vec<f64>>,
    text: String,
    score: f64,
}

#[derive(Debug, Deserialize)]
struct OcrResponse {
    boxes: Vec<TextBox>,
}

impl TextBox {
    /// Collapse the corner points into an axis-aligned rect.
    fn bounding_box(&self) -> BoundingBox {
        let xs = self.corners.iter().filter_map(|p| p.first().copied());
        let ys = self.corners.iter().filter_map(|p| p.get(1).copied());

        let x_min = xs.clone().fold(f64::INFINITY, f64::min);
        let x_max = xs.fold(f64::NEG_INFINITY, f64::max);
        let y_min = ys.clone().fold(f64::INFINITY, f64::min);
        let y_max = ys.fold(f64::NEG_INFINITY, f64::max);

        if !x_min.is_finite() || !y_min.is_finite() {
            return BoundingBox {
                x: 0.0,
                y: 0.0,
                width: 0.0,
                height: 0.0,
            };
        }

        BoundingBox {
            x: x_min,
            y: y_min,
            width: x_max - x_min,
            height: y_max - y_min,
        }
    }
}

impl HttpOcrProvider {
    /// Create a client for the OCR service at `base_url`.
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(OCR_TIMEOUT)
            .build()
            .expect("failed to build HTTP client");
        Self { client, base_url }
    }

    /// Build a provider from the OCR_ENDPOINT environment variable, if set.
    pub fn from_env() -> Option<Self> {
        std::env::var("OCR_ENDPOINT").ok().map(Self::new)
    }
}

#[async_trait]
impl OcrProvider for HttpOcrProvider {
    async fn recognize(&self, image: &[u8]) -> Result<Vec<OcrFragment>, OcrError> {
        let request = ImageRequest {
            image_base64: general_purpose::STANDARD.encode(image),
        };

        let response = self
            .client
            .post(format!("{}/ocr", self.base_url.trim_end_matches('/')))
            .json(&request)
            .send()
            .await
            .map_err(|e| OcrError::RequestFailed(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| OcrError::RequestFailed(e.to_string()))?;

        if status != 200 {
            return Err(OcrError::ApiError {
                status,
                message: body,
            });
        }

        let parsed: OcrResponse =
            serde_json::from_str(&body).map_err(|e| OcrError::ParseError(e.to_string()))?;

        Ok(parsed
            .boxes
            .into_iter()
            .map(|b| OcrFragment {
                confidence: b.score,
                bounding_box: b.bounding_box(),
                text: b.text,
            })
            .collect())
    }
}
