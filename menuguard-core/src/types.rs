//! Core data types for the menu analysis pipeline.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Axis-aligned pixel-space bounding box of a detected text region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// One text region produced by the OCR provider.
///
/// Fragments are not guaranteed to be unique or correctly segmented;
/// the pipeline owns cleaning them up.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OcrFragment {
    pub text: String,
    /// OCR confidence in [0, 1].
    pub confidence: f64,
    pub bounding_box: BoundingBox,
}

/// Output of the cleansing stage for a single fragment.
///
/// `original` is retained for audit/debugging; confidence and bounding box
/// are copied from the source fragment verbatim, never recomputed.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CleansedFragment {
    pub original: String,
    pub cleansed: String,
    pub confidence: f64,
    pub bounding_box: BoundingBox,
}

/// A canonical menu entry after normalization and deduplication.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NormalizedItem {
    pub original: String,
    pub normalized: String,
    pub confidence: f64,
    pub bounding_box: BoundingBox,
}

/// The caller-supplied allergy/diet profile used for classification.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UserSafetyContext {
    pub allergy_tokens: BTreeSet<String>,
    pub diet_tokens: BTreeSet<String>,
    /// Language the user wants reasons/translations in (e.g. "en", "ko").
    pub language: String,
}

/// Safety verdict for a menu item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SafetyStatus {
    Safe,
    /// Only used by detailed classification, for cross-contamination /
    /// "may contain" situations.
    Caution,
    Danger,
}

/// A classified menu entry, ready for presentation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ClassifiedItem {
    pub id: Uuid,
    pub original_name: String,
    pub translated_name: String,
    pub safety_status: SafetyStatus,
    pub reason: String,
    pub ingredients: Vec<String>,
}

/// Per-stage wall-clock timings in milliseconds, keyed by stage name.
pub type StageTimings = BTreeMap<String, u64>;
