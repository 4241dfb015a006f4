//! Stage-selector entry point for the analysis pipeline.
//!
//! Callers name any subset of the stages; later stages implicitly run the
//! earlier ones they depend on (classification needs normalized input,
//! normalization needs cleansed input). The output carries only the keys
//! for the stages that were actually requested, plus per-stage timings.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::classify::{classify_item, ClassificationMode};
use crate::cleanse::cleanse;
use crate::error::PipelineError;
use crate::llm::GenerativeClient;
use crate::normalize::normalize;
use crate::types::{
    ClassifiedItem, CleansedFragment, NormalizedItem, OcrFragment, StageTimings,
    UserSafetyContext,
};

/// Timing keys, shared with the background worker.
pub const STAGE_CLEANSE: &str = "cleanse";
pub const STAGE_NORMALIZE: &str = "normalize";
pub const STAGE_CLASSIFY: &str = "classify";

/// A pipeline stage a caller can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Cleanse,
    Normalize,
    Classify,
}

/// Partial pipeline output: only the requested stages' keys are present.
#[derive(Debug, Default, Serialize, ToSchema)]
pub struct PipelineOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleansed: Option<Vec<CleansedFragment>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normalized: Option<Vec<NormalizedItem>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classified: Option<Vec<ClassifiedItem>>,
    pub timings: StageTimings,
}

/// Run the requested stages over a batch of OCR fragments.
///
/// `context` and `client` are only required when classification is
/// requested.
pub async fn run_stages(
    fragments: &[OcrFragment],
    stages: &[Stage],
    context: Option<&UserSafetyContext>,
    client: Option<&dyn GenerativeClient>,
    mode: ClassificationMode,
) -> Result<PipelineOutput, PipelineError> {
    let want = |stage: Stage| stages.contains(&stage);
    let need_classify = want(Stage::Classify);
    let need_normalize = want(Stage::Normalize) || need_classify;
    let need_cleanse = want(Stage::Cleanse) || need_normalize;

    let mut out = PipelineOutput::default();

    let mut cleansed: Vec<CleansedFragment> = Vec::new();
    if need_cleanse {
        let start = Instant::now();
        cleansed = cleanse(fragments);
        out.timings
            .insert(STAGE_CLEANSE.to_string(), elapsed_ms(start));
        if want(Stage::Cleanse) {
            out.cleansed = Some(cleansed.clone());
        }
    }

    let mut normalized: Vec<NormalizedItem> = Vec::new();
    if need_normalize {
        let start = Instant::now();
        normalized = normalize(&cleansed);
        out.timings
            .insert(STAGE_NORMALIZE.to_string(), elapsed_ms(start));
        if want(Stage::Normalize) {
            out.normalized = Some(normalized.clone());
        }
    }

    if need_classify {
        let context = context.ok_or(PipelineError::MissingSafetyContext)?;
        let client = client.ok_or(PipelineError::MissingClassifier)?;

        let start = Instant::now();
        let mut classified = Vec::with_capacity(normalized.len());
        for item in &normalized {
            classified.push(classify_item(client, item, context, mode).await);
        }
        out.timings
            .insert(STAGE_CLASSIFY.to_string(), elapsed_ms(start));
        out.classified = Some(classified);
    }

    Ok(out)
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}
