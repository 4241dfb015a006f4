//! Background analysis worker.
//!
//! Runs the pipeline for one job: OCR (when given an image) → cleanse →
//! normalize → fast classification, then the optional detailed pass.
//! Every outcome lands in a terminal job state: results via
//! `complete_job`, failures via `fail_job`. Classifier failures never
//! reach here — they are absorbed into DANGER verdicts inside the
//! classifier — but OCR has no safe fallback, so its errors fail the job.

use std::time::Instant;

use menuguard_core::{
    classify_item, cleanse, normalize, ocr::OcrError,
    pipeline::{STAGE_CLEANSE, STAGE_NORMALIZE},
    ClassificationMode, ClassifiedItem, OcrFragment, StageTimings, UserSafetyContext,
};
use thiserror::Error;
use uuid::Uuid;

use crate::SharedState;

/// What the worker starts from: pre-recognized fragments or a raw image.
pub enum AnalysisInput {
    Fragments(Vec<OcrFragment>),
    Image(Vec<u8>),
}

#[derive(Error, Debug)]
enum AnalysisError {
    #[error("OCR provider not configured")]
    OcrNotConfigured,

    #[error("OCR failed: {0}")]
    Ocr(#[from] OcrError),
}

/// Run the analysis for a job to a terminal state.
pub async fn run_analysis_job(
    state: SharedState,
    job_id: Uuid,
    input: AnalysisInput,
    context: UserSafetyContext,
    detailed: bool,
) {
    let mut timings = StageTimings::new();

    match run_pipeline(&state, job_id, &mut timings, input, &context, detailed).await {
        Ok(items) => {
            tracing::info!("analysis job {} finished with {} items", job_id, items.len());
            if let Err(e) = state.coordinator.complete_job(job_id, items, timings) {
                tracing::error!("could not complete analysis job {}: {}", job_id, e);
            }
        }
        Err(e) => {
            tracing::warn!("analysis job {} failed: {}", job_id, e);
            if let Err(e) = state.coordinator.fail_job(job_id, &e.to_string(), timings) {
                tracing::error!("could not fail analysis job {}: {}", job_id, e);
            }
        }
    }
}

async fn run_pipeline(
    state: &SharedState,
    job_id: Uuid,
    timings: &mut StageTimings,
    input: AnalysisInput,
    context: &UserSafetyContext,
    detailed: bool,
) -> Result<Vec<ClassifiedItem>, AnalysisError> {
    let fragments = match input {
        AnalysisInput::Fragments(fragments) => fragments,
        AnalysisInput::Image(bytes) => {
            let ocr = state.ocr.as_ref().ok_or(AnalysisError::OcrNotConfigured)?;
            let start = Instant::now();
            let fragments = ocr.recognize(&bytes).await?;
            timings.insert("ocr".to_string(), elapsed_ms(start));
            fragments
        }
    };

    let start = Instant::now();
    let cleansed = cleanse(&fragments);
    timings.insert(STAGE_CLEANSE.to_string(), elapsed_ms(start));

    let start = Instant::now();
    let normalized = normalize(&cleansed);
    timings.insert(STAGE_NORMALIZE.to_string(), elapsed_ms(start));

    let classifier = state.classifier.as_ref();

    let start = Instant::now();
    let mut fast_items = Vec::with_capacity(normalized.len());
    for item in &normalized {
        fast_items.push(classify_item(classifier, item, context, ClassificationMode::Fast).await);
    }
    timings.insert("classify_fast".to_string(), elapsed_ms(start));

    if !detailed {
        return Ok(fast_items);
    }

    // The interim result only improves perceived latency; failing to
    // record it must not fail the job.
    if let Err(e) = state.coordinator.record_quick_result(job_id, fast_items) {
        tracing::warn!("could not record quick result for job {}: {}", job_id, e);
    }

    let start = Instant::now();
    let mut detailed_items = Vec::with_capacity(normalized.len());
    for item in &normalized {
        detailed_items
            .push(classify_item(classifier, item, context, ClassificationMode::Detailed).await);
    }
    timings.insert("classify_detailed".to_string(), elapsed_ms(start));

    Ok(detailed_items)
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}
