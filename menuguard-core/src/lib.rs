pub mod classify;
pub mod cleanse;
pub mod error;
pub mod jobs;
pub mod llm;
pub mod normalize;
pub mod ocr;
pub mod pipeline;
pub mod types;

pub use classify::{classify_item, parse_fast_status, ClassificationMode, CLASSIFY_TIMEOUT};
pub use cleanse::cleanse;
pub use error::PipelineError;
pub use jobs::{
    spawn_sweeper, AnalysisJob, InMemoryJobStore, JobCoordinator, JobError, JobStatus, JobStore,
};
pub use llm::{
    create_client_from_env, ClaudeClient, FakeClient, GenerationConstraints, GenerativeClient,
    LlmError,
};
pub use normalize::{edit_distance, normalize, similarity, MERGE_THRESHOLD};
pub use ocr::{HttpOcrProvider, OcrError, OcrProvider};
pub use pipeline::{run_stages, PipelineOutput, Stage};
pub use types::{
    BoundingBox, ClassifiedItem, CleansedFragment, NormalizedItem, OcrFragment, SafetyStatus,
    StageTimings, UserSafetyContext,
};
