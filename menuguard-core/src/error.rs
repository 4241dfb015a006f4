use thiserror::Error;

/// Errors from the stage-selector pipeline entry point.
///
/// The stages themselves are pure string functions and do not fail; the
/// only failure modes are missing collaborators for a requested stage.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Classification requested without a safety context")]
    MissingSafetyContext,

    #[error("Classification requested without a classifier client")]
    MissingClassifier,
}
