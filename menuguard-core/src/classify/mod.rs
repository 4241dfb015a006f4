//! Safety classification decision policy.
//!
//! Judgment is delegated to an external generative model; this module's
//! job is the policy wrapping that call: deterministic prompt packaging,
//! strict generation constraints, and conservative parsing. The binding
//! invariant: any response that cannot be positively read as SAFE (empty,
//! malformed, call failure, timeout) resolves to DANGER. "Unable to
//! confirm safety" must read as unsafe, never as an error and never as
//! safe.

pub mod prompts;

use std::time::Duration;

use serde::Deserialize;
use uuid::Uuid;

use crate::llm::{GenerationConstraints, GenerativeClient, LlmError};
use crate::types::{ClassifiedItem, NormalizedItem, SafetyStatus, UserSafetyContext};

/// Hard bound on one classifier call.
pub const CLASSIFY_TIMEOUT: Duration = Duration::from_secs(5);

/// Which classification tier to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassificationMode {
    /// Binary SAFE/DANGER screening: one-token response, zero temperature.
    Fast,
    /// Tri-state verdict with translated name, reason, and ingredients.
    Detailed,
}

/// Classify one normalized menu item against the user's profile.
///
/// Never fails: collaborator errors are absorbed into a DANGER verdict.
pub async fn classify_item(
    client: &dyn GenerativeClient,
    item: &NormalizedItem,
    context: &UserSafetyContext,
    mode: ClassificationMode,
) -> ClassifiedItem {
    match mode {
        ClassificationMode::Fast => classify_fast(client, item, context).await,
        ClassificationMode::Detailed => classify_detailed(client, item, context).await,
    }
}

async fn classify_fast(
    client: &dyn GenerativeClient,
    item: &NormalizedItem,
    context: &UserSafetyContext,
) -> ClassifiedItem {
    let prompt = prompts::render_fast_prompt(&item.normalized, context);

    let (status, reason) = match call(client, &prompt, &GenerationConstraints::fast()).await {
        Ok(response) => (parse_fast_status(&response), String::new()),
        Err(e) => {
            tracing::warn!("fast classification of {:?} failed: {}", item.normalized, e);
            (
                SafetyStatus::Danger,
                "Safety could not be verified".to_string(),
            )
        }
    };

    ClassifiedItem {
        id: Uuid::new_v4(),
        original_name: item.normalized.clone(),
        translated_name: item.normalized.clone(),
        safety_status: status,
        reason,
        ingredients: Vec::new(),
    }
}

async fn classify_detailed(
    client: &dyn GenerativeClient,
    item: &NormalizedItem,
    context: &UserSafetyContext,
) -> ClassifiedItem {
    let prompt = prompts::render_detailed_prompt(&item.normalized, context);

    let verdict = match call(client, &prompt, &GenerationConstraints::detailed()).await {
        Ok(response) => parse_detailed_response(&response),
        Err(e) => {
            tracing::warn!(
                "detailed classification of {:?} failed: {}",
                item.normalized,
                e
            );
            DetailedVerdict::unverified()
        }
    };

    ClassifiedItem {
        id: Uuid::new_v4(),
        original_name: item.normalized.clone(),
        translated_name: verdict
            .translated_name
            .unwrap_or_else(|| item.normalized.clone()),
        safety_status: verdict.safety_status,
        reason: verdict.reason,
        ingredients: verdict.ingredients,
    }
}

async fn call(
    client: &dyn GenerativeClient,
    prompt: &str,
    constraints: &GenerationConstraints,
) -> Result<String, LlmError> {
    match tokio::time::timeout(CLASSIFY_TIMEOUT, client.complete(prompt, constraints)).await {
        Ok(result) => result,
        Err(_) => Err(LlmError::Timeout(CLASSIFY_TIMEOUT)),
    }
}

/// Parse a fast-mode response. The first occurring S or D (after
/// uppercasing and trimming) decides; anything else is DANGER.
pub fn parse_fast_status(response: &str) -> SafetyStatus {
    let upper = response.trim().to_uppercase();
    for c in upper.chars() {
        match c {
            'S' => return SafetyStatus::Safe,
            'D' => return SafetyStatus::Danger,
            _ => {}
        }
    }
    SafetyStatus::Danger
}

#[derive(Debug)]
struct DetailedVerdict {
    translated_name: Option<String>,
    safety_status: SafetyStatus,
    reason: String,
    ingredients: Vec<String>,
}

impl DetailedVerdict {
    fn unverified() -> Self {
        Self {
            translated_name: None,
            safety_status: SafetyStatus::Danger,
            reason: "Safety could not be verified".to_string(),
            ingredients: Vec::new(),
        }
    }
}

/// JSON shape the detailed prompt asks for.
#[derive(Debug, Deserialize)]
struct DetailedJson {
    translated_name: Option<String>,
    safety_status: String,
    reason: Option<String>,
    ingredients: Option<Vec<String>>,
}

/// Parse a detailed-mode JSON response. Parse failures and unknown status
/// strings fall back to DANGER.
fn parse_detailed_response(response: &str) -> DetailedVerdict {
    let body = strip_code_fences(response.trim());

    let parsed: DetailedJson = match serde_json::from_str(body) {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!("unparseable detailed classification response: {}", e);
            return DetailedVerdict::unverified();
        }
    };

    let safety_status = match parsed.safety_status.trim().to_uppercase().as_str() {
        "SAFE" => SafetyStatus::Safe,
        "CAUTION" => SafetyStatus::Caution,
        "DANGER" => SafetyStatus::Danger,
        other => {
            tracing::warn!("unknown safety status {:?} in response", other);
            SafetyStatus::Danger
        }
    };

    DetailedVerdict {
        translated_name: parsed.translated_name,
        safety_status,
        reason: parsed.reason.unwrap_or_default(),
        ingredients: parsed.ingredients.unwrap_or_default(),
    }
}

/// Models sometimes wrap JSON in a markdown code fence despite being told
/// not to.
fn strip_code_fences(text: &str) -> &str {
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    text.strip_suffix("```").unwrap_or(text).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::FakeClient;
    use crate::types::BoundingBox;
    use std::collections::BTreeSet;

    fn item(name: &str) -> NormalizedItem {
        NormalizedItem {
            original: name.to_string(),
            normalized: name.to_string(),
            confidence: 0.9,
            bounding_box: BoundingBox {
                x: 0.0,
                y: 0.0,
                width: 10.0,
                height: 10.0,
            },
        }
    }

    fn peanut_context() -> UserSafetyContext {
        UserSafetyContext {
            allergy_tokens: BTreeSet::from(["peanuts".to_string()]),
            diet_tokens: BTreeSet::new(),
            language: "en".to_string(),
        }
    }

    #[test]
    fn test_parse_fast_status_happy_paths() {
        assert_eq!(parse_fast_status("S"), SafetyStatus::Safe);
        assert_eq!(parse_fast_status("D"), SafetyStatus::Danger);
        assert_eq!(parse_fast_status("  s \n"), SafetyStatus::Safe);
        assert_eq!(parse_fast_status("d."), SafetyStatus::Danger);
    }

    #[test]
    fn test_parse_fast_status_first_occurrence_wins() {
        assert_eq!(parse_fast_status("SD"), SafetyStatus::Safe);
        assert_eq!(parse_fast_status("DS"), SafetyStatus::Danger);
        assert_eq!(parse_fast_status("the answer is D"), SafetyStatus::Safe);
    }

    #[test]
    fn test_parse_fast_status_conservative_fallback() {
        for response in ["", "  ", "?", "maybe", "안전", "{}"] {
            assert_eq!(
                parse_fast_status(response),
                SafetyStatus::Danger,
                "response {:?} must fall back to DANGER",
                response
            );
        }
    }

    #[tokio::test]
    async fn test_fast_mode_danger_on_allergen() {
        let client = FakeClient::with_response("땅콩", "D");
        let out = classify_item(
            &client,
            &item("땅콩 소스 샐러드"),
            &peanut_context(),
            ClassificationMode::Fast,
        )
        .await;
        assert_eq!(out.safety_status, SafetyStatus::Danger);
    }

    #[tokio::test]
    async fn test_fast_mode_unconfigured_client_is_danger() {
        // A fake nobody configured (the env factory's fallback) must come
        // down on the DANGER side, allergen hit or not.
        let client = FakeClient::default();
        let out = classify_item(
            &client,
            &item("땅콩 소스 샐러드"),
            &peanut_context(),
            ClassificationMode::Fast,
        )
        .await;
        assert_eq!(out.safety_status, SafetyStatus::Danger);
    }

    #[tokio::test]
    async fn test_fast_mode_uses_fast_constraints() {
        let client = FakeClient::default();
        let _ = classify_item(
            &client,
            &item("비빔밥"),
            &peanut_context(),
            ClassificationMode::Fast,
        )
        .await;
        assert_eq!(client.last_constraints(), Some(GenerationConstraints::fast()));
    }

    #[tokio::test]
    async fn test_fast_mode_empty_response_is_danger() {
        let client = FakeClient::new().with_default_response("");
        let out = classify_item(
            &client,
            &item("비빔밥"),
            &peanut_context(),
            ClassificationMode::Fast,
        )
        .await;
        assert_eq!(out.safety_status, SafetyStatus::Danger);
    }

    #[tokio::test]
    async fn test_fast_mode_call_failure_is_danger() {
        let client = FakeClient::failing("network down");
        let out = classify_item(
            &client,
            &item("비빔밥"),
            &peanut_context(),
            ClassificationMode::Fast,
        )
        .await;
        assert_eq!(out.safety_status, SafetyStatus::Danger);
        assert!(!out.reason.is_empty());
    }

    #[tokio::test]
    async fn test_detailed_mode_parses_json() {
        let client = FakeClient::new().with_default_response(
            r#"{"translated_name": "Kimchi stew", "safety_status": "CAUTION",
                "reason": "May contain traces of shrimp.",
                "ingredients": ["kimchi", "pork", "tofu"]}"#,
        );
        let out = classify_item(
            &client,
            &item("김치찌개"),
            &peanut_context(),
            ClassificationMode::Detailed,
        )
        .await;
        assert_eq!(out.safety_status, SafetyStatus::Caution);
        assert_eq!(out.translated_name, "Kimchi stew");
        assert_eq!(out.ingredients, vec!["kimchi", "pork", "tofu"]);
        assert_eq!(client.last_constraints(), Some(GenerationConstraints::detailed()));
    }

    #[tokio::test]
    async fn test_detailed_mode_code_fenced_json() {
        let client = FakeClient::new().with_default_response(
            "```json\n{\"translated_name\": null, \"safety_status\": \"SAFE\", \"reason\": \"ok\", \"ingredients\": []}\n```",
        );
        let out = classify_item(
            &client,
            &item("비빔밥"),
            &peanut_context(),
            ClassificationMode::Detailed,
        )
        .await;
        assert_eq!(out.safety_status, SafetyStatus::Safe);
        // Falls back to the item name when no translation is given.
        assert_eq!(out.translated_name, "비빔밥");
    }

    #[tokio::test]
    async fn test_detailed_mode_malformed_json_is_danger() {
        let client = FakeClient::new().with_default_response("not json at all");
        let out = classify_item(
            &client,
            &item("김치찌개"),
            &peanut_context(),
            ClassificationMode::Detailed,
        )
        .await;
        assert_eq!(out.safety_status, SafetyStatus::Danger);
    }

    #[tokio::test]
    async fn test_detailed_mode_unknown_status_is_danger() {
        let client = FakeClient::new().with_default_response(
            r#"{"translated_name": "x", "safety_status": "FINE", "reason": "", "ingredients": []}"#,
        );
        let out = classify_item(
            &client,
            &item("김치찌개"),
            &peanut_context(),
            ClassificationMode::Detailed,
        )
        .await;
        assert_eq!(out.safety_status, SafetyStatus::Danger);
    }
}
