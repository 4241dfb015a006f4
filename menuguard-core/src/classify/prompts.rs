//! Prompt templates for the safety classifier.
//!
//! Pure formatting functions so the prompt contract can be unit-tested
//! without a live model call. The decision rules live in the prompt text;
//! the calling code only packages context and parses the constrained
//! response.

use crate::types::UserSafetyContext;

fn join_tokens(tokens: &std::collections::BTreeSet<String>) -> String {
    if tokens.is_empty() {
        "none".to_string()
    } else {
        tokens.iter().cloned().collect::<Vec<_>>().join(", ")
    }
}

/// Render the fast binary-screening prompt. The response alphabet is
/// restricted to exactly "S" or "D".
pub fn render_fast_prompt(item_name: &str, context: &UserSafetyContext) -> String {
    format!(
        r#"You are a food safety screener for a person with allergies and dietary restrictions.

Allergies: {allergies}
Dietary restrictions: {diets}

Menu item: {item}

Rules:
- Respond D if any allergen is, or could plausibly be, an ingredient of this dish.
- Respond D if the dish violates any listed dietary restriction (vegetarian, vegan, halal, kosher, gluten-free rules apply to their usual ingredient categories).
- Respond D if you cannot determine what the dish contains.
- Otherwise respond S.

Respond with exactly one character: S or D. No other text."#,
        allergies = join_tokens(&context.allergy_tokens),
        diets = join_tokens(&context.diet_tokens),
        item = item_name,
    )
}

/// Render the detailed analysis prompt. The response is a single JSON
/// object with a tri-state verdict, a translated name, a reason, and the
/// likely ingredient list.
pub fn render_detailed_prompt(item_name: &str, context: &UserSafetyContext) -> String {
    let language = if context.language.is_empty() {
        "en"
    } else {
        &context.language
    };

    format!(
        r#"You are a food safety analyst for a person with allergies and dietary restrictions.

Allergies: {allergies}
Dietary restrictions: {diets}

Menu item: {item}

Classify the item:
- DANGER if any allergen matches a likely ingredient, or a dietary restriction is violated.
- CAUTION only when cross-contamination or "may contain" information is material.
- SAFE otherwise.

Write the reason and the translated dish name in language "{language}".

Respond with ONLY a JSON object, no other text. Example format:
{{"translated_name": "Kimchi stew", "safety_status": "DANGER", "reason": "Contains shrimp paste.", "ingredients": ["kimchi", "pork", "shrimp paste"]}}"#,
        allergies = join_tokens(&context.allergy_tokens),
        diets = join_tokens(&context.diet_tokens),
        item = item_name,
        language = language,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn context() -> UserSafetyContext {
        UserSafetyContext {
            allergy_tokens: BTreeSet::from(["peanuts".to_string(), "shrimp".to_string()]),
            diet_tokens: BTreeSet::from(["vegetarian".to_string()]),
            language: "en".to_string(),
        }
    }

    #[test]
    fn test_fast_prompt_contents() {
        let prompt = render_fast_prompt("김치찌개", &context());
        assert!(prompt.contains("김치찌개"));
        assert!(prompt.contains("peanuts, shrimp"));
        assert!(prompt.contains("vegetarian"));
        assert!(prompt.contains("exactly one character: S or D"));
    }

    #[test]
    fn test_fast_prompt_empty_profile() {
        let prompt = render_fast_prompt("비빔밥", &UserSafetyContext::default());
        assert!(prompt.contains("Allergies: none"));
        assert!(prompt.contains("Dietary restrictions: none"));
    }

    #[test]
    fn test_detailed_prompt_contents() {
        let prompt = render_detailed_prompt("김치찌개", &context());
        assert!(prompt.contains("JSON object"));
        assert!(prompt.contains("safety_status"));
        assert!(prompt.contains("CAUTION"));
        assert!(prompt.contains("language \"en\""));
    }
}
