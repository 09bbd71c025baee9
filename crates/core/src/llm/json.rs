use crate::domain::contract::LlmAdviceItem;
use anyhow::Context;

/// Locates the advice array in free-form model output. Markdown fences are
/// stripped first; otherwise the span from the first `[` to the last `]` is
/// taken (greedy, so nested arrays inside entries are safe).
pub fn extract_json_array(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.starts_with("```") {
        let mut inner = trimmed;
        if let Some(after_first) = inner.splitn(2, '\n').nth(1) {
            inner = after_first;
        }
        if let Some(end) = inner.rfind("```") {
            inner = &inner[..end];
        }
        return extract_json_array_span(inner.trim()).or_else(|| Some(inner.trim().to_string()));
    }

    extract_json_array_span(trimmed)
}

fn extract_json_array_span(text: &str) -> Option<String> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    if end <= start {
        return None;
    }
    Some(text[start..=end].trim().to_string())
}

pub fn parse_advices(text: &str) -> anyhow::Result<Vec<LlmAdviceItem>> {
    let json_str = extract_json_array(text)
        .with_context(|| format!("no JSON array found in LLM output: {text}"))?;
    serde_json::from_str::<Vec<LlmAdviceItem>>(&json_str)
        .with_context(|| format!("LLM output is not a valid advice array: {json_str}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::recommendation::RecommendationType;
    use serde_json::json;

    fn advice_array_json() -> String {
        json!([
            {
                "symbol": "AAPL",
                "recommendation_type": "buy",
                "confidence_score": 0.82,
                "target_price": 195.0,
                "reasoning": "strong momentum"
            },
            {
                "symbol": "MSFT",
                "recommendation_type": "hold",
                "confidence_score": 0.65,
                "target_price": 410.0,
                "reasoning": "fairly valued"
            }
        ])
        .to_string()
    }

    #[test]
    fn extracts_array_from_surrounding_prose() {
        let text = format!("Here is my analysis:\n{}\nLet me know!", advice_array_json());
        let advices = parse_advices(&text).unwrap();
        assert_eq!(advices.len(), 2);
        assert_eq!(advices[0].symbol, "AAPL");
        assert_eq!(advices[1].recommendation_type, RecommendationType::Hold);
    }

    #[test]
    fn extracts_array_from_fenced_block() {
        let text = format!("```json\n{}\n```", advice_array_json());
        let advices = parse_advices(&text).unwrap();
        assert_eq!(advices.len(), 2);
    }

    #[test]
    fn bare_array_parses() {
        let advices = parse_advices(&advice_array_json()).unwrap();
        assert_eq!(advices.len(), 2);
    }

    #[test]
    fn missing_array_is_an_error() {
        assert!(parse_advices("I cannot provide recommendations.").is_err());
    }

    #[test]
    fn truncated_array_is_an_error() {
        let full = advice_array_json();
        let truncated = &full[..full.len() - 20];
        assert!(parse_advices(truncated).is_err());
    }
}
