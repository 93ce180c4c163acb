//! Prompts for each classifier endpoint and parsing of model replies.
//!
//! Models are asked to answer with a bare JSON object. Replies wrapped in
//! markdown code fences are accepted; anything else that is not a JSON
//! object is a validation failure.

use serde_json::Value;

use crate::error::{Result, SieveError};
use crate::types::{ClassificationRequest, EndpointKind};

/// System prompt for `endpoint`.
pub fn system_prompt(endpoint: EndpointKind) -> &'static str {
    match endpoint {
        EndpointKind::AdCheck => {
            "You are an ad detection assistant. Analyze the given search result content \
             and determine if it is likely an advertisement. Respond with {\"isAd\": true/false}."
        }
        EndpointKind::Relevance => {
            "You are a search result relevance analyzer. Calculate the relevance score between \
             the search query and content. Return a JSON response with a score between 0 and 1."
        }
        EndpointKind::Summarize => {
            "You are a reading assistant. Analyze the given content and provide a concise summary \
             and key points. Reply strictly in the format \
             {\"summary\": \"...\", \"keywords\": [\"keyword1\", \"keyword2\", ...]} \
             with no other formatting or markup."
        }
    }
}

/// User message for `request`.
pub fn user_prompt(request: &ClassificationRequest) -> String {
    let query = request.query.as_deref().unwrap_or_default();
    match request.endpoint {
        EndpointKind::AdCheck => format!(
            "Given the user's search query \"{query}\", decide whether the following search \
             result is an advertisement. Reply exactly in the format {{\"isAd\": true/false}}: {}",
            request.content
        ),
        EndpointKind::Relevance => format!(
            "Calculate the relevance score between the search query \"{query}\" and the \
             following content. Reply in the format {{\"relevanceScore\": 0.0-1.0}}: {}",
            request.content
        ),
        EndpointKind::Summarize => format!(
            "Analyze the following content and provide a concise summary and keywords. Reply \
             strictly in the format {{\"summary\": \"...\", \"keywords\": [\"keyword1\", ...]}}:\n\n{}",
            request.content
        ),
    }
}

/// Strip markdown code fences from a model reply.
pub fn strip_code_fences(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Parse a model reply into a JSON object.
///
/// # Errors
///
/// Returns [`SieveError::Validation`] if the reply is not a JSON object.
pub fn parse_reply(reply: &str) -> Result<Value> {
    let body = strip_code_fences(reply);
    let value: Value = serde_json::from_str(body)
        .map_err(|e| SieveError::Validation(format!("reply is not JSON: {e}")))?;
    if !value.is_object() {
        return Err(SieveError::Validation("reply is not a JSON object".into()));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompts_mention_reply_keys() {
        assert!(system_prompt(EndpointKind::AdCheck).contains("isAd"));
        let req = ClassificationRequest::relevance("Rust book", "rust");
        let prompt = user_prompt(&req);
        assert!(prompt.contains("relevanceScore"));
        assert!(prompt.contains("\"rust\""));
        assert!(prompt.ends_with("Rust book"));
    }

    #[test]
    fn summarize_prompt_has_no_query() {
        let req = ClassificationRequest::summarize("long article");
        let prompt = user_prompt(&req);
        assert!(prompt.contains("keywords"));
        assert!(prompt.ends_with("long article"));
    }

    #[test]
    fn parse_plain_object() {
        let value = parse_reply(r#" {"isAd": true} "#).expect("parse");
        assert_eq!(value["isAd"], true);
    }

    #[test]
    fn parse_fenced_object() {
        let value = parse_reply("```json\n{\"summary\": \"s\", \"keywords\": []}\n```")
            .expect("parse");
        assert_eq!(value["summary"], "s");
        let value = parse_reply("```\n{\"relevanceScore\": 0.5}\n```").expect("parse");
        assert_eq!(value["relevanceScore"], 0.5);
    }

    #[test]
    fn prose_is_validation_error() {
        let err = parse_reply("I think this is an ad.").unwrap_err();
        assert_eq!(err.code(), "VALIDATION_FAILED");
    }

    #[test]
    fn non_object_is_validation_error() {
        let err = parse_reply("[1, 2]").unwrap_err();
        assert_eq!(err.code(), "VALIDATION_FAILED");
    }
}
