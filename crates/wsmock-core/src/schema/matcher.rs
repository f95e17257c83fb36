//! MessageMatcher - payload がどの message 仕様に合うかを調べる
//!
//! message 仕様の形は三通り:
//! - `oneOf`: 選択肢ごとに検証し、通ったもの全ての `name` を集める（複数可）
//! - `$ref`: 参照先の `{name, payload}` で検証
//! - それ以外: channel ローカルな message id をキーにしたコンテナとみなし、
//!   その唯一の値を取り出してから検証

use std::collections::BTreeSet;

use serde_json::Value;
use tracing::debug;

use super::error::SchemaError;
use super::resolver::dereference;
use super::validator::validate_payload;

/// Names of every message specification the payload satisfied.
pub type MatchedMessages = BTreeSet<String>;

/// Match `value` against a message specification.
///
/// A validation failure of one candidate only excludes that candidate.
/// Hard schema errors propagate.
pub fn match_message(
    value: &Value,
    message_spec: &Value,
    document: &Value,
) -> Result<MatchedMessages, SchemaError> {
    let spec = message_spec
        .as_object()
        .ok_or_else(|| SchemaError::malformed("message", "message specification is not a mapping"))?;

    let mut matched = MatchedMessages::new();

    if let Some(alternatives) = spec.get("oneOf") {
        let alternatives = alternatives
            .as_array()
            .ok_or_else(|| SchemaError::malformed("message.oneOf", "oneOf must be a sequence"))?;
        for alternative in alternatives {
            if let Some(name) = match_candidate(value, alternative, document)? {
                matched.insert(name);
            }
        }
        return Ok(matched);
    }

    let candidate = if spec.contains_key("$ref") {
        message_spec
    } else {
        spec.values().next().ok_or_else(|| {
            SchemaError::malformed("message", "message container is empty")
        })?
    };

    if let Some(name) = match_candidate(value, candidate, document)? {
        matched.insert(name);
    }
    Ok(matched)
}

fn match_candidate(
    value: &Value,
    candidate: &Value,
    document: &Value,
) -> Result<Option<String>, SchemaError> {
    let resolved = match candidate.get("$ref") {
        Some(reference) => {
            let reference = reference
                .as_str()
                .ok_or_else(|| SchemaError::malformed("message", "$ref must be a string"))?;
            dereference(reference, document)?
        }
        None => candidate,
    };

    let name = resolved
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| SchemaError::malformed("message", "message needs a string name"))?;
    let payload = resolved
        .get("payload")
        .ok_or_else(|| SchemaError::malformed("message", format!("message {name} has no payload")))?;

    debug!(message_name = name, %value, "validating payload");
    match validate_payload(value, payload, document)? {
        Ok(()) => {
            debug!(message_name = name, "payload passed");
            Ok(Some(name.to_string()))
        }
        Err(failure) => {
            debug!(message_name = name, %failure, "payload did not pass");
            Ok(None)
        }
    }
}
