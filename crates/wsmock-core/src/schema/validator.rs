//! PayloadValidator - payload の再帰的バリデーション
//!
//! # 対応しているスキーマ
//! - `type`: string / integer（`minimum` / `maximum` は両端を含む）/ number / object
//! - `enum`: 宣言された type に関係なくチェック
//! - `$ref`: ドキュメントルートからの絶対参照
//! - `oneOf`: 「少なくとも一つ」に合えば OK（排他ではない）
//!
//! object は `properties` の全キーが必須。payload 側の余分なキーは無視する。
//! それ以外の type（array など）は `UnsupportedType` で明示的に失敗する。

use std::cmp::Ordering;

use serde_json::{Map, Number, Value};

use super::error::{FailureReason, SchemaError, ValidationFailure};
use super::resolver::dereference;

/// 期待される失敗（`Err(ValidationFailure)`）と成功。
///
/// 仕様が壊れている場合は外側の `Result` の `Err(SchemaError)` になる。
pub type Validation = Result<(), ValidationFailure>;

const ROOT_PATH: &str = "$";

/// `$ref` / `oneOf` を値を降りずに辿れる上限。循環参照の検出に使う。
const MAX_INDIRECTIONS: usize = 64;

/// Validate `value` against `schema`, resolving `$ref` nodes in `document`.
///
/// Pure: no side effects besides the returned outcome.
pub fn validate_payload(
    value: &Value,
    schema: &Value,
    document: &Value,
) -> Result<Validation, SchemaError> {
    validate_node(value, schema, document, ROOT_PATH, 0)
}

fn validate_node(
    value: &Value,
    node: &Value,
    document: &Value,
    path: &str,
    indirections: usize,
) -> Result<Validation, SchemaError> {
    let schema = node
        .as_object()
        .ok_or_else(|| SchemaError::malformed(path, "schema node is not a mapping"))?;

    let Some(declared) = schema.get("type") else {
        if indirections >= MAX_INDIRECTIONS {
            return Err(SchemaError::malformed(
                path,
                "too many nested $ref/oneOf indirections (reference cycle?)",
            ));
        }
        if let Some(reference) = schema.get("$ref") {
            let reference = reference
                .as_str()
                .ok_or_else(|| SchemaError::malformed(path, "$ref must be a string"))?;
            let target = dereference(reference, document)?;
            return validate_node(value, target, document, path, indirections + 1);
        }
        if let Some(alternatives) = schema.get("oneOf") {
            return validate_one_of(value, alternatives, document, path, indirections + 1);
        }
        return Err(SchemaError::malformed(
            path,
            "schema node has neither type, $ref nor oneOf",
        ));
    };

    if let Some(allowed) = schema.get("enum") {
        let allowed = allowed
            .as_array()
            .ok_or_else(|| SchemaError::malformed(path, "enum must be a sequence"))?;
        if !allowed.contains(value) {
            return Ok(fail(
                path,
                FailureReason::EnumMismatch {
                    value: value.clone(),
                    allowed: allowed.clone(),
                },
            ));
        }
    }

    let declared = declared
        .as_str()
        .ok_or_else(|| SchemaError::malformed(path, "type must be a string"))?;

    match declared {
        "string" => Ok(expect(value.is_string(), value, "string", path)),
        "integer" => validate_integer(value, schema, path),
        "number" => Ok(expect(
            matches!(value, Value::Number(n) if n.is_f64()),
            value,
            "number",
            path,
        )),
        "object" => validate_object(value, schema, document, path),
        other => Err(SchemaError::UnsupportedType {
            path: path.to_string(),
            type_name: other.to_string(),
        }),
    }
}

/// 全ての選択肢を評価し、一つでも通れば成功。
/// 選択肢の中の SchemaError はそのまま伝播する。
fn validate_one_of(
    value: &Value,
    alternatives: &Value,
    document: &Value,
    path: &str,
    indirections: usize,
) -> Result<Validation, SchemaError> {
    let alternatives = alternatives
        .as_array()
        .ok_or_else(|| SchemaError::malformed(path, "oneOf must be a sequence"))?;

    let mut passed = 0usize;
    let mut failures = Vec::new();
    for alternative in alternatives {
        match validate_node(value, alternative, document, path, indirections)? {
            Ok(()) => passed += 1,
            Err(failure) => failures.push(failure),
        }
    }

    if passed > 0 {
        Ok(Ok(()))
    } else {
        Ok(fail(path, FailureReason::NoAlternativeMatched(failures)))
    }
}

fn validate_integer(
    value: &Value,
    schema: &Map<String, Value>,
    path: &str,
) -> Result<Validation, SchemaError> {
    let number = match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => n,
        _ => return Ok(type_mismatch(value, "integer", path)),
    };

    let minimum = bound(schema, "minimum", path)?;
    let maximum = bound(schema, "maximum", path)?;

    let below = minimum
        .as_ref()
        .is_some_and(|min| compare(number, min) == Some(Ordering::Less));
    let above = maximum
        .as_ref()
        .is_some_and(|max| compare(number, max) == Some(Ordering::Greater));

    if below || above {
        return Ok(fail(
            path,
            FailureReason::RangeViolation {
                value: number.clone(),
                minimum,
                maximum,
            },
        ));
    }
    Ok(Ok(()))
}

fn validate_object(
    value: &Value,
    schema: &Map<String, Value>,
    document: &Value,
    path: &str,
) -> Result<Validation, SchemaError> {
    let Some(object) = value.as_object() else {
        return Ok(type_mismatch(value, "object", path));
    };

    let properties = schema
        .get("properties")
        .and_then(Value::as_object)
        .ok_or_else(|| SchemaError::malformed(path, "object schema needs a properties mapping"))?;

    // 欠けているキーは、他のプロパティの正否より先に報告する
    if let Some(missing) = properties.keys().find(|name| !object.contains_key(*name)) {
        return Ok(fail(path, FailureReason::MissingProperty(missing.clone())));
    }

    for (name, property_schema) in properties {
        let Some(property) = object.get(name) else {
            continue;
        };
        let property_path = format!("{path}.{name}");
        // 降りたので indirection のカウントはリセット
        if let Err(failure) = validate_node(property, property_schema, document, &property_path, 0)? {
            return Ok(Err(failure));
        }
    }
    Ok(Ok(()))
}

fn bound(
    schema: &Map<String, Value>,
    key: &str,
    path: &str,
) -> Result<Option<Number>, SchemaError> {
    match schema.get(key) {
        None => Ok(None),
        Some(Value::Number(n)) => Ok(Some(n.clone())),
        Some(_) => Err(SchemaError::malformed(path, format!("{key} must be a number"))),
    }
}

/// 整数同士は i128 で、それ以外は f64 で比較する
fn compare(value: &Number, bound: &Number) -> Option<Ordering> {
    match (as_i128(value), as_i128(bound)) {
        (Some(v), Some(b)) => Some(v.cmp(&b)),
        _ => value.as_f64()?.partial_cmp(&bound.as_f64()?),
    }
}

fn as_i128(n: &Number) -> Option<i128> {
    n.as_i64()
        .map(i128::from)
        .or_else(|| n.as_u64().map(i128::from))
}

fn expect(ok: bool, value: &Value, expected: &'static str, path: &str) -> Validation {
    if ok {
        Ok(())
    } else {
        type_mismatch(value, expected, path)
    }
}

fn type_mismatch(value: &Value, expected: &'static str, path: &str) -> Validation {
    fail(
        path,
        FailureReason::TypeMismatch {
            expected,
            found: kind_of(value),
        },
    )
}

fn fail(path: &str, reason: FailureReason) -> Validation {
    Err(ValidationFailure::new(path, reason))
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
