//! Resolver - `$ref` の参照解決
//!
//! 対応しているのはドキュメントルートからの絶対参照（`#/a/b/c`）のみ。
//! 相対参照や外部ファイル参照は `UnsupportedReference` として明示的に失敗させる。

use serde_json::Value;

use super::error::SchemaError;

const ROOT_MARKER: &str = "#";

/// Dereference an absolute path (`#/components/schemas/person`) against the
/// full specification document.
///
/// Each segment after the root marker is a mapping-key lookup.
pub fn dereference<'a>(reference: &str, document: &'a Value) -> Result<&'a Value, SchemaError> {
    let mut segments = reference.split('/');
    if segments.next() != Some(ROOT_MARKER) {
        return Err(SchemaError::UnsupportedReference(reference.to_string()));
    }

    segments.try_fold(document, |current, segment| {
        current
            .as_object()
            .and_then(|mapping| mapping.get(segment))
            .ok_or_else(|| SchemaError::ReferenceNotFound {
                reference: reference.to_string(),
                segment: segment.to_string(),
            })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn document() -> Value {
        json!({
            "components": {
                "schemas": {
                    "person": { "type": "object", "properties": {} }
                }
            }
        })
    }

    #[test]
    fn resolves_absolute_reference() {
        let doc = document();
        let resolved = dereference("#/components/schemas/person", &doc).unwrap();
        assert_eq!(resolved["type"], "object");
    }

    #[test]
    fn root_marker_alone_is_the_document() {
        let doc = document();
        assert_eq!(dereference("#", &doc).unwrap(), &doc);
    }

    #[rstest]
    #[case::relative("../x")]
    #[case::external("other.yaml#/components/schemas/person")]
    #[case::bare("components/schemas/person")]
    #[case::empty("")]
    fn non_absolute_references_are_unsupported(#[case] reference: &str) {
        let doc = document();
        assert_eq!(
            dereference(reference, &doc),
            Err(SchemaError::UnsupportedReference(reference.to_string()))
        );
    }

    #[test]
    fn missing_segment_is_reported() {
        let doc = document();
        let err = dereference("#/components/schemas/animal", &doc).unwrap_err();
        assert_eq!(
            err,
            SchemaError::ReferenceNotFound {
                reference: "#/components/schemas/animal".to_string(),
                segment: "animal".to_string(),
            }
        );
    }

    #[test]
    fn lookup_through_a_scalar_fails() {
        let doc = json!({ "a": "leaf" });
        assert!(matches!(
            dereference("#/a/b", &doc),
            Err(SchemaError::ReferenceNotFound { segment, .. }) if segment == "b"
        ));
    }
}
