//! # Shape Normalization
//!
//! Configuration documents are hand-written, so a single template may be a
//! bare string where a list is expected, and expanded kernel lists may be
//! one- or two-dimensional. These helpers normalize those shapes or reject
//! them with `InvalidArgument`.

use crate::KernqlError;
use serde_json::Value;

/// A string, or an array of strings, as a list.
pub fn string_list(value: &Value) -> Result<Vec<String>, KernqlError> {
    match value {
        Value::String(s) => Ok(vec![s.clone()]),
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_str().map(str::to_string).ok_or_else(|| {
                    KernqlError::InvalidArgument(format!(
                        "Input json is not a valid Json array of strings: {}",
                        value
                    ))
                })
            })
            .collect(),
        other => Err(KernqlError::InvalidArgument(format!(
            "Input json is not a valid Json array: {}",
            other
        ))),
    }
}

/// Kernel groups of an expanded `kernels` leaf.
///
/// A bare string is one group of one. An array must hold arrays of strings;
/// empty groups and empty entries are skipped.
pub fn kernel_groups(value: &Value) -> Result<Vec<Vec<String>>, KernqlError> {
    let invalid = || {
        KernqlError::InvalidArgument(format!(
            "Input json is not a valid 2D Json array: {}",
            value
        ))
    };

    match value {
        Value::String(s) => Ok(vec![vec![s.clone()]]),
        Value::Array(groups) => {
            let mut out = Vec::with_capacity(groups.len());
            for group in groups {
                let Value::Array(entries) = group else {
                    return Err(invalid());
                };
                if entries.is_empty() {
                    continue;
                }
                let mut paths = Vec::with_capacity(entries.len());
                for entry in entries {
                    match entry {
                        Value::String(s) if s.is_empty() => {}
                        Value::String(s) => paths.push(s.clone()),
                        Value::Null => {}
                        _ => return Err(invalid()),
                    }
                }
                out.push(paths);
            }
            Ok(out)
        }
        _ => Err(invalid()),
    }
}

/// Groups back into a JSON 2-D array.
pub fn groups_to_value(groups: Vec<Vec<String>>) -> Value {
    Value::Array(
        groups
            .into_iter()
            .map(|g| Value::Array(g.into_iter().map(Value::String).collect()))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn string_list_accepts_string_or_array() {
        assert_eq!(string_list(&json!("a")).expect("list"), vec!["a"]);
        assert_eq!(
            string_list(&json!(["a", "b"])).expect("list"),
            vec!["a", "b"]
        );
        assert!(string_list(&json!(5)).is_err());
        assert!(string_list(&json!(["a", 1])).is_err());
    }

    #[test]
    fn kernel_groups_shapes() {
        let two_d = json!([["a", "b"], [], ["c"]]);
        assert_eq!(
            kernel_groups(&two_d).expect("groups"),
            vec![vec!["a".to_string(), "b".to_string()], vec!["c".to_string()]]
        );
        assert_eq!(
            kernel_groups(&json!("single")).expect("groups"),
            vec![vec!["single".to_string()]]
        );

        let one_d = json!(["a", "b"]);
        let err = kernel_groups(&one_d).expect_err("1-D rejected");
        assert!(err.to_string().contains("not a valid 2D Json array"));
    }

    #[test]
    fn groups_convert_back() {
        let value = groups_to_value(vec![vec!["x".to_string()]]);
        assert_eq!(value, json!([["x"]]));
    }
}
