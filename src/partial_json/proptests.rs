//! Property tests for the partial JSON decoder
//!
//! Every prefix of a serialized document either fails to decode or decodes
//! to a structural prefix of the full document: nothing appears that the
//! full document does not contain.

use super::{decode, PartialJsonError};
use proptest::prelude::*;
use serde_json::Value;

fn arb_leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        (-100_000i64..100_000).prop_map(|n| Value::Number(n.into())),
        "[a-zA-Z0-9 \"\\\\é/\n]{0,12}".prop_map(Value::String),
    ]
}

fn arb_json() -> impl Strategy<Value = Value> {
    arb_leaf().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            proptest::collection::btree_map("[a-z_\"]{1,6}", inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

fn arb_container() -> impl Strategy<Value = Value> {
    arb_json().prop_filter("containers only", |v| v.is_object() || v.is_array())
}

/// `partial` only holds what `full` holds, with strings possibly cut short.
fn is_structural_prefix(partial: &Value, full: &Value) -> bool {
    match (partial, full) {
        (Value::String(p), Value::String(f)) => f.starts_with(p.as_str()),
        (Value::Array(p), Value::Array(f)) => {
            p.len() <= f.len() && p.iter().zip(f).all(|(a, b)| is_structural_prefix(a, b))
        }
        (Value::Object(p), Value::Object(f)) => p
            .iter()
            .all(|(k, v)| f.get(k).is_some_and(|fv| is_structural_prefix(v, fv))),
        (p, f) => p == f,
    }
}

proptest! {
    #[test]
    fn complete_documents_round_trip(doc in arb_json()) {
        let text = serde_json::to_string(&doc).unwrap();
        if doc.is_number() {
            // A bare number is only known to be complete once terminated
            prop_assert_eq!(decode(&text), Err(PartialJsonError::Incomplete));
            prop_assert_eq!(decode(&format!("{text} ")).unwrap(), doc);
        } else {
            prop_assert_eq!(decode(&text).unwrap(), doc);
        }
    }

    #[test]
    fn prefixes_never_fabricate(doc in arb_json()) {
        let text = serde_json::to_string(&doc).unwrap();
        let boundaries: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();

        for end in boundaries {
            let prefix = text.get(..end).unwrap();
            if let Ok(partial) = decode(prefix) {
                prop_assert!(
                    is_structural_prefix(&partial, &doc),
                    "prefix {:?} decoded to {} which is not a prefix of {}",
                    prefix,
                    partial,
                    doc
                );
            }
        }
    }

    #[test]
    fn container_prefixes_always_decode(doc in arb_container()) {
        let text = serde_json::to_string(&doc).unwrap();
        for (end, _) in text.char_indices().skip(1) {
            let prefix = text.get(..end).unwrap();
            prop_assert!(decode(prefix).is_ok(), "prefix {:?} failed", prefix);
        }
    }
}
