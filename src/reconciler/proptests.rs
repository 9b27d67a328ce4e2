//! Property tests for the reconciler

use super::*;
use proptest::prelude::*;
use serde_json::json;

fn arb_arguments() -> impl Strategy<Value = Value> {
    proptest::collection::btree_map(
        "[a-z]{1,6}",
        prop_oneof![
            "[a-zA-Z0-9 ]{0,10}".prop_map(Value::String),
            (-1000i64..1000).prop_map(|n| Value::Number(n.into())),
            any::<bool>().prop_map(Value::Bool),
        ],
        0..5,
    )
    .prop_map(|m| Value::Object(m.into_iter().collect()))
}

/// Cut `text` into pieces at the given char positions
fn split_text(text: &str, cuts: &[usize]) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut cuts: Vec<usize> = cuts.iter().map(|c| c % (chars.len() + 1)).collect();
    cuts.sort_unstable();
    cuts.dedup();

    let mut pieces = Vec::new();
    let mut start = 0;
    for cut in cuts.into_iter().chain(std::iter::once(chars.len())) {
        pieces.push(chars[start..cut].iter().collect());
        start = cut;
    }
    pieces
}

fn event(kind: &str, data: Value) -> ServerEvent {
    ServerEvent::from_parts(kind.to_string(), data).unwrap()
}

fn streamed_call(arguments: &str, cuts: &[usize]) -> Vec<ServerEvent> {
    let mut events = vec![event(
        "response.output_item.added",
        json!({"item": {"type": "function_call", "id": "fc", "name": "f", "arguments": ""}}),
    )];
    for piece in split_text(arguments, cuts) {
        events.push(event(
            "response.function_call_arguments.delta",
            json!({"item_id": "fc", "delta": piece}),
        ));
    }
    events
}

fn apply_all(store: &mut ConversationStore, reconciler: &mut Reconciler, events: &[ServerEvent]) {
    for e in events {
        // Unmatched events are no-ops by contract
        let _ = reconciler.apply(store, e);
    }
}

proptest! {
    #[test]
    fn arguments_done_is_idempotent(
        args in arb_arguments(),
        cuts in proptest::collection::vec(0usize..64, 0..6),
    ) {
        let text = serde_json::to_string(&args).unwrap();
        let done = event(
            "response.function_call_arguments.done",
            json!({"item_id": "fc", "arguments": text}),
        );

        let mut store = ConversationStore::new();
        let mut reconciler = Reconciler::new();
        apply_all(&mut store, &mut reconciler, &streamed_call(&text, &cuts));

        reconciler.apply(&mut store, &done).unwrap();
        let once = store.items().to_vec();
        reconciler.apply(&mut store, &done).unwrap();

        prop_assert_eq!(store.items(), once.as_slice());
        let call = store.items()[0].as_tool_call().unwrap();
        prop_assert_eq!(call.status, ToolStatus::Completed);
        prop_assert_eq!(&call.parsed_arguments, &args);
    }

    #[test]
    fn delta_splitting_does_not_change_the_result(
        args in arb_arguments(),
        cuts in proptest::collection::vec(0usize..64, 0..8),
    ) {
        let text = serde_json::to_string(&args).unwrap();

        let mut whole = ConversationStore::new();
        apply_all(&mut whole, &mut Reconciler::new(), &streamed_call(&text, &[]));

        let mut split = ConversationStore::new();
        apply_all(&mut split, &mut Reconciler::new(), &streamed_call(&text, &cuts));

        let whole_call = whole.items()[0].as_tool_call().unwrap();
        let split_call = split.items()[0].as_tool_call().unwrap();
        prop_assert_eq!(&split_call.arguments, &text);
        prop_assert_eq!(&split_call.parsed_arguments, &whole_call.parsed_arguments);
        prop_assert_eq!(split_call.status, ToolStatus::InProgress);
    }

    #[test]
    fn text_deltas_concatenate(pieces in proptest::collection::vec("[a-z é]{0,8}", 1..10)) {
        let mut store = ConversationStore::new();
        let mut reconciler = Reconciler::new();
        for piece in &pieces {
            let e = event("response.output_text.delta", json!({"item_id": "m", "delta": piece}));
            reconciler.apply(&mut store, &e).unwrap();
        }
        prop_assert_eq!(store.items().len(), 1);
        prop_assert_eq!(store.items()[0].as_message().unwrap().text(), pieces.concat());
    }
}
