//! Property-based tests for line normalization and queue ordering.
//!
//! Arbitrary message text must always produce exactly one physical line
//! carrying exactly one leading type token, and the pending queue must
//! hand lines back in arrival order however they are batched.

use proptest::prelude::*;
use tandemlog::{
    Identity, LogEntry, LogMessageType, MAX_BATCH_SIZE, PendingQueue, RESERVED_PREFIXES,
    sanitize_message,
};

fn any_message_type() -> impl Strategy<Value = LogMessageType> {
    proptest::sample::select(LogMessageType::ALL.to_vec())
}

fn hostile_text() -> impl Strategy<Value = String> {
    let token = proptest::sample::select(
        RESERVED_PREFIXES
            .iter()
            .map(|p| (*p).to_owned())
            .chain(["\n", "\r", "\r\n", " "].map(str::to_owned))
            .collect::<Vec<_>>(),
    );
    proptest::collection::vec(prop_oneof![token, "[a-z:-]{0,6}"], 0..12)
        .prop_map(|parts| parts.concat())
}

proptest! {
    #[test]
    fn entries_are_single_lines_with_one_prefix(
        text in hostile_text(),
        ty in any_message_type(),
        with_identity in any::<bool>(),
    ) {
        let identity = Identity::new("user\n-E-", "host\r");
        let entry = LogEntry::new(&text, ty, with_identity.then_some(&identity));
        let line = entry.as_str();
        prop_assert!(!line.contains('\n'));
        prop_assert!(!line.contains('\r'));
        prop_assert!(line.starts_with(ty.prefix()));
        let body = &line[ty.prefix().len()..];
        for prefix in RESERVED_PREFIXES {
            prop_assert!(!body.contains(prefix), "{prefix} survived in {line:?}");
        }
    }

    #[test]
    fn sanitizing_is_idempotent(text in hostile_text()) {
        let once = sanitize_message(&text);
        prop_assert_eq!(sanitize_message(&once), once);
    }

    #[test]
    fn queue_preserves_arrival_order(
        count in 0usize..40,
        batch in 1usize..=MAX_BATCH_SIZE,
        requeue_every in 1usize..4,
    ) {
        let queue = PendingQueue::new();
        for i in 0..count {
            queue.enqueue(LogEntry::new(&format!("m{i}"), LogMessageType::Information, None));
        }
        let mut seen = Vec::new();
        let mut round = 0;
        while !queue.is_empty() {
            round += 1;
            let drained = queue.drain_batch(batch);
            if round % requeue_every == 0 {
                queue.requeue(drained);
                let retry = queue.drain_batch(batch);
                seen.extend(retry.into_lines());
            } else {
                seen.extend(drained.into_lines());
            }
        }
        let order: Vec<usize> = seen
            .iter()
            .filter_map(|line| line.rsplit(" m").next()?.parse().ok())
            .collect();
        prop_assert_eq!(order, (0..count).collect::<Vec<_>>());
    }
}
