//! Property tests for the pure layers: key derivation, the portable codec,
//! and the merge function.

use proptest::prelude::*;
use uuid::Uuid;

use homebound::codec;
use homebound::model::{Document, Frequency, Settings, Task, Theme};
use homebound::sync::reconciler;
use homebound::vault::VaultKey;

fn frequency_strategy() -> impl Strategy<Value = Frequency> {
    prop_oneof![
        Just(Frequency::Daily),
        Just(Frequency::Alternate),
        Just(Frequency::Weekly),
        Just(Frequency::OneTime),
        Just(Frequency::Custom),
    ]
}

fn task_strategy() -> impl Strategy<Value = Task> {
    // Ids drawn from a small pool so that two generated documents share some
    // tasks, exercising the union-by-id path.
    (0u128..16, "[a-zA-Z0-9 ]{1,24}", frequency_strategy(), 0usize..32, any::<Option<i64>>())
        .prop_map(|(id, name, frequency, index, last_dismissed)| {
            let mut task = Task::new(name, frequency, index);
            task.id = Uuid::from_u128(id);
            task.last_dismissed = last_dismissed;
            task
        })
}

fn document_strategy() -> impl Strategy<Value = Document> {
    (
        prop::collection::vec(task_strategy(), 0..6),
        prop::collection::vec("[a-z ]{1,16}", 0..4),
        "[a-z0-9]{1,12}",
        any::<bool>(),
        0i64..1_000_000_000,
    )
        .prop_map(|(mut tasks, mut today_list, email_local, dark, clock)| {
            // Ids and list entries are unique within one document, matching
            // what the engine's own mutations produce.
            let mut seen = std::collections::HashSet::new();
            tasks.retain(|t| seen.insert(t.id));
            let mut seen = std::collections::HashSet::new();
            today_list.retain(|n| seen.insert(n.clone()));
            Document {
                tasks,
                today_list,
                settings: Settings {
                    email: format!("{}@example.com", email_local),
                    theme: if dark { Theme::Dark } else { Theme::Light },
                    has_onboarded: true,
                    ..Settings::default()
                },
                last_reset_timestamp: clock,
                last_updated: clock,
            }
        })
}

proptest! {
    #[test]
    fn vault_key_is_symmetric(a in ".{0,40}", b in ".{0,40}") {
        prop_assert_eq!(
            VaultKey::derive(&a, Some(&b)),
            VaultKey::derive(&b, Some(&a))
        );
    }

    #[test]
    fn vault_key_is_deterministic_and_url_safe(email in ".{0,60}") {
        let first = VaultKey::derive(&email, None);
        let second = VaultKey::derive(&email, None);
        prop_assert_eq!(&first, &second);
        prop_assert!(first.as_str().chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
    }

    #[test]
    fn vault_key_ignores_case_and_whitespace(email in "[a-z0-9@.]{1,30}") {
        let messy = format!("  {} ", email.to_uppercase());
        prop_assert_eq!(
            VaultKey::derive(&email, None),
            VaultKey::derive(&messy, None)
        );
    }

    #[test]
    fn codec_round_trips_any_document(doc in document_strategy()) {
        let restored = codec::import(&codec::export(&doc)).unwrap();
        prop_assert_eq!(restored.tasks, doc.tasks);
        prop_assert_eq!(restored.settings, doc.settings);
        prop_assert_eq!(restored.today_list, doc.today_list);
    }

    #[test]
    fn codec_import_never_panics(code in ".{0,200}") {
        // Arbitrary input must come back as a value, never a panic.
        let _ = codec::import(&code);
    }

    #[test]
    fn merge_never_drops_a_task(local in document_strategy(), remote in document_strategy()) {
        let merged = reconciler::merge(&local, &remote);
        for task in local.tasks.iter().chain(remote.tasks.iter()) {
            prop_assert!(merged.tasks.iter().any(|t| t.id == task.id));
        }
    }

    #[test]
    fn merge_prefers_local_on_shared_ids(local in document_strategy(), remote in document_strategy()) {
        let merged = reconciler::merge(&local, &remote);
        for task in &local.tasks {
            let kept = merged.tasks.iter().find(|t| t.id == task.id).unwrap();
            prop_assert_eq!(kept, task);
        }
    }

    #[test]
    fn merge_is_idempotent(local in document_strategy(), remote in document_strategy()) {
        let once = reconciler::merge(&local, &remote);
        let twice = reconciler::merge(&once, &remote);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn merge_today_list_has_no_duplicates(local in document_strategy(), remote in document_strategy()) {
        let merged = reconciler::merge(&local, &remote);
        let mut seen = std::collections::HashSet::new();
        for name in &merged.today_list {
            prop_assert!(seen.insert(name.clone()), "duplicate entry {:?}", name);
        }
    }
}
