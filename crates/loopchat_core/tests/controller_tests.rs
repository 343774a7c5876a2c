//! Integration tests for the conversation controller.

use std::sync::Arc;

use async_trait::async_trait;
use mockall::mock;
use tokio::sync::Notify;

use loopchat_core::{
    BotReply, BotResponder, ChatController, ChatEvent, ChatResult, FaultKind, FileStore,
    KeyValueStore, MemoryStore, MockResponder, MockResponse, QuickReply, Turn, Visibility,
    WidgetConfig, CHATS_SLOT, DEFAULT_GREETING, NO_RESPONSE_TEXT, SELECTED_INDEX_SLOT,
};

mock! {
    pub Bot {}

    #[async_trait]
    impl BotResponder for Bot {
        async fn send(&self, utterance: &str, conversation_id: i64) -> ChatResult<BotReply>;
    }
}

fn config() -> WidgetConfig {
    WidgetConfig::new("http://bot.test/chat")
}

fn controller(store: &MemoryStore, responder: &MockResponder) -> ChatController {
    ChatController::new(config(), Arc::new(store.clone()), Arc::new(responder.clone()))
}

/// Fresh store: one greeting bot turn, first conversation selected.
#[test]
fn test_fresh_store_seeds_greeting() {
    let store = MemoryStore::new();
    let ctl = controller(&store, &MockResponder::new());

    assert_eq!(ctl.active_index(), 0);
    assert_eq!(ctl.conversation_count(), 1);
    assert_eq!(ctl.active_transcript(), vec![Turn::bot(DEFAULT_GREETING, Vec::new())]);
    assert!(store.raw(CHATS_SLOT).unwrap().contains("Loopi's friendly chatbot"));
}

/// The user turn is stored before the responder sees the message.
#[tokio::test]
async fn test_user_turn_persisted_before_network_call() {
    let store = MemoryStore::new();
    let observed = store.clone();

    let mut bot = MockBot::new();
    bot.expect_send().times(1).returning(move |utterance, conversation_id| {
        let stored = observed.raw(CHATS_SLOT).unwrap_or_default();
        assert!(stored.contains(r#"{"user":"where is my order?"}"#));
        assert_eq!(utterance, "where is my order?");
        assert_eq!(conversation_id, 1);
        Ok(BotReply::plain("Let me check."))
    });

    let ctl = ChatController::new(config(), Arc::new(store.clone()), Arc::new(bot));
    ctl.submit_user_message("  where is my order?  ").await;

    let transcript = ctl.active_transcript();
    assert_eq!(transcript.len(), 3);
    assert_eq!(transcript[1], Turn::user("where is my order?"));
    assert_eq!(transcript[2], Turn::bot("Let me check.", Vec::new()));
}

/// Blank submissions touch neither the store nor the network.
#[tokio::test]
async fn test_blank_submissions_are_noops() {
    let store = MemoryStore::new();
    let mut bot = MockBot::new();
    bot.expect_send().times(0);

    let ctl = ChatController::new(config(), Arc::new(store.clone()), Arc::new(bot));
    let writes = store.write_count();
    let before = ctl.active_transcript();

    ctl.submit_user_message("").await;
    ctl.submit_user_message("   ").await;
    ctl.submit_user_message("\n\t").await;
    ctl.submit_button_payload(" ").await;

    assert_eq!(ctl.active_transcript(), before);
    assert_eq!(store.write_count(), writes);
}

#[tokio::test]
async fn test_reply_with_buttons_is_appended() {
    let store = MemoryStore::new();
    let mock = MockResponder::new();
    mock.push(MockResponse::with_buttons("hi", vec![QuickReply::new("Yes", "yes")]));
    let ctl = controller(&store, &mock);

    ctl.submit_user_message("hello").await;

    let last = ctl.active_transcript().pop().unwrap();
    assert_eq!(last, Turn::bot("hi", vec![QuickReply::new("Yes", "yes")]));
    assert!(store
        .raw(CHATS_SLOT)
        .unwrap()
        .ends_with(r#"{"user":"hello"},{"bot":"hi","buttons":[{"title":"Yes","payload":"yes"}]}]]"#));
}

#[tokio::test]
async fn test_empty_reply_uses_fallback_text() {
    let store = MemoryStore::new();
    let mut bot = MockBot::new();
    bot.expect_send()
        .returning(|_, _| Ok(loopchat_core::parse_reply("{}").unwrap()));

    let ctl = ChatController::new(config(), Arc::new(store), Arc::new(bot));
    ctl.submit_user_message("hello").await;

    let last = ctl.active_transcript().pop().unwrap();
    assert_eq!(last, Turn::bot(NO_RESPONSE_TEXT, Vec::new()));
}

/// A failed request leaves only the user turn behind.
#[tokio::test]
async fn test_responder_failure_adds_no_bot_turn() {
    let store = MemoryStore::new();
    let mock = MockResponder::new();
    mock.push(MockResponse::failure("Network error: connection refused"));
    let ctl = controller(&store, &mock);
    let mut events = ctl.subscribe();

    ctl.submit_user_message("anyone there?").await;

    let transcript = ctl.active_transcript();
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript[1], Turn::user("anyone there?"));
    assert!(store.raw(CHATS_SLOT).unwrap().contains("anyone there?"));

    let faults: Vec<_> = std::iter::from_fn(|| events.try_recv().ok())
        .filter_map(|e| match e {
            ChatEvent::Fault(f) => Some(f),
            _ => None,
        })
        .collect();
    assert_eq!(faults.len(), 1);
    assert_eq!(faults[0].kind, FaultKind::Responder);
}

#[tokio::test]
async fn test_toggle_twice_restores_visibility() {
    let store = MemoryStore::new();
    let mock = MockResponder::new();
    let ctl = controller(&store, &mock);
    let writes = store.write_count();
    let transcript = ctl.active_transcript();

    assert_eq!(ctl.visibility(), Visibility::Closed);
    assert_eq!(ctl.toggle(), Visibility::Open);
    assert!(ctl.is_open());
    assert_eq!(ctl.toggle(), Visibility::Closed);

    assert_eq!(ctl.active_transcript(), transcript);
    assert_eq!(store.write_count(), writes);
    assert_eq!(mock.call_count(), 0);
}

/// Quick-reply clicks are not echoed as user turns.
#[tokio::test]
async fn test_button_payload_skips_user_turn() {
    let store = MemoryStore::new();
    let mock = MockResponder::new();
    mock.push(MockResponse::reply("Here are our plans."));
    let ctl = controller(&store, &mock);

    ctl.submit_button_payload("show_plans").await;

    assert_eq!(mock.calls()[0].utterance, "show_plans");
    let transcript = ctl.active_transcript();
    assert_eq!(transcript.len(), 2);
    assert!(transcript.iter().all(|t| t.is_bot()));
    assert_eq!(transcript[1].text(), "Here are our plans.");
}

/// Overlapping sends are not serialized; both replies survive, in
/// completion order.
#[tokio::test]
async fn test_overlapping_sends_keep_both_replies() {
    let store = MemoryStore::new();
    let mock = MockResponder::new();
    let first_gate = Arc::new(Notify::new());
    let second_gate = Arc::new(Notify::new());
    mock.push(MockResponse::reply("reply to first").gated(first_gate.clone()))
        .push(MockResponse::reply("reply to second").gated(second_gate.clone()));
    let ctl = controller(&store, &mock);

    tokio::join!(
        ctl.submit_user_message("first"),
        ctl.submit_user_message("second"),
        async {
            while mock.call_count() < 2 {
                tokio::task::yield_now().await;
            }
            second_gate.notify_one();
            while ctl.active_transcript().len() < 4 {
                tokio::task::yield_now().await;
            }
            first_gate.notify_one();
        }
    );

    let texts: Vec<String> = ctl
        .active_transcript()
        .iter()
        .skip(1)
        .map(|t| t.text().to_string())
        .collect();
    assert_eq!(texts.len(), 4);
    assert!(texts[..2].contains(&"first".to_string()));
    assert!(texts[..2].contains(&"second".to_string()));
    assert_eq!(texts[2], "reply to second");
    assert_eq!(texts[3], "reply to first");

    let stored = store.raw(CHATS_SLOT).unwrap();
    assert!(stored.contains("reply to first") && stored.contains("reply to second"));
}

/// Known divergence point: the reply goes to the conversation that was
/// active when the message was sent, not the one selected when it arrives.
#[tokio::test]
async fn test_reply_targets_conversation_active_at_send_time() {
    let store = MemoryStore::new();
    let mock = MockResponder::new();
    let gate = Arc::new(Notify::new());
    mock.push(MockResponse::reply("late reply").gated(gate.clone()));
    let ctl = controller(&store, &mock);

    tokio::join!(ctl.submit_user_message("question"), async {
        while mock.call_count() < 1 {
            tokio::task::yield_now().await;
        }
        assert_eq!(ctl.new_conversation(), 1);
        gate.notify_one();
    });

    assert_eq!(ctl.active_index(), 1);
    assert!(ctl.active_transcript().is_empty());

    let sent_from = ctl.conversation(0).unwrap();
    assert_eq!(sent_from.len(), 3);
    assert_eq!(sent_from.turns()[2].text(), "late reply");
}

/// Storage capacity errors are swallowed; the in-memory transcript carries on.
#[tokio::test]
async fn test_storage_capacity_fault_is_swallowed() {
    let store = MemoryStore::new().with_capacity(200);
    let mock = MockResponder::new();
    mock.push(MockResponse::reply("x".repeat(300)));
    let ctl = controller(&store, &mock);
    let mut events = ctl.subscribe();

    ctl.submit_user_message("hello").await;

    assert_eq!(ctl.active_transcript().len(), 3);
    // The last successful write still holds the user turn
    let stored = store.raw(CHATS_SLOT).unwrap();
    assert!(stored.contains(r#"{"user":"hello"}"#));
    assert!(!stored.contains("xxx"));

    let kinds: Vec<FaultKind> = std::iter::from_fn(|| events.try_recv().ok())
        .filter_map(|e| match e {
            ChatEvent::Fault(f) => Some(f.kind),
            _ => None,
        })
        .collect();
    assert_eq!(kinds, vec![FaultKind::Storage]);
}

/// History survives a restart on a file-backed store.
#[tokio::test]
async fn test_history_survives_restart() {
    let temp = tempfile::tempdir().unwrap();
    let mock = MockResponder::new();
    mock.push(MockResponse::reply("noted"));

    {
        let ctl = ChatController::new(
            config(),
            Arc::new(FileStore::new(temp.path())),
            Arc::new(mock.clone()),
        );
        ctl.new_conversation();
        ctl.submit_user_message("remember me").await;
    }

    let store = FileStore::new(temp.path());
    assert_eq!(store.read(SELECTED_INDEX_SLOT).unwrap().as_deref(), Some("1"));

    let ctl = ChatController::new(config(), Arc::new(store), Arc::new(mock));
    assert_eq!(ctl.conversation_count(), 2);
    assert_eq!(ctl.active_index(), 1);
    assert_eq!(
        ctl.active_transcript(),
        vec![Turn::user("remember me"), Turn::bot("noted", Vec::new())]
    );
}

/// A button without a usable payload costs only that button.
#[tokio::test]
async fn test_malformed_button_keeps_bot_turn() {
    let store = MemoryStore::new();
    let mut bot = MockBot::new();
    bot.expect_send().returning(|_, _| {
        loopchat_core::parse_reply(
            r#"{"text":"Pick a plan","buttons":[{"title":"Basic"},{"title":"Pro","payload":"plan_pro"}]}"#,
        )
    });

    let ctl = ChatController::new(config(), Arc::new(store.clone()), Arc::new(bot));
    let mut events = ctl.subscribe();
    ctl.submit_user_message("plans?").await;

    let last = ctl.active_transcript().pop().unwrap();
    assert_eq!(last, Turn::bot("Pick a plan", vec![QuickReply::new("Pro", "plan_pro")]));
    assert!(store.raw(CHATS_SLOT).unwrap().contains("Pick a plan"));
    assert!(!std::iter::from_fn(|| events.try_recv().ok()).any(|e| matches!(e, ChatEvent::Fault(_))));
}

/// A reply whose conversation was deleted in flight is dropped.
#[tokio::test]
async fn test_reply_for_deleted_conversation_is_dropped() {
    let store = MemoryStore::new();
    let mock = MockResponder::new();
    let gate = Arc::new(Notify::new());
    mock.push(MockResponse::reply("late reply").gated(gate.clone()));
    let ctl = controller(&store, &mock);
    assert_eq!(ctl.new_conversation(), 1);
    let mut events = ctl.subscribe();

    tokio::join!(ctl.submit_user_message("question"), async {
        while mock.call_count() < 1 {
            tokio::task::yield_now().await;
        }
        ctl.delete_conversation(1).unwrap();
        gate.notify_one();
    });

    assert_eq!(ctl.conversation_count(), 1);
    assert_eq!(ctl.active_transcript(), vec![Turn::bot(DEFAULT_GREETING, Vec::new())]);
    assert!(!store.raw(CHATS_SLOT).unwrap().contains("late reply"));

    let kinds: Vec<FaultKind> = std::iter::from_fn(|| events.try_recv().ok())
        .filter_map(|e| match e {
            ChatEvent::Fault(f) => Some(f.kind),
            _ => None,
        })
        .collect();
    assert_eq!(kinds, vec![FaultKind::Model]);
}

/// Deleting an earlier conversation shifts indices; the reply follows the
/// index, not the conversation.
#[tokio::test]
async fn test_reply_after_index_shift_lands_at_same_index() {
    let store = MemoryStore::new();
    let mock = MockResponder::new();
    let gate = Arc::new(Notify::new());
    mock.push(MockResponse::reply("late reply").gated(gate.clone()));
    let ctl = controller(&store, &mock);
    ctl.new_conversation();
    ctl.new_conversation();
    ctl.select_conversation(1).unwrap();

    tokio::join!(ctl.submit_user_message("from the middle"), async {
        while mock.call_count() < 1 {
            tokio::task::yield_now().await;
        }
        ctl.delete_conversation(0).unwrap();
        gate.notify_one();
    });

    assert_eq!(ctl.conversation_count(), 2);
    assert_eq!(
        ctl.conversation(0).unwrap().turns(),
        &[Turn::user("from the middle")][..]
    );
    assert_eq!(
        ctl.conversation(1).unwrap().turns(),
        &[Turn::bot("late reply", Vec::new())][..]
    );
}
