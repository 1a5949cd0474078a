mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use courier_core::{BotCommand, Chat, ChatId, ChatKind, Event, MediaKind, MessageEntity, MessageRef, UserId};
use courier_framework::{
    AccessPolicy, DispatchOutcome, EnablementStore, Engine, EngineBuilder, EngineError, HandlerSpec,
    InMemoryAllowList, InMemoryEnablement, MessageFilter, callback,
};

fn engine_with(transport: &Arc<RecordingTransport>, plugins: Vec<TestPlugin>) -> Engine {
    let mut builder = Engine::builder().transport(transport.clone());
    for plugin in plugins {
        builder.register(Arc::new(plugin)).unwrap();
    }
    builder.build(bot()).unwrap()
}

fn quote_command(recorder: &Recorder, label: &str) -> HandlerSpec {
    HandlerSpec::command(r"(?i)^/quote(?:@{bot})?$", recorder.callback(label))
}

#[tokio::test]
async fn first_matching_handler_wins() {
    let transport = RecordingTransport::new();
    let recorder = Recorder::new();
    let engine = engine_with(
        &transport,
        vec![
            TestPlugin::new("first", vec![quote_command(&recorder, "first-a"), quote_command(&recorder, "first-b")]),
            TestPlugin::new("second", vec![quote_command(&recorder, "second")]),
        ],
    );

    let outcome = engine.dispatch(message(group(GROUP), MEMBER, "/quote")).await;

    assert_eq!(recorder.labels(), ["first-a"]);
    assert_eq!(
        outcome,
        DispatchOutcome::Handled {
            plugin: Arc::from("first"),
            handler: 0,
            failed: false
        }
    );
}

#[tokio::test]
async fn globally_disabled_plugin_never_matches() {
    let transport = RecordingTransport::new();
    let recorder = Recorder::new();
    let mut builder = EngineBuilder::new()
        .transport(transport.clone())
        .enablement_persistence(Arc::new(InMemoryEnablement::new(true).with_plugin("quotes", false)));
    builder
        .register(Arc::new(TestPlugin::new("quotes", vec![quote_command(&recorder, "quote")])))
        .unwrap();
    let engine = builder.build(bot()).unwrap();

    for chat in [group(GROUP), group(OTHER_GROUP), Chat::private(MEMBER)] {
        let outcome = engine.dispatch(message(chat, MEMBER, "/quote")).await;
        assert_eq!(outcome, DispatchOutcome::Unhandled);
    }
    assert_eq!(recorder.count(), 0);
}

#[tokio::test]
async fn chat_override_only_silences_that_chat() {
    let transport = RecordingTransport::new();
    let recorder = Recorder::new();
    let engine = engine_with(&transport, vec![TestPlugin::new("quotes", vec![quote_command(&recorder, "quote")])]);

    engine.enablement().disable_for_chat(&group(GROUP), "quotes").await.unwrap();

    let silenced = engine.dispatch(message(group(GROUP), MEMBER, "/quote")).await;
    assert_eq!(silenced, DispatchOutcome::Unhandled);
    assert_eq!(recorder.count(), 0);

    let other = engine.dispatch(message(group(OTHER_GROUP), MEMBER, "/quote")).await;
    assert!(other.is_handled());
    assert_eq!(recorder.count(), 1);
}

#[tokio::test]
async fn quote_without_stored_quotes_reports_not_found() {
    let transport = RecordingTransport::new();
    let plugin = TestPlugin::new(
        "quotes",
        vec![HandlerSpec::command(
            r"(?i)^/quote(?:@{bot})?$",
            callback(|_ctx| async { "No quotes stored yet.".to_string() }),
        )],
    );
    let engine = engine_with(&transport, vec![plugin]);

    let outcome = engine.dispatch(message(group(GROUP), MEMBER, "/quote")).await;

    assert!(matches!(outcome, DispatchOutcome::Handled { failed: false, .. }));
    assert_eq!(transport.texts(), ["No quotes stored yet."]);
}

#[tokio::test]
async fn admin_only_requires_a_chat_administrator() {
    let transport = RecordingTransport::new();
    let recorder = Recorder::new();
    let engine = engine_with(
        &transport,
        vec![TestPlugin::new(
            "admin",
            vec![HandlerSpec::command(r"^/ban$", recorder.callback("ban")).admin_only()],
        )],
    );

    let denied = engine.dispatch(message(group(GROUP), MEMBER, "/ban")).await;
    assert_eq!(denied, DispatchOutcome::Unhandled);

    let allowed = engine.dispatch(message(group(GROUP), ADMIN, "/ban")).await;
    assert!(allowed.is_handled());

    let private = engine.dispatch(message(Chat::private(ADMIN), ADMIN, "/ban")).await;
    assert_eq!(private, DispatchOutcome::Unhandled);

    assert_eq!(recorder.count(), 1);
}

#[tokio::test]
async fn admin_resolution_failure_denies() {
    let transport = RecordingTransport::new();
    transport.fail_admin_lookup();
    let recorder = Recorder::new();
    let engine = engine_with(
        &transport,
        vec![TestPlugin::new(
            "admin",
            vec![HandlerSpec::command(r"^/ban$", recorder.callback("ban")).admin_only()],
        )],
    );

    let outcome = engine.dispatch(message(group(GROUP), ADMIN, "/ban")).await;

    assert_eq!(outcome, DispatchOutcome::Unhandled);
    assert_eq!(recorder.count(), 0);
}

#[tokio::test]
async fn superusers_pass_admin_checks_everywhere() {
    let transport = RecordingTransport::new();
    transport.fail_admin_lookup();
    let recorder = Recorder::new();
    let mut builder = Engine::builder().transport(transport.clone()).superusers([UserId(77)]);
    builder
        .register(Arc::new(TestPlugin::new(
            "admin",
            vec![HandlerSpec::command(r"^/ban$", recorder.callback("ban")).admin_only()],
        )))
        .unwrap();
    let engine = builder.build(bot()).unwrap();

    assert!(engine.dispatch(message(group(GROUP), 77, "/ban")).await.is_handled());
    assert!(engine.dispatch(message(Chat::private(77), 77, "/ban")).await.is_handled());
}

#[tokio::test]
async fn group_only_skips_private_chats_and_channels() {
    let transport = RecordingTransport::new();
    let recorder = Recorder::new();
    let engine = engine_with(
        &transport,
        vec![TestPlugin::new(
            "quotes",
            vec![quote_command(&recorder, "group").group_only(), quote_command(&recorder, "anywhere")],
        )],
    );

    let channel = Chat {
        id: ChatId(-77),
        kind: ChatKind::Channel,
        title: Some("news".into()),
    };
    engine.dispatch(message(Chat::private(MEMBER), MEMBER, "/quote")).await;
    engine.dispatch(message(channel, MEMBER, "/quote")).await;
    engine.dispatch(message(group(GROUP), MEMBER, "/quote")).await;

    assert_eq!(recorder.labels(), ["anywhere", "anywhere", "group"]);
}

#[tokio::test]
async fn again_button_respects_cooldown() {
    let transport = RecordingTransport::new();
    let recorder = Recorder::new();
    let engine = engine_with(
        &transport,
        vec![TestPlugin::new(
            "quotes",
            vec![HandlerSpec::callback_query(r"^quotes_again$", recorder.callback("again")).cooldown(Duration::from_secs(2))],
        )],
    );
    let press = |id: &str| {
        Arc::new(Event::callback_query(
            5,
            group(GROUP),
            user(MEMBER),
            id,
            "quotes_again",
            Some(MessageRef {
                chat_id: ChatId(GROUP),
                message_id: 50,
            }),
        ))
    };

    let first = engine.dispatch(press("q1")).await;
    let second = engine.dispatch(press("q2")).await;

    assert!(matches!(first, DispatchOutcome::Handled { failed: false, .. }));
    assert_eq!(second, DispatchOutcome::Unhandled);
    assert_eq!(recorder.count(), 1);

    let elsewhere = Arc::new(Event::callback_query(6, group(OTHER_GROUP), user(MEMBER), "q3", "quotes_again", None));
    assert!(engine.dispatch(elsewhere).await.is_handled());
}

#[tokio::test]
async fn remove_buttons_strips_the_pressed_message() {
    let transport = RecordingTransport::new();
    let recorder = Recorder::new();
    let engine = engine_with(
        &transport,
        vec![TestPlugin::new(
            "quotes",
            vec![HandlerSpec::callback_query(r"^again$", recorder.callback("again")).remove_buttons()],
        )],
    );
    let target = MessageRef {
        chat_id: ChatId(GROUP),
        message_id: 9,
    };

    engine
        .dispatch(Arc::new(Event::callback_query(1, group(GROUP), user(MEMBER), "q", "again", Some(target))))
        .await;

    assert_eq!(transport.outbound(), [Outbound::RemoveButtons(target)]);
    assert_eq!(recorder.count(), 1);
}

#[tokio::test]
async fn triggers_are_case_insensitive_and_pass_captures_in_order() {
    let transport = RecordingTransport::new();
    let recorder = Recorder::new();
    let engine = engine_with(
        &transport,
        vec![TestPlugin::new(
            "echo",
            vec![HandlerSpec::command(r"(?i)^/echo(?:@{bot})? (\w+) (\w+)$", recorder.callback("echo"))],
        )],
    );

    engine
        .dispatch(message(group(GROUP), MEMBER, "/ECHO@courier_bot hello world"))
        .await;
    let other_bot = engine
        .dispatch(message(group(GROUP), MEMBER, "/echo@someone_else hello world"))
        .await;

    assert_eq!(recorder.groups(0), ["/ECHO@courier_bot hello world", "hello", "world"]);
    assert_eq!(other_bot, DispatchOutcome::Unhandled);
}

fn media(chat: courier_core::Chat, kind: MediaKind) -> Arc<Event> {
    Arc::new(Event::media(1, chat, user(MEMBER), 30, kind))
}

#[tokio::test]
async fn media_triggers_route_messages_without_text() {
    let transport = RecordingTransport::new();
    let recorder = Recorder::new();
    let engine = engine_with(
        &transport,
        vec![TestPlugin::new(
            "files",
            vec![
                HandlerSpec::message(MessageFilter::Media(MediaKind::Location), recorder.callback("location")),
                HandlerSpec::message(MessageFilter::AnyMedia, recorder.callback("file")),
            ],
        )],
    );

    let location = engine.dispatch(media(group(GROUP), MediaKind::Location)).await;
    let photo = engine.dispatch(media(group(GROUP), MediaKind::Photo)).await;
    let venue = engine.dispatch(media(group(GROUP), MediaKind::Venue)).await;

    assert!(matches!(location, DispatchOutcome::Handled { handler: 0, .. }));
    assert!(matches!(photo, DispatchOutcome::Handled { handler: 1, .. }));
    assert_eq!(venue, DispatchOutcome::Unhandled);
    assert_eq!(recorder.labels(), ["location", "file"]);
}

#[tokio::test]
async fn media_triggers_see_the_caption() {
    let transport = RecordingTransport::new();
    let recorder = Recorder::new();
    let engine = engine_with(
        &transport,
        vec![TestPlugin::new(
            "files",
            vec![
                HandlerSpec::command(r"^/caption$", recorder.callback("caption")),
                HandlerSpec::message(MessageFilter::Media(MediaKind::Document), recorder.callback("document")),
            ],
        )],
    );

    let captioned = Event::media(1, group(GROUP), user(MEMBER), 31, MediaKind::Document).with_caption("report.pdf");
    engine.dispatch(Arc::new(captioned)).await;

    assert_eq!(recorder.labels(), ["document"]);
    assert_eq!(recorder.groups(0), ["report.pdf"]);
}

#[tokio::test]
async fn any_message_catches_what_earlier_plugins_left() {
    let transport = RecordingTransport::new();
    let recorder = Recorder::new();
    let engine = engine_with(
        &transport,
        vec![
            TestPlugin::new("quotes", vec![quote_command(&recorder, "quote")]),
            TestPlugin::new(
                "stats",
                vec![HandlerSpec::message(MessageFilter::AnyMessage, recorder.callback("count")).group_only()],
            ),
        ],
    );

    engine.dispatch(message(group(GROUP), MEMBER, "/quote")).await;
    engine.dispatch(message(group(GROUP), MEMBER, "hello")).await;
    engine.dispatch(media(group(GROUP), MediaKind::Sticker)).await;
    let private = engine.dispatch(message(Chat::private(MEMBER), MEMBER, "hello")).await;

    assert_eq!(recorder.labels(), ["quote", "count", "count"]);
    assert_eq!(private, DispatchOutcome::Unhandled);
}

#[tokio::test]
async fn entity_triggers_match_on_entity_type() {
    let transport = RecordingTransport::new();
    let recorder = Recorder::new();
    let engine = engine_with(
        &transport,
        vec![TestPlugin::new(
            "notify",
            vec![HandlerSpec::entity("mention", recorder.callback("mention"))],
        )],
    );

    let mention = Event::message(1, group(GROUP), user(MEMBER), 32, "ping @admin")
        .with_entity(MessageEntity::new("mention", 5, 6));
    let link = Event::message(2, group(GROUP), user(MEMBER), 33, "see https://example.org")
        .with_entity(MessageEntity::new("url", 4, 19));

    assert!(engine.dispatch(Arc::new(mention)).await.is_handled());
    assert_eq!(engine.dispatch(Arc::new(link)).await, DispatchOutcome::Unhandled);
    assert_eq!(recorder.groups(0), ["ping @admin"]);
}

#[tokio::test]
async fn edits_reach_only_opted_in_handlers() {
    let transport = RecordingTransport::new();
    let recorder = Recorder::new();
    let engine = engine_with(
        &transport,
        vec![TestPlugin::new(
            "calc",
            vec![
                HandlerSpec::command(r"^/plain$", recorder.callback("plain")),
                HandlerSpec::command(r"^/calc$", recorder.callback("calc")).handle_edits(),
            ],
        )],
    );

    let plain = Arc::new(Event::edited_message(1, group(GROUP), user(MEMBER), 4, "/plain"));
    let calc = Arc::new(Event::edited_message(2, group(GROUP), user(MEMBER), 5, "/calc"));

    assert_eq!(engine.dispatch(plain).await, DispatchOutcome::Unhandled);
    assert!(engine.dispatch(calc).await.is_handled());
    assert_eq!(recorder.labels(), ["calc"]);
}

#[tokio::test]
async fn failing_and_panicking_handlers_are_isolated() {
    let transport = RecordingTransport::new();
    let recorder = Recorder::new();
    let engine = engine_with(
        &transport,
        vec![TestPlugin::new(
            "flaky",
            vec![
                HandlerSpec::command(
                    r"^/fail$",
                    callback(|_ctx| async { Err::<(), _>(std::io::Error::other("database offline")) }),
                ),
                HandlerSpec::command(
                    r"^/panic$",
                    callback::<_, _, ()>(|_ctx| async {
                        panic!("boom");
                    }),
                ),
                HandlerSpec::command(r"^/ok$", recorder.callback("ok")),
            ],
        )],
    );

    let failed = engine.dispatch(message(group(GROUP), MEMBER, "/fail")).await;
    let panicked = engine.dispatch(message(group(GROUP), MEMBER, "/panic")).await;
    let fine = engine.dispatch(message(group(GROUP), MEMBER, "/ok")).await;

    assert!(matches!(failed, DispatchOutcome::Handled { failed: true, handler: 0, .. }));
    assert!(matches!(panicked, DispatchOutcome::Handled { failed: true, handler: 1, .. }));
    assert!(matches!(fine, DispatchOutcome::Handled { failed: false, handler: 2, .. }));
}

#[tokio::test]
async fn events_without_text_are_not_routed() {
    let transport = RecordingTransport::new();
    let recorder = Recorder::new();
    let engine = engine_with(
        &transport,
        vec![TestPlugin::new(
            "any",
            vec![
                HandlerSpec::callback_query(r".*", recorder.callback("callback")),
                HandlerSpec::inline(r".*", recorder.callback("inline")).for_everyone(),
            ],
        )],
    );

    let empty_press = Arc::new(Event::callback_query(1, group(GROUP), user(MEMBER), "q", "", None));
    let empty_query = Arc::new(Event::inline_query(2, user(MEMBER), "i", ""));

    assert_eq!(engine.dispatch(empty_press).await, DispatchOutcome::Empty);
    assert_eq!(engine.dispatch(empty_query).await, DispatchOutcome::Empty);
    assert_eq!(engine.dispatch(message(group(GROUP), MEMBER, "")).await, DispatchOutcome::Empty);
    assert_eq!(recorder.count(), 0);
}

#[tokio::test]
async fn inline_handlers_consult_the_allow_list() {
    let transport = RecordingTransport::new();
    let recorder = Recorder::new();
    let mut builder = Engine::builder()
        .transport(transport.clone())
        .allow_list(Arc::new(InMemoryAllowList::new().with_users([UserId(ADMIN)])));
    builder
        .register(Arc::new(TestPlugin::new(
            "search",
            vec![
                HandlerSpec::inline(r"^private (.+)$", recorder.callback("restricted")),
                HandlerSpec::inline(r"^public (.+)$", recorder.callback("public")).for_everyone(),
            ],
        )))
        .unwrap();
    let engine = builder.build(bot()).unwrap();

    let query = |from: i64, text: &str| Arc::new(Event::inline_query(1, user(from), "i", text));

    assert_eq!(engine.dispatch(query(MEMBER, "private cats")).await, DispatchOutcome::Unhandled);
    assert!(engine.dispatch(query(ADMIN, "private cats")).await.is_handled());
    assert!(engine.dispatch(query(MEMBER, "public cats")).await.is_handled());
    assert_eq!(recorder.labels(), ["restricted", "public"]);
}

#[tokio::test]
async fn allow_listed_access_requires_user_or_chat_on_the_list() {
    let transport = RecordingTransport::new();
    let recorder = Recorder::new();
    let allow_list = Arc::new(InMemoryAllowList::new().with_chats([ChatId(OTHER_GROUP)]));
    let mut builder = Engine::builder()
        .transport(transport.clone())
        .allow_list(allow_list)
        .access(AccessPolicy::AllowListed);
    builder
        .register(Arc::new(TestPlugin::new("quotes", vec![quote_command(&recorder, "quote")])))
        .unwrap();
    let engine = builder.build(bot()).unwrap();

    assert_eq!(
        engine.dispatch(message(group(GROUP), MEMBER, "/quote")).await,
        DispatchOutcome::Denied
    );
    assert!(engine.dispatch(message(group(OTHER_GROUP), MEMBER, "/quote")).await.is_handled());
    assert_eq!(
        engine.dispatch(message(Chat::private(MEMBER), MEMBER, "/quote")).await,
        DispatchOutcome::Denied
    );
}

#[tokio::test]
async fn malformed_trigger_aborts_construction() {
    let transport = RecordingTransport::new();
    let mut builder = Engine::builder().transport(transport);
    builder
        .register(Arc::new(TestPlugin::new(
            "broken",
            vec![HandlerSpec::command(r"^/quote(", callback(|_ctx| async {}))],
        )))
        .unwrap();

    match builder.build(bot()) {
        Err(EngineError::Trigger(e)) => assert_eq!(e.plugin, "broken"),
        other => panic!("expected a trigger error, got {other:?}"),
    }
}

#[tokio::test]
async fn build_without_transport_fails() {
    assert!(matches!(EngineBuilder::new().build(bot()), Err(EngineError::MissingTransport)));
}

#[tokio::test]
async fn command_menu_follows_enablement() {
    let transport = RecordingTransport::new();
    let store = Arc::new(EnablementStore::new(Arc::new(InMemoryEnablement::new(true))));
    let mut builder = Engine::builder().transport(transport.clone()).enablement(Arc::clone(&store));
    builder
        .register(Arc::new(TestPlugin::new("quotes", Vec::new()).with_command("quote")))
        .unwrap();
    builder
        .register(Arc::new(TestPlugin::new("weather", Vec::new()).with_command("weather")))
        .unwrap();
    let engine = builder.build(bot()).unwrap();

    store.disable_for_chat(&group(GROUP), "weather").await.unwrap();
    store.disable("quotes").await.unwrap();

    let names = |menu: Vec<BotCommand>| menu.into_iter().map(|c| c.command).collect::<Vec<_>>();
    assert_eq!(names(engine.command_menu(None).await), ["weather"]);
    assert!(engine.command_menu(Some(&group(GROUP))).await.is_empty());

    engine.publish_commands().await.unwrap();
    assert_eq!(
        transport.outbound(),
        [Outbound::SetCommands(vec![BotCommand::new("weather", "weather description")])]
    );
}
