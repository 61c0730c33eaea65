//! End-to-end behavior of the bridge driving the headless engine.

use weaver_richtext::weaver_richtext_model::{Value, json};
use weaver_richtext::{
    AppliedFormat, BridgeHooks, Delta, FormatValue, Key, KeyCombo, KeydownResult, MemoryEngine,
    Model, Module, Range, RichTextBridge, RichTextEngine, SmolStr, ToolbarContainer, formats,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn create(model: &Model, hooks: BridgeHooks) -> RichTextBridge<MemoryEngine> {
    init_tracing();
    RichTextBridge::create(model.at("editor"), hooks, |options| {
        Ok(MemoryEngine::new("quill-1", options))
    })
    .unwrap()
}

fn doc(text: &str) -> Value {
    json!({"ops": [{"insert": text}]})
}

fn model_with(editor: Value) -> Model {
    Model::from_value(json!({ "editor": editor }))
}

fn strip_scripts(html: &str) -> String {
    let mut out = String::new();
    let mut rest = html;
    while let Some(start) = rest.find("<script>") {
        out.push_str(&rest[..start]);
        rest = match rest[start..].find("</script>") {
            Some(end) => &rest[start + end + "</script>".len()..],
            None => "",
        };
    }
    out.push_str(rest);
    out
}

#[test]
fn test_create_installs_detached_toolbar() {
    let model = Model::new();
    let bridge = create(&model, BridgeHooks::new());
    assert_eq!(
        bridge.engine().modules(),
        &[Module::Toolbar {
            container: ToolbarContainer::Detached
        }]
    );
    assert_eq!(bridge.origin().as_str(), "quill-1");
}

#[test]
fn test_external_delta_write_updates_editor() {
    let model = Model::new();
    let mut bridge = create(&model, BridgeHooks::new());

    let delta = json!({"ops": [
        {"insert": "Hello", "attributes": {"bold": true}},
        {"insert": "\n"}
    ]});
    model.set("editor.delta", delta.clone()).unwrap();
    bridge.dispatch_pending().unwrap();

    let expected: Delta = model.get_as("editor.delta").unwrap().unwrap();
    assert_eq!(model.get("editor.delta"), Some(delta));
    assert_eq!(bridge.engine().contents(), expected);
    assert_eq!(
        model.get("editor.htmlResult"),
        Some(json!("<div><b>Hello</b></div>"))
    );
    assert_eq!(model.get("editor.plainText"), Some(json!("Hello\n")));
    assert_eq!(
        model.get("editor.shouldShowPlaceholder"),
        Some(json!(false))
    );
}

#[test]
fn test_external_delta_with_foreign_values_is_applied_unchanged() {
    let model = Model::new();
    let mut bridge = create(&model, BridgeHooks::new());

    let delta = json!({"ops": [
        {"insert": "Title", "attributes": {"header": 1}},
        {"insert": "\n"}
    ]});
    model.set("editor.delta", delta.clone()).unwrap();
    bridge.dispatch_pending().unwrap();

    let expected: Delta = model.get_as("editor.delta").unwrap().unwrap();
    assert_eq!(model.get("editor.delta"), Some(delta));
    assert_eq!(bridge.engine().contents(), expected);
    assert_eq!(model.get("editor.plainText"), Some(json!("Title\n")));
}

#[test]
fn test_create_loads_stored_delta_with_numeric_attributes() {
    let delta = json!({"ops": [
        {"insert": "Item"},
        {"insert": "\n", "attributes": {"indent": 2}}
    ]});
    let model = model_with(json!({"delta": delta.clone()}));
    let bridge = create(&model, BridgeHooks::new());

    let expected: Delta = model.get_as("editor.delta").unwrap().unwrap();
    assert_eq!(model.get("editor.delta"), Some(delta));
    assert_eq!(bridge.engine().contents(), expected);
}

#[test]
fn test_failed_handler_still_settles_rest_of_batch() {
    let model = model_with(json!({"delta": doc("ab\n")}));
    let mut bridge = create(&model, BridgeHooks::new());
    bridge.engine_mut().select(Range::caret(2));
    bridge.dispatch_pending().unwrap();

    // A scalar here makes the prepared-format write fail.
    model.set("editor.activeFormats", json!("stale")).unwrap();
    bridge
        .engine_mut()
        .prepare_format(formats::ITALIC, FormatValue::Bool(true));
    bridge.engine_mut().type_text("c");

    assert!(bridge.dispatch_pending().is_err());
    assert_eq!(model.get("editor.plainText"), Some(json!("abc\n")));
    assert_eq!(
        model.get("editor.htmlResult"),
        Some(json!("<div>ab<i>c</i></div>"))
    );
    bridge.dispatch_pending().unwrap();
    assert_eq!(bridge.engine().load_count(), 1);
}

#[test]
fn test_nested_delta_writes_reload() {
    let model = model_with(json!({"delta": doc("one\n")}));
    let mut bridge = create(&model, BridgeHooks::new());

    model
        .set("editor.delta.ops", json!([{"insert": "two\n"}]))
        .unwrap();
    bridge.dispatch_pending().unwrap();
    assert_eq!(bridge.engine().text(), "two\n");
}

#[test]
fn test_own_delta_writes_are_not_reapplied() {
    let model = model_with(json!({"delta": doc("ab\n")}));
    let mut bridge = create(&model, BridgeHooks::new());
    assert_eq!(bridge.engine().load_count(), 1);

    let mut watcher = model.subscribe("editor.delta");
    bridge.engine_mut().select(Range::caret(2));
    bridge.engine_mut().type_text("c");
    bridge.dispatch_pending().unwrap();

    assert_eq!(bridge.engine().load_count(), 1);
    let stored: Delta = model.get_as("editor.delta").unwrap().unwrap();
    assert_eq!(stored, bridge.engine().contents());
    assert_eq!(stored.text(), "abc\n");

    let events = watcher.drain();
    assert_eq!(events.len(), 1);
    assert!(events[0].is_from(bridge.origin()));
    assert_eq!(model.get("editor.plainText"), Some(json!("abc\n")));
}

#[test]
fn test_api_changes_do_not_write_delta() {
    let model = Model::new();
    let mut bridge = create(&model, BridgeHooks::new());
    bridge.set_html("<p>loaded</p>").unwrap();

    assert_eq!(model.get("editor.delta"), None);
    assert_eq!(model.get("editor.plainText"), Some(json!("loaded\n")));
}

#[test]
fn test_placeholder_follows_html_result() {
    let model = Model::new();
    let _bridge = create(&model, BridgeHooks::new());
    assert_eq!(model.get("editor.shouldShowPlaceholder"), Some(json!(true)));

    model.set("editor.htmlResult", json!("<p>hi</p>")).unwrap();
    assert_eq!(
        model.get("editor.shouldShowPlaceholder"),
        Some(json!(false))
    );

    model.set("editor.htmlResult", json!("<div><br></div>")).unwrap();
    assert_eq!(model.get("editor.shouldShowPlaceholder"), Some(json!(true)));

    model.set("editor.htmlResult", json!("")).unwrap();
    assert_eq!(model.get("editor.shouldShowPlaceholder"), Some(json!(true)));
}

#[test]
fn test_update_active_formats_without_range_is_empty() {
    let model = model_with(json!({"delta": {"ops": [
        {"insert": "bold", "attributes": {"bold": true}},
        {"insert": "\n"}
    ]}}));
    let mut bridge = create(&model, BridgeHooks::new());
    bridge.update_active_formats(Some(Range::new(0, 4))).unwrap();
    assert_eq!(
        model.get("editor.activeFormats"),
        Some(json!({"bold": true}))
    );

    bridge.update_active_formats(None).unwrap();
    assert_eq!(model.get("editor.activeFormats"), Some(json!({})));
}

#[test]
fn test_selection_changes_track_focus_and_formats() {
    let model = model_with(json!({"delta": {"ops": [
        {"insert": "ab", "attributes": {"italic": true}},
        {"insert": "cd\n"}
    ]}}));
    let mut bridge = create(&model, BridgeHooks::new());

    bridge.engine_mut().select(Range::new(0, 2));
    bridge.dispatch_pending().unwrap();
    assert_eq!(model.get("editor.editorFocused"), Some(json!(true)));
    assert!(bridge.is_format_active(formats::ITALIC));

    bridge.engine_mut().select(Range::new(2, 4));
    bridge.dispatch_pending().unwrap();
    assert!(!bridge.is_format_active(formats::ITALIC));

    bridge.engine_mut().blur();
    bridge.dispatch_pending().unwrap();
    assert_eq!(model.get("editor.editorFocused"), Some(json!(false)));
    assert_eq!(model.get("editor.activeFormats"), Some(json!({})));
}

#[test]
fn test_set_format_applies_once_on_frame_flush() {
    let model = model_with(json!({"delta": doc("hello world\n")}));
    let mut bridge = create(&model, BridgeHooks::new());
    bridge.engine_mut().select(Range::new(0, 5));
    bridge.dispatch_pending().unwrap();

    bridge
        .set_format(formats::BOLD, FormatValue::Bool(true), false)
        .unwrap();
    assert!(bridge.engine().applied_formats().is_empty());
    assert_eq!(bridge.pending_frames(), 1);

    bridge.flush_frame().unwrap();
    assert_eq!(
        bridge.engine().applied_formats(),
        &[AppliedFormat {
            name: formats::BOLD.into(),
            range: Range::new(0, 5),
            value: FormatValue::Bool(true),
        }]
    );
    assert_eq!(bridge.engine().html(), "<div><b>hello</b> world</div>");
    insta::assert_yaml_snapshot!(model.get("editor.activeFormats"), @"bold: true");
}

#[test]
fn test_toggle_format_negates_active_value() {
    let model = model_with(json!({"delta": doc("hello\n")}));
    let mut bridge = create(&model, BridgeHooks::new());
    bridge.engine_mut().select(Range::new(0, 5));
    bridge.dispatch_pending().unwrap();

    bridge.toggle_format(formats::UNDERLINE).unwrap();
    bridge.flush_frame().unwrap();
    assert!(bridge.is_format_active(formats::UNDERLINE));
    assert_eq!(bridge.engine().html(), "<div><u>hello</u></div>");

    bridge.toggle_format(formats::UNDERLINE).unwrap();
    bridge.flush_frame().unwrap();
    assert_eq!(
        model.get("editor.activeFormats.underline"),
        Some(json!(false))
    );
    assert_eq!(bridge.engine().html(), "<div>hello</div>");
}

#[test]
fn test_set_format_focuses_editor() {
    let model = model_with(json!({"delta": doc("hello\n")}));
    let mut bridge = create(&model, BridgeHooks::new());
    assert!(!bridge.engine().has_focus());

    bridge
        .set_format(formats::ITALIC, FormatValue::Bool(true), false)
        .unwrap();
    assert!(bridge.engine().has_focus());
    assert_eq!(model.get("editor.editorFocused"), Some(json!(true)));
}

#[test]
fn test_tasks_queued_during_flush_wait_for_next_frame() {
    let model = model_with(json!({"delta": doc("hello\n")}));
    let mut bridge = create(&model, BridgeHooks::new());
    bridge.engine_mut().select(Range::new(0, 5));
    bridge.dispatch_pending().unwrap();

    bridge
        .set_format(formats::BOLD, FormatValue::Bool(true), true)
        .unwrap();
    bridge
        .set_format(formats::ITALIC, FormatValue::Bool(true), true)
        .unwrap();
    bridge.flush_frame().unwrap();
    assert_eq!(bridge.engine().applied_formats().len(), 2);
    assert_eq!(bridge.pending_frames(), 0);
    assert_eq!(bridge.engine().html(), "<div><b><i>hello</i></b></div>");
}

#[test]
fn test_list_mode_formats_whole_document() {
    let model = model_with(json!({"mode": "list", "delta": doc("one\ntwo\n")}));
    let mut bridge = create(&model, BridgeHooks::new());
    bridge.engine_mut().select(Range::caret(1));
    bridge.dispatch_pending().unwrap();

    bridge
        .set_format(formats::LIST, FormatValue::Bool(false), false)
        .unwrap();
    bridge.flush_frame().unwrap();

    assert_eq!(
        bridge.engine().applied_formats(),
        &[AppliedFormat {
            name: formats::LIST.into(),
            range: Range::new(0, 8),
            value: FormatValue::Bool(true),
        }]
    );
    assert_eq!(bridge.engine().html(), "<ol><li>one</li><li>two</li></ol>");
    assert_eq!(model.get("editor.activeFormats.list"), Some(json!(true)));
}

#[test]
fn test_list_mode_leaves_other_formats_alone() {
    let model = model_with(json!({"mode": "list", "delta": doc("one\ntwo\n")}));
    let mut bridge = create(&model, BridgeHooks::new());
    bridge.engine_mut().select(Range::new(0, 3));
    bridge.dispatch_pending().unwrap();

    bridge
        .set_format(formats::BOLD, FormatValue::Bool(true), false)
        .unwrap();
    bridge.flush_frame().unwrap();
    assert_eq!(bridge.engine().applied_formats()[0].range, Range::new(0, 3));
}

#[test]
fn test_delta_wins_over_initial_html() {
    let model = model_with(json!({
        "delta": doc("from delta\n"),
        "initialHtml": "<p>from html</p>"
    }));
    let bridge = create(&model, BridgeHooks::new());
    assert_eq!(bridge.engine().text(), "from delta\n");
    assert_eq!(model.get("editor.plainText"), Some(json!("from delta\n")));
}

#[test]
fn test_initial_html_is_sanitized_and_captured() {
    let model = model_with(json!({
        "initialHtml": "<p>safe</p><script>alert(1)</script>"
    }));
    let bridge = create(&model, BridgeHooks::new().with_sanitizer(strip_scripts));

    assert_eq!(bridge.engine().text(), "safe\n");
    let stored: Delta = model.get_as("editor.delta").unwrap().unwrap();
    assert_eq!(stored, bridge.engine().contents());
    assert_eq!(bridge.engine().load_count(), 1);
}

#[test]
fn test_empty_delta_falls_back_to_initial_html() {
    let model = model_with(json!({
        "delta": {"ops": []},
        "initialHtml": "<p>fallback</p>"
    }));
    let bridge = create(&model, BridgeHooks::new());
    assert_eq!(bridge.engine().text(), "fallback\n");
}

#[test]
fn test_absent_content_is_a_no_op() {
    let model = model_with(json!({"initialHtml": ""}));
    let bridge = create(&model, BridgeHooks::new());
    assert_eq!(bridge.engine().text(), "\n");
    assert_eq!(bridge.engine().load_count(), 0);
    assert_eq!(model.get("editor.delta"), None);
}

#[test]
fn test_set_html_sanitizes() {
    let model = Model::new();
    let mut bridge = create(&model, BridgeHooks::new().with_sanitizer(strip_scripts));
    bridge
        .set_html("<div>kept</div><script>gone</script>")
        .unwrap();
    assert_eq!(bridge.engine().text(), "kept\n");
}

#[test]
fn test_focus_on_create() {
    let model = model_with(json!({"focus": true, "delta": doc("hi\n")}));
    let bridge = create(&model, BridgeHooks::new());
    assert!(bridge.engine().has_focus());
    assert_eq!(model.get("editor.editorFocused"), Some(json!(true)));
}

#[test]
fn test_focus_moves_caret_to_end() {
    let model = model_with(json!({"delta": doc("hello\n")}));
    let mut bridge = create(&model, BridgeHooks::new());
    bridge.focus().unwrap();
    assert_eq!(bridge.engine_mut().selection(false), Some(Range::caret(5)));
    assert_eq!(model.get("editor.editorFocused"), Some(json!(true)));
}

#[test]
fn test_allowed_formats_restrict_engine() {
    let model = model_with(json!({"allowedFormats": ["bold"]}));
    let bridge = create(&model, BridgeHooks::new());
    assert_eq!(
        bridge.engine().registered_formats(),
        vec![SmolStr::new(formats::BOLD)]
    );
}

#[test]
fn test_hotkeys_are_delegated() {
    let model = Model::new();
    let bridge = create(&model, BridgeHooks::new());
    for key in ["B", "I", "U"] {
        assert_eq!(
            bridge.engine().hotkey(&KeyCombo::meta(Key::character(key))),
            Some(true)
        );
    }
}

#[test]
fn test_hotkey_on_selection_applies() {
    let model = model_with(json!({"delta": doc("ab\n")}));
    let mut bridge = create(&model, BridgeHooks::new());
    bridge.engine_mut().select(Range::new(0, 2));
    bridge.dispatch_pending().unwrap();

    let combo = KeyCombo::meta(Key::character("b"));
    assert_eq!(
        bridge.engine_mut().press_key(&combo),
        KeydownResult::Handled
    );
    bridge.dispatch_pending().unwrap();

    assert_eq!(bridge.engine().html(), "<div><b>ab</b></div>");
    assert!(bridge.is_format_active(formats::BOLD));
    let stored: Delta = model.get_as("editor.delta").unwrap().unwrap();
    assert_eq!(stored, bridge.engine().contents());
}

#[test]
fn test_hotkey_on_caret_prepares() {
    let model = model_with(json!({"delta": {"ops": [
        {"insert": "ab", "attributes": {"bold": true}},
        {"insert": "\n"}
    ]}}));
    let mut bridge = create(&model, BridgeHooks::new());
    bridge.engine_mut().select(Range::caret(2));
    bridge.dispatch_pending().unwrap();
    assert!(bridge.is_format_active(formats::BOLD));

    bridge
        .engine_mut()
        .press_key(&KeyCombo::meta(Key::character("b")));
    bridge.dispatch_pending().unwrap();
    assert_eq!(model.get("editor.activeFormats.bold"), Some(json!(false)));
    assert!(bridge.engine().applied_formats().is_empty());

    bridge.engine_mut().type_text("c");
    bridge.dispatch_pending().unwrap();
    assert_eq!(bridge.engine().html(), "<div><b>ab</b>c</div>");
}

#[test]
fn test_paste_hook_rewrites_content() {
    let model = Model::new();
    let hooks = BridgeHooks::new().with_paste(|delta: Delta, raw: &str| {
        assert!(raw.contains("<b>"));
        Delta::new().insert(delta.text().to_uppercase(), Default::default())
    });
    let mut bridge = create(&model, hooks);

    bridge.engine_mut().focus();
    bridge.engine_mut().paste_html("<b>quiet</b>").unwrap();
    bridge.dispatch_pending().unwrap();

    assert_eq!(bridge.engine().text(), "QUIET\n");
    assert_eq!(model.get("editor.plainText"), Some(json!("QUIET\n")));
}

#[test]
fn test_clear_formatting_removes_line_and_inline_formats() {
    let model = model_with(json!({"delta": {"ops": [
        {"insert": "ab", "attributes": {"bold": true, "color": "red"}},
        {"insert": "\n", "attributes": {"bullet": true}},
        {"insert": "cd", "attributes": {"italic": true}},
        {"insert": "\n", "attributes": {"bullet": true, "align": "center"}}
    ]}}));
    let mut bridge = create(&model, BridgeHooks::new());
    bridge.engine_mut().select(Range::new(0, 5));
    bridge.dispatch_pending().unwrap();

    bridge.clear_formatting().unwrap();

    assert_eq!(bridge.engine().html(), "<div>ab</div><div>cd</div>");
    assert_eq!(model.get("editor.activeFormats"), Some(json!({})));
    let applied: Vec<&str> = bridge
        .engine()
        .applied_formats()
        .iter()
        .map(|a| a.name.as_str())
        .collect();
    assert_eq!(applied[0], formats::BULLET);
    assert!(applied.iter().all(|name| *name != "type"));
}

#[test]
fn test_clear_formatting_at_caret_disarms_formats() {
    let model = model_with(json!({"delta": {"ops": [
        {"insert": "ab", "attributes": {"bold": true}},
        {"insert": "\n"}
    ]}}));
    let mut bridge = create(&model, BridgeHooks::new());
    bridge.engine_mut().select(Range::caret(2));
    bridge.dispatch_pending().unwrap();

    bridge.clear_formatting().unwrap();
    assert_eq!(model.get("editor.activeFormats"), Some(json!({})));

    bridge.engine_mut().type_text("c");
    bridge.dispatch_pending().unwrap();
    assert_eq!(bridge.engine().html(), "<div><b>ab</b>c</div>");
}

#[test]
fn test_teardown_unbinds() {
    let model = model_with(json!({"delta": doc("keep\n")}));
    let mut bridge = create(&model, BridgeHooks::new());
    bridge
        .set_format(formats::BOLD, FormatValue::Bool(true), true)
        .unwrap();

    let engine = bridge.teardown();
    assert!(engine.applied_formats().is_empty());

    model.set("editor.htmlResult", json!("")).unwrap();
    assert_eq!(
        model.get("editor.shouldShowPlaceholder"),
        Some(json!(false))
    );
    model.set("editor.delta", doc("changed\n")).unwrap();
    assert_eq!(engine.text(), "keep\n");
}
