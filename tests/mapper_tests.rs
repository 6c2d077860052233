
use bili_comments::comments::{map_envelope, map_payload, sanitize_text, CommentRecord, TimeFormat};
use bili_comments::json_utils::{ExtractStrategy, JsonObject};
use serde_json::json;

use crate::test_utils::envelope;

fn object(v: serde_json::Value) -> JsonObject {
    match v {
        serde_json::Value::Object(obj) => obj,
        other => panic!("expected object, got {}", other),
    }
}

fn reply(ctime: i64, mid: i64, uname: &str, message: &str) -> serde_json::Value {
    json!({"ctime": ctime, "member": {"mid": mid, "uname": uname}, "content": {"message": message}})
}

#[test]
fn maps_well_formed_envelope() {
    let env = object(json!({
        "code": 0,
        "data": {"replies": [reply(1700000000, 42, "alice", "hi\nthere")]}
    }));
    let records = map_envelope(&env, TimeFormat::Utc);
    assert_eq!(
        records,
        vec![CommentRecord {
            timestamp: "2023-11-14 22:13:20".into(),
            user_id: "42".into(),
            username: "alice".into(),
            text: "hi there".into(),
        }]
    );
}

#[test]
fn non_zero_code_yields_nothing() {
    for code in [json!(-400), json!(1), json!("0"), json!(null)] {
        let env = object(json!({"code": code, "data": {"replies": [reply(1, 1, "a", "b")]}}));
        assert!(map_envelope(&env, TimeFormat::Utc).is_empty(), "code {:?}", env["code"]);
    }
    let env = object(json!({"data": {"replies": [reply(1, 1, "a", "b")]}}));
    assert!(map_envelope(&env, TimeFormat::Utc).is_empty());
}

#[test]
fn missing_or_malformed_replies_yield_nothing() {
    for data in [json!({}), json!({"replies": null}), json!({"replies": {"0": 1}}), json!([1, 2]), json!("x")] {
        let env = object(json!({"code": 0, "data": data}));
        assert!(map_envelope(&env, TimeFormat::Utc).is_empty());
    }
    let env = object(json!({"code": 0}));
    assert!(map_envelope(&env, TimeFormat::Utc).is_empty());
}

#[test]
fn defective_reply_is_skipped_alone() {
    let env = object(json!({
        "code": 0,
        "data": {"replies": [
            reply(1700000000, 1, "first", "one"),
            {"ctime": 1700000001, "member": {"uname": "no mid"}, "content": {"message": "x"}},
            {"member": {"mid": 3, "uname": "no ctime"}, "content": {"message": "x"}},
            {"ctime": 1700000003, "member": {"mid": 4, "uname": "no content"}},
            "not even an object",
            reply(1700000005, 5, "last", "five"),
        ]}
    }));
    let records = map_envelope(&env, TimeFormat::Utc);
    let names: Vec<&str> = records.iter().map(|r| r.username.as_str()).collect();
    assert_eq!(names, vec!["first", "last"]);
    assert_eq!(records[1].user_id, "5");
}

#[test]
fn unicode_is_preserved() {
    let env = object(json!({"code": 0, "data": {"replies": [reply(0, 7, "小明\r", "好耶！🎉\r\n")]}}));
    let records = map_envelope(&env, TimeFormat::Utc);
    assert_eq!(records[0].username, "小明 ");
    assert_eq!(records[0].text, "好耶！🎉  ");
}

#[test]
fn sanitize_is_idempotent_and_strips_line_breaks() {
    for s in ["", "plain", "a\nb", "\r\n\r\n", "mixed\r text\n with 换行\n"] {
        let once = sanitize_text(s);
        assert_eq!(sanitize_text(&once), once);
        assert!(!once.contains('\n') && !once.contains('\r'));
        assert_eq!(once.chars().count(), s.chars().count());
    }
}

#[test]
fn payload_concatenated_envelopes_keep_order() {
    let payload = format!(
        "{}{}",
        envelope(&[(1700000000, 1, "a", "first")]),
        envelope(&[(1700000001, 2, "b", "second"), (1700000002, 3, "c", "third")])
    );
    for strategy in [ExtractStrategy::OffsetScan, ExtractStrategy::Structural] {
        let texts: Vec<String> = map_payload(&payload, strategy, TimeFormat::Utc).records.into_iter().map(|r| r.text).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
    }
}

#[test]
fn payload_array_of_envelopes_as_captured() {
    // The capture script saves JSON.stringify(array, null, 2)
    let a: serde_json::Value = serde_json::from_str(&envelope(&[(1700000000, 1, "a", "x")])).expect("json");
    let b = json!({"code": -404, "message": "nothing here"});
    let payload = serde_json::to_string_pretty(&json!([a, b])).expect("json");
    let mapped = map_payload(&payload, ExtractStrategy::OffsetScan, TimeFormat::Utc);
    assert_eq!(mapped.objects, 2);
    assert_eq!(mapped.records.len(), 1);
    assert_eq!(mapped.records[0].user_id, "1");
}
