use bili_comments::json_utils::{extract_objects, find_json_structures, ExtractStrategy, NodeType};

const STRATEGIES: [ExtractStrategy; 2] = [ExtractStrategy::OffsetScan, ExtractStrategy::Structural];

#[test]
fn extract_objects_from_array_drops_non_objects() {
    let s = r#"[{"x":1}, 2, "three", null, [{"nested":true}], {"x":2}]"#;
    for strategy in STRATEGIES {
        let v = extract_objects(s, strategy);
        assert_eq!(v.len(), 2, "{:?}", strategy);
        assert_eq!(v[0]["x"], 1);
        assert_eq!(v[1]["x"], 2);
    }
}

#[test]
fn extract_objects_single_object() {
    let s = r#"  {"code":0,"data":{"replies":[]}}  "#;
    for strategy in STRATEGIES {
        let v = extract_objects(s, strategy);
        assert_eq!(v.len(), 1);
        assert_eq!(v[0]["code"], 0);
    }
}

#[test]
fn extract_objects_concatenated_without_separator() {
    let s = r#"{"a":1}{"b":2}"#;
    for strategy in STRATEGIES {
        let v = extract_objects(s, strategy);
        assert_eq!(v.len(), 2, "{:?}", strategy);
        assert_eq!(v[0]["a"], 1);
        assert_eq!(v[1]["b"], 2);
    }
}

#[test]
fn extract_objects_concatenated_with_whitespace_and_noise() {
    let s = "{\"a\":1}\n\n{\"b\":2} garbage ,,, {\"c\":3}";
    for strategy in STRATEGIES {
        let v = extract_objects(s, strategy);
        assert_eq!(v.len(), 3, "{:?}", strategy);
        assert_eq!(v[2]["c"], 3);
    }
}

#[test]
fn extract_objects_concatenated_arrays_are_not_flattened_by_offset_scan() {
    // Two pretty-printed dumps appended to each other: the whole text is not one
    // array, and the scan only keeps top-level objects.
    let s = "[{\"a\":1}]\n[{\"b\":2}]";
    assert!(extract_objects(s, ExtractStrategy::OffsetScan).is_empty());
    // The structural scan decodes each root array.
    assert_eq!(extract_objects(s, ExtractStrategy::Structural).len(), 2);
}

#[test]
fn extract_objects_skips_truncated_tail() {
    let s = r#"{"a":1}{"b":{"c":"#;
    for strategy in STRATEGIES {
        let v = extract_objects(s, strategy);
        assert_eq!(v.len(), 1, "{:?}", strategy);
        assert_eq!(v[0]["a"], 1);
    }
}

#[test]
fn extract_objects_recovers_objects_after_truncated_or_unbalanced_fragments() {
    let cases: [(&str, &[&str]); 3] = [
        (r#"{"a":[1,2 {"b":2}"#, &["b"]),
        (r#"{"code":0,"data":{"replies":[1,2{"b":2}"#, &["b"]),
        (r#"[{"a":1}} {"c":3}"#, &["a", "c"]),
    ];
    for (text, keys) in cases {
        for strategy in STRATEGIES {
            let v = extract_objects(text, strategy);
            let found: Vec<&str> = v.iter().filter_map(|o| o.keys().next().map(String::as_str)).collect();
            assert_eq!(found, keys, "{:?} on {}", strategy, text);
        }
    }
}

#[test]
fn extract_objects_truncated_page_then_good_page() {
    let good = r#"{"code":0,"data":{"replies":[{"ctime":1,"member":{"mid":1,"uname":"u"},"content":{"message":"m"}}]}}"#;
    // First page cut off mid-reply, second page appended straight after
    let text = format!(r#"{{"code":0,"data":{{"replies":[{{"ctime":1,{}"#, good);
    for strategy in STRATEGIES {
        let v = extract_objects(&text, strategy);
        assert_eq!(v.len(), 1, "{:?}", strategy);
        assert_eq!(v[0]["data"]["replies"][0]["content"]["message"], "m");
    }
}

#[test]
fn extract_objects_unparseable_input_is_empty() {
    for strategy in STRATEGIES {
        assert!(extract_objects("not json at all", strategy).is_empty());
        assert!(extract_objects("42", strategy).is_empty());
        assert!(extract_objects(r#""just a string""#, strategy).is_empty());
    }
}

#[test]
fn offset_scan_does_not_look_inside_strings() {
    // The object text lives inside a string value, so a decoder never sees it
    let s = r#""{\"hidden\":1}" trailing"#;
    assert!(extract_objects(s, ExtractStrategy::OffsetScan).is_empty());
}

#[test]
fn find_json_structures_nests_children() {
    let text = r#"x {"a":[1,{"b":2}]} y"#;
    let coords = find_json_structures(text);
    assert_eq!(coords.len(), 1);
    let root = &coords[0];
    assert_eq!(root.kind, NodeType::Object);
    assert_eq!(&text[root.start..=root.end], r#"{"a":[1,{"b":2}]}"#);
    assert_eq!(root.children.len(), 1);
    assert_eq!(root.children[0].kind, NodeType::Array);
    assert_eq!(root.children[0].children[0].kind, NodeType::Object);
}

#[test]
fn find_json_structures_ignores_braces_in_strings() {
    let text = r#"{"s":"}{]["} {"t":1}"#;
    let coords = find_json_structures(text);
    assert_eq!(coords.len(), 2);
}
