use askdocs_core::error::Error;
use askdocs_core::filter::{FilterValue, Predicate, SearchFilter};
use serde_json::json;

fn doc() -> serde_json::Value {
    json!({
        "source": "pump.txt",
        "chunk_index": 5,
        "tags": ["maintenance", "water"],
        "meta": { "lang": "en", "year": "2021" }
    })
}

#[test]
fn empty_filter_compiles_to_always() {
    let p = SearchFilter::new().compile().expect("compile");
    assert!(p.is_always());
    assert!(p.matches(&doc()));
}

#[test]
fn scalar_equality_compares_string_forms() {
    let by_text = SearchFilter::new().with("chunk_index", "5").compile().expect("compile");
    assert!(by_text.matches(&doc()));
    let by_int = SearchFilter::new().with("chunk_index", 5i64).compile().expect("compile");
    assert!(by_int.matches(&doc()));
    let year = SearchFilter::new()
        .with("meta", FilterValue::nested([("year", FilterValue::from(2021i64))]))
        .compile()
        .expect("compile");
    assert!(year.matches(&doc()));
    let miss = SearchFilter::new().with("source", "other.txt").compile().expect("compile");
    assert!(!miss.matches(&doc()));
}

#[test]
fn list_is_any_of_and_matches_array_fields() {
    let p = SearchFilter::new()
        .with("tags", FilterValue::any_of(["solar", "water"]))
        .compile()
        .expect("compile");
    assert!(p.matches(&doc()));
    let p = SearchFilter::new()
        .with("source", FilterValue::any_of(["a.txt", "pump.txt"]))
        .compile()
        .expect("compile");
    assert!(p.matches(&doc()));
    let p = SearchFilter::new()
        .with("tags", FilterValue::any_of(["solar"]))
        .compile()
        .expect("compile");
    assert!(!p.matches(&doc()));
}

#[test]
fn empty_list_is_skipped() {
    let p = SearchFilter::new()
        .with("tags", FilterValue::any_of(Vec::<String>::new()))
        .compile()
        .expect("compile");
    assert_eq!(p, Predicate::Always);
}

#[test]
fn top_level_entries_are_anded() {
    let p = SearchFilter::new()
        .with("source", "pump.txt")
        .with("meta", FilterValue::nested([("lang", FilterValue::from("de"))]))
        .compile()
        .expect("compile");
    assert!(!p.matches(&doc()));
}

#[test]
fn missing_field_does_not_match() {
    let p = SearchFilter::new().with("author", "x").compile().expect("compile");
    assert!(!p.matches(&doc()));
}

#[test]
fn nesting_deeper_than_one_level_is_rejected() {
    let deep = FilterValue::nested([("inner", FilterValue::nested([("x", FilterValue::from(1i64))]))]);
    let err = SearchFilter::new().with("meta", deep).compile().unwrap_err();
    assert!(matches!(err, Error::InvalidFilter(_)));
}

#[test]
fn filter_deserializes_from_json() {
    let f: SearchFilter = serde_json::from_value(json!({
        "source": ["pump.txt"],
        "meta": { "lang": "en" }
    }))
    .expect("deserialize");
    assert!(f.compile().expect("compile").matches(&doc()));
}
