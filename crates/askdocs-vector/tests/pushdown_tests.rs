use askdocs_core::filter::{FilterValue, SearchFilter};
use askdocs_vector::LanceFilter;

fn lance(filter: SearchFilter) -> LanceFilter {
    LanceFilter::from_predicate(&filter.compile().unwrap())
}

#[test]
fn empty_filter_pushes_nothing() {
    let f = lance(SearchFilter::new());
    assert_eq!(f.sql, None);
    assert!(f.exact);
}

#[test]
fn column_conditions_become_sql() {
    let f = lance(
        SearchFilter::new()
            .with("category", "power")
            .with("source", FilterValue::any_of(["pump.txt", "o'neil.md"])),
    );
    assert_eq!(f.sql.as_deref(), Some("category IN ('power') AND source IN ('pump.txt','o''neil.md')"));
    assert!(f.exact);
}

#[test]
fn chunk_index_compares_as_integer() {
    let f = lance(SearchFilter::new().with("chunk_index", FilterValue::any_of(["2", "x", "3.5"])));
    assert_eq!(f.sql.as_deref(), Some("chunk_index IN (2)"));

    let f = lance(SearchFilter::new().with("chunk_index", "none"));
    assert_eq!(f.sql.as_deref(), Some("FALSE"));
    assert!(f.exact);
}

#[test]
fn other_fields_stay_client_side() {
    let f = lance(
        SearchFilter::new()
            .with("category", "power")
            .with("tags", FilterValue::any_of(["solar"]))
            .with("meta", FilterValue::nested([("source", FilterValue::from("x"))])),
    );
    assert_eq!(f.sql.as_deref(), Some("category IN ('power')"));
    assert!(!f.exact);

    let f = lance(SearchFilter::new().with("author", "ann"));
    assert_eq!(f.sql, None);
    assert!(!f.exact);
}
