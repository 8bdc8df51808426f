//! Translates filter predicates into LanceDB `only_if` SQL.
//!
//! Only conditions on the `source`, `category` and `chunk_index` columns are
//! pushed down. Anything else (nested paths, other metadata keys) stays with
//! the client-side matcher, and the result is marked inexact.

use askdocs_core::filter::{Predicate, Scalar};

use crate::table::quoted_list;

#[derive(Debug, Clone, PartialEq)]
pub struct LanceFilter {
    /// Conjunction of every condition that maps onto a column.
    pub sql: Option<String>,
    /// True when `sql` alone selects exactly the rows the predicate matches.
    pub exact: bool,
}

#[derive(Clone, Copy)]
enum Column {
    Text(&'static str),
    Int(&'static str),
}

fn column(path: &[String]) -> Option<Column> {
    match path {
        [field] => match field.as_str() {
            "source" => Some(Column::Text("source")),
            "category" => Some(Column::Text("category")),
            "chunk_index" => Some(Column::Int("chunk_index")),
            _ => None,
        },
        _ => None,
    }
}

impl LanceFilter {
    pub fn from_predicate(predicate: &Predicate) -> Self {
        let mut clauses = Vec::new();
        let exact = collect(predicate, &mut clauses);
        let sql = if clauses.is_empty() { None } else { Some(clauses.join(" AND ")) };
        Self { sql, exact }
    }
}

// Pushes translatable conjuncts into `out`; returns false if any were left behind.
fn collect(predicate: &Predicate, out: &mut Vec<String>) -> bool {
    match predicate {
        Predicate::Always => true,
        Predicate::All(parts) => parts.iter().fold(true, |exact, p| collect(p, out) && exact),
        Predicate::Equals { path, value } => match column(path) {
            Some(col) => {
                out.push(in_clause(col, std::slice::from_ref(value)));
                true
            }
            None => false,
        },
        Predicate::AnyOf { path, values } => match column(path) {
            Some(col) => {
                out.push(in_clause(col, values));
                true
            }
            None => false,
        },
    }
}

// Scalars compare by string form on text columns and numerically on integer
// columns; values that cannot equal any integer drop out of the list.
fn in_clause(col: Column, values: &[Scalar]) -> String {
    let (name, literals) = match col {
        Column::Text(name) => {
            let texts: Vec<String> = values.iter().map(Scalar::to_string).collect();
            (name, quoted_list(texts.iter().map(String::as_str)))
        }
        Column::Int(name) => {
            let ints: Vec<String> = values.iter().filter_map(as_int).map(|i| i.to_string()).collect();
            (name, ints.join(","))
        }
    };
    if literals.is_empty() {
        "FALSE".to_string()
    } else {
        format!("{name} IN ({literals})")
    }
}

fn as_int(value: &Scalar) -> Option<i64> {
    match value {
        Scalar::Int(i) => Some(*i),
        Scalar::Float(x) if x.fract() == 0.0 && x.is_finite() => Some(*x as i64),
        Scalar::Text(s) => s.parse::<f64>().ok().filter(|x| x.fract() == 0.0).map(|x| x as i64),
        _ => None,
    }
}
