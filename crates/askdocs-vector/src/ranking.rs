use std::cmp::Ordering;

pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Highest `k` scores, descending. Equal scores keep their input order.
pub fn top_k<T>(mut scored: Vec<(f32, T)>, k: usize) -> Vec<(f32, T)> {
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
    scored.truncate(k);
    scored
}
