// src/normalize/header.rs

use serde::Deserialize;
use std::collections::{HashMap, HashSet};

use super::rows::cell_at;

/// How many rows make up the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderSpec {
    /// One header row.
    #[default]
    Single,
    /// A group row followed by a sub-label row, merged per column.
    Double,
}

impl HeaderSpec {
    pub fn row_count(&self) -> usize {
        match self {
            HeaderSpec::Single => 1,
            HeaderSpec::Double => 2,
        }
    }
}

/// Where the (first) header row sits in the non-blank rows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum HeaderLocation {
    #[default]
    First,
    /// First row containing this label (trim + uppercase comparison).
    Marker(String),
}

/// Merge a group label with its sub-label.
///
/// - both present → `"{group} - {sub}"`
/// - only one present → that one
/// - neither → empty string
pub fn combine_labels(group: &str, sub: &str) -> String {
    match (group.trim(), sub.trim()) {
        ("", "") => String::new(),
        (g, "") => g.to_string(),
        ("", s) => s.to_string(),
        (g, s) => format!("{} - {}", g, s),
    }
}

/// One label per column position. With a sub-label row, the shorter of the
/// two rows reads as empty past its end. Labels are not unique yet.
pub fn build_column_names(group: &[String], sub: Option<&[String]>) -> Vec<String> {
    match sub {
        None => group.iter().map(|label| label.trim().to_string()).collect(),
        Some(sub) => {
            let width = group.len().max(sub.len());
            (0..width)
                .map(|idx| combine_labels(cell_at(group, idx), cell_at(sub, idx)))
                .collect()
        }
    }
}

/// Replace empty labels with `Unnamed: {position}`.
pub fn fill_placeholders(names: Vec<String>) -> Vec<String> {
    names
        .into_iter()
        .enumerate()
        .map(|(idx, name)| {
            if name.is_empty() {
                format!("Unnamed: {}", idx)
            } else {
                name
            }
        })
        .collect()
}

/// Make names unique, in order: the first occurrence keeps its name, the
/// n-th repeat becomes `name_n`. A suffixed name that is already taken bumps
/// the counter again, so the result never repeats.
pub fn deduplicate(names: &[String]) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::with_capacity(names.len());
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut out = Vec::with_capacity(names.len());

    for name in names {
        let mut candidate = name.clone();
        if seen.contains(&candidate) {
            let n = counts.entry(name.as_str()).or_insert(0);
            loop {
                *n += 1;
                candidate = format!("{}_{}", name, n);
                if !seen.contains(&candidate) {
                    break;
                }
            }
        }
        seen.insert(candidate.clone());
        out.push(candidate);
    }

    out
}
