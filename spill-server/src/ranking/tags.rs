use std::collections::BTreeSet;

use super::Listing;

pub const MAX_TAGS: usize = 5;
pub const MAX_TAG_LEN: usize = 30;

/// Keep items carrying at least one selected tag. An empty selection keeps everything.
pub fn filter_by_tags<T: Listing>(items: Vec<T>, selected: &[String]) -> Vec<T> {
    if selected.is_empty() {
        return items;
    }
    items
        .into_iter()
        .filter(|item| item.tags().iter().any(|t| selected.contains(t)))
        .collect()
}

/// Sorted, de-duplicated union of all tags.
pub fn available_tags<T: Listing>(items: &[T]) -> Vec<String> {
    items
        .iter()
        .flat_map(|item| item.tags().iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Trim, lowercase and de-duplicate, preserving first occurrence order.
/// Blank entries are dropped.
pub fn normalize_tags<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = BTreeSet::new();
    raw.into_iter()
        .map(|t| t.as_ref().trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

/// `?tags=work,Love` query value to a normalised selection.
pub fn parse_tag_query(query: Option<&str>) -> Vec<String> {
    query.map(|q| normalize_tags(q.split(','))).unwrap_or_default()
}
