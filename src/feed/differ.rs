use super::parser::{self, Entry, Feed};

/// Compute the entries of `current` that were not present in the previous
/// snapshot, preserving the order they appear in `current`.
///
/// The previous snapshot is re-parsed with the same parser used for live
/// fetches; an absent or unparseable snapshot yields an empty baseline, so
/// every current entry counts as new. Novelty is full structural equality
/// over the entry tuple — there is no identifier-based matching.
///
/// Pure function: no I/O, no side effects, same inputs give same output.
pub fn new_entries(previous_raw: Option<&str>, current: &Feed) -> Vec<Entry> {
    let previous: Vec<Entry> = previous_raw
        .and_then(|raw| parser::parse(raw).ok())
        .map(|feed| feed.entries)
        .unwrap_or_default();

    current
        .entries
        .iter()
        .filter(|entry| !previous.contains(entry))
        .cloned()
        .collect()
}
