//! Merging and ranking of per-image recognition results.

use std::collections::HashMap;

use crate::types::{RecognitionOptions, RecognitionResult};

/// Merge result lists, keeping one result per item id.
///
/// Lists are visited in order. A later duplicate replaces the kept result
/// only when its confidence is strictly higher, so the first-seen result
/// wins ties. The kept result stays at its first-seen position.
pub fn merge_results<I>(batches: I) -> Vec<RecognitionResult>
where
    I: IntoIterator<Item = Vec<RecognitionResult>>,
{
    let mut merged: Vec<RecognitionResult> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for result in batches.into_iter().flatten() {
        match index.get(&result.item.id) {
            Some(&at) => {
                if result.confidence > merged[at].confidence {
                    merged[at] = result;
                }
            }
            None => {
                index.insert(result.item.id.clone(), merged.len());
                merged.push(result);
            }
        }
    }
    merged
}

/// Apply the caller's options to merged results.
///
/// Drops results below `min_confidence` (equality is kept), sorts by
/// confidence descending (stable), truncates to `max_results`, and keeps
/// only the best result when `detect_multiple_items` is off.
pub fn rank(mut results: Vec<RecognitionResult>, options: &RecognitionOptions) -> Vec<RecognitionResult> {
    results.retain(|r| r.confidence >= options.min_confidence);
    results.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    results.truncate(options.max_results);
    if !options.detect_multiple_items {
        results.truncate(1);
    }
    results
}
