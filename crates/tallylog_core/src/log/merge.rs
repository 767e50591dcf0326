//! Merging results from several logs into one feed.

use crate::types::ScanItem;

/// Stably sorts items newest-first.
///
/// Items with equal timestamps keep their relative order, so a merged feed
/// lists ties in the order the logs were scanned. Corruption sentinels have
/// no timestamp and sink to the end.
pub fn sort_newest_first(items: &mut [ScanItem]) {
    items.sort_by(|a, b| b.timestamp().cmp(&a.timestamp()));
}

/// Concatenates per-log results in scan order, optionally sorting them.
pub(super) fn merge_feeds(feeds: Vec<Vec<ScanItem>>, sort: bool) -> Vec<ScanItem> {
    let mut merged: Vec<ScanItem> = feeds.into_iter().flatten().collect();
    if sort {
        sort_newest_first(&mut merged);
    }
    merged
}
