//! Joins merge groups with the images anchored on their rows.

use std::collections::HashSet;

use crate::images::{ImageIndex, RowKey};
use crate::melt::MergeGroup;

/// One output record: a merge group plus the images anchored on any of its rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QaRecord {
    pub sheet_name: String,
    pub classification: String,
    pub item: Option<String>,
    pub number: i64,
    pub question: String,
    pub answer: String,
    /// Saved image paths in index order.
    pub images: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assembly {
    pub records: Vec<QaRecord>,
    /// Image rows that fell inside no group. Their images are saved but referenced by nothing.
    pub orphans: Vec<RowKey>,
}

/// Attach images to groups.
///
/// A group collects every index entry whose sheet matches and whose row is one of the group's
/// original rows. Entries are visited in index insertion order, so a record's image list follows
/// the anchor scan order rather than row order.
pub fn assemble(groups: Vec<MergeGroup>, index: &ImageIndex) -> Assembly {
    let mut claimed: HashSet<&RowKey> = HashSet::new();

    let records = groups
        .into_iter()
        .map(|group| {
            let mut images = Vec::new();
            for (key, paths) in index.iter() {
                let (sheet, row) = key;
                if *sheet == group.sheet_name && group.original_rows.contains(row) {
                    images.extend(paths.iter().cloned());
                    claimed.insert(key);
                }
            }
            QaRecord {
                sheet_name: group.sheet_name,
                classification: group.classification,
                item: group.item,
                number: group.number,
                question: group.question,
                answer: group.answer,
                images,
            }
        })
        .collect();

    let orphans: Vec<RowKey> = index
        .iter()
        .map(|(key, _)| key)
        .filter(|key| !claimed.contains(key))
        .cloned()
        .collect();
    for (sheet, row) in &orphans {
        log::warn!("image anchored on sheet `{sheet}` row {row} belongs to no record");
    }

    Assembly { records, orphans }
}
