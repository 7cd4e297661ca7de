/// One raw row extracted from the listing page, before dedup.
///
/// `href` is the relative link as it appears in the markup; all other
/// fields degrade to empty strings when the markup lacks them.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingRow {
    pub title: String,
    pub href: String,
    pub author: String,
    pub category: String,
    pub posted_at: String,
}

/// An ordered snapshot of the listing's newest rows, pinned entries already
/// excluded and the cap already applied. Produced once per run and consumed
/// immediately by new-item detection.
#[derive(Debug, Clone, Default)]
pub struct ListingSnapshot {
    pub rows: Vec<ListingRow>,
}

impl ListingSnapshot {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
