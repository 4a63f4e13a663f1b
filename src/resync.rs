//! Record resynchronization
//!
//! Resynchronization walks every stored record and overwrites its
//! range-derived fields from a freshly built range index, leaving every
//! human-entered field untouched. It is a full rebuild-and-rewrite, not a
//! diff: the operation is idempotent and safely re-runnable after an
//! interruption.

use anyhow::{Context, Result};
use tracing::info;

use crate::index::RangeIndex;
use crate::store::{Category, RecordStore};

/// Refresh the range data of every record in every category from `index`.
///
/// Returns the number of records rewritten. A record whose ASN no longer
/// appears in the bulk database ends up with empty range fields; that means
/// "currently no known ranges", not an error. A non-numeric filename in a
/// category directory is store corruption and aborts the run.
pub fn resync(store: &RecordStore, index: &RangeIndex) -> Result<usize> {
    let mut refreshed = 0usize;

    for category in Category::ALL {
        for name in store.list(category)? {
            let asn: u32 = name.parse().with_context(|| {
                format!("non-numeric record filename {name:?} in category {category}")
            })?;

            let mut record = store.load(category, asn)?;
            record.apply_ranges(index, asn);
            store.save(category, asn, &record)?;
            refreshed += 1;
        }
    }

    info!("refreshed range data of {} records", refreshed);
    Ok(refreshed)
}
