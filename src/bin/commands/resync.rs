use anyhow::Result;

use asntriage::{MmdbAsnDb, RangeIndex, RecordStore, TriageConfig};

/// Rebuild the range index from the current bulk database and rewrite the
/// range data of every stored record.
pub fn run(config: &TriageConfig) -> Result<()> {
    let db = MmdbAsnDb::open(config.require_mmdb_path()?)?;
    let index = RangeIndex::build(&db)?;
    let store = RecordStore::open(config.store_root())?;

    asntriage::resync(&store, &index)?;
    Ok(())
}
