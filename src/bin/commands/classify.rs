use std::io;

use anyhow::Result;

use asntriage::{Classifier, MmdbAsnDb, RangeIndex, RecordStore, TriageConfig};

/// Classify the addresses arriving on standard input.
///
/// The bulk database handle lives for exactly this invocation and is
/// released when the function returns, on success and failure alike.
pub fn run(config: &TriageConfig) -> Result<()> {
    let db = MmdbAsnDb::open(config.require_mmdb_path()?)?;
    let index = RangeIndex::build(&db)?;
    let store = RecordStore::open(config.store_root())?;

    let classifier = Classifier::new(&db, &index, &store);
    classifier.run(io::stdin().lock(), io::stdout().lock())
}
