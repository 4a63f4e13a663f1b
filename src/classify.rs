//! Address stream classification
//!
//! The classifier consumes a line-oriented stream of IP addresses, reports
//! one line per input on the output stream, and files a pending record for
//! every resolved ASN that is not yet classified anywhere.

use std::io::{BufRead, Write};
use std::net::IpAddr;

use anyhow::{Context, Result};
use tracing::info;

use crate::bulkdb::BulkAsnDb;
use crate::index::RangeIndex;
use crate::store::{AsnRecord, Category, RecordStore};

/// Classifies a stream of observed addresses against one bulk-database
/// snapshot and its range index.
///
/// The check-then-create step for new pending records is not atomic across
/// processes; concurrent classifier invocations are unsupported (single
/// writer assumed).
pub struct Classifier<'a> {
    db: &'a dyn BulkAsnDb,
    index: &'a RangeIndex,
    store: &'a RecordStore,
}

impl<'a> Classifier<'a> {
    pub fn new(db: &'a dyn BulkAsnDb, index: &'a RangeIndex, store: &'a RecordStore) -> Self {
        Self { db, index, store }
    }

    /// Process the input stream to completion.
    ///
    /// Per line, exactly one report line is written to `output`:
    /// `"<addr> - OK - AS<number> - <organization>"` on success,
    /// `"<line> - failed to parse"` for unparsable addresses, and
    /// `"<addr> - failed to lookup[: <detail>]"` when the bulk database has
    /// no ASN for the address or the lookup itself failed. Per-line
    /// failures never stop the stream; storage and input errors do.
    pub fn run(&self, input: impl BufRead, mut output: impl Write) -> Result<()> {
        let mut created = 0usize;

        for line in input.lines() {
            let line = line.context("failed to read address stream")?;

            let Ok(parsed) = line.parse::<IpAddr>() else {
                writeln!(output, "{line} - failed to parse")?;
                continue;
            };
            // Report the canonical textual form, not the raw input.
            let addr = parsed.to_string();

            let info = match self.db.lookup(parsed) {
                Ok(Some(info)) => info,
                Ok(None) => {
                    writeln!(output, "{addr} - failed to lookup")?;
                    continue;
                }
                Err(e) => {
                    writeln!(output, "{addr} - failed to lookup: {e}")?;
                    continue;
                }
            };
            writeln!(output, "{addr} - OK - AS{} - {}", info.asn, info.organization)?;

            if !self.store.exists_in_any(info.asn)? {
                let mut record = AsnRecord::default();
                record.apply_ranges(self.index, info.asn);
                self.store.save(Category::Pending, info.asn, &record)?;
                created += 1;
            }
        }

        info!("created {} pending records", created);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MemAsnDb;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn setup() -> (TempDir, RecordStore, MemAsnDb) {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = RecordStore::open(temp_dir.path().join("db")).unwrap();
        let db = MemAsnDb::new(vec![("198.51.100.0/24", 64500, "Example Org")]);
        (temp_dir, store, db)
    }

    fn classify(db: &MemAsnDb, store: &RecordStore, input: &str) -> String {
        let index = RangeIndex::build(db).unwrap();
        let classifier = Classifier::new(db, &index, store);
        let mut output = Vec::new();
        classifier.run(input.as_bytes(), &mut output).unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn test_known_address_creates_pending_record() {
        let (_temp_dir, store, db) = setup();
        let output = classify(&db, &store, "198.51.100.7\n");

        assert_eq!(output, "198.51.100.7 - OK - AS64500 - Example Org\n");

        let record = store.load(Category::Pending, 64500).unwrap();
        assert_eq!(record.ranges, vec!["198.51.100.0/24"]);
        assert_eq!(
            record.ranges_org,
            BTreeMap::from([(
                "198.51.100.0/24".to_string(),
                "Example Org".to_string()
            )])
        );
        assert!(record.ranges_date.is_some());
        // Only range fields are populated on creation.
        assert!(record.whois.is_none());
        assert!(record.added.is_none());
        assert!(store.exists_in_any(64500).unwrap());
    }

    #[test]
    fn test_unparsable_address_is_reported_and_skipped() {
        let (_temp_dir, store, db) = setup();
        let output = classify(&db, &store, "not-an-ip\n198.51.100.7\n");

        assert_eq!(
            output,
            "not-an-ip - failed to parse\n198.51.100.7 - OK - AS64500 - Example Org\n"
        );
        // The bad line created nothing; the good one did.
        assert_eq!(store.list(Category::Pending).unwrap(), vec!["64500"]);
    }

    #[test]
    fn test_unknown_address_is_reported_and_skipped() {
        let (_temp_dir, store, db) = setup();
        let output = classify(&db, &store, "203.0.113.9\n");

        assert_eq!(output, "203.0.113.9 - failed to lookup\n");
        assert!(store.list(Category::Pending).unwrap().is_empty());
    }

    #[test]
    fn test_second_observation_performs_no_write() {
        let (_temp_dir, store, db) = setup();
        classify(&db, &store, "198.51.100.7\n");

        // A human annotates the pending record between observations.
        let mut record = store.load(Category::Pending, 64500).unwrap();
        record.whois = Some("annotated".to_string());
        store.save(Category::Pending, 64500, &record).unwrap();

        classify(&db, &store, "198.51.100.7\n");
        let reloaded = store.load(Category::Pending, 64500).unwrap();
        assert_eq!(reloaded.whois.as_deref(), Some("annotated"));
    }

    #[test]
    fn test_classified_asn_is_not_refiled_from_other_categories() {
        let (_temp_dir, store, db) = setup();
        store
            .save(Category::Approved, 64500, &AsnRecord::default())
            .unwrap();

        classify(&db, &store, "198.51.100.7\n");
        assert!(!store.exists(Category::Pending, 64500).unwrap());
    }
}
