//! Classification record store
//!
//! Records live in a flat directory-per-category layout under a single
//! root: one JSON file per classified ASN, named by the ASN's decimal
//! string, inside the directory of the category it currently belongs to.
//! The category set is a closed enumeration; a record occupies exactly one
//! category at a time, and moving a record between categories is a manual
//! action outside this store.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::index::RangeIndex;

/// The fixed set of classification buckets a record can occupy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Newly observed ASNs awaiting a human decision.
    Pending,
    /// ASNs cleared by a human reviewer.
    Approved,
    /// ASNs rejected by a human reviewer.
    Rejected,
}

impl Category {
    /// Every category, in the order directory walks visit them.
    pub const ALL: [Category; 3] = [Category::Pending, Category::Approved, Category::Rejected];

    /// Directory name of the category under the store root.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Category::Pending => "pending",
            Category::Approved => "approved",
            Category::Rejected => "rejected",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.dir_name())
    }
}

/// One classification record, serialized as a JSON document per ASN.
///
/// The manual fields (`added`, `whois`, `whois_date`, `pdb`, `pdb_date`,
/// `exclusions`) are entered by humans and never touched by this system.
/// The range-derived fields (`ranges`, `ranges_org`, `ranges_date`) are
/// always replaced together from a freshly built [`RangeIndex`] and never
/// merged with prior contents. Empty fields are omitted on disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AsnRecord {
    /// Date the ASN was first classified.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added: Option<String>,

    /// Free-form whois excerpt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub whois: Option<String>,

    /// Date the whois excerpt was captured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub whois_date: Option<String>,

    /// External database reference, free-form JSON.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdb: Option<serde_json::Value>,

    /// Date the external reference was captured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdb_date: Option<String>,

    /// Ranges currently attributed to the ASN, from the range index.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ranges: Vec<String>,

    /// Organization name per range, from the range index.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub ranges_org: BTreeMap<String, String>,

    /// When the range fields were last refreshed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ranges_date: Option<String>,

    /// Ranges a human excluded from enforcement.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclusions: Vec<String>,
}

impl AsnRecord {
    /// Replace the range-derived fields from a freshly built index.
    ///
    /// The prior range list and organization map are discarded, not merged;
    /// an ASN absent from the index ends up with empty range fields. All
    /// other fields are left untouched.
    pub fn apply_ranges(&mut self, index: &RangeIndex, asn: u32) {
        self.ranges = Vec::new();
        self.ranges_org = BTreeMap::new();
        for entry in index.entries(asn) {
            self.ranges.push(entry.range.clone());
            self.ranges_org
                .insert(entry.range.clone(), entry.organization.clone());
        }
        self.ranges_date = Some(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true));
    }
}

/// Directory-per-category flat file store keyed by ASN.
pub struct RecordStore {
    root: PathBuf,
}

impl RecordStore {
    /// Open the store rooted at `root`, materializing any missing category
    /// directory so an empty category is still valid and checkable.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        for category in Category::ALL {
            let dir = root.join(category.dir_name());
            fs::create_dir_all(&dir).with_context(|| {
                format!("failed to create category directory {}", dir.display())
            })?;
        }
        Ok(Self { root })
    }

    /// Path of the record file for `asn` under `category`.
    pub fn record_path(&self, category: Category, asn: u32) -> PathBuf {
        self.root.join(category.dir_name()).join(asn.to_string())
    }

    /// Whether a record for `asn` exists under `category`. Any error other
    /// than "not found" indicates a storage problem and is fatal.
    pub fn exists(&self, category: Category, asn: u32) -> Result<bool> {
        match fs::metadata(self.record_path(category, asn)) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(anyhow!(
                "failed to check record {} in category {}: {}",
                asn,
                category,
                e
            )),
        }
    }

    /// Whether a record for `asn` exists in any category. Every category in
    /// the fixed set is checked; a storage fault in any of them surfaces
    /// even when an earlier category already matched.
    pub fn exists_in_any(&self, asn: u32) -> Result<bool> {
        let mut found = false;
        for category in Category::ALL {
            found |= self.exists(category, asn)?;
        }
        Ok(found)
    }

    /// Load and decode the record for `asn` under `category`. Missing or
    /// malformed files are fatal; callers must have established existence.
    pub fn load(&self, category: Category, asn: u32) -> Result<AsnRecord> {
        let path = self.record_path(category, asn);
        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read record {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("malformed record {}", path.display()))
    }

    /// Serialize and write the record for `asn` under `category`, replacing
    /// any existing content. The record is written to a dot-prefixed
    /// temporary file in the category directory and renamed over the
    /// target, so a partial write is never visible and the temporary stays
    /// invisible to [`list`](RecordStore::list).
    pub fn save(&self, category: Category, asn: u32, record: &AsnRecord) -> Result<()> {
        let path = self.record_path(category, asn);
        let tmp = self
            .root
            .join(category.dir_name())
            .join(format!(".{asn}.tmp"));

        let content = serde_json::to_string_pretty(record)
            .with_context(|| format!("failed to serialize record for AS{asn}"))?;
        fs::write(&tmp, content)
            .with_context(|| format!("failed to write record {}", tmp.display()))?;
        fs::rename(&tmp, &path)
            .with_context(|| format!("failed to replace record {}", path.display()))?;

        debug!("saved record for AS{} in category {}", asn, category);
        Ok(())
    }

    /// List the record filenames under `category`, excluding dot-prefixed
    /// entries, sorted by filename length then lexicographically. ASN
    /// numbers are the filenames, so length-then-lex approximates numeric
    /// order without parsing ("9" sorts before "10").
    pub fn list(&self, category: Category) -> Result<Vec<String>> {
        let dir = self.root.join(category.dir_name());
        let entries = fs::read_dir(&dir)
            .with_context(|| format!("failed to read category directory {}", dir.display()))?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry
                .with_context(|| format!("failed to read category directory {}", dir.display()))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            names.push(name);
        }
        names.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
        Ok(names)
    }

    /// The store root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MemAsnDb;
    use tempfile::TempDir;

    fn setup_store() -> (TempDir, RecordStore) {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = RecordStore::open(temp_dir.path().join("db")).unwrap();
        (temp_dir, store)
    }

    fn sample_record() -> AsnRecord {
        AsnRecord {
            added: Some("2024-05-01".to_string()),
            whois: Some("sample".to_string()),
            ranges: vec!["198.51.100.0/24".to_string()],
            ranges_org: BTreeMap::from([(
                "198.51.100.0/24".to_string(),
                "Example Org".to_string(),
            )]),
            ranges_date: Some("2024-05-01T00:00:00Z".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_open_creates_category_directories() {
        let (temp_dir, _store) = setup_store();
        for category in Category::ALL {
            assert!(temp_dir.path().join("db").join(category.dir_name()).is_dir());
        }
    }

    #[test]
    fn test_save_load_round_trip() {
        let (_temp_dir, store) = setup_store();
        let record = sample_record();

        store.save(Category::Approved, 64500, &record).unwrap();
        let loaded = store.load(Category::Approved, 64500).unwrap();
        assert_eq!(loaded, record);
    }

    #[test]
    fn test_save_replaces_existing_content() {
        let (_temp_dir, store) = setup_store();
        store.save(Category::Pending, 64500, &sample_record()).unwrap();

        let replacement = AsnRecord {
            whois: Some("updated".to_string()),
            ..Default::default()
        };
        store.save(Category::Pending, 64500, &replacement).unwrap();

        let loaded = store.load(Category::Pending, 64500).unwrap();
        assert_eq!(loaded, replacement);
    }

    #[test]
    fn test_exists_per_category() {
        let (_temp_dir, store) = setup_store();
        store.save(Category::Pending, 64500, &sample_record()).unwrap();

        assert!(store.exists(Category::Pending, 64500).unwrap());
        assert!(!store.exists(Category::Approved, 64500).unwrap());
        assert!(!store.exists(Category::Pending, 64501).unwrap());
    }

    #[test]
    fn test_exists_in_any_covers_all_categories() {
        let (_temp_dir, store) = setup_store();
        assert!(!store.exists_in_any(64500).unwrap());

        store.save(Category::Rejected, 64500, &sample_record()).unwrap();
        assert!(store.exists_in_any(64500).unwrap());
        // Repeated observation stays true.
        assert!(store.exists_in_any(64500).unwrap());
    }

    #[test]
    fn test_load_missing_record_is_fatal() {
        let (_temp_dir, store) = setup_store();
        assert!(store.load(Category::Pending, 64500).is_err());
    }

    #[test]
    fn test_load_malformed_record_is_fatal() {
        let (_temp_dir, store) = setup_store();
        fs::write(store.record_path(Category::Pending, 64500), "not json").unwrap();
        assert!(store.load(Category::Pending, 64500).is_err());
    }

    #[test]
    fn test_list_sorts_by_length_then_lexicographically() {
        let (_temp_dir, store) = setup_store();
        for asn in [9u32, 10, 100, 2] {
            store.save(Category::Pending, asn, &AsnRecord::default()).unwrap();
        }

        let names = store.list(Category::Pending).unwrap();
        assert_eq!(names, vec!["2", "9", "10", "100"]);
    }

    #[test]
    fn test_list_skips_hidden_entries() {
        let (_temp_dir, store) = setup_store();
        store.save(Category::Pending, 64500, &AsnRecord::default()).unwrap();
        fs::write(
            store.root().join(Category::Pending.dir_name()).join(".64501.tmp"),
            "{}",
        )
        .unwrap();

        assert_eq!(store.list(Category::Pending).unwrap(), vec!["64500"]);
    }

    #[test]
    fn test_empty_fields_are_omitted_on_disk() {
        let (_temp_dir, store) = setup_store();
        store.save(Category::Pending, 64500, &AsnRecord::default()).unwrap();

        let content = fs::read_to_string(store.record_path(Category::Pending, 64500)).unwrap();
        assert_eq!(content.trim(), "{}");
    }

    #[test]
    fn test_apply_ranges_replaces_without_merging() {
        let db = MemAsnDb::new(vec![("203.0.113.0/24", 64500, "Example Org")]);
        let index = RangeIndex::build(&db).unwrap();

        let mut record = sample_record();
        record.apply_ranges(&index, 64500);

        assert_eq!(record.ranges, vec!["203.0.113.0/24"]);
        assert_eq!(
            record.ranges_org.get("203.0.113.0/24"),
            Some(&"Example Org".to_string())
        );
        // No residue from the prior snapshot.
        assert!(!record.ranges_org.contains_key("198.51.100.0/24"));
        // Manual fields are untouched.
        assert_eq!(record.whois.as_deref(), Some("sample"));
        assert_eq!(record.added.as_deref(), Some("2024-05-01"));
    }

    #[test]
    fn test_apply_ranges_empties_fields_for_unknown_asn() {
        let db = MemAsnDb::new(vec![("203.0.113.0/24", 64500, "Example Org")]);
        let index = RangeIndex::build(&db).unwrap();

        let mut record = sample_record();
        record.apply_ranges(&index, 64999);

        assert!(record.ranges.is_empty());
        assert!(record.ranges_org.is_empty());
        assert!(record.ranges_date.is_some());
    }
}
