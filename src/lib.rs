#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

//! Asntriage - ASN classification toolkit
//!
//! Asntriage classifies the autonomous systems behind observed IP addresses
//! into a small set of curated categories and keeps each stored
//! classification's IP-range data in sync with a periodically refreshed
//! bulk ASN database (MaxMind MMDB format). It can be used as both a
//! command-line application and a library.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - **[`bulkdb`]**: the bulk ASN database collaborator — full block
//!   iteration and single-address lookup behind the [`BulkAsnDb`] trait,
//!   with [`MmdbAsnDb`] as the MMDB-backed implementation
//! - **[`index`]**: the ASN-to-ranges index, rebuilt wholesale from one
//!   bulk-database snapshot
//! - **[`store`]**: the directory-per-category record store and the
//!   classification record type
//! - **[`classify`]**: classification of an incoming address stream,
//!   filing unseen ASNs as pending records
//! - **[`resync`]**: refresh of every stored record's range data from a
//!   fresh index
//! - **[`config`]**: configuration management
//!
//! Data flow: bulk database → range index → classifier / resynchronizer →
//! record store.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use asntriage::{Classifier, MmdbAsnDb, RangeIndex, RecordStore};
//!
//! let db = MmdbAsnDb::open("GeoLite2-ASN.mmdb")?;
//! let index = RangeIndex::build(&db)?;
//! let store = RecordStore::open("/var/lib/asntriage/db")?;
//!
//! // Classify addresses from stdin, one per line
//! let classifier = Classifier::new(&db, &index, &store);
//! classifier.run(std::io::stdin().lock(), std::io::stdout().lock())?;
//!
//! // Later, against a refreshed database snapshot:
//! let index = RangeIndex::build(&db)?;
//! let refreshed = asntriage::resync(&store, &index)?;
//! println!("refreshed {refreshed} records");
//! ```

pub mod bulkdb;
pub mod classify;
pub mod config;
pub mod index;
pub mod resync;
pub mod store;

#[cfg(test)]
pub(crate) mod test_utils;

pub use bulkdb::{AsnInfo, BulkAsnDb, MmdbAsnDb, NetworkBlock};
pub use classify::Classifier;
pub use config::TriageConfig;
pub use index::{RangeEntry, RangeIndex};
pub use resync::resync;
pub use store::{AsnRecord, Category, RecordStore};
