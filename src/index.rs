//! ASN-to-ranges index
//!
//! The range index maps every ASN of one bulk-database snapshot to the IP
//! ranges (and organization names) currently attributed to it. It is
//! rebuilt wholesale from a full scan each time it is needed and never
//! merged across snapshots: the index an operation holds always reflects
//! exactly one snapshot.

use std::collections::HashMap;

use anyhow::Result;
use ipnetwork::{IpNetwork, Ipv4Network};
use tracing::info;

use crate::bulkdb::BulkAsnDb;

/// One IP range attributed to an ASN, with the organization name the bulk
/// database reports for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeEntry {
    /// Canonical CIDR string form of the range; also the map key in stored
    /// records.
    pub range: String,
    /// Organization name registered for the range's ASN.
    pub organization: String,
}

/// Mapping from ASN to the ranges a single bulk-database snapshot
/// attributes to it.
///
/// Entry order within an ASN follows the database's native iteration order
/// and must be treated as arbitrary by consumers.
#[derive(Debug, Default)]
pub struct RangeIndex {
    map: HashMap<u32, Vec<RangeEntry>>,
}

/// Address-family policy: the index covers IPv4 only. IPv4 blocks that a
/// v6-tree database reports as IPv4-mapped or IPv4-compatible IPv6 networks
/// are normalized back to IPv4; IPv6-native blocks are skipped.
fn as_ipv4_network(network: IpNetwork) -> Option<Ipv4Network> {
    match network {
        IpNetwork::V4(v4) => Some(v4),
        IpNetwork::V6(v6) => {
            let addr = v6.network().to_ipv4()?;
            let prefix = v6.prefix().checked_sub(96)?;
            Ipv4Network::new(addr, prefix).ok()
        }
    }
}

impl RangeIndex {
    /// Build the index from a full scan of the given snapshot.
    ///
    /// Fails fast: any structural iteration error or per-block resolution
    /// error aborts the whole build, and no partially built index is ever
    /// returned.
    pub fn build(db: &dyn BulkAsnDb) -> Result<RangeIndex> {
        info!("building ASN-to-ranges index from the bulk database");

        let mut map: HashMap<u32, Vec<RangeEntry>> = HashMap::new();
        for block in db.blocks()? {
            let block = block?;
            let Some(network) = as_ipv4_network(block.network) else {
                continue;
            };
            map.entry(block.asn).or_default().push(RangeEntry {
                range: network.to_string(),
                organization: block.organization,
            });
        }

        info!("indexed ranges for {} autonomous systems", map.len());
        Ok(RangeIndex { map })
    }

    /// The ranges attributed to `asn`, empty for ASNs the snapshot does not
    /// know about.
    pub fn entries(&self, asn: u32) -> &[RangeEntry] {
        self.map.get(&asn).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of distinct ASNs in the index.
    pub fn asn_count(&self) -> usize {
        self.map.len()
    }
}
