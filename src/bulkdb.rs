//! Bulk ASN database collaborator
//!
//! The bulk database is an externally maintained MaxMind-format dataset
//! mapping IP ranges to ASN ownership metadata. This module consumes it as
//! an opaque collaborator through the [`BulkAsnDb`] trait: a full scan of
//! every network block for index building, and a single-address lookup for
//! classification. [`MmdbAsnDb`] is the production implementation over
//! `maxminddb::Reader`; tests substitute an in-memory implementation.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use ipnetwork::{IpNetwork, Ipv4Network, Ipv6Network};
use maxminddb::{geoip2, MaxMindDBError, Reader};
use tracing::info;

/// One network block of a bulk-database snapshot with its ASN metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkBlock {
    /// The network prefix the block covers.
    pub network: IpNetwork,
    /// ASN the block is attributed to (0 when the block carries no number).
    pub asn: u32,
    /// Organization name registered for the ASN.
    pub organization: String,
}

/// ASN metadata resolved for a single address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsnInfo {
    /// Autonomous System Number.
    pub asn: u32,
    /// Organization name registered for the ASN.
    pub organization: String,
}

/// Read access to one bulk ASN database snapshot.
///
/// Implementations represent a single snapshot: repeated [`blocks`] calls
/// must yield the same data, and [`lookup`] must be consistent with it.
///
/// [`blocks`]: BulkAsnDb::blocks
/// [`lookup`]: BulkAsnDb::lookup
pub trait BulkAsnDb {
    /// Iterate every network block the snapshot knows about, in the
    /// database's native order. A structural iteration failure surfaces as
    /// an `Err` item; callers must abort on it rather than continue.
    fn blocks(&self) -> Result<Box<dyn Iterator<Item = Result<NetworkBlock>> + '_>>;

    /// Resolve the ASN owning a single address. `Ok(None)` means the
    /// database holds no ASN for the address (including an explicit zero
    /// ASN); `Err` is reserved for real lookup failures.
    fn lookup(&self, addr: IpAddr) -> Result<Option<AsnInfo>>;
}

/// Production bulk database backed by a MaxMind MMDB file.
///
/// The reader is opened once per invocation and released when the value is
/// dropped at the end of that invocation's scope.
pub struct MmdbAsnDb {
    reader: Reader<Vec<u8>>,
}

impl MmdbAsnDb {
    /// Open an MMDB ASN database from a file path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let reader = Reader::open_readfile(path)
            .map_err(|e| anyhow!("failed to open bulk ASN database {}: {}", path.display(), e))?;
        info!(
            "opened bulk ASN database {} ({} epoch {})",
            path.display(),
            reader.metadata.database_type,
            reader.metadata.build_epoch
        );
        Ok(Self { reader })
    }

    /// The network covering the database's entire address space.
    fn full_scan_network(&self) -> Result<IpNetwork> {
        let network = if self.reader.metadata.ip_version == 4 {
            IpNetwork::V4(
                Ipv4Network::new(Ipv4Addr::UNSPECIFIED, 0)
                    .context("failed to build IPv4 scan network")?,
            )
        } else {
            IpNetwork::V6(
                Ipv6Network::new(Ipv6Addr::UNSPECIFIED, 0)
                    .context("failed to build IPv6 scan network")?,
            )
        };
        Ok(network)
    }
}

impl BulkAsnDb for MmdbAsnDb {
    fn blocks(&self) -> Result<Box<dyn Iterator<Item = Result<NetworkBlock>> + '_>> {
        let iter = self
            .reader
            .within::<geoip2::Asn>(self.full_scan_network()?)
            .map_err(|e| anyhow!("failed to start bulk database iteration: {}", e))?;

        Ok(Box::new(iter.map(|item| {
            let item = item.map_err(|e| anyhow!("bulk database iteration failed: {}", e))?;
            Ok(NetworkBlock {
                network: item.ip_net,
                asn: item.info.autonomous_system_number.unwrap_or(0),
                organization: item
                    .info
                    .autonomous_system_organization
                    .unwrap_or_default()
                    .to_string(),
            })
        })))
    }

    fn lookup(&self, addr: IpAddr) -> Result<Option<AsnInfo>> {
        let asn: geoip2::Asn = match self.reader.lookup(addr) {
            Ok(asn) => asn,
            Err(MaxMindDBError::AddressNotFoundError(_)) => return Ok(None),
            Err(e) => return Err(anyhow!("bulk database lookup failed: {}", e)),
        };
        match asn.autonomous_system_number {
            Some(number) if number != 0 => Ok(Some(AsnInfo {
                asn: number,
                organization: asn
                    .autonomous_system_organization
                    .unwrap_or_default()
                    .to_string(),
            })),
            _ => Ok(None),
        }
    }
}
