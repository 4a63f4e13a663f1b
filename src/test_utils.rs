//! Shared test helpers.

use std::net::IpAddr;

use anyhow::Result;

use crate::bulkdb::{AsnInfo, BulkAsnDb, NetworkBlock};

/// In-memory bulk database standing in for an MMDB snapshot in tests.
///
/// Blocks are yielded in insertion order; lookups return the most specific
/// block containing the address.
pub(crate) struct MemAsnDb {
    blocks: Vec<NetworkBlock>,
}

impl MemAsnDb {
    pub(crate) fn new(blocks: Vec<(&str, u32, &str)>) -> Self {
        let blocks = blocks
            .into_iter()
            .map(|(network, asn, organization)| NetworkBlock {
                network: network.parse().unwrap(),
                asn,
                organization: organization.to_string(),
            })
            .collect();
        Self { blocks }
    }
}

impl BulkAsnDb for MemAsnDb {
    fn blocks(&self) -> Result<Box<dyn Iterator<Item = Result<NetworkBlock>> + '_>> {
        Ok(Box::new(self.blocks.iter().cloned().map(Ok)))
    }

    fn lookup(&self, addr: IpAddr) -> Result<Option<AsnInfo>> {
        Ok(self
            .blocks
            .iter()
            .filter(|block| block.network.contains(addr))
            .max_by_key(|block| block.network.prefix())
            .filter(|block| block.asn != 0)
            .map(|block| AsnInfo {
                asn: block.asn,
                organization: block.organization.clone(),
            }))
    }
}
