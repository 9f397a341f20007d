//! Observational view of the registry tables.

use std::fmt;

use tandem_device::DevicePtr;
use tracing::debug;

use crate::Addr;
use crate::record::Residency;
use crate::registry::Registry;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferEntry {
    pub host: Addr,
    pub bytes: usize,
    pub device: Option<DevicePtr>,
    pub residency: Residency,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasEntry {
    pub addr: Addr,
    pub offset: usize,
    pub base: Addr,
}

/// Copy of the buffer and alias tables, both in ascending address order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub buffers: Vec<BufferEntry>,
    pub aliases: Vec<AliasEntry>,
}

impl Snapshot {
    pub(crate) fn capture(registry: &Registry) -> Self {
        let buffers = registry
            .buffers()
            .map(|record| BufferEntry {
                host: record.host(),
                bytes: record.bytes(),
                device: record.device(),
                residency: record.residency(),
            })
            .collect();

        let mut aliases: Vec<_> = registry
            .aliases()
            .map(|(addr, alias)| AliasEntry { addr, offset: alias.offset(), base: alias.base() })
            .collect();
        aliases.sort_unstable_by_key(|entry| entry.addr);

        Self { buffers, aliases }
    }

    /// Emit one DEBUG event per entry.
    pub(crate) fn trace(&self) {
        for (index, entry) in self.buffers.iter().enumerate() {
            debug!(
                index,
                host = %entry.host,
                bytes = entry.bytes,
                device = ?entry.device.map(|ptr| ptr.to_string()),
                residency = ?entry.residency,
                "buffer"
            );
        }
        for (index, entry) in self.aliases.iter().enumerate() {
            debug!(index, addr = %entry.addr, offset = entry.offset, base = %entry.base, "alias");
        }
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "buffers:")?;
        for (index, entry) in self.buffers.iter().enumerate() {
            write!(f, "[{index}] {} ({})", entry.host, entry.bytes)?;
            if let Some(device) = entry.device {
                write!(f, " -> {device}")?;
            }
            writeln!(f, " {:?}", entry.residency)?;
        }
        writeln!(f, "aliases:")?;
        for (index, entry) in self.aliases.iter().enumerate() {
            writeln!(f, "[{index}] {} < ({}) < {}", entry.base, entry.offset, entry.addr)?;
        }
        Ok(())
    }
}
