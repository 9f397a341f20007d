//! Address bookkeeping for registered buffers and their aliases.
//!
//! Buffers are kept in an ordered map keyed by host address. Because registered ranges are
//! disjoint, the only buffer that can contain an address is its predecessor in that order, so
//! both overlap checks on insert and alias discovery are a single range lookup. Discovered
//! aliases are memoized in a hash map and answered in O(1) afterwards.

use std::collections::{BTreeMap, HashMap};

use snafu::{OptionExt, ensure};
use tracing::{debug, trace};

use crate::Addr;
use crate::error::{
    AlreadyRegisteredSnafu, InvalidAliasSnafu, InvalidRangeSnafu, KnownAddressSnafu, OverlapSnafu, Result,
    UnknownAddressSnafu,
};
use crate::record::{AliasRecord, BufferRecord};

/// How the registry sees an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Class {
    /// The start of a registered buffer.
    Known,
    /// Strictly inside the buffer at `base`.
    Alias { base: Addr, offset: usize },
    /// Not covered by any registered buffer.
    Unknown,
}

impl Class {
    /// Owning buffer and byte offset into it, for classified addresses.
    pub fn target(self, addr: Addr) -> Option<(Addr, usize)> {
        match self {
            Class::Known => Some((addr, 0)),
            Class::Alias { base, offset } => Some((base, offset)),
            Class::Unknown => None,
        }
    }
}

/// Owner of every buffer and alias record.
#[derive(Debug, Default)]
pub struct Registry {
    buffers: BTreeMap<Addr, BufferRecord>,
    aliases: HashMap<Addr, AliasRecord>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `bytes` of host memory starting at `addr`.
    ///
    /// The range must not intersect any registered buffer.
    pub fn insert(&mut self, addr: Addr, bytes: usize) -> Result<Addr> {
        ensure!(!self.is_known(addr), AlreadyRegisteredSnafu { addr });
        let end = addr.checked_add(bytes).context(InvalidRangeSnafu { addr, bytes })?;

        if let Some((&other, below)) = self.buffers.range(..addr).next_back() {
            ensure!(below.end() <= addr, OverlapSnafu { addr, bytes, other, other_bytes: below.bytes() });
        }
        if let Some((&other, above)) = self.buffers.range(addr..).next() {
            ensure!(end <= other, OverlapSnafu { addr, bytes, other, other_bytes: above.bytes() });
        }

        self.buffers.insert(addr, BufferRecord::new(addr, bytes));
        debug!(%addr, bytes, "registered buffer");
        Ok(addr)
    }

    /// Forget the buffer at `addr` together with every alias into it.
    ///
    /// The removed record is returned so the caller can release its device copy.
    pub fn erase(&mut self, addr: Addr) -> Result<BufferRecord> {
        let record = self.buffers.remove(&addr).context(UnknownAddressSnafu { addr })?;
        for alias in record.aliases() {
            self.aliases.remove(alias);
        }
        debug!(%addr, bytes = record.bytes(), aliases = record.aliases().len(), "erased buffer");
        Ok(record)
    }

    pub fn is_known(&self, addr: Addr) -> bool {
        self.buffers.contains_key(&addr)
    }

    /// Whether `addr` lies strictly inside a registered buffer.
    ///
    /// The first positive answer for an address records an alias, so later queries skip the
    /// base search.
    pub fn is_alias(&mut self, addr: Addr) -> bool {
        !self.is_known(addr) && self.lookup_alias(addr).is_some()
    }

    /// Host address of the buffer containing `addr`, if any.
    ///
    /// Must not be asked about the start of a registered buffer.
    pub fn find_alias_base(&self, addr: Addr) -> Result<Option<Addr>> {
        ensure!(!self.is_known(addr), KnownAddressSnafu { addr });

        let base = self.buffers.range(..addr).next_back().filter(|(_, record)| record.contains(addr));
        Ok(base.map(|(&base, _)| base))
    }

    /// Classify `addr`, discovering and recording a new alias when needed.
    pub fn classify(&mut self, addr: Addr) -> Class {
        if self.is_known(addr) {
            return Class::Known;
        }
        match self.lookup_alias(addr) {
            Some(alias) => Class::Alias { base: alias.base(), offset: alias.offset() },
            None => Class::Unknown,
        }
    }

    /// Declare the sub-view `offset` bytes into the buffer at `base`.
    ///
    /// Declaring the same sub-view again is a no-op.
    pub fn declare_alias(&mut self, base: Addr, offset: usize) -> Result<Addr> {
        let record = self.buffers.get(&base).context(UnknownAddressSnafu { addr: base })?;
        let bytes = record.bytes();
        ensure!(offset > 0 && offset < bytes, InvalidAliasSnafu { base, offset, bytes });

        let addr = base.add(offset);
        if !self.aliases.contains_key(&addr) {
            self.record_alias(base, offset);
        }
        Ok(addr)
    }

    pub fn buffer(&self, addr: Addr) -> Option<&BufferRecord> {
        self.buffers.get(&addr)
    }

    pub(crate) fn buffer_mut(&mut self, addr: Addr) -> Option<&mut BufferRecord> {
        self.buffers.get_mut(&addr)
    }

    /// Recorded alias at `addr`, without attempting discovery.
    pub fn alias(&self, addr: Addr) -> Option<&AliasRecord> {
        self.aliases.get(&addr)
    }

    /// Number of registered buffers.
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Number of recorded aliases.
    pub fn alias_count(&self) -> usize {
        self.aliases.len()
    }

    /// Buffers in ascending host address order.
    pub fn buffers(&self) -> impl Iterator<Item = &BufferRecord> {
        self.buffers.values()
    }

    /// Recorded aliases, in no particular order.
    pub fn aliases(&self) -> impl Iterator<Item = (Addr, &AliasRecord)> {
        self.aliases.iter().map(|(&addr, alias)| (addr, alias))
    }

    /// Remove every record, handing the buffers back for teardown.
    pub(crate) fn drain(&mut self) -> impl Iterator<Item = BufferRecord> {
        self.aliases.clear();
        std::mem::take(&mut self.buffers).into_values()
    }

    fn lookup_alias(&mut self, addr: Addr) -> Option<AliasRecord> {
        if let Some(alias) = self.aliases.get(&addr) {
            trace!(%addr, "alias hit");
            return Some(*alias);
        }

        let base = self.find_alias_base(addr).ok().flatten()?;
        let offset = addr.offset_from(base)?;
        Some(self.record_alias(base, offset))
    }

    fn record_alias(&mut self, base: Addr, offset: usize) -> AliasRecord {
        let addr = base.add(offset);
        let alias = AliasRecord::new(base, offset);

        self.aliases.insert(addr, alias);
        if let Some(record) = self.buffers.get_mut(&base) {
            record.push_alias(addr);
        }
        debug!(%addr, %base, offset, "recorded alias");
        alias
    }
}
