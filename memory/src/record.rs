use smallvec::SmallVec;
use snafu::ResultExt;
use tandem_device::{Backend, DevicePtr};

use crate::Addr;
use crate::error::{DeviceSnafu, Result};

/// Which copy of a buffer holds the up-to-date data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Residency {
    #[default]
    Host,
    Device,
}

/// Metadata of a registered host buffer.
#[derive(Debug, Clone)]
pub struct BufferRecord {
    /// Host address; the registry key. Memory behind it belongs to the caller.
    host: Addr,
    bytes: usize,
    /// Device copy, allocated on first device access and owned by the manager.
    device: Option<DevicePtr>,
    residency: Residency,
    /// Addresses of the aliases discovered inside this buffer.
    aliases: SmallVec<[Addr; 4]>,
}

impl BufferRecord {
    pub(crate) fn new(host: Addr, bytes: usize) -> Self {
        Self { host, bytes, device: None, residency: Residency::Host, aliases: SmallVec::new() }
    }

    pub fn host(&self) -> Addr {
        self.host
    }

    pub fn bytes(&self) -> usize {
        self.bytes
    }

    pub fn device(&self) -> Option<DevicePtr> {
        self.device
    }

    pub fn residency(&self) -> Residency {
        self.residency
    }

    pub fn aliases(&self) -> &[Addr] {
        &self.aliases
    }

    /// One past the last host byte.
    pub fn end(&self) -> Addr {
        self.host.add(self.bytes)
    }

    /// Whether `addr` falls inside `[host, host + bytes)`.
    pub fn contains(&self, addr: Addr) -> bool {
        self.host <= addr && addr < self.end()
    }

    /// Device copy of this buffer, allocating it on first use.
    ///
    /// Allocation alone moves no data.
    pub(crate) fn ensure_device(&mut self, backend: &dyn Backend) -> Result<DevicePtr> {
        if let Some(ptr) = self.device {
            return Ok(ptr);
        }

        let ptr = backend.alloc(self.bytes).context(DeviceSnafu)?;
        self.device = Some(ptr);
        tracing::debug!(host = %self.host, device = %ptr, bytes = self.bytes, "allocated device copy");
        Ok(ptr)
    }

    pub(crate) fn set_residency(&mut self, residency: Residency) {
        self.residency = residency;
    }

    pub(crate) fn push_alias(&mut self, alias: Addr) {
        self.aliases.push(alias);
    }
}

/// A sub-view strictly inside a registered buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AliasRecord {
    /// Host address of the owning buffer.
    base: Addr,
    /// Always in `1..base.bytes`.
    offset: usize,
}

impl AliasRecord {
    pub(crate) fn new(base: Addr, offset: usize) -> Self {
        debug_assert!(offset > 0);
        Self { base, offset }
    }

    pub fn base(&self) -> Addr {
        self.base
    }

    pub fn offset(&self) -> usize {
        self.offset
    }
}
