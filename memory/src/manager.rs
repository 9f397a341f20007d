use std::marker::PhantomData;
use std::rc::Rc;
use std::sync::Arc;

use snafu::{OptionExt, ResultExt};
use tandem_device::Backend;

use crate::Addr;
use crate::config::MemoryConfig;
use crate::dump::Snapshot;
use crate::error::{DeviceSnafu, Result, UnknownAddressSnafu};
use crate::registry::{Class, Registry};

/// Tracks caller-owned host buffers and the device copies made of them.
///
/// The manager is the single owner of the registry and of every device allocation. It is
/// `!Send + !Sync`: all registrations, resolutions and transfers are serialized by the thread
/// that owns it. Dropping the manager releases all device copies; host memory is never touched
/// by teardown.
#[derive(Debug)]
pub struct MemoryManager {
    pub(crate) registry: Registry,
    pub(crate) backend: Arc<dyn Backend>,
    config: MemoryConfig,
    /// Marker to make the manager `!Send + !Sync` (single-threaded only).
    _not_send_sync: PhantomData<Rc<()>>,
}

impl MemoryManager {
    pub fn new(backend: Arc<dyn Backend>, config: MemoryConfig) -> Self {
        tracing::debug!(backend = backend.name(), debug = config.debug, "memory manager created");
        Self { registry: Registry::new(), backend, config, _not_send_sync: PhantomData }
    }

    /// Open the backend named by `config.device`.
    pub fn from_config(config: MemoryConfig) -> Result<Self> {
        let backend = config.device.open().context(DeviceSnafu)?;
        Ok(Self::new(backend, config))
    }

    /// Shorthand for `from_config(MemoryConfig::from_env())`.
    pub fn from_env() -> Result<Self> {
        Self::from_config(MemoryConfig::from_env())
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Register `bytes` of host memory at `addr`. Returns `addr`.
    ///
    /// # Safety
    ///
    /// `[addr, addr + bytes)` must stay valid for reads and writes until the buffer is erased.
    /// The manager copies into and out of it during resolve, push and pull.
    pub unsafe fn insert(&mut self, addr: Addr, bytes: usize) -> Result<Addr> {
        let result = self.registry.insert(addr, bytes);
        self.checked(result)
    }

    /// Forget the buffer at `addr`, its aliases and its device copy. Returns `addr`.
    pub fn erase(&mut self, addr: Addr) -> Result<Addr> {
        let result = self.erase_buffer(addr);
        self.checked(result)
    }

    /// Declare the sub-view `offset` bytes into the buffer at `base`, returning its address.
    pub fn declare_alias(&mut self, base: Addr, offset: usize) -> Result<Addr> {
        let result = self.registry.declare_alias(base, offset);
        self.checked(result)
    }

    pub fn classify(&mut self, addr: Addr) -> Class {
        self.registry.classify(addr)
    }

    pub fn is_known(&self, addr: Addr) -> bool {
        self.registry.is_known(addr)
    }

    pub fn is_alias(&mut self, addr: Addr) -> bool {
        self.registry.is_alias(addr)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(&self.registry)
    }

    /// Log the buffer and alias tables when debugging is enabled.
    ///
    /// Returns the emitted snapshot, or `None` when debugging is off.
    pub fn dump(&self) -> Option<Snapshot> {
        if !self.config.debug {
            return None;
        }
        let snapshot = self.snapshot();
        snapshot.trace();
        Some(snapshot)
    }

    /// Wait for asynchronous device copies.
    pub fn synchronize(&self) -> Result<()> {
        let result = self.backend.synchronize().context(DeviceSnafu);
        self.checked(result)
    }

    /// Owning buffer and offset of a known or alias address.
    pub(crate) fn target(&mut self, addr: Addr) -> Result<(Addr, usize)> {
        self.registry.classify(addr).target(addr).context(UnknownAddressSnafu { addr })
    }

    /// Report a failed operation before handing it back.
    pub(crate) fn checked<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(error) = &result {
            tracing::error!(%error, "memory operation failed");
            self.dump();
        }
        result
    }

    /// The device copy is released first so a failed free leaves the buffer registered.
    fn erase_buffer(&mut self, addr: Addr) -> Result<Addr> {
        let record = self.registry.buffer(addr).context(UnknownAddressSnafu { addr })?;
        if let Some(device) = record.device() {
            self.backend.free(device).context(DeviceSnafu)?;
        }
        self.registry.erase(addr)?;
        Ok(addr)
    }
}

impl Drop for MemoryManager {
    fn drop(&mut self) {
        for record in self.registry.drain() {
            let Some(device) = record.device() else { continue };
            if let Err(error) = self.backend.free(device) {
                tracing::warn!(host = %record.host(), %device, %error, "failed to release device copy");
            }
        }
    }
}
