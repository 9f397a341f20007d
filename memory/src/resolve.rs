//! Address resolution: a registered address plus an execution mode to the address to use.

use snafu::{OptionExt, ResultExt, ensure};
use tracing::{debug, trace};

use crate::Addr;
use crate::error::{DeviceSnafu, Result, UnknownAddressSnafu};
use crate::manager::MemoryManager;
use crate::record::Residency;

/// Side of the machine an access runs on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Host code dereferences the result.
    #[default]
    HostOnly,
    /// A device kernel dereferences the result.
    Accelerated,
}

impl MemoryManager {
    /// Translate `addr` into the address valid for `mode`, moving data when the other side holds
    /// the current copy.
    ///
    /// Aliases act on their whole base buffer and come back offset into the chosen side.
    /// Unregistered addresses pass through in [`Mode::HostOnly`] and fail in
    /// [`Mode::Accelerated`].
    pub fn resolve(&mut self, addr: Addr, mode: Mode) -> Result<Addr> {
        let result = self.resolve_inner(addr, mode);
        self.checked(result)
    }

    /// [`MemoryManager::resolve`] for a typed mutable pointer.
    pub fn resolve_ptr<T>(&mut self, ptr: *mut T, mode: Mode) -> Result<*mut T> {
        self.resolve(Addr::from_mut_ptr(ptr), mode).map(Addr::as_mut_ptr)
    }

    /// [`MemoryManager::resolve`] for a typed const pointer.
    pub fn resolve_const<T>(&mut self, ptr: *const T, mode: Mode) -> Result<*const T> {
        self.resolve(Addr::from_ptr(ptr), mode).map(Addr::as_ptr)
    }

    pub(crate) fn resolve_inner(&mut self, addr: Addr, mode: Mode) -> Result<Addr> {
        let Some((base, offset)) = self.registry.classify(addr).target(addr) else {
            ensure!(mode == Mode::HostOnly, UnknownAddressSnafu { addr });
            trace!(%addr, "unregistered host address");
            return Ok(addr);
        };

        let record = self.registry.buffer_mut(base).context(UnknownAddressSnafu { addr: base })?;
        let bytes = record.bytes();

        match (record.residency(), mode) {
            (Residency::Host, Mode::HostOnly) => Ok(addr),
            (Residency::Device, Mode::Accelerated) => {
                let device = record.ensure_device(&*self.backend)?;
                Ok(device.add(offset).into())
            }
            (Residency::Device, Mode::HostOnly) => {
                let device = record.ensure_device(&*self.backend)?;
                // SAFETY: the host range was vouched for at registration.
                unsafe { self.backend.copy_dtoh(base.as_mut_ptr(), device, bytes) }.context(DeviceSnafu)?;
                record.set_residency(Residency::Host);
                debug!(%base, %device, bytes, "pulled buffer to host");
                Ok(addr)
            }
            (Residency::Host, Mode::Accelerated) => {
                let device = record.ensure_device(&*self.backend)?;
                // SAFETY: the host range was vouched for at registration.
                unsafe { self.backend.copy_htod(device, base.as_ptr(), bytes) }.context(DeviceSnafu)?;
                record.set_residency(Residency::Device);
                debug!(%base, %device, bytes, "pushed buffer to device");
                Ok(device.add(offset).into())
            }
        }
    }
}
