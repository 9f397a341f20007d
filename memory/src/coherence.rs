//! Explicit transfers: push, pull and same-side copies.
//!
//! Push and pull never change residency; that stays with [`MemoryManager::resolve`]. Callers
//! batching their own transfers keep the two copies consistent themselves.

use snafu::{OptionExt, ResultExt, ensure};
use tandem_device::DevicePtr;
use tracing::debug;

use crate::Addr;
use crate::error::{DeviceSnafu, NoDeviceCopySnafu, OutOfBoundsSnafu, Result, UnknownAddressSnafu};
use crate::manager::MemoryManager;
use crate::record::BufferRecord;
use crate::resolve::Mode;

/// Offset into the owning buffer and length of a push/pull request.
///
/// `bytes == 0` selects the whole owning buffer.
fn transfer_span(record: &BufferRecord, addr: Addr, offset: usize, bytes: usize) -> Result<(usize, usize)> {
    if bytes == 0 {
        return Ok((0, record.bytes()));
    }
    let available = record.bytes() - offset;
    ensure!(bytes <= available, OutOfBoundsSnafu { addr, bytes, available });
    Ok((offset, bytes))
}

impl MemoryManager {
    /// Copy host data of a known or alias address to its device copy, allocating it if needed.
    ///
    /// `bytes == 0` pushes the whole owning buffer; otherwise `bytes` starting at `addr`.
    pub fn push(&mut self, addr: Addr, bytes: usize) -> Result<()> {
        let result = self.push_inner(addr, bytes);
        self.checked(result)
    }

    /// Copy device data of a known or alias address back to the host.
    ///
    /// Same size convention as [`MemoryManager::push`]. The buffer must have a device copy.
    pub fn pull(&mut self, addr: Addr, bytes: usize) -> Result<()> {
        let result = self.pull_inner(addr, bytes);
        self.checked(result)
    }

    /// Copy `bytes` from `src` to `dst` on the side selected by `mode`. Returns `dst`.
    ///
    /// Both endpoints are resolved first, so registered endpoints are brought to the right side
    /// before the copy. In [`Mode::Accelerated`] the copy runs on the device and may be
    /// `asynchronous`; call [`MemoryManager::synchronize`] before reading the result. Zero-byte
    /// copies return immediately without touching either address.
    ///
    /// # Safety
    ///
    /// In [`Mode::HostOnly`], unregistered endpoints are dereferenced as they are: `src` must be
    /// valid for reads and `dst` for writes of `bytes` bytes.
    pub unsafe fn copy(&mut self, dst: Addr, src: Addr, bytes: usize, mode: Mode, asynchronous: bool) -> Result<Addr> {
        if bytes == 0 {
            return Ok(dst);
        }
        // SAFETY: forwarded from the caller.
        let result = unsafe { self.copy_inner(dst, src, bytes, mode, asynchronous) };
        self.checked(result)
    }

    fn push_inner(&mut self, addr: Addr, bytes: usize) -> Result<()> {
        let (base, offset) = self.target(addr)?;
        let record = self.registry.buffer_mut(base).context(UnknownAddressSnafu { addr: base })?;
        let (start, len) = transfer_span(record, addr, offset, bytes)?;
        let device = record.ensure_device(&*self.backend)?;

        // SAFETY: the host range was vouched for at registration and `start + len` stays inside it.
        unsafe { self.backend.copy_htod(device.add(start), base.add(start).as_ptr(), len) }.context(DeviceSnafu)?;
        debug!(%addr, %device, offset = start, bytes = len, "push");
        Ok(())
    }

    fn pull_inner(&mut self, addr: Addr, bytes: usize) -> Result<()> {
        let (base, offset) = self.target(addr)?;
        let record = self.registry.buffer(base).context(UnknownAddressSnafu { addr: base })?;
        let (start, len) = transfer_span(record, addr, offset, bytes)?;
        let device = record.device().context(NoDeviceCopySnafu { addr: base })?;

        // SAFETY: the host range was vouched for at registration and `start + len` stays inside it.
        unsafe { self.backend.copy_dtoh(base.add(start).as_mut_ptr(), device.add(start), len) }
            .context(DeviceSnafu)?;
        debug!(%addr, %device, offset = start, bytes = len, "pull");
        Ok(())
    }

    unsafe fn copy_inner(&mut self, dst: Addr, src: Addr, bytes: usize, mode: Mode, asynchronous: bool) -> Result<Addr> {
        self.check_extent(src, bytes)?;
        self.check_extent(dst, bytes)?;

        let from = self.resolve_inner(src, mode)?;
        let to = self.resolve_inner(dst, mode)?;

        match mode {
            // SAFETY: registered endpoints were bounds-checked; plain ones are the caller's promise.
            Mode::HostOnly => unsafe { std::ptr::copy(from.as_ptr::<u8>(), to.as_mut_ptr::<u8>(), bytes) },
            Mode::Accelerated => self
                .backend
                .copy_dtod(DevicePtr::new(to.get()), DevicePtr::new(from.get()), bytes, asynchronous)
                .context(DeviceSnafu)?,
        }
        debug!(%dst, %src, bytes, ?mode, asynchronous, "copy");
        Ok(dst)
    }

    /// Ensure `bytes` starting at a registered address stay inside its buffer.
    fn check_extent(&mut self, addr: Addr, bytes: usize) -> Result<()> {
        let Some((base, offset)) = self.registry.classify(addr).target(addr) else {
            return Ok(());
        };
        let record = self.registry.buffer(base).context(UnknownAddressSnafu { addr: base })?;
        let available = record.bytes() - offset;
        ensure!(bytes <= available, OutOfBoundsSnafu { addr, bytes, available });
        Ok(())
    }
}
