use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use snafu::{OptionExt, ensure};

use crate::error::{OutOfRangeSnafu, Result, UnknownAllocationSnafu};

/// Opaque address of device memory.
///
/// Only the backend that produced it can interpret the value. Arithmetic is limited to
/// byte offsets inside the allocation it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DevicePtr(usize);

impl DevicePtr {
    pub const fn new(addr: usize) -> Self {
        Self(addr)
    }

    pub const fn addr(self) -> usize {
        self.0
    }

    /// Address `bytes` past this one.
    pub const fn add(self, bytes: usize) -> Self {
        Self(self.0 + bytes)
    }
}

impl fmt::Display for DevicePtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Device memory allocation and transfers.
///
/// A backend owns every allocation it hands out until `free` is called. Transfers take raw
/// host pointers, which is why they are `unsafe`: the backend checks device ranges but cannot
/// check host ones.
pub trait Backend: Send + Sync + fmt::Debug {
    /// Allocate `bytes` of device memory. Contents are unspecified.
    fn alloc(&self, bytes: usize) -> Result<DevicePtr>;

    /// Release an allocation returned by `alloc`.
    fn free(&self, ptr: DevicePtr) -> Result<()>;

    /// Copy `bytes` from host memory at `src` into device memory at `dst`.
    ///
    /// # Safety
    ///
    /// `src` must be valid for reads of `bytes` bytes.
    unsafe fn copy_htod(&self, dst: DevicePtr, src: *const u8, bytes: usize) -> Result<()>;

    /// Copy `bytes` from device memory at `src` into host memory at `dst`.
    ///
    /// # Safety
    ///
    /// `dst` must be valid for writes of `bytes` bytes.
    unsafe fn copy_dtoh(&self, dst: *mut u8, src: DevicePtr, bytes: usize) -> Result<()>;

    /// Copy `bytes` between two device locations.
    ///
    /// With `asynchronous` set the copy may still be in flight on return; call
    /// [`Backend::synchronize`] before relying on the destination.
    fn copy_dtod(&self, dst: DevicePtr, src: DevicePtr, bytes: usize, asynchronous: bool) -> Result<()>;

    /// Wait for all queued device work.
    fn synchronize(&self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str;
}

/// Byte and call counters kept by [`SimBackend`].
#[derive(Debug, Default)]
pub struct TransferStats {
    allocations: AtomicU64,
    htod_bytes: AtomicU64,
    dtoh_bytes: AtomicU64,
    dtod_bytes: AtomicU64,
}

impl TransferStats {
    pub fn allocations(&self) -> u64 {
        self.allocations.load(Ordering::Relaxed)
    }

    pub fn htod_bytes(&self) -> u64 {
        self.htod_bytes.load(Ordering::Relaxed)
    }

    pub fn dtoh_bytes(&self) -> u64 {
        self.dtoh_bytes.load(Ordering::Relaxed)
    }

    pub fn dtod_bytes(&self) -> u64 {
        self.dtod_bytes.load(Ordering::Relaxed)
    }

    fn record(counter: &AtomicU64, bytes: usize) {
        counter.fetch_add(bytes as u64, Ordering::Relaxed);
    }
}

/// Emulated discrete device.
///
/// Allocations are separate host heap blocks, so device addresses never coincide with any
/// registered host buffer, and every transfer is checked against the live allocation table.
/// Device memory stays host-addressable, which lets tests play the part of a kernel.
#[derive(Debug, Default)]
pub struct SimBackend {
    /// Base address -> length of every live allocation.
    allocations: Mutex<BTreeMap<usize, usize>>,
    stats: TransferStats,
}

impl SimBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> &TransferStats {
        &self.stats
    }

    /// Number of live allocations.
    pub fn live(&self) -> usize {
        self.allocations.lock().len()
    }

    /// Ensure `[ptr, ptr + bytes)` lies inside one live allocation.
    fn check(&self, ptr: DevicePtr, bytes: usize) -> Result<()> {
        let allocations = self.allocations.lock();
        let inside = allocations
            .range(..=ptr.addr())
            .next_back()
            .is_some_and(|(&base, &len)| ptr.addr() + bytes <= base + len);
        ensure!(inside, OutOfRangeSnafu { ptr, bytes });
        Ok(())
    }
}

impl Backend for SimBackend {
    fn alloc(&self, bytes: usize) -> Result<DevicePtr> {
        // Zero-byte requests still get a distinct address.
        let len = bytes.max(1);
        let block = Box::into_raw(vec![0u8; len].into_boxed_slice());
        let addr = block as *mut u8 as usize;

        self.allocations.lock().insert(addr, len);
        self.stats.allocations.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(device.ptr = addr, bytes, "sim allocation");
        Ok(DevicePtr(addr))
    }

    fn free(&self, ptr: DevicePtr) -> Result<()> {
        let len = self.allocations.lock().remove(&ptr.addr()).context(UnknownAllocationSnafu { ptr })?;
        // SAFETY: `ptr`/`len` come from `Box::into_raw` in `alloc` and were just unlisted, so this
        // is the only reconstruction of the box.
        drop(unsafe { Box::from_raw(std::ptr::slice_from_raw_parts_mut(ptr.addr() as *mut u8, len)) });
        Ok(())
    }

    unsafe fn copy_htod(&self, dst: DevicePtr, src: *const u8, bytes: usize) -> Result<()> {
        self.check(dst, bytes)?;
        // SAFETY: the destination is inside a live allocation; the caller vouches for `src`.
        unsafe { std::ptr::copy(src, dst.addr() as *mut u8, bytes) };
        TransferStats::record(&self.stats.htod_bytes, bytes);
        Ok(())
    }

    unsafe fn copy_dtoh(&self, dst: *mut u8, src: DevicePtr, bytes: usize) -> Result<()> {
        self.check(src, bytes)?;
        // SAFETY: the source is inside a live allocation; the caller vouches for `dst`.
        unsafe { std::ptr::copy(src.addr() as *const u8, dst, bytes) };
        TransferStats::record(&self.stats.dtoh_bytes, bytes);
        Ok(())
    }

    fn copy_dtod(&self, dst: DevicePtr, src: DevicePtr, bytes: usize, _asynchronous: bool) -> Result<()> {
        self.check(src, bytes)?;
        self.check(dst, bytes)?;
        // SAFETY: both ranges were checked against live allocations.
        unsafe { std::ptr::copy(src.addr() as *const u8, dst.addr() as *mut u8, bytes) };
        TransferStats::record(&self.stats.dtod_bytes, bytes);
        Ok(())
    }

    fn name(&self) -> &str {
        "SIM"
    }
}

impl Drop for SimBackend {
    fn drop(&mut self) {
        let allocations = std::mem::take(self.allocations.get_mut());
        for (addr, len) in allocations {
            // SAFETY: every listed block came from `Box::into_raw` and was never freed.
            drop(unsafe { Box::from_raw(std::ptr::slice_from_raw_parts_mut(addr as *mut u8, len)) });
        }
    }
}
