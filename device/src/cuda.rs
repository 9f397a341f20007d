//! CUDA backend on the driver API.

use std::fmt;
use std::sync::Arc;

use cudarc::driver::{CudaContext, CudaStream, result};
use snafu::ResultExt;

use crate::backend::{Backend, DevicePtr};
use crate::error::{CudaSnafu, Result};

pub struct CudaBackend {
    context: Arc<CudaContext>,
    stream: Arc<CudaStream>,
    device_id: usize,
}

impl CudaBackend {
    pub fn new(device_id: usize) -> Result<Self> {
        let context = CudaContext::new(device_id).context(CudaSnafu)?;
        let stream = context.default_stream();
        Ok(Self { context, stream, device_id })
    }

    fn bind(&self) -> Result<()> {
        self.context.bind_to_thread().context(CudaSnafu)
    }
}

impl fmt::Debug for CudaBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CudaBackend").field("device_id", &self.device_id).finish_non_exhaustive()
    }
}

impl Backend for CudaBackend {
    fn alloc(&self, bytes: usize) -> Result<DevicePtr> {
        self.bind()?;
        let ptr = unsafe { result::malloc_sync(bytes.max(1)) }.context(CudaSnafu)?;
        Ok(DevicePtr::new(ptr as usize))
    }

    fn free(&self, ptr: DevicePtr) -> Result<()> {
        self.bind()?;
        unsafe { result::free_sync(ptr.addr() as u64) }.context(CudaSnafu)
    }

    unsafe fn copy_htod(&self, dst: DevicePtr, src: *const u8, bytes: usize) -> Result<()> {
        self.bind()?;
        // SAFETY: the caller vouches for `src`.
        let host = unsafe { std::slice::from_raw_parts(src, bytes) };
        unsafe { result::memcpy_htod_sync(dst.addr() as u64, host) }.context(CudaSnafu)
    }

    unsafe fn copy_dtoh(&self, dst: *mut u8, src: DevicePtr, bytes: usize) -> Result<()> {
        self.bind()?;
        // SAFETY: the caller vouches for `dst`.
        let host = unsafe { std::slice::from_raw_parts_mut(dst, bytes) };
        unsafe { result::memcpy_dtoh_sync(host, src.addr() as u64) }.context(CudaSnafu)
    }

    fn copy_dtod(&self, dst: DevicePtr, src: DevicePtr, bytes: usize, asynchronous: bool) -> Result<()> {
        self.bind()?;
        let (dst, src) = (dst.addr() as u64, src.addr() as u64);
        if asynchronous {
            unsafe { result::memcpy_dtod_async(dst, src, bytes, self.stream.cu_stream()) }.context(CudaSnafu)
        } else {
            unsafe { result::memcpy_dtod_sync(dst, src, bytes) }.context(CudaSnafu)
        }
    }

    fn synchronize(&self) -> Result<()> {
        self.stream.synchronize().context(CudaSnafu)
    }

    fn name(&self) -> &str {
        "CUDA"
    }
}
