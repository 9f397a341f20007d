use snafu::Snafu;

use crate::DevicePtr;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// The backend could not provide device memory.
    #[snafu(display("device allocation of {bytes} bytes failed: {reason}"))]
    AllocationFailed { bytes: usize, reason: String },

    /// Invalid device specification.
    #[snafu(display("invalid device: {device}"))]
    InvalidDevice { device: String },

    /// The pointer does not start a live allocation of this backend.
    #[snafu(display("{ptr} is not a live allocation"))]
    UnknownAllocation { ptr: DevicePtr },

    /// A transfer touches bytes outside of any live allocation.
    #[snafu(display("range {ptr}+{bytes} is outside of device memory"))]
    OutOfRange { ptr: DevicePtr, bytes: usize },

    /// The requested backend was not compiled in.
    #[snafu(display("{backend} backend is not available in this build"))]
    Unsupported { backend: String },

    #[cfg(feature = "cuda")]
    /// CUDA-specific errors.
    #[snafu(display("CUDA error: {source}"))]
    Cuda { source: cudarc::driver::DriverError },
}
