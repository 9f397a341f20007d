//! Accelerator backends for the tandem memory manager.
//!
//! A [`Backend`] owns device allocations and moves bytes in the three directions the
//! memory manager needs: host to device, device to host and device to device. Backends are
//! selected with a [`DeviceSpec`]:
//!
//! - `SIM`: [`SimBackend`], an emulated device whose memory is separate host heap blocks.
//! - `CUDA:N`: [`CudaBackend`] on device `N` (requires the `cuda` feature).

pub mod backend;
#[cfg(feature = "cuda")]
pub mod cuda;
pub mod error;
pub mod spec;


pub use backend::{Backend, DevicePtr, SimBackend, TransferStats};
#[cfg(feature = "cuda")]
pub use cuda::CudaBackend;
pub use error::*;
pub use spec::DeviceSpec;
