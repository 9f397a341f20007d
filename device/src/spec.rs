use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::backend::{Backend, SimBackend};
use crate::error::{Error, InvalidDeviceSnafu, Result};

/// Which accelerator backs the device side of the memory manager.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DeviceSpec {
    /// Emulated device living in host memory.
    #[default]
    Sim,
    Cuda { device_id: usize },
}

impl DeviceSpec {
    /// Parse a device string.
    ///
    /// Examples:
    /// - "SIM" -> DeviceSpec::Sim
    /// - "CUDA:1" -> DeviceSpec::Cuda { device_id: 1 }
    /// - "gpu" -> DeviceSpec::Cuda { device_id: 0 }
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim().to_uppercase();
        let mut parts = s.splitn(2, ':');

        match (parts.next(), parts.next()) {
            (Some("SIM" | "HOST"), None) => Ok(DeviceSpec::Sim),
            (Some("CUDA" | "GPU"), id) => {
                let device_id = match id {
                    Some(id) => id.parse().map_err(|_| Error::InvalidDevice { device: s.clone() })?,
                    None => 0,
                };
                Ok(DeviceSpec::Cuda { device_id })
            }
            _ => InvalidDeviceSnafu { device: s.clone() }.fail(),
        }
    }

    /// Canonical string form, accepted back by [`DeviceSpec::parse`].
    pub fn canonicalize(&self) -> String {
        match self {
            DeviceSpec::Sim => "SIM".to_string(),
            DeviceSpec::Cuda { device_id } => format!("CUDA:{device_id}"),
        }
    }

    /// Construct the backend this spec names.
    pub fn open(&self) -> Result<Arc<dyn Backend>> {
        let backend: Arc<dyn Backend> = match self {
            DeviceSpec::Sim => Arc::new(SimBackend::new()),
            #[cfg(feature = "cuda")]
            DeviceSpec::Cuda { device_id } => Arc::new(crate::cuda::CudaBackend::new(*device_id)?),
            #[cfg(not(feature = "cuda"))]
            DeviceSpec::Cuda { .. } => return crate::error::UnsupportedSnafu { backend: "CUDA" }.fail(),
        };
        tracing::debug!(device = %self, backend = backend.name(), "opened device backend");
        Ok(backend)
    }
}

impl fmt::Display for DeviceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonicalize())
    }
}

impl FromStr for DeviceSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
