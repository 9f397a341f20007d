//! Host/device memory registry and address resolution.
//!
//! Numerical code hands the [`MemoryManager`] plain host addresses. Every buffer is registered
//! once with [`MemoryManager::insert`]; afterwards any address inside it can be resolved for the
//! side that is about to touch it:
//!
//! ```
//! use tandem_memory::{Addr, MemoryConfig, MemoryManager, Mode};
//!
//! let mut manager = MemoryManager::from_config(MemoryConfig::default())?;
//! let mut data = vec![3.0f64; 1024];
//! let host = Addr::from_mut_ptr(data.as_mut_ptr());
//!
//! unsafe { manager.insert(host, data.len() * size_of::<f64>())? };
//! let device = manager.resolve(host, Mode::Accelerated)?; // pushed, device now authoritative
//! assert_ne!(device, host);
//! let back = manager.resolve(host, Mode::HostOnly)?; // pulled, host authoritative again
//! assert_eq!(back, host);
//!
//! manager.erase(host)?;
//! # Ok::<(), tandem_memory::Error>(())
//! ```
//!
//! # Aliases
//!
//! An address strictly inside a registered buffer is an alias. Aliases are discovered on first
//! use (or declared with [`MemoryManager::declare_alias`]), remembered, and resolved through
//! their base buffer: moving an alias moves the whole base buffer.
//!
//! # Residency
//!
//! Exactly one copy of a buffer is authoritative. [`MemoryManager::resolve`] is the only
//! operation that changes which one; [`MemoryManager::push`] and [`MemoryManager::pull`] copy
//! data without touching that bookkeeping.
//!
//! # Debugging
//!
//! With `TANDEM_DEBUG` set (see [`MemoryConfig::from_env`]) the buffer and alias tables are
//! logged through `tracing` by [`MemoryManager::dump`] and after every failed operation.

pub mod addr;
pub mod coherence;
pub mod config;
pub mod dump;
pub mod error;
pub mod manager;
pub mod record;
pub mod registry;
pub mod resolve;


pub use addr::Addr;
pub use config::MemoryConfig;
pub use dump::{AliasEntry, BufferEntry, Snapshot};
pub use error::*;
pub use manager::MemoryManager;
pub use record::{AliasRecord, BufferRecord, Residency};
pub use registry::{Class, Registry};
pub use resolve::Mode;
pub use tandem_device::{Backend, DevicePtr, DeviceSpec, SimBackend};
