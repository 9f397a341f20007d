//! Error types for the memory manager.

use snafu::Snafu;

use crate::Addr;

/// Result type for memory manager operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Contract violations and backend failures.
///
/// None of these are retried: a caller receiving one has accessed memory the manager cannot
/// vouch for, or the device refused an allocation or transfer.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// The address is already registered as a buffer.
    #[snafu(display("{addr} is already registered"))]
    AlreadyRegistered { addr: Addr },

    /// The new range intersects a registered buffer.
    #[snafu(display("range {addr}+{bytes} overlaps buffer {other}+{other_bytes}"))]
    Overlap { addr: Addr, bytes: usize, other: Addr, other_bytes: usize },

    /// The range does not fit below the top of the address space.
    #[snafu(display("range {addr}+{bytes} wraps the address space"))]
    InvalidRange { addr: Addr, bytes: usize },

    /// The address is neither a registered buffer nor inside one.
    #[snafu(display("unknown address {addr}"))]
    UnknownAddress { addr: Addr },

    /// Alias lookup was asked about an address that is itself a buffer.
    #[snafu(display("{addr} is a registered buffer, not an alias candidate"))]
    KnownAddress { addr: Addr },

    /// An explicit alias does not lie strictly inside its base.
    #[snafu(display("offset {offset} is not strictly inside buffer {base} of {bytes} bytes"))]
    InvalidAlias { base: Addr, offset: usize, bytes: usize },

    /// A transfer or copy runs past the end of the owning buffer.
    #[snafu(display("{bytes} bytes at {addr} exceed the {available} bytes left in its buffer"))]
    OutOfBounds { addr: Addr, bytes: usize, available: usize },

    /// A pull was requested before the buffer ever reached the device.
    #[snafu(display("{addr} has no device copy"))]
    NoDeviceCopy { addr: Addr },

    /// Backend failure.
    #[snafu(display("device error: {source}"))]
    Device { source: tandem_device::Error },
}
