use std::fmt;

use tandem_device::DevicePtr;

/// A byte address, host or device, used as an identity.
///
/// The manager never dereferences an `Addr` on its own behalf except through the host range a
/// caller vouched for at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Addr(usize);

impl Addr {
    pub const fn new(addr: usize) -> Self {
        Self(addr)
    }

    pub fn from_ptr<T>(ptr: *const T) -> Self {
        Self(ptr as usize)
    }

    pub fn from_mut_ptr<T>(ptr: *mut T) -> Self {
        Self(ptr as usize)
    }

    pub const fn get(self) -> usize {
        self.0
    }

    pub fn as_ptr<T>(self) -> *const T {
        self.0 as *const T
    }

    pub fn as_mut_ptr<T>(self) -> *mut T {
        self.0 as *mut T
    }

    /// Address `bytes` past this one.
    pub const fn add(self, bytes: usize) -> Self {
        Self(self.0 + bytes)
    }

    /// Address `bytes` past this one, or `None` if that wraps the address space.
    pub const fn checked_add(self, bytes: usize) -> Option<Self> {
        match self.0.checked_add(bytes) {
            Some(end) => Some(Self(end)),
            None => None,
        }
    }

    /// Byte distance from `base` to `self`, if `self` is not below `base`.
    pub const fn offset_from(self, base: Addr) -> Option<usize> {
        self.0.checked_sub(base.0)
    }
}

impl From<DevicePtr> for Addr {
    fn from(ptr: DevicePtr) -> Self {
        Self(ptr.addr())
    }
}

impl fmt::Display for Addr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}
