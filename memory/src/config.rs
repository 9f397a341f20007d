//! Memory manager configuration.
//!
//! Built explicitly with the bon builder or read from the process environment.

use bon::bon;
use tandem_device::DeviceSpec;

/// Settings fixed for the lifetime of a [`MemoryManager`](crate::MemoryManager).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryConfig {
    /// Emit table dumps through `tracing`, on request and on every failed operation.
    pub debug: bool,
    /// Backend used by [`MemoryManager::from_config`](crate::MemoryManager::from_config).
    pub device: DeviceSpec,
}

#[bon]
impl MemoryConfig {
    #[builder]
    pub fn builder(#[builder(default)] debug: bool, #[builder(default)] device: DeviceSpec) -> Self {
        Self { debug, device }
    }

    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// * `TANDEM_DEBUG` - Enable table dumps if set
    /// * `TANDEM_DEVICE` - Device spec such as `SIM` or `CUDA:0` (default: `SIM`)
    ///
    /// An unparsable `TANDEM_DEVICE` falls back to the default with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var_os(key).map(|value| value.to_string_lossy().into_owned()))
    }

    /// [`MemoryConfig::from_env`] over an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let debug = lookup("TANDEM_DEBUG").is_some();
        let device = match lookup("TANDEM_DEVICE") {
            Some(value) => DeviceSpec::parse(&value).unwrap_or_else(|error| {
                tracing::warn!(%value, %error, "ignoring TANDEM_DEVICE");
                DeviceSpec::default()
            }),
            None => DeviceSpec::default(),
        };

        Self { debug, device }
    }
}
