use memoexec_core::MEMOEXEC_CACHE_MODE_VAR;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Cache mode determines how the cache behaves
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CacheMode {
    /// Caching is disabled; commands always run and nothing is fingerprinted
    Off,
    /// Stored results are served but new ones are never persisted
    Read,
    /// Cache can be read from and written to (default)
    #[default]
    ReadWrite,
    /// Every command runs and its result is persisted
    Write,
}

impl From<String> for CacheMode {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(mode) => mode,
            Err(()) => {
                log::warn!(
                    "Unknown {MEMOEXEC_CACHE_MODE_VAR} environment variable value \"{value}\", falling back to read-write mode"
                );
                CacheMode::ReadWrite
            }
        }
    }
}

impl std::str::FromStr for CacheMode {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "off" | "false" | "0" => Ok(CacheMode::Off),
            "read" => Ok(CacheMode::Read),
            "read-write" | "readwrite" | "on" | "true" | "1" => Ok(CacheMode::ReadWrite),
            "write" => Ok(CacheMode::Write),
            _ => Err(()),
        }
    }
}

impl fmt::Display for CacheMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode_str = match self {
            CacheMode::Off => "off",
            CacheMode::Read => "read",
            CacheMode::ReadWrite => "read-write",
            CacheMode::Write => "write",
        };
        write!(f, "{mode_str}")
    }
}

impl CacheMode {
    /// Check if cache is consulted at all
    pub fn is_enabled(&self) -> bool {
        !matches!(self, CacheMode::Off)
    }

    /// Check if cache can be read from
    pub fn is_readable(&self) -> bool {
        matches!(self, CacheMode::Read | CacheMode::ReadWrite)
    }

    /// Check if cache is read-only
    pub fn is_read_only(&self) -> bool {
        matches!(self, CacheMode::Read)
    }

    /// Check if cache can be written to
    pub fn is_writable(&self) -> bool {
        matches!(self, CacheMode::Write | CacheMode::ReadWrite)
    }

    /// Check if cache is write-only
    pub fn is_write_only(&self) -> bool {
        matches!(self, CacheMode::Write)
    }
}

/// Get the current cache mode from environment variable
pub fn get_cache_mode() -> CacheMode {
    match std::env::var(MEMOEXEC_CACHE_MODE_VAR) {
        Ok(var) if !var.is_empty() => CacheMode::from(var),
        _ => CacheMode::ReadWrite,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_mode_capabilities() {
        assert!(!CacheMode::Off.is_enabled());
        assert!(!CacheMode::Off.is_readable());
        assert!(!CacheMode::Off.is_writable());

        assert!(CacheMode::Read.is_readable());
        assert!(CacheMode::Read.is_read_only());
        assert!(!CacheMode::Read.is_writable());

        assert!(CacheMode::ReadWrite.is_readable());
        assert!(CacheMode::ReadWrite.is_writable());

        assert!(CacheMode::Write.is_write_only());
        assert!(!CacheMode::Write.is_readable());
    }

    #[test]
    fn test_mode_parsing_round_trips_display() {
        for mode in [
            CacheMode::Off,
            CacheMode::Read,
            CacheMode::ReadWrite,
            CacheMode::Write,
        ] {
            assert_eq!(mode.to_string().parse::<CacheMode>(), Ok(mode));
        }
        assert_eq!("READ".parse::<CacheMode>(), Ok(CacheMode::Read));
        assert!("sometimes".parse::<CacheMode>().is_err());
    }

    #[test]
    fn test_unknown_value_falls_back_to_read_write() {
        assert_eq!(CacheMode::from("bogus".to_string()), CacheMode::ReadWrite);
    }

    #[test]
    #[serial]
    fn test_get_cache_mode_from_env() {
        let saved = std::env::var(MEMOEXEC_CACHE_MODE_VAR).ok();

        std::env::set_var(MEMOEXEC_CACHE_MODE_VAR, "off");
        assert_eq!(get_cache_mode(), CacheMode::Off);
        std::env::remove_var(MEMOEXEC_CACHE_MODE_VAR);
        assert_eq!(get_cache_mode(), CacheMode::ReadWrite);

        if let Some(value) = saved {
            std::env::set_var(MEMOEXEC_CACHE_MODE_VAR, value);
        }
    }
}
