use memoexec_core::{APP_DIR_NAME, MEMOEXEC_CACHE_DIR_VAR};
use std::env;
use std::path::PathBuf;

/// XDG Base Directory paths for memoexec
pub struct XdgPaths;

impl XdgPaths {
    /// Get XDG_CACHE_HOME/memoexec or fallback under the home directory
    pub fn cache_dir() -> PathBuf {
        env::var("XDG_CACHE_HOME")
            .ok()
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .map(|home| home.join(".cache"))
                    .unwrap_or_else(|| PathBuf::from(".cache"))
            })
            .join(APP_DIR_NAME)
    }

    /// Root of the memoization cache: `MEMOEXEC_CACHE_DIR` if set, else [`Self::cache_dir`]
    pub fn memo_cache_root() -> PathBuf {
        match env::var(MEMOEXEC_CACHE_DIR_VAR) {
            Ok(dir) if !dir.is_empty() => expand_home(&dir),
            _ => Self::cache_dir(),
        }
    }
}

/// Expand a leading `~` to the user's home directory
pub fn expand_home(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn with_env<F: FnOnce()>(vars: &[(&str, Option<&str>)], f: F) {
        let saved: Vec<(String, Option<String>)> = vars
            .iter()
            .map(|(key, _)| (key.to_string(), env::var(key).ok()))
            .collect();
        for (key, value) in vars {
            match value {
                Some(value) => env::set_var(key, value),
                None => env::remove_var(key),
            }
        }
        f();
        for (key, value) in saved {
            match value {
                Some(value) => env::set_var(&key, value),
                None => env::remove_var(&key),
            }
        }
    }

    #[test]
    #[serial]
    fn test_cache_dir_respects_xdg() {
        with_env(&[("XDG_CACHE_HOME", Some("/tmp/cache"))], || {
            assert_eq!(XdgPaths::cache_dir(), PathBuf::from("/tmp/cache/memoexec"));
        });
    }

    #[test]
    #[serial]
    fn test_memo_cache_root_override() {
        with_env(
            &[
                ("XDG_CACHE_HOME", Some("/tmp/cache")),
                (MEMOEXEC_CACHE_DIR_VAR, Some("/srv/memo")),
            ],
            || {
                assert_eq!(XdgPaths::memo_cache_root(), PathBuf::from("/srv/memo"));
            },
        );
        with_env(
            &[
                ("XDG_CACHE_HOME", Some("/tmp/cache")),
                (MEMOEXEC_CACHE_DIR_VAR, None),
            ],
            || {
                assert_eq!(
                    XdgPaths::memo_cache_root(),
                    PathBuf::from("/tmp/cache/memoexec")
                );
            },
        );
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("/abs/path"), PathBuf::from("/abs/path"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~/.memo"), home.join(".memo"));
            assert_eq!(expand_home("~"), home);
        }
    }
}
