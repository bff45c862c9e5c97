/// Constants used throughout the memoexec codebase
// Environment variable names
pub const MEMOEXEC_CACHE_DIR_VAR: &str = "MEMOEXEC_CACHE_DIR";
pub const MEMOEXEC_CACHE_MODE_VAR: &str = "MEMOEXEC_CACHE";
pub const MEMOEXEC_LOG_VAR: &str = "MEMOEXEC_LOG";

// Application directory name under the XDG base directories
pub const APP_DIR_NAME: &str = "memoexec";

// Cache entry layout
pub const CACHE_RESULT_FILENAME: &str = "result.json";
pub const CACHE_MANIFEST_FILENAME: &str = "manifest.json";
pub const CACHE_ENTRY_VERSION: u32 = 1;

// Stream draining
pub const DEFAULT_CHUNK_SIZE: usize = 8192;

// Progress indicator redraw interval in milliseconds
pub const INDICATOR_INTERVAL_MS: u64 = 400;
