// =============================================================================
// Application Identity
// =============================================================================

/// Application name in title case (for display)
pub const APP_NAME: &str = "Sieve";

/// Application name in lowercase (for paths and identifiers)
pub const APP_NAME_LOWER: &str = "sieve";

/// Unix-style dotfile folder name
pub const APP_DOT_FOLDER: &str = ".sieve";

// =============================================================================
// Configuration Files
// =============================================================================

/// Config file name
pub const CONFIG_FILE_NAME: &str = "sieve.json";

/// Environment variable for config file path
pub const ENV_CONFIG: &str = "SIEVE_CONFIG";

// =============================================================================
// Environment Variables
// =============================================================================

/// Environment variable for log level/filter
pub const ENV_LOG: &str = "SIEVE_LOG";

/// Environment variable for the SQL dialect used when rendering
pub const ENV_DIALECT: &str = "SIEVE_DIALECT";

/// Environment variable for the default timezone of catalogs without one
pub const ENV_TIMEZONE: &str = "SIEVE_TIMEZONE";

/// Environment variable for the maximum combinator nesting depth
pub const ENV_MAX_FILTER_DEPTH: &str = "SIEVE_MAX_FILTER_DEPTH";

// =============================================================================
// Paging
// =============================================================================

/// Page size when neither the request nor the catalog sets one
pub const DEFAULT_PAGE_ITEMS: u32 = 50;

/// Largest page size a request may ask for
pub const MAX_PAGE_ITEMS: u32 = 500;

// =============================================================================
// Filter Limits
// =============================================================================

/// Maximum number of nested combinators in one filter
pub const DEFAULT_MAX_FILTER_DEPTH: usize = 16;

/// Maximum size of a raw filter request in bytes (64KB)
pub const MAX_FILTER_JSON_SIZE: usize = 64 * 1024;
