//! Linux provider configuration
//!
//! Driver options arrive as one whitespace separated argument string, the
//! way firmware hands load options to a driver image.

use alloc::string::String;

use crate::scanner::LOADER_ENTRIES_DIR;

/// Default bound on the size of one entry file
pub const DEFAULT_MAX_CONF_SIZE: usize = 64 * 1024;

/// Largest accepted entry file bound
pub const MAX_CONF_SIZE_LIMIT: usize = 16 * 1024 * 1024;

/// Linux Provider Configuration - Immutable Value Object
///
/// # Examples
///
/// ```
/// use bootmgr_linux::config::LinuxBootConfig;
///
/// let config = LinuxBootConfig::from_arguments("--options=quiet --verbose").unwrap();
/// assert_eq!(config.extra_options, "quiet");
/// assert!(config.verbose);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinuxBootConfig {
    /// Directory scanned for entry files, relative to the filesystem root
    pub entries_dir: String,
    /// Appended to the load options of every entry
    pub extra_options: String,
    /// Suffix entry names with the kernel release
    pub version_in_name: bool,
    /// Log accepted candidates at info level
    pub verbose: bool,
    /// Entry files larger than this are skipped
    pub max_conf_size: usize,
}

impl LinuxBootConfig {
    /// Create default configuration
    pub fn new() -> Self {
        Self {
            entries_dir: String::from(LOADER_ENTRIES_DIR),
            extra_options: String::new(),
            version_in_name: false,
            verbose: false,
            max_conf_size: DEFAULT_MAX_CONF_SIZE,
        }
    }

    /// Parse a driver argument string and validate the result
    pub fn from_arguments(arguments: &str) -> Result<Self, &'static str> {
        let mut config = Self::new();

        for argument in arguments.split_ascii_whitespace() {
            if let Some(dir) = argument.strip_prefix("--entries-dir=") {
                config.entries_dir = String::from(dir);
            } else if let Some(options) = argument.strip_prefix("--options=") {
                if !config.extra_options.is_empty() {
                    config.extra_options.push(' ');
                }
                config.extra_options.push_str(options);
            } else if argument == "--version-in-name" {
                config.version_in_name = true;
            } else if argument == "--verbose" {
                config.verbose = true;
            } else if let Some(size) = argument.strip_prefix("--max-conf-size=") {
                config.max_conf_size = size.parse().map_err(|_| "Invalid --max-conf-size value")?;
            } else {
                return Err("Unknown driver argument");
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration consistency
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.entries_dir.is_empty() {
            return Err("Entries directory must not be empty");
        }

        if self.entries_dir.split(['/', '\\']).any(|component| component == "..") {
            return Err("Entries directory must not leave the filesystem root");
        }

        if self.max_conf_size == 0 {
            return Err("Entry file size bound must not be zero");
        }

        if self.max_conf_size > MAX_CONF_SIZE_LIMIT {
            return Err("Entry file size bound too large (>16MB)");
        }

        if self.extra_options.contains('\0') {
            return Err("Extra options must not contain NUL");
        }

        Ok(())
    }
}

impl Default for LinuxBootConfig {
    fn default() -> Self {
        Self::new()
    }
}
