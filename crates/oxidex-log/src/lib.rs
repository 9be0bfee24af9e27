//! A minimal, zero-dependency logging crate for the `OxideX` project.
//!
//! Records are written to stderr as `[LEVEL] target: message`, where the
//! target is the module path of the call site. Filtering is controlled by a
//! global default level plus optional per-target overrides, both of which can
//! be configured from the `OXIDEX_LOG` environment variable.
//!
//! # Configuration
//!
//! `OXIDEX_LOG` is a comma-separated list of directives:
//!
//! - `debug` sets the default level
//! - `oxidex_bridge::runtime=trace` sets the level for every target that
//!   starts with `oxidex_bridge::runtime`
//!
//! `OXIDEX_LOG_STYLE=never` disables ANSI colours.
//!
//! # Example
//!
//! ```
//! use oxidex_log::{debug, info, warn, Level};
//!
//! oxidex_log::set_level(Level::Debug);
//!
//! let selector = "initWithFrame:";
//! debug!("registering selector {selector}");
//! info!("cache holds {} entries", 3);
//! warn!("falling back to the local selector table");
//! ```

use std::fmt::{self, Arguments};
use std::io::Write;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{OnceLock, RwLock};

/// Environment variable holding the filter directives.
pub const LOG_ENV: &str = "OXIDEX_LOG";

/// Environment variable controlling colour output (`always` / `never`).
pub const LOG_STYLE_ENV: &str = "OXIDEX_LOG_STYLE";

/// Log levels, ordered from most severe (`Error`) to least severe (`Trace`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    /// Critical failures.
    Error = 0,
    /// Potentially harmful situations.
    Warn = 1,
    /// Informational messages.
    Info = 2,
    /// Diagnostic detail.
    Debug = 3,
    /// Most detailed tracing.
    Trace = 4,
}

impl Level {
    const fn color_code(self) -> &'static str {
        match self {
            Level::Error => "\x1b[31m",
            Level::Warn => "\x1b[33m",
            Level::Info => "\x1b[32m",
            Level::Debug => "\x1b[36m",
            Level::Trace => "\x1b[35m",
        }
    }

    /// Returns the upper-case name of the level.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Level::Error => "ERROR",
            Level::Warn => "WARN",
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
        }
    }

    const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Level::Error,
            1 => Level::Warn,
            2 => Level::Info,
            3 => Level::Debug,
            _ => Level::Trace,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a level or directive cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseLevelError {
    input: String,
}

impl fmt::Display for ParseLevelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid log level: {}", self.input)
    }
}

impl std::error::Error for ParseLevelError {}

impl FromStr for Level {
    type Err = ParseLevelError;

    /// Parses a level name, case-insensitively.
    ///
    /// ```
    /// use oxidex_log::Level;
    ///
    /// assert_eq!("error".parse::<Level>(), Ok(Level::Error));
    /// assert_eq!("INFO".parse::<Level>(), Ok(Level::Info));
    /// assert!("loud".parse::<Level>().is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ERROR" => Ok(Level::Error),
            "WARN" | "WARNING" => Ok(Level::Warn),
            "INFO" => Ok(Level::Info),
            "DEBUG" => Ok(Level::Debug),
            "TRACE" => Ok(Level::Trace),
            _ => Err(ParseLevelError {
                input: s.to_string(),
            }),
        }
    }
}

/// A per-target level override.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Directive {
    prefix: String,
    level: Level,
}

/// Parsed form of an `OXIDEX_LOG` value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    default: Option<Level>,
    directives: Vec<Directive>,
}

impl Filter {
    /// Parses a comma-separated directive list.
    ///
    /// # Errors
    ///
    /// Returns [`ParseLevelError`] if any directive names an unknown level.
    pub fn parse(directives: &str) -> Result<Self, ParseLevelError> {
        let mut filter = Filter::default();
        for part in directives.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            match part.split_once('=') {
                Some((prefix, level)) => filter.directives.push(Directive {
                    prefix: prefix.trim().to_string(),
                    level: level.parse()?,
                }),
                None => filter.default = Some(part.parse()?),
            }
        }
        // Longest prefix wins.
        filter
            .directives
            .sort_by(|a, b| b.prefix.len().cmp(&a.prefix.len()));
        Ok(filter)
    }

    fn level_for(&self, target: &str) -> Option<Level> {
        self.directives
            .iter()
            .find(|d| target.starts_with(d.prefix.as_str()))
            .map(|d| d.level)
    }
}

/// The global logger.
///
/// Holds the default level atomically so the common "disabled" check is a
/// single relaxed load; per-target overrides sit behind an `RwLock` and are
/// only consulted when at least one is installed.
pub struct Logger {
    level: AtomicU8,
    has_directives: AtomicBool,
    overrides: RwLock<Filter>,
    color: AtomicBool,
}

impl Logger {
    const fn new(level: Level) -> Self {
        Logger {
            level: AtomicU8::new(level as u8),
            has_directives: AtomicBool::new(false),
            overrides: RwLock::new(Filter {
                default: None,
                directives: Vec::new(),
            }),
            color: AtomicBool::new(true),
        }
    }

    /// Sets the default level.
    pub fn set_level(&self, level: Level) {
        self.level.store(level as u8, Ordering::SeqCst);
    }

    /// Returns the default level.
    pub fn level(&self) -> Level {
        Level::from_u8(self.level.load(Ordering::Relaxed))
    }

    /// Replaces the default level and per-target overrides with `filter`.
    pub fn apply(&self, filter: &Filter) {
        if let Some(level) = filter.default {
            self.set_level(level);
        }
        let mut overrides = self
            .overrides
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        overrides.directives.clone_from(&filter.directives);
        self.has_directives
            .store(!overrides.directives.is_empty(), Ordering::SeqCst);
    }

    /// Enables or disables ANSI colours.
    pub fn set_color(&self, enabled: bool) {
        self.color.store(enabled, Ordering::Relaxed);
    }

    /// Checks whether a record at `level` would be written for `target`.
    pub fn enabled(&self, level: Level, target: &str) -> bool {
        if self.has_directives.load(Ordering::Relaxed) {
            let overrides = self
                .overrides
                .read()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            if let Some(max) = overrides.level_for(target) {
                return level <= max;
            }
        }
        level as u8 <= self.level.load(Ordering::Relaxed)
    }
}

static LOGGER: OnceLock<Logger> = OnceLock::new();

/// Returns the global logger, creating it with `Level::Warn` on first use.
pub fn get_logger() -> &'static Logger {
    LOGGER.get_or_init(|| Logger::new(Level::Warn))
}

/// Sets the default level of the global logger.
pub fn set_level(level: Level) {
    get_logger().set_level(level);
}

/// Applies a directive string such as `"info,oxidex_bridge=trace"`.
///
/// # Errors
///
/// Returns [`ParseLevelError`] and leaves the logger unchanged if the string
/// cannot be parsed.
pub fn set_filter(directives: &str) -> Result<(), ParseLevelError> {
    let filter = Filter::parse(directives)?;
    get_logger().apply(&filter);
    Ok(())
}

/// Configures the global logger from `OXIDEX_LOG` and `OXIDEX_LOG_STYLE`.
///
/// Missing variables leave the defaults in place. An unparsable `OXIDEX_LOG`
/// is reported once on stderr and otherwise ignored.
pub fn init_from_env() {
    if let Ok(directives) = std::env::var(LOG_ENV) {
        if let Err(err) = set_filter(&directives) {
            eprintln!("oxidex-log: ignoring {LOG_ENV}: {err}");
        }
    }
    if let Ok(style) = std::env::var(LOG_STYLE_ENV) {
        get_logger().set_color(!style.eq_ignore_ascii_case("never"));
    }
}

#[doc(hidden)]
pub fn __log_with_target(level: Level, target: &str, args: Arguments) {
    const RESET: &str = "\x1b[0m";

    let logger = get_logger();
    if !logger.enabled(level, target) {
        return;
    }

    let mut stderr = std::io::stderr().lock();
    // A failed write to stderr has nowhere better to go.
    let _ = if logger.color.load(Ordering::Relaxed) {
        let color = level.color_code();
        writeln!(stderr, "{color}[{level}]{RESET} {target}: {args}")
    } else {
        writeln!(stderr, "[{level}] {target}: {args}")
    };
}

/// Logs a message at the given level, tagged with the caller's module path.
///
/// ```
/// use oxidex_log::{log, Level};
///
/// log!(level: Level::Info, "resolved {} tokens", 3);
/// ```
#[macro_export]
macro_rules! log {
    (level: $level:expr, $($arg:tt)*) => {
        {
            let level = $level;
            if $crate::get_logger().enabled(level, module_path!()) {
                $crate::__log_with_target(level, module_path!(), format_args!($($arg)*));
            }
        }
    };
}

/// Logs at [`Level::Error`].
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        $crate::log!(level: $crate::Level::Error, $($arg)*)
    };
}

/// Logs at [`Level::Warn`].
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        $crate::log!(level: $crate::Level::Warn, $($arg)*)
    };
}

/// Logs at [`Level::Info`].
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        $crate::log!(level: $crate::Level::Info, $($arg)*)
    };
}

/// Logs at [`Level::Debug`].
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {
        $crate::log!(level: $crate::Level::Debug, $($arg)*)
    };
}

/// Logs at [`Level::Trace`].
#[macro_export]
macro_rules! trace {
    ($($arg:tt)*) => {
        $crate::log!(level: $crate::Level::Trace, $($arg)*)
    };
}
