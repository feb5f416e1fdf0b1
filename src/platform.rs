//! Host platform selection.
//!
//! Library and plugin file names are pure functions of the platform, so the
//! platform is an explicit value instead of scattered `cfg!` checks. This keeps
//! discovery and binding testable for every platform from any host.

use std::fmt;

/// Operating system family the launcher targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Platform {
    Windows,
    Linux,
    MacOs,
}

impl Platform {
    /// Platform the binary was compiled for.
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::MacOs
        } else {
            Platform::Linux
        }
    }

    /// File name prefix the OS loader expects for shared libraries.
    pub fn library_prefix(self) -> &'static str {
        match self {
            Platform::Windows => "",
            Platform::Linux | Platform::MacOs => "lib",
        }
    }

    /// Shared library extension, without the dot.
    pub fn library_extension(self) -> &'static str {
        match self {
            Platform::Windows => "dll",
            Platform::Linux => "so",
            Platform::MacOs => "dylib",
        }
    }

    /// Decorates a bare library stem (`coppeliaSim`) into a loadable file name.
    pub fn decorate_library(self, stem: &str) -> String {
        format!(
            "{}{}.{}",
            self.library_prefix(),
            stem,
            self.library_extension()
        )
    }

    /// Hint printed when a plugin fails because one of its own dependencies
    /// could not be resolved by the OS loader.
    pub fn dependency_hint(self) -> &'static str {
        match self {
            Platform::Windows => {
                "the plugin probably couldn't load dependency libraries; try rebuilding the plugin"
            }
            Platform::MacOs => {
                "the plugin probably couldn't load dependency libraries; try 'otool -L' on the plugin, or rebuild it"
            }
            Platform::Linux => {
                "the plugin probably couldn't load dependency libraries; try 'ldd' on the plugin, or rebuild it"
            }
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Platform::Windows => "windows",
            Platform::Linux => "linux",
            Platform::MacOs => "macos",
        };
        f.write_str(name)
    }
}
