use camino::Utf8PathBuf;
use std::fmt;
use thiserror::Error;

/// Where a plugin is in its load/unload lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadState {
    Discovered,
    Loaded,
    Failed,
    Unloaded,
}

impl fmt::Display for LoadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            LoadState::Discovered => "discovered",
            LoadState::Loaded => "loaded",
            LoadState::Failed => "failed",
            LoadState::Unloaded => "unloaded",
        };
        f.write_str(text)
    }
}

/// Why the engine refused to load a plugin.
///
/// Decoded from the negative handle returned by the engine's load call.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginFailure {
    #[error("failed initialization")]
    InitFailure,

    #[error("missing entry points")]
    MissingEntryPoints,

    #[error("could not load (unresolved dependency)")]
    DependencyFailure,

    #[error("unknown load error {0}")]
    Other(i32),
}

impl PluginFailure {
    /// Splits a raw engine handle into a usable handle or a failure kind.
    pub fn check(handle: i32) -> Result<i32, PluginFailure> {
        match handle {
            h if h >= 0 => Ok(h),
            -1 => Err(PluginFailure::InitFailure),
            -2 => Err(PluginFailure::MissingEntryPoints),
            -3 => Err(PluginFailure::DependencyFailure),
            other => Err(PluginFailure::Other(other)),
        }
    }
}

/// One extension module found in the application directory.
#[derive(Clone, Debug, PartialEq)]
pub struct PluginRecord {
    /// Name between the platform prefix and extension (`Dynamics`).
    pub name: String,
    pub path: Utf8PathBuf,
    /// Engine handle; negative until a load succeeded.
    pub handle: i32,
    pub state: LoadState,
    pub failure: Option<PluginFailure>,
}

impl PluginRecord {
    pub fn discovered(name: impl Into<String>, path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            handle: -1,
            state: LoadState::Discovered,
            failure: None,
        }
    }

    /// Applies the outcome of the single load attempt.
    ///
    /// Only a `Discovered` record can be resolved; later calls are ignored so
    /// a record is mutated exactly once after loading.
    pub fn resolve(&mut self, raw_handle: i32) -> Result<i32, PluginFailure> {
        if self.state != LoadState::Discovered {
            return PluginFailure::check(self.handle);
        }
        match PluginFailure::check(raw_handle) {
            Ok(handle) => {
                self.handle = handle;
                self.state = LoadState::Loaded;
                Ok(handle)
            }
            Err(failure) => {
                self.handle = raw_handle;
                self.state = LoadState::Failed;
                self.failure = Some(failure);
                Err(failure)
            }
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.state == LoadState::Loaded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_codes() {
        assert_eq!(PluginFailure::check(0), Ok(0));
        assert_eq!(PluginFailure::check(12), Ok(12));
        assert_eq!(PluginFailure::check(-1), Err(PluginFailure::InitFailure));
        assert_eq!(PluginFailure::check(-2), Err(PluginFailure::MissingEntryPoints));
        assert_eq!(PluginFailure::check(-3), Err(PluginFailure::DependencyFailure));
        assert_eq!(PluginFailure::check(-9), Err(PluginFailure::Other(-9)));
    }

    #[test]
    fn test_resolve_only_once() {
        let mut record = PluginRecord::discovered("Dynamics", "/app/libsimExtDynamics.so");
        assert_eq!(record.resolve(4), Ok(4));
        assert!(record.is_loaded());

        // A second resolution does not overwrite the first outcome
        assert_eq!(record.resolve(-2), Ok(4));
        assert_eq!(record.handle, 4);
        assert_eq!(record.state, LoadState::Loaded);
    }

    #[test]
    fn test_resolve_failure_records_kind() {
        let mut record = PluginRecord::discovered("Broken", "/app/libsimExtBroken.so");
        assert_eq!(record.resolve(-3), Err(PluginFailure::DependencyFailure));
        assert_eq!(record.state, LoadState::Failed);
        assert_eq!(record.failure, Some(PluginFailure::DependencyFailure));
        assert!(!record.is_loaded());
    }
}
