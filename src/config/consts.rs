/// File name of a pipeline definition
pub const PIPELINE_FILE_NAME: &str = "pipeline.yml";
/// File name of a workspace definition
pub const WORKSPACE_FILE_NAME: &str = "workspace.yml";
/// Directory definitions may live in, below the source root
pub const PIPELINE_FOLDER: &str = "pipeline";
/// Working directory used when a definition does not name one
pub const DEFAULT_WORKING_DIR: &str = "build";
/// Head branch assumed for workspace entries that do not declare one
pub const DEFAULT_HEAD: &str = "master";
/// Build number used outside of a CI server
pub const DEFAULT_BUILD_NUMBER: &str = "local";

/// Directory (below a working dir) holding store files
pub const STORE_DIR: &str = ".cache";
/// Extension appended to a store file that failed to decode
pub const STORE_QUARANTINE_EXTENSION: &str = "corrupt";

/// Store key: current step pointer
pub const KEY_STEP: &str = "step";
/// Store key: failed flag
pub const KEY_DIRTY: &str = "dirty";
/// Store key: disabled step filters
pub const KEY_DISABLED_STEPS: &str = "disabled-steps";
/// Store key: pipeline / workspace stats
pub const KEY_STATS: &str = "stats";
/// Store key: persisted backend attributes
pub const KEY_ATTRIBUTES: &str = "attributes";

/// Attempts per scheduled unit (one attempt, no retry)
pub const DEFAULT_RETRY_COUNT: u32 = 1;
/// Pull retries during sync
pub const DEFAULT_SYNC_RETRIES: u32 = 3;
/// Multiplicative backoff factor for sync retries
pub const DEFAULT_BACKOFF_FACTOR: f64 = 1.3;
/// Upper bound on a single sync retry sleep, in seconds
pub const MAX_RETRY_SLEEP_SECS: f64 = 60.0;
/// Upper bound on default parallelism
pub const MAX_DEFAULT_PARALLELISM: usize = 8;

/// Default number of parallel jobs: half the available cores, capped, at least one.
pub fn default_parallelism() -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(2);
    (cores / 2).clamp(1, MAX_DEFAULT_PARALLELISM)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_parallelism_is_bounded() {
        let jobs = default_parallelism();
        assert!(jobs >= 1);
        assert!(jobs <= MAX_DEFAULT_PARALLELISM);
    }
}
