//! Pipeline configuration.

/// How the merged manifest is produced when later sources also declare a
/// main class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ManifestPolicy {
    /// Rewrite the merged `META-INF/MANIFEST.MF` so that it declares exactly
    /// the chosen main class (or none if no source declared one).
    #[default]
    Rewrite,
    /// Keep the raw bytes of the first manifest encountered, untouched. The
    /// chosen main class is still reported, but the bytes may disagree with
    /// it.
    Preserve,
}

/// Configuration shared by readers, pipelines, and merges.
///
/// The output compression level is deliberately not part of the
/// configuration: it is passed explicitly to every assembly call.
///
/// # Examples
///
/// ```
/// use jarpipe_core::ManifestPolicy;
/// use jarpipe_core::PipelineConfig;
///
/// let config = PipelineConfig::default()
///     .with_worker_threads(Some(4))
///     .with_require_jar_extension(true)
///     .with_manifest_policy(ManifestPolicy::Preserve);
///
/// assert_eq!(config.worker_threads, Some(4));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Number of worker threads for entry decoding and change application.
    ///
    /// `None` lets rayon pick (one per logical CPU).
    ///
    /// Default: `None`.
    pub worker_threads: Option<usize>,

    /// Reject input paths whose file name does not end in `.jar`.
    ///
    /// The decoder itself only needs ZIP structure.
    ///
    /// Default: `false`.
    pub require_jar_extension: bool,

    /// Manifest handling during merges.
    ///
    /// Default: [`ManifestPolicy::Rewrite`].
    pub manifest_policy: ManifestPolicy,
}

impl Default for PipelineConfig {
    /// Default values:
    /// - `worker_threads`: `None`
    /// - `require_jar_extension`: `false`
    /// - `manifest_policy`: `Rewrite`
    fn default() -> Self {
        Self {
            worker_threads: None,
            require_jar_extension: false,
            manifest_policy: ManifestPolicy::Rewrite,
        }
    }
}

impl PipelineConfig {
    /// Creates a new `PipelineConfig` with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the worker thread count.
    #[must_use]
    pub fn with_worker_threads(mut self, threads: Option<usize>) -> Self {
        self.worker_threads = threads;
        self
    }

    /// Sets whether input paths must carry the `.jar` extension.
    #[must_use]
    pub fn with_require_jar_extension(mut self, require: bool) -> Self {
        self.require_jar_extension = require;
        self
    }

    /// Sets the merge manifest policy.
    #[must_use]
    pub fn with_manifest_policy(mut self, policy: ManifestPolicy) -> Self {
        self.manifest_policy = policy;
        self
    }

    /// Builds a worker pool sized by this configuration.
    pub(crate) fn build_pool(&self) -> crate::Result<rayon::ThreadPool> {
        let mut builder =
            rayon::ThreadPoolBuilder::new().thread_name(|i| format!("jarpipe-worker-{i}"));
        if let Some(threads) = self.worker_threads {
            builder = builder.num_threads(threads.max(1));
        }
        builder
            .build()
            .map_err(|e| crate::PipelineError::WorkerPool(e.to_string()))
    }
}

/// Returns `true` if the path's file name ends in `.jar` (case-insensitive).
pub(crate) fn has_jar_extension(path: &std::path::Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("jar"))
}
