use std::path::PathBuf;
use thiserror::Error;

/// Exit code reserved for a crash test that could not reach the server.
pub const CRASH_TEST_EXIT_CODE: i32 = 69;

/// Central error type for the entire launcher backend.
/// Every module returns `Result<T, LauncherError>`.
#[derive(Debug, Error)]
pub enum LauncherError {
    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── Network ─────────────────────────────────────────
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Download failed for {url}: HTTP {status}")]
    DownloadFailed { url: String, status: u16 },

    // ── Integrity ───────────────────────────────────────
    #[error("SHA-1 mismatch for {path:?}: expected {expected}, got {actual}")]
    Sha1Mismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("SHA-256 mismatch for {path:?}: expected {expected}, got {actual}")]
    Sha256Mismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    // ── Maven ───────────────────────────────────────────
    #[error("Invalid Maven coordinate: {0}")]
    InvalidMavenCoordinate(String),

    // ── Serialization ───────────────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid manifest {path:?}: {source}")]
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Cannot serialize manifest: {0}")]
    TomlWrite(#[from] toml::ser::Error),

    // ── Resolution ──────────────────────────────────────
    #[error("Package {name}@{requirement} was not found in the registry")]
    PackageNotFound { name: String, requirement: String },

    #[error("Package {name} has no release supporting {requirement}")]
    UnsupportedVersion { name: String, requirement: String },

    #[error("Dependency {name} uses unsupported provider '{provider}'")]
    UnsupportedProvider { name: String, provider: String },

    #[error("Invalid version requirement '{requirement}' for {name}: {source}")]
    InvalidRequirement {
        name: String,
        requirement: String,
        source: semver::Error,
    },

    // ── Instance ────────────────────────────────────────
    #[error("No minepack.toml found in {0:?}")]
    InstanceNotFound(PathBuf),

    #[error("Only modpacks can be launched, {0} is a mod")]
    NotAModpack(String),

    // ── Launch preconditions ────────────────────────────
    #[error("Missing credentials: log in before launching")]
    MissingCredentials,

    #[error("Account cannot launch: the profile does not own the game")]
    AccountCannotLaunch,

    #[error("Unsupported operating system: {0}")]
    UnsupportedOs(String),

    #[error("Game version {0} could not be resolved")]
    NoVersion(String),

    #[error("Launch descriptor inheritance cycle at {0}")]
    InheritanceCycle(String),

    #[error("Loader {0} cannot be launched")]
    UnsupportedLoader(String),

    // ── Java ────────────────────────────────────────────
    #[error("No java runtime available for {os}/{arch}")]
    JavaNotFound { os: String, arch: String },

    #[error("Java execution failed: {0}")]
    JavaExecution(String),

    // ── Auth ────────────────────────────────────────────
    #[error("Authentication failed: {0}")]
    Auth(String),

    // ── Process ─────────────────────────────────────────
    #[error("Game process exited with code {0}")]
    ProcessExit(i32),

    #[error("Game process was terminated by a signal")]
    ProcessKilled,

    #[error("Crash test: could not connect to the server ({0})")]
    CrashTestFailed(String),

    // ── Archive ─────────────────────────────────────────
    #[error("Zip extraction error: {0}")]
    Zip(#[from] zip::result::ZipError),

    // ── Generic ─────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the crate.
pub type LauncherResult<T> = Result<T, LauncherError>;

impl LauncherError {
    /// Build an `Io` error bound to the path that failed.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LauncherError::Io {
            path: path.into(),
            source,
        }
    }

    /// Process exit code the binary reports for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            LauncherError::CrashTestFailed(_) => CRASH_TEST_EXIT_CODE,
            LauncherError::ProcessExit(code) if *code != 0 => *code,
            _ => 1,
        }
    }
}

impl From<std::io::Error> for LauncherError {
    fn from(source: std::io::Error) -> Self {
        LauncherError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}
