// ─── Platform ───
// Everything that differs between host operating systems lives here:
// descriptor OS names, classpath separator, java executable, signals.

use std::process::Stdio;

use crate::core::error::{LauncherError, LauncherResult};

/// Host operating system as named by launch descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Os {
    Windows,
    Linux,
    Osx,
}

impl Os {
    /// Detect the running OS. Anything other than windows/linux/macos is fatal.
    pub fn current() -> LauncherResult<Self> {
        Self::from_rust_os(std::env::consts::OS)
    }

    pub fn from_rust_os(os: &str) -> LauncherResult<Self> {
        match os {
            "windows" => Ok(Os::Windows),
            "linux" => Ok(Os::Linux),
            "macos" => Ok(Os::Osx),
            other => Err(LauncherError::UnsupportedOs(other.to_string())),
        }
    }

    /// Name used in `rules.os.name` and `natives` maps.
    pub fn descriptor_name(self) -> &'static str {
        match self {
            Os::Windows => "windows",
            Os::Linux => "linux",
            Os::Osx => "osx",
        }
    }

    /// Name used by the Adoptium runtime API.
    pub fn runtime_name(self) -> &'static str {
        match self {
            Os::Windows => "windows",
            Os::Linux => "linux",
            Os::Osx => "mac",
        }
    }

    /// Platform-specific Java classpath separator.
    pub fn classpath_separator(self) -> &'static str {
        match self {
            Os::Windows => ";",
            Os::Linux | Os::Osx => ":",
        }
    }

    pub fn java_exe(self) -> &'static str {
        match self {
            Os::Windows => "java.exe",
            Os::Linux | Os::Osx => "java",
        }
    }

    /// Runtime archives are zips on windows and tarballs elsewhere.
    pub fn runtime_archive_ext(self) -> &'static str {
        match self {
            Os::Windows => "zip",
            Os::Linux | Os::Osx => "tar.gz",
        }
    }

    /// File extensions of native shared objects for this OS.
    pub fn is_native_library(self, file_name: &str) -> bool {
        let lower = file_name.to_ascii_lowercase();
        match self {
            Os::Windows => lower.ends_with(".dll"),
            Os::Linux => lower.ends_with(".so"),
            Os::Osx => lower.ends_with(".dylib") || lower.ends_with(".jnilib"),
        }
    }
}

impl std::fmt::Display for Os {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.descriptor_name())
    }
}

/// Architecture string for runtime downloads and `${arch}` in classifiers.
pub fn runtime_arch() -> String {
    match std::env::consts::ARCH {
        "x86_64" => "x64".to_string(),
        "aarch64" => "aarch64".to_string(),
        other => other.to_string(),
    }
}

/// `${arch}` value in legacy native classifiers (`natives-windows-${arch}`).
pub fn classifier_arch() -> &'static str {
    if cfg!(target_pointer_width = "64") {
        "64"
    } else {
        "32"
    }
}

/// Ask a process to stop on its own (SIGTERM / plain taskkill).
pub async fn request_graceful_termination(pid: u32) -> LauncherResult<()> {
    let mut cmd = graceful_terminate_command(pid);
    let status = cmd
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map_err(|e| LauncherError::Other(format!("Cannot signal process {pid}: {e}")))?;

    if !status.success() {
        return Err(LauncherError::Other(format!(
            "Terminate request for process {pid} returned {:?}",
            status.code()
        )));
    }
    Ok(())
}

#[cfg(target_os = "windows")]
fn graceful_terminate_command(pid: u32) -> tokio::process::Command {
    let mut cmd = tokio::process::Command::new("taskkill");
    cmd.args(["/PID", &pid.to_string(), "/T"]);
    cmd
}

#[cfg(not(target_os = "windows"))]
fn graceful_terminate_command(pid: u32) -> tokio::process::Command {
    let mut cmd = tokio::process::Command::new("kill");
    cmd.args(["-15", &pid.to_string()]);
    cmd
}

/// Prepend `value` to a path-like environment variable.
pub fn append_env_path(os: Os, var_name: &str, value: &str) -> String {
    let separator = os.classpath_separator();
    match std::env::var(var_name) {
        Ok(existing) if !existing.trim().is_empty() => {
            format!("{}{}{}", value, separator, existing)
        }
        _ => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_os_is_rejected() {
        assert!(matches!(
            Os::from_rust_os("freebsd"),
            Err(LauncherError::UnsupportedOs(os)) if os == "freebsd"
        ));
        assert_eq!(Os::from_rust_os("macos").unwrap(), Os::Osx);
    }

    #[test]
    fn separators_follow_os() {
        assert_eq!(Os::Windows.classpath_separator(), ";");
        assert_eq!(Os::Linux.classpath_separator(), ":");
        assert_eq!(Os::Osx.classpath_separator(), ":");
    }

    #[test]
    fn native_extensions_per_os() {
        assert!(Os::Linux.is_native_library("liblwjgl.so"));
        assert!(!Os::Linux.is_native_library("lwjgl.dll"));
        assert!(Os::Windows.is_native_library("LWJGL.DLL"));
        assert!(Os::Osx.is_native_library("liblwjgl.jnilib"));
    }

    #[test]
    fn append_env_path_prefixes_new_value() {
        let merged = append_env_path(Os::Linux, "MINEPACK_SHOULD_NOT_EXIST", "/tmp/natives");
        assert_eq!(merged, "/tmp/natives");

        std::env::set_var("MINEPACK_TEST_PATH", "/usr/lib");
        let merged = append_env_path(Os::Linux, "MINEPACK_TEST_PATH", "/game/natives");
        assert_eq!(merged, "/game/natives:/usr/lib");
        std::env::remove_var("MINEPACK_TEST_PATH");
    }
}
