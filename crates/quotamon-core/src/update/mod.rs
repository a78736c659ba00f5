//! Self-update: release check, verified binary replacement, restart.
//!
//! `apply` is the riskiest path in the tree and favors correctness over
//! speed: the candidate is downloaded into its own staging directory,
//! smoke-tested, and only then swapped over the running executable.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::error::UpdateError;

const REPO: &str = "trust-delta/quotamon";

const CHECK_TIMEOUT: Duration = Duration::from_secs(15);
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// Version reported by unreleased builds. Self-update is disabled for
/// them: an unversioned build must not "upgrade" itself onto a tag.
pub const DEV_VERSION: &str = "dev";

/// A published release newer than the running build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    /// Release tag, e.g. "v0.5.0"
    pub version: String,
    /// Download URL for this host's binary
    pub url: String,
}

/// The slice of the release feed we care about.
#[derive(Debug, Deserialize)]
struct ReleaseFeed {
    #[serde(default)]
    tag_name: String,
}

fn feed_url() -> String {
    format!("https://api.github.com/repos/{REPO}/releases/latest")
}

/// Query the release feed for a version newer than `current_version`.
///
/// Returns `Ok(None)` when already up to date or when running an
/// unreleased build. Feed failures are `UpdateError::Check`; callers log
/// them and retry on the next interval.
pub fn check(current_version: &str) -> Result<Option<Release>, UpdateError> {
    if current_version == DEV_VERSION {
        return Ok(None);
    }

    let agent: ureq::Agent = ureq::Agent::config_builder()
        .timeout_global(Some(CHECK_TIMEOUT))
        .build()
        .into();

    let mut response = agent
        .get(&feed_url())
        .call()
        .map_err(|e| UpdateError::Check(e.to_string()))?;
    let feed: ReleaseFeed = response
        .body_mut()
        .read_json()
        .map_err(|e| UpdateError::Check(e.to_string()))?;

    Ok(select_release(current_version, &feed.tag_name))
}

/// Decide whether `latest_tag` is an update over `current_version`.
fn select_release(current_version: &str, latest_tag: &str) -> Option<Release> {
    if latest_tag.is_empty() || latest_tag == current_version {
        return None;
    }
    Some(Release {
        version: latest_tag.to_string(),
        url: download_url(latest_tag, std::env::consts::OS, std::env::consts::ARCH),
    })
}

/// Download URL for a tag and host target, derived deterministically.
fn download_url(tag: &str, os: &str, arch: &str) -> String {
    format!("https://github.com/{REPO}/releases/download/{tag}/quotamon-{os}-{arch}")
}

/// Download, verify, and install the release binary over the running
/// executable. The caller restarts afterwards.
///
/// On any failure before the replace step the running binary is
/// untouched. The staging directory is removed on every path.
pub fn apply(url: &str) -> Result<(), UpdateError> {
    let target = current_exe_resolved()?;

    let staging = tempfile::Builder::new()
        .prefix("quotamon-update-")
        .tempdir()?;
    let candidate = staging.path().join("quotamon");

    download(url, &candidate)?;
    make_executable(&candidate)?;
    clear_quarantine(&candidate);
    verify_and_install(&candidate, &target)
}

/// Real path of the running executable, with symlinks resolved so the
/// replacement lands on the actual binary.
fn current_exe_resolved() -> Result<PathBuf, UpdateError> {
    let exe = std::env::current_exe()?;
    Ok(fs::canonicalize(exe)?)
}

fn download(url: &str, dest: &Path) -> Result<(), UpdateError> {
    let agent: ureq::Agent = ureq::Agent::config_builder()
        .timeout_global(Some(DOWNLOAD_TIMEOUT))
        .build()
        .into();

    let mut response = agent
        .get(url)
        .call()
        .map_err(|e| UpdateError::Download(e.to_string()))?;

    let mut file = fs::File::create(dest)?;
    std::io::copy(&mut response.body_mut().as_reader(), &mut file)
        .map_err(|e| UpdateError::Download(e.to_string()))?;
    Ok(())
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<(), UpdateError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))?;
    Ok(())
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<(), UpdateError> {
    Ok(())
}

/// Downloaded executables are quarantined on macOS; clear the attribute so
/// the binary runs without an interactive prompt. Failures are ignored.
#[cfg(target_os = "macos")]
fn clear_quarantine(path: &Path) {
    let _ = Command::new("xattr")
        .args(["-d", "com.apple.quarantine"])
        .arg(path)
        .status();
}

#[cfg(not(target_os = "macos"))]
fn clear_quarantine(_path: &Path) {}

/// Smoke-test the candidate, then swap it in. A failing test aborts
/// before any replace step runs.
fn verify_and_install(candidate: &Path, target: &Path) -> Result<(), UpdateError> {
    smoke_test(candidate)?;
    replace_binary(candidate, target)
}

/// Run the candidate with a harmless flag before trusting it.
fn smoke_test(candidate: &Path) -> Result<(), UpdateError> {
    let status = Command::new(candidate)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map_err(|e| UpdateError::Verify(format!("failed to launch: {e}")))?;

    if !status.success() {
        return Err(UpdateError::Verify(format!("candidate exited with {status}")));
    }
    Ok(())
}

/// Rename the verified candidate over the target. Rename can fail across
/// filesystems; the fallback copies instead. The copy is not atomic, an
/// accepted risk given the candidate already passed its smoke test.
fn replace_binary(candidate: &Path, target: &Path) -> Result<(), UpdateError> {
    if let Err(rename_err) = fs::rename(candidate, target) {
        debug!("rename failed ({rename_err}), falling back to copy");
        copy_executable(candidate, target).map_err(UpdateError::Replace)?;
    }
    Ok(())
}

fn copy_executable(src: &Path, dst: &Path) -> std::io::Result<()> {
    fs::copy(src, dst)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(dst, fs::Permissions::from_mode(0o755))?;
    }
    Ok(())
}

/// Launch a fresh monitor process from the (now updated) executable and
/// return without waiting. The caller exits right after so exactly one
/// instance stays live.
pub fn restart() -> Result<(), UpdateError> {
    let exe = std::env::current_exe().map_err(UpdateError::Restart)?;
    Command::new(exe)
        .arg("monitor")
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(UpdateError::Restart)?;
    Ok(())
}

/// Strip a leading "v" for display: "v1.2.3" -> "1.2.3".
pub fn strip_v(version: &str) -> &str {
    version.strip_prefix('v').unwrap_or(version)
}
