//! External tool checks and installation
//!
//! yt-dlp and ffmpeg are probed with their version flags. On Linux, ffmpeg
//! can be installed through the detected system package manager and yt-dlp
//! through pip.

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, error, info, warn};

use super::models::{AppError, AppResult};

pub const FFMPEG_DOWNLOAD_URL: &str = "https://ffmpeg.org/download.html";

/// Availability of one external tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolStatus {
    /// First line of the version output
    Available { version: String },
    Missing,
    /// Present but the version probe failed
    Broken { message: String },
}

impl ToolStatus {
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available { .. })
    }
}

/// Probe `binary` with `version_arg`
pub async fn check_tool(binary: &str, version_arg: &str) -> ToolStatus {
    let output = Command::new(binary)
        .arg(version_arg)
        .stdin(Stdio::null())
        .output()
        .await;

    match output {
        Ok(output) if output.status.success() => {
            let stdout = String::from_utf8_lossy(&output.stdout);
            let version = stdout.lines().next().unwrap_or_default().trim().to_string();
            debug!("Found {}: {}", binary, version);
            ToolStatus::Available { version }
        }
        Ok(output) => ToolStatus::Broken {
            message: format!(
                "'{} {}' exited with {:?}: {}",
                binary,
                version_arg,
                output.status.code(),
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => ToolStatus::Missing,
        Err(e) => ToolStatus::Broken {
            message: format!("Failed to run {}: {}", binary, e),
        },
    }
}

/// Status of both required tools
#[derive(Debug, Clone, Serialize)]
pub struct RequirementReport {
    pub ytdlp: ToolStatus,
    pub ffmpeg: ToolStatus,
}

impl RequirementReport {
    pub fn all_available(&self) -> bool {
        self.ytdlp.is_available() && self.ffmpeg.is_available()
    }
}

/// Check yt-dlp and ffmpeg at the given paths
pub async fn check_requirements(ytdlp: &str, ffmpeg: &str) -> RequirementReport {
    let (ytdlp, ffmpeg) = tokio::join!(
        check_tool(ytdlp, "--version"),
        check_tool(ffmpeg, "-version")
    );
    RequirementReport { ytdlp, ffmpeg }
}

/// Linux package managers that can install ffmpeg
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Apt,
    Yum,
    Dnf,
    Pacman,
    Zypper,
}

impl PackageManager {
    /// Probe order
    pub const ALL: [PackageManager; 5] = [
        PackageManager::Apt,
        PackageManager::Yum,
        PackageManager::Dnf,
        PackageManager::Pacman,
        PackageManager::Zypper,
    ];

    pub fn binary(&self) -> &'static str {
        match self {
            Self::Apt => "apt",
            Self::Yum => "yum",
            Self::Dnf => "dnf",
            Self::Pacman => "pacman",
            Self::Zypper => "zypper",
        }
    }

    /// Commands that install ffmpeg, run in order
    pub fn ffmpeg_install_commands(&self) -> Vec<Vec<&'static str>> {
        match self {
            Self::Apt => vec![
                vec!["sudo", "apt", "update"],
                vec!["sudo", "apt", "install", "-y", "ffmpeg"],
            ],
            Self::Yum => vec![vec!["sudo", "yum", "install", "-y", "ffmpeg"]],
            Self::Dnf => vec![vec!["sudo", "dnf", "install", "-y", "ffmpeg"]],
            Self::Pacman => vec![vec!["sudo", "pacman", "-Sy", "--noconfirm", "ffmpeg"]],
            Self::Zypper => vec![vec!["sudo", "zypper", "install", "-y", "ffmpeg"]],
        }
    }
}

/// Locate `name` on `path_var` (a PATH-style list)
pub fn find_in_path(name: &str, path_var: &std::ffi::OsStr) -> Option<PathBuf> {
    std::env::split_paths(path_var)
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// First package manager found on PATH
pub fn detect_package_manager() -> Option<PackageManager> {
    let path_var = std::env::var_os("PATH")?;
    PackageManager::ALL
        .into_iter()
        .find(|pm| find_in_path(pm.binary(), &path_var).is_some())
}

async fn run_step(step: &[&str]) -> AppResult<()> {
    let (program, args) = step
        .split_first()
        .ok_or_else(|| AppError::Config("empty install command".to_string()))?;

    info!("📦 Running: {}", step.join(" "));
    let status = Command::new(program)
        .args(args)
        .status()
        .await
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => AppError::MissingTool {
                tool: program.to_string(),
            },
            _ => AppError::Spawn {
                tool: program.to_string(),
                message: e.to_string(),
            },
        })?;

    if !status.success() {
        return Err(AppError::ToolFailed {
            tool: step.join(" "),
            code: status.code(),
            stderr_tail: String::new(),
        });
    }
    Ok(())
}

/// Install ffmpeg with the system package manager (Linux only)
pub async fn install_ffmpeg() -> AppResult<PackageManager> {
    if !cfg!(target_os = "linux") {
        return Err(AppError::Config(format!(
            "Unsupported operating system. Please install ffmpeg manually: {}",
            FFMPEG_DOWNLOAD_URL
        )));
    }

    let package_manager = detect_package_manager().ok_or_else(|| {
        AppError::Config(format!(
            "Package manager not detected. Please install ffmpeg manually: {}",
            FFMPEG_DOWNLOAD_URL
        ))
    })?;

    info!("Detected package manager: {}", package_manager.binary());
    for step in package_manager.ffmpeg_install_commands() {
        if let Err(e) = run_step(&step).await {
            error!("❌ Error installing ffmpeg: {}", e);
            return Err(e);
        }
    }

    info!("✅ ffmpeg installed successfully");
    Ok(package_manager)
}

/// Install or upgrade yt-dlp for the current user through pip
pub async fn install_ytdlp() -> AppResult<()> {
    let mut last_error = None;
    for python in ["python3", "python"] {
        match run_step(&[python, "-m", "pip", "install", "--user", "-U", "yt-dlp"]).await {
            Ok(()) => {
                info!("✅ yt-dlp installed successfully");
                return Ok(());
            }
            Err(AppError::MissingTool { .. }) => continue,
            Err(e) => {
                warn!("pip install through {} failed: {}", python, e);
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| AppError::MissingTool {
        tool: "python3".to_string(),
    }))
}
