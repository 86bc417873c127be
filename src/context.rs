//! Host description for the command helper.
//!
//! The `cmd` prompt is more useful when the model knows which system the
//! command will run on.

use std::fmt;

/// What the model is told about the machine.
#[derive(Debug, Clone, PartialEq)]
pub struct HostContext {
    /// Operating system info (uname -sr output).
    pub os: String,
    /// Linux distribution or macOS version.
    pub distro: Option<String>,
    /// User's shell (from $SHELL).
    pub shell: String,
}

impl HostContext {
    /// Gather context from the running system.
    pub fn gather() -> Self {
        Self {
            os: get_os_info(),
            distro: get_distro_info(),
            shell: get_shell(),
        }
    }
}

impl fmt::Display for HostContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "OS: {}", self.os)?;
        if let Some(distro) = &self.distro {
            writeln!(f, "Distro: {}", distro)?;
        }
        write!(f, "Shell: {}", self.shell)
    }
}

/// Get the user's shell from $SHELL environment variable.
fn get_shell() -> String {
    std::env::var("SHELL").unwrap_or_else(|_| "/bin/sh".to_string())
}

fn get_os_info() -> String {
    #[cfg(unix)]
    {
        use std::process::Command;
        if let Ok(output) = Command::new("uname").arg("-sr").output() {
            if output.status.success() {
                return String::from_utf8_lossy(&output.stdout).trim().to_string();
            }
        }
    }

    format!("{} {}", std::env::consts::OS, std::env::consts::ARCH)
}

/// PRETTY_NAME from /etc/os-release, or the macOS product version.
fn get_distro_info() -> Option<String> {
    #[cfg(target_os = "linux")]
    {
        if let Ok(contents) = std::fs::read_to_string("/etc/os-release") {
            return parse_os_release(&contents);
        }
    }

    #[cfg(target_os = "macos")]
    {
        use std::process::Command;
        if let Ok(output) = Command::new("sw_vers").arg("-productVersion").output() {
            if output.status.success() {
                let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
                return Some(format!("macOS {}", version));
            }
        }
    }

    None
}

#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_os_release(contents: &str) -> Option<String> {
    contents
        .lines()
        .find_map(|line| line.strip_prefix("PRETTY_NAME="))
        .map(|name| name.trim_matches('"').to_string())
        .filter(|name| !name.is_empty())
}
