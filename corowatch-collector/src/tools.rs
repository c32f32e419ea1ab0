//! The corosync diagnostic tools and how they are invoked.

use std::env;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};

/// Name of the privilege-escalation helper.
pub const SUDO_BINARY: &str = "sudo";

/// One of the two diagnostic tools the collector runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    /// `corosync-quorumtool`: quorum and votequorum information.
    QuorumTool,
    /// `corosync-cfgtool -sb`: per-link status.
    CfgTool,
}

impl Tool {
    /// Executable name looked up in the search path.
    pub const fn binary(self) -> &'static str {
        match self {
            Tool::QuorumTool => "corosync-quorumtool",
            Tool::CfgTool => "corosync-cfgtool",
        }
    }

    /// Arguments passed on every invocation.
    pub const fn args(self) -> &'static [&'static str] {
        match self {
            Tool::QuorumTool => &[],
            Tool::CfgTool => &["-sb"],
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.binary())
    }
}

/// A fully resolved command line for one tool.
///
/// When privilege escalation is configured the program is `sudo` and the
/// tool path becomes its first argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: PathBuf,
    args: Vec<OsString>,
}

impl Invocation {
    /// Build the command line for `tool` located at `tool_path`.
    pub fn new(tool: Tool, tool_path: &Path, sudo: Option<&Path>) -> Self {
        let tool_args = tool.args().iter().map(OsString::from);
        match sudo {
            Some(sudo) => Self {
                program: sudo.to_path_buf(),
                args: std::iter::once(tool_path.as_os_str().to_os_string())
                    .chain(tool_args)
                    .collect(),
            },
            None => Self {
                program: tool_path.to_path_buf(),
                args: tool_args.collect(),
            },
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn args(&self) -> &[OsString] {
        &self.args
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Look up `binary` in the process `PATH`.
pub fn find_in_path(binary: &str) -> Option<PathBuf> {
    let path = env::var_os("PATH")?;
    find_in(binary, &path)
}

/// Look up `binary` in a `PATH`-style list of directories.
///
/// Returns the first candidate that is a regular, executable file.
pub fn find_in(binary: &str, search_path: &OsStr) -> Option<PathBuf> {
    env::split_paths(search_path)
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(|dir| dir.join(binary))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_names_and_args() {
        assert_eq!(Tool::QuorumTool.binary(), "corosync-quorumtool");
        assert!(Tool::QuorumTool.args().is_empty());
        assert_eq!(Tool::CfgTool.to_string(), "corosync-cfgtool");
        assert_eq!(Tool::CfgTool.args(), ["-sb"]);
    }

    #[test]
    fn invocation_without_sudo() {
        let inv = Invocation::new(Tool::CfgTool, Path::new("/usr/sbin/corosync-cfgtool"), None);
        assert_eq!(inv.program(), Path::new("/usr/sbin/corosync-cfgtool"));
        assert_eq!(inv.args(), [OsString::from("-sb")]);
        assert_eq!(inv.to_string(), "/usr/sbin/corosync-cfgtool -sb");
    }

    #[test]
    fn invocation_with_sudo_prefix() {
        let inv = Invocation::new(
            Tool::QuorumTool,
            Path::new("/usr/sbin/corosync-quorumtool"),
            Some(Path::new("/usr/bin/sudo")),
        );
        assert_eq!(inv.program(), Path::new("/usr/bin/sudo"));
        assert_eq!(inv.args(), [OsString::from("/usr/sbin/corosync-quorumtool")]);
        assert_eq!(inv.to_string(), "/usr/bin/sudo /usr/sbin/corosync-quorumtool");
    }

    #[cfg(unix)]
    #[test]
    fn find_in_skips_non_executables() {
        use std::os::unix::fs::PermissionsExt;

        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();

        let plain = first.path().join("corosync-cfgtool");
        std::fs::write(&plain, "").unwrap();

        let exec = second.path().join("corosync-cfgtool");
        std::fs::write(&exec, "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&exec, std::fs::Permissions::from_mode(0o755)).unwrap();

        let search = env::join_paths([first.path(), second.path()]).unwrap();
        assert_eq!(find_in("corosync-cfgtool", &search), Some(exec));
        assert_eq!(find_in("corosync-quorumtool", &search), None);
    }

    #[test]
    fn find_in_empty_path() {
        assert_eq!(find_in("sh", OsStr::new("")), None);
    }
}
