//! ResourceProbe (spec §4.1): pure, stateless existence tests for files,
//! directories, executables, services and ports. No package-manager
//! queries are ever issued here; every probe returns within a <100ms
//! budget because each is a single filesystem stat or a PATH lookup.

use std::path::Path;

/// Service kind used to decide which native facility to consult
/// (spec §4.1 `service_exists`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceType {
    Systemd,
    Launchd,
    WindowsService,
    Unknown,
}

/// Stat a path, resolving symlinks, and report whether it exists and is a
/// regular file.
pub fn file_exists(path: &str) -> bool {
    Path::new(path)
        .metadata()
        .map(|m| m.is_file())
        .unwrap_or(false)
}

/// Stat a path, resolving symlinks, and report whether it exists and is a
/// directory.
pub fn dir_exists(path: &str) -> bool {
    Path::new(path)
        .metadata()
        .map(|m| m.is_dir())
        .unwrap_or(false)
}

/// Resolve a command: an absolute path is stat-checked for an executable
/// bit; otherwise it is resolved against `PATH` (spec §4.1).
pub fn command_exists(name_or_path: &str) -> bool {
    let path = Path::new(name_or_path);
    if path.is_absolute() {
        return is_executable(path);
    }
    which::which(name_or_path).is_ok()
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
    path.metadata().map(|m| m.is_file()).unwrap_or(false)
}

/// Consult the host service manager for a unit/plist/registry entry of the
/// given type. A missing native facility (e.g. no systemd present) yields
/// `false`, never an error — a known false-negative risk, per spec §9
/// Design Notes.
pub fn service_exists(name: &str, service_type: ServiceType) -> bool {
    match service_type {
        ServiceType::Systemd => systemd_unit_exists(name),
        ServiceType::Launchd => launchd_plist_exists(name),
        ServiceType::WindowsService => windows_service_exists(name),
        ServiceType::Unknown => {
            systemd_unit_exists(name) || launchd_plist_exists(name) || windows_service_exists(name)
        }
    }
}

const SYSTEMD_UNIT_DIRS: &[&str] = &[
    "/etc/systemd/system",
    "/usr/lib/systemd/system",
    "/lib/systemd/system",
    "/run/systemd/system",
];

fn systemd_unit_exists(name: &str) -> bool {
    let unit = format!("{name}.service");
    SYSTEMD_UNIT_DIRS
        .iter()
        .any(|dir| Path::new(dir).join(&unit).is_file())
}

fn launchd_plist_dirs() -> Vec<String> {
    let mut dirs = vec![
        "/Library/LaunchDaemons".to_string(),
        "/Library/LaunchAgents".to_string(),
    ];
    if let Some(home) = dirs_home() {
        dirs.push(format!("{home}/Library/LaunchAgents"));
    }
    dirs
}

fn dirs_home() -> Option<String> {
    std::env::var("HOME").ok()
}

fn launchd_plist_exists(name: &str) -> bool {
    if !cfg!(target_os = "macos") {
        return false;
    }
    let plist = format!("{name}.plist");
    launchd_plist_dirs()
        .iter()
        .any(|dir| Path::new(dir).join(&plist).is_file())
}

#[cfg(target_os = "windows")]
fn windows_service_exists(name: &str) -> bool {
    use winreg::enums::HKEY_LOCAL_MACHINE;
    use winreg::RegKey;
    let hklm = RegKey::predef(HKEY_LOCAL_MACHINE);
    hklm.open_subkey(format!(r"SYSTEM\CurrentControlSet\Services\{name}"))
        .is_ok()
}

#[cfg(not(target_os = "windows"))]
fn windows_service_exists(_name: &str) -> bool {
    false
}

/// `1 <= n <= 65535`. Does not probe listening state (spec §4.1).
pub fn port_valid(n: u32) -> bool {
    (1..=65535).contains(&n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_exists_true_for_real_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("x.txt");
        std::fs::write(&file, "hi").unwrap();
        assert!(file_exists(file.to_str().unwrap()));
        assert!(!dir_exists(file.to_str().unwrap()));
    }

    #[test]
    fn file_exists_false_for_missing_path() {
        assert!(!file_exists("/definitely/does/not/exist/xyz"));
    }

    #[test]
    fn dir_exists_true_for_real_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(dir_exists(dir.path().to_str().unwrap()));
    }

    #[test]
    fn command_exists_true_for_common_shell_builtin_path() {
        assert!(command_exists("sh"));
    }

    #[test]
    fn command_exists_false_for_nonsense_name() {
        assert!(!command_exists("totally-not-a-real-binary-zzz"));
    }

    #[test]
    fn port_valid_boundaries() {
        assert!(!port_valid(0));
        assert!(port_valid(1));
        assert!(port_valid(65535));
        assert!(!port_valid(65536));
    }

    #[test]
    fn service_exists_false_when_no_native_facility_matches() {
        assert!(!service_exists(
            "definitely-not-a-real-service-zzz",
            ServiceType::Systemd
        ));
    }
}
