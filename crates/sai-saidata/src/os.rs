//! Host OS + version detection (spec §4.4 step 4).
//!
//! `SAI_TEST_OS` / `SAI_TEST_OS_VERSION` override detection entirely, so
//! tests can exercise the override-merge path deterministically without
//! depending on the CI host's actual OS.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostOs {
    pub family: String,
    pub version: String,
}

pub fn detect_host_os() -> HostOs {
    if let Ok(family) = std::env::var("SAI_TEST_OS") {
        let version = std::env::var("SAI_TEST_OS_VERSION").unwrap_or_default();
        return HostOs { family, version };
    }

    if cfg!(target_os = "linux") {
        detect_linux()
    } else if cfg!(target_os = "macos") {
        detect_macos()
    } else if cfg!(target_os = "windows") {
        detect_windows()
    } else {
        HostOs {
            family: "unknown".to_string(),
            version: String::new(),
        }
    }
}

fn detect_linux() -> HostOs {
    if let Some(host) = parse_os_release("/etc/os-release") {
        return host;
    }
    if let Some(host) = parse_lsb_release("/etc/lsb-release") {
        return host;
    }
    for (family, path) in [
        ("rhel", "/etc/redhat-release"),
        ("debian", "/etc/debian_version"),
    ] {
        if let Ok(contents) = std::fs::read_to_string(path) {
            let version = extract_first_version(&contents).unwrap_or_default();
            return HostOs {
                family: family.to_string(),
                version,
            };
        }
    }
    HostOs {
        family: "linux".to_string(),
        version: String::new(),
    }
}

fn parse_os_release(path: &str) -> Option<HostOs> {
    let contents = std::fs::read_to_string(path).ok()?;
    let mut id = None;
    let mut version_id = None;
    for line in contents.lines() {
        if let Some(v) = line.strip_prefix("ID=") {
            id = Some(unquote(v));
        } else if let Some(v) = line.strip_prefix("VERSION_ID=") {
            version_id = Some(unquote(v));
        }
    }
    Some(HostOs {
        family: id?,
        version: version_id.unwrap_or_default(),
    })
}

fn parse_lsb_release(path: &str) -> Option<HostOs> {
    let contents = std::fs::read_to_string(path).ok()?;
    let mut id = None;
    let mut release = None;
    for line in contents.lines() {
        if let Some(v) = line.strip_prefix("DISTRIB_ID=") {
            id = Some(unquote(v).to_lowercase());
        } else if let Some(v) = line.strip_prefix("DISTRIB_RELEASE=") {
            release = Some(unquote(v));
        }
    }
    Some(HostOs {
        family: id?,
        version: release.unwrap_or_default(),
    })
}

fn unquote(v: &str) -> String {
    v.trim().trim_matches('"').to_string()
}

fn extract_first_version(s: &str) -> Option<String> {
    // Version parsing here is regex-free but equally a "hint, not
    // authoritative" extraction (spec §9 Design Notes Open Question).
    let digits: String = s
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if digits.is_empty() {
        None
    } else {
        Some(digits)
    }
}

fn detect_macos() -> HostOs {
    let plist = std::fs::read_to_string("/System/Library/CoreServices/SystemVersion.plist")
        .unwrap_or_default();
    let version = extract_plist_string(&plist, "ProductVersion").unwrap_or_default();
    HostOs {
        family: "macos".to_string(),
        version,
    }
}

fn extract_plist_string(xml: &str, key: &str) -> Option<String> {
    let key_tag = format!("<key>{key}</key>");
    let pos = xml.find(&key_tag)? + key_tag.len();
    let rest = &xml[pos..];
    let start = rest.find("<string>")? + "<string>".len();
    let end = rest.find("</string>")?;
    Some(rest[start..end].trim().to_string())
}

#[cfg(target_os = "windows")]
fn detect_windows() -> HostOs {
    use winreg::enums::HKEY_LOCAL_MACHINE;
    use winreg::RegKey;
    let hklm = RegKey::predef(HKEY_LOCAL_MACHINE);
    let version = hklm
        .open_subkey(r"SOFTWARE\Microsoft\Windows NT\CurrentVersion")
        .and_then(|k| k.get_value::<String, _>("CurrentBuild"))
        .unwrap_or_default();
    HostOs {
        family: "windows".to_string(),
        version,
    }
}

#[cfg(not(target_os = "windows"))]
fn detect_windows() -> HostOs {
    HostOs {
        family: "windows".to_string(),
        version: String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn env_override_takes_precedence() {
        std::env::set_var("SAI_TEST_OS", "ubuntu");
        std::env::set_var("SAI_TEST_OS_VERSION", "22.04");
        let host = detect_host_os();
        assert_eq!(host.family, "ubuntu");
        assert_eq!(host.version, "22.04");
        std::env::remove_var("SAI_TEST_OS");
        std::env::remove_var("SAI_TEST_OS_VERSION");
    }

    #[test]
    fn os_release_parses_id_and_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("os-release");
        std::fs::write(&path, "NAME=\"Ubuntu\"\nID=ubuntu\nVERSION_ID=\"22.04\"\n").unwrap();
        let host = parse_os_release(path.to_str().unwrap()).unwrap();
        assert_eq!(host.family, "ubuntu");
        assert_eq!(host.version, "22.04");
    }
}
