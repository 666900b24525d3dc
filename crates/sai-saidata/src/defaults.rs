//! DefaultsGenerator (spec §4.5): synthesises saidata for an unknown
//! software id, then prunes every candidate through ResourceProbe so the
//! result reflects what actually exists on this host.

use sai_core::{
    CommandResource, DirectoryResource, FileResource, FileType, PackageResource, PortResource,
    Saidata, ServiceResource, ServiceType,
};
use sai_probe::ServiceType as ProbeServiceType;

fn infer_service_type() -> ServiceType {
    if cfg!(target_os = "linux") {
        ServiceType::Systemd
    } else if cfg!(target_os = "macos") {
        ServiceType::Launchd
    } else if cfg!(target_os = "windows") {
        ServiceType::WindowsService
    } else {
        ServiceType::Unknown
    }
}

fn probe_service_type(t: ServiceType) -> ProbeServiceType {
    match t {
        ServiceType::Systemd => ProbeServiceType::Systemd,
        ServiceType::Launchd => ProbeServiceType::Launchd,
        ServiceType::WindowsService => ProbeServiceType::WindowsService,
        ServiceType::Unknown => ProbeServiceType::Unknown,
    }
}

/// name, (port, protocol) pairs for a small curated table of well-known
/// software (spec §4.5).
fn well_known_ports(id: &str) -> Vec<(&'static str, u32, &'static str)> {
    match id {
        "nginx" | "apache" | "apache2" | "httpd" => {
            vec![("http", 80, "tcp"), ("https", 443, "tcp")]
        }
        "mysql" | "mariadb" => vec![("mysql", 3306, "tcp")],
        "postgresql" | "postgres" => vec![("postgresql", 5432, "tcp")],
        "redis" => vec![("redis", 6379, "tcp")],
        "mongodb" | "mongo" => vec![("mongodb", 27017, "tcp")],
        "memcached" => vec![("memcached", 11211, "tcp")],
        _ => Vec::new(),
    }
}

fn config_file_candidates(id: &str) -> Vec<String> {
    vec![
        format!("/etc/{id}/{id}.conf"),
        format!("/usr/local/etc/{id}/{id}.conf"),
        format!(r"C:\ProgramData\{id}\{id}.conf"),
    ]
}

fn directory_candidates(id: &str) -> Vec<String> {
    vec![format!("/var/log/{id}"), format!("/var/lib/{id}")]
}

fn command_candidates(id: &str) -> Vec<String> {
    vec![
        format!("/usr/bin/{id}"),
        format!("/opt/homebrew/bin/{id}"),
        format!(r"C:\Program Files\{id}\{id}.exe"),
    ]
}

/// Synthesise saidata for `id`, seeded entirely from the id itself, then
/// filter every candidate resource to what ResourceProbe confirms exists.
/// `is_generated` remains true regardless of how many candidates survive.
pub fn generate(id: &str) -> Saidata {
    let mut saidata = Saidata {
        is_generated: true,
        ..Default::default()
    };
    saidata.metadata.name = id.to_string();

    // Package: always present, unconditionally (spec §4.5 + scenario 5).
    saidata.resources.packages.push(PackageResource {
        name: id.to_string(),
        version: String::new(),
    });

    // Service: candidate, kept only if the native service manager reports it.
    let service_type = infer_service_type();
    if sai_probe::service_exists(id, probe_service_type(service_type)) {
        saidata.resources.services.push(ServiceResource {
            name: id.to_string(),
            service_name: id.to_string(),
            service_type: Some(service_type),
        });
    }

    // Config files: kept only if they exist.
    for (i, path) in config_file_candidates(id).into_iter().enumerate() {
        if sai_probe::file_exists(&path) {
            saidata.resources.files.push(FileResource {
                name: if i == 0 {
                    "config".to_string()
                } else {
                    format!("config{i}")
                },
                path,
                file_type: Some(FileType::Config),
            });
        }
    }

    // Directories: kept only if they exist.
    for path in directory_candidates(id) {
        if sai_probe::dir_exists(&path) {
            let name = path.rsplit('/').next().unwrap_or(id).to_string();
            saidata
                .resources
                .directories
                .push(DirectoryResource { name, path });
        }
    }

    // Command path: kept only if it resolves.
    for path in command_candidates(id) {
        if sai_probe::command_exists(&path) {
            saidata.resources.commands.push(CommandResource {
                name: id.to_string(),
                path,
            });
            break;
        }
    }

    // Port guesses: curated table only, no further probing (ResourceProbe
    // never probes listening state).
    for (name, port, protocol) in well_known_ports(id) {
        saidata.resources.ports.push(PortResource {
            name: name.to_string(),
            port,
            protocol: protocol.to_string(),
            service: id.to_string(),
        });
    }

    saidata
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_package_unconditionally_for_unknown_software() {
        let saidata = generate("flibber");
        assert!(saidata.is_generated);
        assert_eq!(saidata.resources.packages[0].name, "flibber");
        assert!(saidata.resources.files.is_empty());
        assert!(saidata.resources.directories.is_empty());
    }

    #[test]
    fn well_known_ports_populated_for_curated_names() {
        let saidata = generate("nginx");
        assert_eq!(saidata.resources.ports.len(), 2);
        assert!(saidata.resources.ports.iter().any(|p| p.port == 80));
    }

    #[test]
    fn uncurated_names_get_no_port_guesses() {
        let saidata = generate("some-random-tool-xyz");
        assert!(saidata.resources.ports.is_empty());
    }
}
