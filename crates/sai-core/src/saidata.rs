//! Saidata data model (spec §3, "Saidata") and deep-merge semantics
//! (spec §4.4 "Merge semantics").

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{ErrorKind, Result, SaiError};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Urls {
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default, flatten)]
    pub other: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub license: String,
    #[serde(default)]
    pub urls: Urls,
    #[serde(default)]
    pub version: String,
}

impl Metadata {
    /// Scalar fields "replace when override non-empty" (spec §4.4).
    fn merge_onto(base: Metadata, override_: Metadata) -> Metadata {
        Metadata {
            name: replace_if_non_empty(base.name, override_.name),
            display_name: replace_if_non_empty(base.display_name, override_.display_name),
            description: replace_if_non_empty(base.description, override_.description),
            license: replace_if_non_empty(base.license, override_.license),
            urls: Urls {
                website: override_.urls.website.or(base.urls.website),
                other: {
                    let mut merged = base.urls.other;
                    merged.extend(override_.urls.other);
                    merged
                },
            },
            version: replace_if_non_empty(base.version, override_.version),
        }
    }
}

fn replace_if_non_empty(base: String, override_: String) -> String {
    if override_.is_empty() {
        base
    } else {
        override_
    }
}

pub trait Named {
    fn name(&self) -> &str;
}

macro_rules! named_impl {
    ($t:ty) => {
        impl Named for $t {
            fn name(&self) -> &str {
                &self.name
            }
        }
    };
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PackageResource {
    pub name: String,
    #[serde(default)]
    pub version: String,
}
named_impl!(PackageResource);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    Systemd,
    Launchd,
    WindowsService,
    Unknown,
}

impl Default for ServiceType {
    fn default() -> Self {
        ServiceType::Unknown
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ServiceResource {
    pub name: String,
    #[serde(default)]
    pub service_name: String,
    #[serde(default)]
    pub service_type: Option<ServiceType>,
}
named_impl!(ServiceResource);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    Config,
    Log,
    Data,
    Other,
}

impl Default for FileType {
    fn default() -> Self {
        FileType::Other
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FileResource {
    pub name: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub file_type: Option<FileType>,
}
named_impl!(FileResource);

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DirectoryResource {
    pub name: String,
    #[serde(default)]
    pub path: String,
}
named_impl!(DirectoryResource);

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CommandResource {
    pub name: String,
    #[serde(default)]
    pub path: String,
}
named_impl!(CommandResource);

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PortResource {
    pub name: String,
    #[serde(default)]
    pub port: u32,
    #[serde(default)]
    pub protocol: String,
    #[serde(default)]
    pub service: String,
}
named_impl!(PortResource);

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ContainerResource {
    pub name: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub tag: String,
}
named_impl!(ContainerResource);

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Repository {
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub enabled: bool,
}
named_impl!(Repository);

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ResourceCollections {
    #[serde(default)]
    pub packages: Vec<PackageResource>,
    #[serde(default)]
    pub services: Vec<ServiceResource>,
    #[serde(default)]
    pub files: Vec<FileResource>,
    #[serde(default)]
    pub directories: Vec<DirectoryResource>,
    #[serde(default)]
    pub commands: Vec<CommandResource>,
    #[serde(default)]
    pub ports: Vec<PortResource>,
    #[serde(default)]
    pub containers: Vec<ContainerResource>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProviderOverride {
    #[serde(flatten)]
    pub resources: ResourceCollections,
    #[serde(default)]
    pub repositories: Vec<Repository>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Requirements {
    #[serde(default)]
    pub memory_mb: Option<u64>,
    #[serde(default)]
    pub disk_mb: Option<u64>,
    #[serde(default)]
    pub java_version: Option<String>,
    #[serde(default, flatten)]
    pub other: HashMap<String, serde_yaml::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Compatibility {
    #[serde(default)]
    pub os: Vec<String>,
    #[serde(default)]
    pub min_os_version: Option<String>,
    #[serde(default, flatten)]
    pub other: HashMap<String, serde_yaml::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Saidata {
    #[serde(default = "default_schema_version")]
    pub version: String,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(flatten)]
    pub resources: ResourceCollections,
    #[serde(default)]
    pub providers: HashMap<String, ProviderOverride>,
    #[serde(default)]
    pub compatibility: Compatibility,
    #[serde(default)]
    pub requirements: Requirements,
    /// True when synthesised by DefaultsGenerator rather than loaded from
    /// disk (spec §4.5).
    #[serde(default)]
    pub is_generated: bool,
}

pub const SCHEMA_VERSION: &str = "0.2";

fn default_schema_version() -> String {
    SCHEMA_VERSION.to_string()
}

impl Default for Saidata {
    fn default() -> Self {
        Saidata {
            version: default_schema_version(),
            metadata: Metadata::default(),
            resources: ResourceCollections::default(),
            providers: HashMap::new(),
            compatibility: Compatibility::default(),
            requirements: Requirements::default(),
            is_generated: false,
        }
    }
}

impl Saidata {
    /// The implicit default package name (spec §3 invariant).
    pub fn default_package_name(&self) -> Option<&str> {
        self.resources
            .packages
            .first()
            .map(|p| p.name.as_str())
            .or_else(|| {
                if self.metadata.name.is_empty() {
                    None
                } else {
                    Some(self.metadata.name.as_str())
                }
            })
    }

    /// First entry of a provider override, if that provider overrides
    /// packages at all (spec §3 invariant: "when providers[P].packages is
    /// non-empty, its first entry overrides").
    pub fn provider_package_name(&self, provider: &str) -> Option<&str> {
        self.providers
            .get(provider)
            .and_then(|p| p.resources.packages.first())
            .map(|p| p.name.as_str())
    }

    pub fn provider_service_name(&self, provider: &str) -> Option<&str> {
        self.providers
            .get(provider)
            .and_then(|p| p.resources.services.first())
            .map(|s| {
                if s.service_name.is_empty() {
                    s.name.as_str()
                } else {
                    s.service_name.as_str()
                }
            })
    }

    pub fn top_level_service_name(&self) -> Option<&str> {
        self.resources.services.first().map(|s| {
            if s.service_name.is_empty() {
                s.name.as_str()
            } else {
                s.service_name.as_str()
            }
        })
    }

    pub fn file_by_name(&self, name: &str) -> Option<&FileResource> {
        self.resources.files.iter().find(|f| f.name == name)
    }

    /// Validate schema-version and per-collection `name` uniqueness and
    /// port ranges (spec §3 invariants).
    pub fn validate(&self) -> Result<()> {
        if self.version != SCHEMA_VERSION {
            return Err(SaiError::new(
                ErrorKind::SaidataSchemaInvalid,
                format!(
                    "saidata schema version '{}' does not match validator version '{}'",
                    self.version, SCHEMA_VERSION
                ),
            ));
        }
        check_unique_names(&self.resources.packages)?;
        check_unique_names(&self.resources.services)?;
        check_unique_names(&self.resources.files)?;
        check_unique_names(&self.resources.directories)?;
        check_unique_names(&self.resources.commands)?;
        check_unique_names(&self.resources.ports)?;
        check_unique_names(&self.resources.containers)?;
        for port in &self.resources.ports {
            if port.port == 0 || port.port > 65535 {
                return Err(SaiError::new(
                    ErrorKind::SaidataSchemaInvalid,
                    format!("port '{}' ({}) out of range 1..=65535", port.name, port.port),
                ));
            }
        }
        Ok(())
    }
}

fn check_unique_names<T: Named>(items: &[T]) -> Result<()> {
    let mut seen = std::collections::HashSet::new();
    for item in items {
        if !seen.insert(item.name()) {
            return Err(SaiError::new(
                ErrorKind::SaidataSchemaInvalid,
                format!("duplicate resource name '{}' in collection", item.name()),
            ));
        }
    }
    Ok(())
}
