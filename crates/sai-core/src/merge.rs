//! Deep-merge machinery for Saidata (spec §4.4, §9 Design Notes: "a table
//! of per-field merge strategies rather than bespoke code per field").
//!
//! Three strategies are used throughout: `replace_if_non_empty` (scalar
//! metadata), `merge_by_name` (named-collection fields), and
//! `recursive_map_merge` (the free-form maps on `Requirements` /
//! `Compatibility` and the `providers` map itself).

use std::collections::HashMap;

use crate::saidata::*;

pub(crate) fn replace_if_non_empty(base: String, override_: String) -> String {
    if override_.is_empty() {
        base
    } else {
        override_
    }
}

fn replace_opt<T>(base: Option<T>, override_: Option<T>) -> Option<T> {
    override_.or(base)
}

/// Merge two named collections by `name`: an override entry whose name
/// matches a base entry replaces it field-by-field (non-empty override
/// wins); names only present in the override are appended; names only in
/// base are kept (spec §4.4).
pub fn merge_by_name<T, F>(base: Vec<T>, overrides: Vec<T>, merge_fields: F) -> Vec<T>
where
    T: Named + Clone,
    F: Fn(T, T) -> T,
{
    let mut override_by_name: HashMap<String, T> = HashMap::new();
    for o in overrides.iter().cloned() {
        override_by_name.insert(o.name().to_string(), o);
    }
    let base_names: std::collections::HashSet<String> =
        base.iter().map(|b| b.name().to_string()).collect();

    let mut merged: Vec<T> = base
        .into_iter()
        .map(|b| match override_by_name.remove(b.name()) {
            Some(o) => merge_fields(b, o),
            None => b,
        })
        .collect();

    for o in overrides {
        if !base_names.contains(o.name()) {
            merged.push(o);
        }
    }
    merged
}

fn recursive_map_merge(
    mut base: HashMap<String, serde_yaml::Value>,
    overrides: HashMap<String, serde_yaml::Value>,
) -> HashMap<String, serde_yaml::Value> {
    for (k, v) in overrides {
        base.insert(k, v);
    }
    base
}

macro_rules! field_merge {
    ($t:ty, |$base:ident, $over:ident| $body:expr) => {
        impl $t {
            fn merge_fields($base: Self, $over: Self) -> Self {
                $body
            }
        }
    };
}

field_merge!(PackageResource, |base, over| PackageResource {
    name: base.name,
    version: replace_if_non_empty(base.version, over.version),
});

field_merge!(ServiceResource, |base, over| ServiceResource {
    name: base.name,
    service_name: replace_if_non_empty(base.service_name, over.service_name),
    service_type: replace_opt(base.service_type, over.service_type),
});

field_merge!(FileResource, |base, over| FileResource {
    name: base.name,
    path: replace_if_non_empty(base.path, over.path),
    file_type: replace_opt(base.file_type, over.file_type),
});

field_merge!(DirectoryResource, |base, over| DirectoryResource {
    name: base.name,
    path: replace_if_non_empty(base.path, over.path),
});

field_merge!(CommandResource, |base, over| CommandResource {
    name: base.name,
    path: replace_if_non_empty(base.path, over.path),
});

field_merge!(PortResource, |base, over| PortResource {
    name: base.name,
    port: if over.port != 0 { over.port } else { base.port },
    protocol: replace_if_non_empty(base.protocol, over.protocol),
    service: replace_if_non_empty(base.service, over.service),
});

field_merge!(ContainerResource, |base, over| ContainerResource {
    name: base.name,
    image: replace_if_non_empty(base.image, over.image),
    tag: replace_if_non_empty(base.tag, over.tag),
});

field_merge!(Repository, |base, over| Repository {
    name: base.name,
    url: replace_if_non_empty(base.url, over.url),
    enabled: over.enabled || base.enabled,
});

fn merge_resource_collections(
    base: ResourceCollections,
    over: ResourceCollections,
) -> ResourceCollections {
    ResourceCollections {
        packages: merge_by_name(base.packages, over.packages, PackageResource::merge_fields),
        services: merge_by_name(base.services, over.services, ServiceResource::merge_fields),
        files: merge_by_name(base.files, over.files, FileResource::merge_fields),
        directories: merge_by_name(
            base.directories,
            over.directories,
            DirectoryResource::merge_fields,
        ),
        commands: merge_by_name(base.commands, over.commands, CommandResource::merge_fields),
        ports: merge_by_name(base.ports, over.ports, PortResource::merge_fields),
        containers: merge_by_name(
            base.containers,
            over.containers,
            ContainerResource::merge_fields,
        ),
    }
}

fn merge_provider_override(base: ProviderOverride, over: ProviderOverride) -> ProviderOverride {
    ProviderOverride {
        resources: merge_resource_collections(base.resources, over.resources),
        repositories: merge_by_name(base.repositories, over.repositories, Repository::merge_fields),
    }
}

fn merge_requirements(base: Requirements, over: Requirements) -> Requirements {
    Requirements {
        memory_mb: replace_opt(base.memory_mb, over.memory_mb),
        disk_mb: replace_opt(base.disk_mb, over.disk_mb),
        java_version: replace_opt(base.java_version, over.java_version),
        other: recursive_map_merge(base.other, over.other),
    }
}

fn merge_compatibility(base: Compatibility, over: Compatibility) -> Compatibility {
    let mut os = base.os;
    for o in over.os {
        if !os.contains(&o) {
            os.push(o);
        }
    }
    Compatibility {
        os,
        min_os_version: replace_opt(base.min_os_version, over.min_os_version),
        other: recursive_map_merge(base.other, over.other),
    }
}

/// Deep-merge `override_` onto `base`, producing a fresh value — the
/// source documents are never mutated (spec §3 lifecycle).
pub fn merge_saidata(base: Saidata, override_: Saidata) -> Saidata {
    let mut providers = base.providers;
    for (name, over_provider) in override_.providers {
        providers
            .entry(name)
            .and_modify(|existing| {
                let taken = std::mem::take(existing);
                *existing = merge_provider_override(taken, over_provider.clone());
            })
            .or_insert(over_provider);
    }

    Saidata {
        version: replace_if_non_empty(base.version, override_.version),
        metadata: Metadata::merge_onto(base.metadata, override_.metadata),
        resources: merge_resource_collections(base.resources, override_.resources),
        providers,
        compatibility: merge_compatibility(base.compatibility, override_.compatibility),
        requirements: merge_requirements(base.requirements, override_.requirements),
        is_generated: base.is_generated || override_.is_generated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pkg(name: &str, version: &str) -> PackageResource {
        PackageResource {
            name: name.to_string(),
            version: version.to_string(),
        }
    }

    #[test]
    fn merge_by_name_replaces_matching_and_keeps_rest() {
        let base = vec![pkg("apache2", "2.4.58"), pkg("extra", "1.0")];
        let over = vec![pkg("apache2", "2.4.52-1ubuntu4"), pkg("new", "9.9")];
        let merged = merge_by_name(base, over, PackageResource::merge_fields);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0].version, "2.4.52-1ubuntu4");
        assert_eq!(merged[1].name, "extra");
        assert_eq!(merged[2].name, "new");
    }

    #[test]
    fn merge_with_empty_override_is_identity() {
        let base = Saidata {
            metadata: Metadata {
                name: "nginx".into(),
                ..Default::default()
            },
            resources: ResourceCollections {
                packages: vec![pkg("nginx", "1.0")],
                ..Default::default()
            },
            ..Default::default()
        };
        let merged = merge_saidata(base.clone(), Saidata::default());
        assert_eq!(merged, base);
    }

    #[test]
    fn merge_is_idempotent_against_self() {
        let base = Saidata {
            metadata: Metadata {
                name: "nginx".into(),
                ..Default::default()
            },
            resources: ResourceCollections {
                packages: vec![pkg("nginx", "1.0")],
                ..Default::default()
            },
            ..Default::default()
        };
        let merged = merge_saidata(base.clone(), base.clone());
        assert_eq!(merged, base);
    }

    #[test]
    fn merge_is_associative_left_to_right() {
        let base = Saidata {
            resources: ResourceCollections {
                packages: vec![pkg("apache2", "2.4.58")],
                ..Default::default()
            },
            ..Default::default()
        };
        let o1 = Saidata {
            resources: ResourceCollections {
                packages: vec![pkg("apache2", "2.4.60")],
                ..Default::default()
            },
            ..Default::default()
        };
        let o2 = Saidata {
            resources: ResourceCollections {
                packages: vec![pkg("apache2", "2.4.52-1ubuntu4")],
                ..Default::default()
            },
            ..Default::default()
        };
        let left_to_right = merge_saidata(merge_saidata(base.clone(), o1.clone()), o2.clone());
        assert_eq!(
            left_to_right.resources.packages[0].version,
            "2.4.52-1ubuntu4"
        );
    }
}
