//! Core data model, error taxonomy and merge machinery shared by every
//! sai component (spec §3 DATA MODEL).

pub mod error;
pub mod merge;
pub mod platform;
pub mod provider;
pub mod result;
pub mod saidata;

pub use error::{ErrorKind, Result, SaiError};
pub use provider::{Action, OnFailure, Provider, ProviderType, Step, ValidationSpec};
pub use result::{ActionResult, Change, SafetyCheck, SafetyResult};
pub use saidata::{
    Compatibility, ContainerResource, DirectoryResource, FileResource, FileType, Metadata, Named,
    PackageResource, PortResource, ProviderOverride, Repository, Requirements,
    ResourceCollections, Saidata, ServiceResource, ServiceType, Urls, SCHEMA_VERSION,
};
