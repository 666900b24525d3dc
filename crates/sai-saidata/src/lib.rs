//! Saidata resolution (spec §4.4 SaidataStore, §4.5 DefaultsGenerator).

pub mod defaults;
pub mod os;
pub mod store;

pub use os::{detect_host_os, HostOs};
pub use store::{prefix, SaidataStore};
