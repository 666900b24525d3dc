//! Current-platform tag used by Provider availability filtering (spec §4.3).

/// Coarse platform tag: `"linux"`, `"macos"`, or `"windows"`. Providers
/// declare membership in this set via their `platforms` field.
pub fn current_platform() -> &'static str {
    if cfg!(target_os = "linux") {
        "linux"
    } else if cfg!(target_os = "macos") {
        "macos"
    } else if cfg!(target_os = "windows") {
        "windows"
    } else {
        "unknown"
    }
}
