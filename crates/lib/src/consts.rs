/// Name of the host, used for the host-specific entry candidate and the project file.
pub const APP_NAME: &str = "modkit";

/// Default project file evaluated by the CLI.
pub const PROJECT_FILE: &str = "modkit.lua";

/// Directory segment marking vendored (third-party) code.
pub const VENDOR_DIR: &str = "lua_modules";

/// Sidecar metadata file shipped next to a module entry.
pub const SIDECAR_FILE: &str = "module.json";

/// Generic module entry candidate, tried after the host-specific one.
pub const MODULE_ENTRY: &str = "module";

/// Per-layer module directory when the layer does not override it.
pub const DEFAULT_LAYER_MODULES_DIR: &str = "modules";
