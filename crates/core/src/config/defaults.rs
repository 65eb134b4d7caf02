//! Default values and functions for configuration

// Default constants
pub(crate) const DEFAULT_FIXTURES_ROOT: &str = "fixtures";
pub(crate) const DEFAULT_BASE_URL: &str = "http://localhost:8080";
pub(crate) const DEFAULT_CSRF_HEADER: &str = "X-CSRF-TOKEN";
pub(crate) const DEFAULT_CONFIG_FILE: &str = "moxter.toml";

pub(crate) fn default_fixtures_root() -> String {
    DEFAULT_FIXTURES_ROOT.to_string()
}

pub(crate) fn default_file_names() -> Vec<String> {
    vec![
        "fixtures.yaml".to_string(),
        "fixtures.yml".to_string(),
        "moxtures.yaml".to_string(),
        "moxtures.yml".to_string(),
    ]
}

pub(crate) fn default_strict() -> bool {
    true
}

pub(crate) fn default_strict_vars() -> bool {
    true
}

pub(crate) fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

pub(crate) fn default_timeout_secs() -> u64 {
    30
}

pub(crate) fn default_csrf_header() -> String {
    DEFAULT_CSRF_HEADER.to_string()
}
