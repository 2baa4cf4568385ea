use std::env;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};

pub const PAGE_CONFIG_FILE: &str = "conf.json";

#[derive(Debug, Default, Deserialize, Serialize, Clone, PartialEq)]
pub struct ConfigFile {
    pub url: Option<String>,
    #[serde(alias = "db", default, deserialize_with = "string_or_number")]
    pub database: Option<String>,
    pub timeout: Option<usize>,
    pub workers: Option<usize>,
    pub proxy: Option<String>,
    pub header: Option<String>,
    pub output: Option<String>,
    pub output_format: Option<String>,
    pub detail_page: Option<String>,
    pub no_color: Option<bool>,
    pub log_level: Option<String>,
    pub log_file: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Number(serde_json::Number),
}

// dserve database names are numeric, and conf.json often writes them bare
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(
        Option::<StringOrNumber>::deserialize(deserializer)?.map(|v| match v {
            StringOrNumber::String(s) => s,
            StringOrNumber::Number(n) => n.to_string(),
        }),
    )
}

fn home_dir() -> Option<PathBuf> {
    env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(|| env::var_os("USERPROFILE").map(PathBuf::from))
        .or_else(|| {
            let drive = env::var_os("HOMEDRIVE")?;
            let path = env::var_os("HOMEPATH")?;
            Some(PathBuf::from(drive).join(path))
        })
}

pub fn default_config_path() -> Option<PathBuf> {
    Some(home_dir()?.join(".dserve-admin").join("config.yml"))
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\")) {
        if let Some(home) = home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

pub fn expand_tilde_string(path: &str) -> String {
    expand_tilde(path).to_string_lossy().to_string()
}

fn is_json_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

pub fn parse_config(contents: &str, json: bool) -> Result<ConfigFile, String> {
    if json {
        serde_json::from_str::<ConfigFile>(contents).map_err(|e| e.to_string())
    } else {
        serde_yaml::from_str::<ConfigFile>(contents).map_err(|e| e.to_string())
    }
}

pub fn load_config(path: &Path, allow_missing: bool) -> Result<ConfigFile, String> {
    match std::fs::read_to_string(path) {
        Ok(contents) => parse_config(&contents, is_json_path(path))
            .map_err(|e| format!("failed to parse config '{}': {e}", path.display())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && allow_missing => {
            Ok(ConfigFile::default())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(format!("config file not found '{}'", path.display()))
        }
        Err(e) => Err(format!("failed to read config '{}': {e}", path.display())),
    }
}

/// Picks the config to load: an explicit path must exist, otherwise a
/// `conf.json` in the working directory, otherwise the optional user config.
pub fn resolve_config(explicit: Option<&str>, cwd: &Path) -> Result<ConfigFile, String> {
    if let Some(path) = explicit {
        return load_config(&expand_tilde(path), false);
    }
    let page_config = cwd.join(PAGE_CONFIG_FILE);
    if page_config.is_file() {
        return load_config(&page_config, false);
    }
    match default_config_path() {
        Some(path) => load_config(&path, true),
        None => Ok(ConfigFile::default()),
    }
}

fn default_config_yaml() -> String {
    r#"# dserve-admin config
#
# Location (default):
#   ~/.dserve-admin/config.yml
# A conf.json ({"url": ..., "database": ...}) in the working directory is
# picked up instead when present.

# API
url: http://localhost/cgi-bin/dserve
database: "1000"

# HTTP (optional)
timeout: 10
# proxy: http://127.0.0.1:8080
# header: "Key: Value"

# Runtime
workers: 2

# Output (optional)
# output: ./index.html
# output_format: html
detail_page: html/data.html
no_color: false

# Logging (optional)
# log_level: dserve_admin=debug
# log_file: ./dserve-admin.log
"#
    .to_string()
}

pub fn ensure_default_config_file(path: &Path) -> Result<bool, String> {
    if path.exists() {
        return Ok(false);
    }
    let parent = path
        .parent()
        .ok_or_else(|| format!("invalid config path '{}'", path.display()))?;
    if !parent.as_os_str().is_empty() {
        std::fs::create_dir_all(parent).map_err(|e| {
            format!(
                "failed to create config directory '{}': {e}",
                parent.display()
            )
        })?;
    }
    let contents = default_config_yaml();
    std::fs::write(path, contents)
        .map_err(|e| format!("failed to write config file '{}': {e}", path.display()))?;
    Ok(true)
}
