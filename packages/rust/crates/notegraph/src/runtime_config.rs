//! Runtime settings loader.
//!
//! Loads and merges, later entries winning:
//! - System defaults: `packages/conf/notegraph.yaml` (embedded at build time)
//! - User overrides:  `<config_home>/notegraph.yaml`, or an explicit file
//! - Environment:     `NOTEGRAPH_STORE_BACKEND`, `NOTEGRAPH_STORE_PATH`
//!
//! The config home also holds the workspace descriptor and the default
//! graph index database.

use std::path::{Path, PathBuf};

use serde_yaml::{Mapping, Value};

use crate::error::{NoteGraphError, Result};
use crate::link_graph::{GraphStoreBackend, GraphStoreConfig};
use crate::workspace::DEFAULT_DESCRIPTOR_FILE;

const SYSTEM_SETTINGS_YAML: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../../../conf/notegraph.yaml"
));
const USER_SETTINGS_FILE: &str = "notegraph.yaml";
const DEFAULT_STORE_FILE: &str = "notegraph.sqlite3";
const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Config home directory override.
pub const CONFIG_HOME_ENV: &str = "NOTEGRAPH_CONFIG_HOME";
/// Graph index backend override (`sqlite` or `memory`).
pub const STORE_BACKEND_ENV: &str = "NOTEGRAPH_STORE_BACKEND";
/// Graph index database path override.
pub const STORE_PATH_ENV: &str = "NOTEGRAPH_STORE_PATH";

/// Explicit locations supplied by the caller (CLI flags).
#[derive(Debug, Clone, Default)]
pub struct SettingsSources {
    /// Config home; wins over `NOTEGRAPH_CONFIG_HOME`.
    pub config_home: Option<PathBuf>,
    /// Settings file used instead of `<config_home>/notegraph.yaml`.
    pub config_file: Option<PathBuf>,
}

/// Resolved runtime settings.
#[derive(Debug, Clone)]
pub struct NoteGraphSettings {
    /// Directory holding descriptor, settings and default database.
    pub config_home: PathBuf,
    /// Workspace descriptor file.
    pub descriptor_path: PathBuf,
    /// Graph index backend.
    pub store: GraphStoreConfig,
    /// Event bus capacity.
    pub event_capacity: usize,
}

impl NoteGraphSettings {
    /// Resolve settings from files and the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error for an unreadable or malformed settings file, or an
    /// unknown store backend.
    pub fn load(sources: &SettingsSources) -> Result<Self> {
        Self::load_with_env(sources, |key| std::env::var(key).ok())
    }

    /// Resolve settings with an injected environment lookup.
    ///
    /// # Errors
    ///
    /// See [`NoteGraphSettings::load`].
    pub fn load_with_env(
        sources: &SettingsSources,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let config_home = resolve_config_home(sources.config_home.as_deref(), &env);

        let mut merged = parse_yaml(SYSTEM_SETTINGS_YAML, Path::new("<embedded defaults>"))?;
        match &sources.config_file {
            Some(explicit) => {
                let content = std::fs::read_to_string(explicit).map_err(|e| {
                    NoteGraphError::Settings {
                        path: explicit.clone(),
                        message: e.to_string(),
                    }
                })?;
                deep_merge(&mut merged, parse_yaml(&content, explicit)?);
            }
            None => {
                let user_path = config_home.join(USER_SETTINGS_FILE);
                if let Some(user) = read_optional_yaml(&user_path)? {
                    deep_merge(&mut merged, user);
                }
            }
        }

        Self::from_merged(config_home, &merged, &env)
    }

    fn from_merged(
        config_home: PathBuf,
        merged: &Value,
        env: &impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let backend_name = first_non_empty(&[
            env(STORE_BACKEND_ENV),
            get_setting_string(merged, "store.backend"),
        ])
        .unwrap_or_else(|| "sqlite".to_string());
        let store_path = first_non_empty(&[
            env(STORE_PATH_ENV),
            get_setting_string(merged, "store.path"),
        ])
        .unwrap_or_else(|| DEFAULT_STORE_FILE.to_string());

        let backend = match backend_name.to_lowercase().as_str() {
            "memory" => GraphStoreBackend::Memory,
            "sqlite" => GraphStoreBackend::Sqlite {
                path: resolve_under(&config_home, &store_path),
            },
            other => {
                return Err(NoteGraphError::Settings {
                    path: config_home,
                    message: format!("unknown store backend '{other}' (expected sqlite or memory)"),
                });
            }
        };

        let descriptor_file = get_setting_string(merged, "descriptor.file")
            .unwrap_or_else(|| DEFAULT_DESCRIPTOR_FILE.to_string());
        let event_capacity = get_setting_string(merged, "events.capacity")
            .and_then(|raw| raw.trim().parse::<usize>().ok())
            .filter(|value| *value > 0)
            .unwrap_or(DEFAULT_EVENT_CAPACITY);

        Ok(Self {
            descriptor_path: resolve_under(&config_home, &descriptor_file),
            config_home,
            store: GraphStoreConfig { backend },
            event_capacity,
        })
    }
}

fn resolve_config_home(explicit: Option<&Path>, env: &impl Fn(&str) -> Option<String>) -> PathBuf {
    if let Some(path) = explicit {
        return absolutize(path);
    }
    if let Some(raw) = env(CONFIG_HOME_ENV) {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return absolutize(Path::new(trimmed));
        }
    }
    dirs::config_dir().map_or_else(
        || absolutize(Path::new(".config/notegraph")),
        |dir| dir.join("notegraph"),
    )
}

fn absolutize(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    }
}

fn resolve_under(base: &Path, raw: &str) -> PathBuf {
    let candidate = PathBuf::from(raw.trim());
    if candidate.is_absolute() {
        candidate
    } else {
        base.join(candidate)
    }
}

fn parse_yaml(content: &str, origin: &Path) -> Result<Value> {
    let value: Value = serde_yaml::from_str(content).map_err(|e| NoteGraphError::Settings {
        path: origin.to_path_buf(),
        message: e.to_string(),
    })?;
    // An empty document parses as null.
    Ok(match value {
        Value::Null => Value::Mapping(Mapping::new()),
        other => other,
    })
}

fn read_optional_yaml(path: &Path) -> Result<Option<Value>> {
    match std::fs::read_to_string(path) {
        Ok(content) => parse_yaml(&content, path).map(Some),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(NoteGraphError::Settings {
            path: path.to_path_buf(),
            message: e.to_string(),
        }),
    }
}

fn deep_merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            for (key, value) in overlay_map {
                if let Some(existing) = base_map.get_mut(&key) {
                    deep_merge(existing, value);
                } else {
                    base_map.insert(key, value);
                }
            }
        }
        (base_value, overlay_value) => {
            *base_value = overlay_value;
        }
    }
}

fn first_non_empty(values: &[Option<String>]) -> Option<String> {
    values.iter().flatten().find_map(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn get_setting_value<'a>(settings: &'a Value, dotted_key: &str) -> Option<&'a Value> {
    let mut cursor = settings;
    for segment in dotted_key.split('.') {
        match cursor {
            Value::Mapping(map) => {
                let key = Value::String(segment.to_string());
                cursor = map.get(&key)?;
            }
            _ => return None,
        }
    }
    Some(cursor)
}

fn get_setting_string(settings: &Value, dotted_key: &str) -> Option<String> {
    match get_setting_value(settings, dotted_key)? {
        Value::String(value) => Some(value.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_resolve_under_config_home() -> Result<()> {
        let sources = SettingsSources {
            config_home: Some(PathBuf::from("/cfg/notegraph")),
            config_file: None,
        };
        let settings = NoteGraphSettings::load_with_env(&sources, env_from(&[]))?;
        assert_eq!(settings.config_home, PathBuf::from("/cfg/notegraph"));
        assert_eq!(
            settings.descriptor_path,
            PathBuf::from("/cfg/notegraph/workspace.json")
        );
        assert_eq!(
            settings.store.backend,
            GraphStoreBackend::Sqlite {
                path: PathBuf::from("/cfg/notegraph/notegraph.sqlite3")
            }
        );
        assert_eq!(settings.event_capacity, 256);
        Ok(())
    }

    #[test]
    fn test_user_file_then_env_override() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let tmp = tempfile::TempDir::new()?;
        std::fs::write(
            tmp.path().join(USER_SETTINGS_FILE),
            "store:\n  path: /var/graph.db\nevents:\n  capacity: 8\n",
        )?;
        let sources = SettingsSources {
            config_home: Some(tmp.path().to_path_buf()),
            config_file: None,
        };

        let settings = NoteGraphSettings::load_with_env(&sources, env_from(&[]))?;
        assert_eq!(
            settings.store.backend,
            GraphStoreBackend::Sqlite {
                path: PathBuf::from("/var/graph.db")
            }
        );
        assert_eq!(settings.event_capacity, 8);

        let settings =
            NoteGraphSettings::load_with_env(&sources, env_from(&[(STORE_BACKEND_ENV, "memory")]))?;
        assert_eq!(settings.store.backend, GraphStoreBackend::Memory);
        Ok(())
    }

    #[test]
    fn test_config_home_from_env() -> Result<()> {
        let settings = NoteGraphSettings::load_with_env(
            &SettingsSources::default(),
            env_from(&[(CONFIG_HOME_ENV, "/env/home")]),
        )?;
        assert_eq!(settings.config_home, PathBuf::from("/env/home"));
        Ok(())
    }

    #[test]
    fn test_unknown_backend_is_rejected() {
        let sources = SettingsSources {
            config_home: Some(PathBuf::from("/cfg")),
            config_file: None,
        };
        let outcome =
            NoteGraphSettings::load_with_env(&sources, env_from(&[(STORE_BACKEND_ENV, "lance")]));
        assert!(matches!(outcome, Err(NoteGraphError::Settings { .. })));
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let sources = SettingsSources {
            config_home: Some(PathBuf::from("/cfg")),
            config_file: Some(PathBuf::from("/no/such/notegraph.yaml")),
        };
        let outcome = NoteGraphSettings::load_with_env(&sources, env_from(&[]));
        assert!(matches!(outcome, Err(NoteGraphError::Settings { .. })));
    }

    #[test]
    fn test_deep_merge_keeps_sibling_keys() -> Result<()> {
        let mut base = parse_yaml("store:\n  backend: sqlite\n  path: a.db\n", Path::new("a"))?;
        deep_merge(&mut base, parse_yaml("store:\n  path: b.db\n", Path::new("b"))?);
        assert_eq!(get_setting_string(&base, "store.backend").as_deref(), Some("sqlite"));
        assert_eq!(get_setting_string(&base, "store.path").as_deref(), Some("b.db"));
        Ok(())
    }
}
