use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::TunnelError;
use crate::tunnel::{DEFAULT_KEEPALIVE, DEFAULT_PORT, Mode};

/// Last-used wizard answers. Every field is optional: a key that is missing
/// or holds the wrong kind of value never fails the whole profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistedProfile {
    #[serde(rename = "modo", alias = "mode", deserialize_with = "lenient_mode", skip_serializing_if = "Option::is_none")]
    pub mode: Option<Mode>,
    #[serde(deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(rename = "usuario", alias = "user", deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(rename = "puerto", alias = "port", deserialize_with = "lenient_port", skip_serializing_if = "Option::is_none")]
    pub port: Option<u32>,
    #[serde(
        rename = "archivo_identidad",
        alias = "identityFile",
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub identity_file: Option<String>,
    #[serde(rename = "sin_pty", alias = "disablePty", deserialize_with = "lenient_bool", skip_serializing_if = "Option::is_none")]
    pub disable_pty: Option<bool>,
    #[serde(alias = "keepaliveSeconds", deserialize_with = "lenient_keepalive", skip_serializing_if = "Option::is_none")]
    pub keepalive: Option<u32>,
    #[serde(rename = "args_ssh_extra", alias = "extraArgs", deserialize_with = "lenient_list", skip_serializing_if = "Option::is_none")]
    pub extra_args: Option<Vec<String>>,
    #[serde(rename = "reenvio", deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub forward: Option<String>,
    #[serde(
        rename = "en_segundo_plano",
        alias = "background",
        deserialize_with = "lenient_bool",
        skip_serializing_if = "Option::is_none"
    )]
    pub background: Option<bool>,
    #[serde(rename = "comando", alias = "command", deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
}

/// Read an integer setting: JSON integers pass through, digit-only strings
/// are parsed, anything else falls back to `default`.
pub fn coerce_int(raw: &Value, default: u32) -> u32 {
    let parsed = match raw {
        Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        Value::String(s) => {
            let s = s.trim();
            if !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()) {
                s.parse().ok()
            } else {
                None
            }
        }
        _ => None,
    };
    parsed.unwrap_or(default)
}

// A present but unusable number decodes to the field default.
fn lenient_port<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u32>, D::Error> {
    Ok(Some(coerce_int(&Value::deserialize(d)?, DEFAULT_PORT)))
}

fn lenient_keepalive<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u32>, D::Error> {
    Ok(Some(coerce_int(&Value::deserialize(d)?, DEFAULT_KEEPALIVE)))
}

/// Empty strings count as unset.
fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) if !s.is_empty() => Some(s),
        _ => None,
    })
}

/// Any value counts as a flag: zero, empty and null are false.
fn lenient_bool<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Null => None,
        Value::Bool(b) => Some(b),
        Value::Number(n) => Some(n.as_f64().is_some_and(|v| v != 0.0)),
        Value::String(s) => Some(!s.is_empty()),
        Value::Array(items) => Some(!items.is_empty()),
        Value::Object(map) => Some(!map.is_empty()),
    })
}

fn lenient_mode<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Mode>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => s.parse().ok(),
        _ => None,
    })
}

/// Non-string entries are dropped rather than rejecting the whole list.
fn lenient_list<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<String>>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Array(items) => Some(
            items
                .into_iter()
                .filter_map(|v| match v {
                    Value::String(s) => Some(s),
                    _ => None,
                })
                .collect(),
        ),
        _ => None,
    })
}

/// Location of the profile: ~/.config/tuneladorassh/config.json
pub fn default_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".config").join("tuneladorassh").join("config.json"))
}

/// Reads and rewrites the persisted profile. There is no locking; the last
/// writer wins.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: Option<PathBuf>,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// Store at the default location. Without a home directory, loads come
    /// back empty and saves fail.
    pub fn open_default() -> Self {
        Self {
            path: default_path(),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Load the profile, falling back to an empty one on any error.
    pub fn load(&self) -> PersistedProfile {
        let path = match self.path {
            Some(ref p) => p,
            None => return PersistedProfile::default(),
        };
        if !path.exists() {
            return PersistedProfile::default();
        }
        match fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_default(),
            Err(_) => PersistedProfile::default(),
        }
    }

    /// Replace the stored profile with `profile`, creating the directory if needed.
    pub fn save(&self, profile: &PersistedProfile) -> Result<(), TunnelError> {
        let path = self.path.clone().ok_or_else(|| TunnelError::Persist {
            path: PathBuf::from("~/.config/tuneladorassh/config.json"),
            source: io::Error::new(io::ErrorKind::NotFound, "cannot determine home directory"),
        })?;
        let persist_err = |source: io::Error| TunnelError::Persist {
            path: path.clone(),
            source,
        };

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(persist_err)?;
        }
        let content = serde_json::to_string_pretty(profile).map_err(|e| persist_err(e.into()))?;
        fs::write(&path, content).map_err(persist_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store_in(dir: &tempfile::TempDir) -> ConfigStore {
        ConfigStore::new(dir.path().join("tuneladorassh").join("config.json"))
    }

    fn full_profile() -> PersistedProfile {
        PersistedProfile {
            mode: Some(Mode::Remote),
            host: Some("10.0.0.5".to_string()),
            user: Some("debian".to_string()),
            port: Some(2222),
            identity_file: Some("~/.ssh/id_rsa".to_string()),
            disable_pty: Some(true),
            keepalive: Some(45),
            extra_args: Some(vec!["-v".to_string(), "-C".to_string()]),
            forward: Some("9090:127.0.0.1:22".to_string()),
            background: Some(true),
            command: Some("uptime".to_string()),
        }
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let profile = full_profile();
        store.save(&profile).unwrap();
        assert_eq!(store.load(), profile);
    }

    #[test]
    fn save_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("a").join("b").join("config.json"));
        store.save(&PersistedProfile::default()).unwrap();
        assert!(store.path().unwrap().exists());
    }

    #[test]
    fn save_rewrites_wholesale() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.save(&full_profile()).unwrap();
        let smaller = PersistedProfile {
            host: Some("example.org".to_string()),
            ..Default::default()
        };
        store.save(&smaller).unwrap();
        assert_eq!(store.load(), smaller);
    }

    #[test]
    fn writes_legacy_key_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.save(&full_profile()).unwrap();
        let raw: Value = serde_json::from_str(&fs::read_to_string(store.path().unwrap()).unwrap()).unwrap();
        assert_eq!(raw["modo"], "remoto");
        assert_eq!(raw["usuario"], "debian");
        assert_eq!(raw["puerto"], 2222);
        assert_eq!(raw["archivo_identidad"], "~/.ssh/id_rsa");
        assert_eq!(raw["sin_pty"], true);
        assert_eq!(raw["keepalive"], 45);
        assert_eq!(raw["args_ssh_extra"], json!(["-v", "-C"]));
        assert_eq!(raw["reenvio"], "9090:127.0.0.1:22");
        assert_eq!(raw["en_segundo_plano"], true);
        assert_eq!(raw["comando"], "uptime");
    }

    #[test]
    fn missing_file_is_empty_profile() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(store_in(&dir).load(), PersistedProfile::default());
    }

    #[test]
    fn corrupt_file_is_empty_profile() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        for content in ["{not json", "", "42", "\"text\"", "null"] {
            fs::create_dir_all(store.path().unwrap().parent().unwrap()).unwrap();
            fs::write(store.path().unwrap(), content).unwrap();
            assert_eq!(store.load(), PersistedProfile::default(), "content {content:?}");
        }
    }

    #[test]
    fn directory_in_place_of_file_is_empty_profile() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path());
        assert_eq!(store.load(), PersistedProfile::default());
    }

    #[test]
    fn wrong_typed_fields_fall_back_individually() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let content = json!({
            "modo": "tunel",
            "host": 12,
            "usuario": "",
            "puerto": "2200",
            "keepalive": "soon",
            "sin_pty": "yes",
            "args_ssh_extra": ["-v", 3, "-C"],
            "reenvio": "1080",
            "unknown_key": {"nested": true}
        });
        fs::create_dir_all(store.path().unwrap().parent().unwrap()).unwrap();
        fs::write(store.path().unwrap(), content.to_string()).unwrap();

        let profile = store.load();
        assert_eq!(profile.mode, None);
        assert_eq!(profile.host, None);
        assert_eq!(profile.user, None);
        assert_eq!(profile.port, Some(2200));
        assert_eq!(profile.keepalive, Some(30));
        assert_eq!(profile.disable_pty, Some(true));
        assert_eq!(profile.extra_args, Some(vec!["-v".to_string(), "-C".to_string()]));
        assert_eq!(profile.forward.as_deref(), Some("1080"));
    }

    #[test]
    fn flags_decode_by_truthiness() {
        let decode = |v: Value| -> Option<bool> {
            serde_json::from_value::<PersistedProfile>(json!({ "sin_pty": v }))
                .unwrap()
                .disable_pty
        };
        assert_eq!(decode(json!(true)), Some(true));
        assert_eq!(decode(json!(1)), Some(true));
        assert_eq!(decode(json!(0)), Some(false));
        assert_eq!(decode(json!("no")), Some(true));
        assert_eq!(decode(json!("")), Some(false));
        assert_eq!(decode(json!([])), Some(false));
        assert_eq!(decode(json!(null)), None);
    }

    #[test]
    fn english_keys_are_accepted() {
        let profile: PersistedProfile = serde_json::from_value(json!({
            "mode": "remote",
            "user": "ubuntu",
            "port": 2022,
            "keepaliveSeconds": 10,
            "disablePty": true,
            "extraArgs": ["-4"],
            "background": false,
            "command": "id"
        }))
        .unwrap();
        assert_eq!(profile.mode, Some(Mode::Remote));
        assert_eq!(profile.user.as_deref(), Some("ubuntu"));
        assert_eq!(profile.port, Some(2022));
        assert_eq!(profile.keepalive, Some(10));
        assert_eq!(profile.disable_pty, Some(true));
        assert_eq!(profile.extra_args, Some(vec!["-4".to_string()]));
        assert_eq!(profile.background, Some(false));
        assert_eq!(profile.command.as_deref(), Some("id"));
    }

    #[test]
    fn coerce_int_rules() {
        assert_eq!(coerce_int(&json!(2222), 22), 2222);
        assert_eq!(coerce_int(&json!("2222"), 22), 2222);
        assert_eq!(coerce_int(&json!(" 45 "), 30), 45);
        assert_eq!(coerce_int(&json!("-5"), 30), 30);
        assert_eq!(coerce_int(&json!("12a"), 30), 30);
        assert_eq!(coerce_int(&json!(""), 30), 30);
        assert_eq!(coerce_int(&json!(1.5), 22), 22);
        assert_eq!(coerce_int(&json!(null), 22), 22);
        assert_eq!(coerce_int(&json!(true), 22), 22);
        assert_eq!(coerce_int(&json!([1]), 22), 22);
    }

    #[test]
    fn save_without_home_fails_with_persist_error() {
        let store = ConfigStore { path: None };
        assert!(matches!(
            store.save(&PersistedProfile::default()),
            Err(TunnelError::Persist { .. })
        ));
        assert_eq!(store.load(), PersistedProfile::default());
    }
}
