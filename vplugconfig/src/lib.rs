//! # VPlug Configuration Module
//!
//! YAML configuration of VPlug: host settings (bind address, logger, SSDP
//! listener) and the persisted identity records of the virtual plugs.
//! An embedded default document is overlaid with the user's `config.yaml`
//! and with `VPLUG_CONFIG__*` environment variables.
//!
//! ## Usage
//!
//! ```no_run
//! use vplugconfig::Config;
//!
//! let config = Config::load_config("")?;
//!
//! // Access configuration values
//! let ip = config.get_server_ip();
//! let devices = config.get_devices()?;
//!
//! // Create a fresh set of devices
//! config.create_devices(&["kitchen", "porch"], 11000)?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{anyhow, Context, Result};
use dirs::home_dir;
use serde_yaml::{Mapping, Value};
use std::{env, fs, path::Path, sync::Mutex};
use tracing::info;
use vplugutils::guess_local_ip;

mod device;

pub use device::{DeviceRecord, short_id_of};

// Configuration par défaut intégrée
const DEFAULT_CONFIG: &str = include_str!("vplug.yaml");

const ENV_CONFIG_DIR: &str = "VPLUG_CONFIG";
const ENV_PREFIX: &str = "VPLUG_CONFIG__";
const DEFAULT_CONFIG_DIR: &str = ".vplug";

// Default values for configuration
/// Premier port de contrôle attribué aux devices créés.
pub const DEFAULT_BASE_PORT: u16 = 11000;
const DEFAULT_LOG_MIN_LEVEL: &str = "INFO";
const DEFAULT_LOG_ENABLE_CONSOLE: bool = true;
const DEFAULT_LOG_JSON: bool = false;
const DEFAULT_EVENT_BUFFER: usize = 256;
const DEFAULT_MULTICAST_INTERFACE: &str = "0.0.0.0";
const DEFAULT_SSDP_ERROR_BACKOFF_MS: usize = 100;

/// Macro to generate a getter for usize values with default
macro_rules! impl_usize_config {
    ($getter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> Result<usize> {
            match self.get_value($path) {
                Ok(Value::Number(n)) => Ok(n.as_u64().map(|v| v as usize).unwrap_or($default)),
                _ => Ok($default),
            }
        }
    };
}

/// Macro to generate a getter for bool values with default
macro_rules! impl_bool_config {
    ($getter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> Result<bool> {
            match self.get_value($path) {
                Ok(Value::Bool(b)) => Ok(b),
                _ => Ok($default),
            }
        }
    };
}

/// In-memory copy of `config.yaml`
///
/// Every write saves the whole document back to disk.
#[derive(Debug)]
pub struct Config {
    config_dir: String,
    path: String,
    data: Mutex<Value>,
}

impl Config {
    /// Returns the first usable config directory candidate
    fn find_config_dir(directory: &str) -> String {
        if !directory.is_empty() {
            return directory.to_string();
        }

        if let Ok(env_path) = env::var(ENV_CONFIG_DIR) {
            info!(env_var = ENV_CONFIG_DIR, path = %env_path, "Config directory taken from env");
            return env_path;
        }

        let home_candidate = home_dir().map(|home| home.join(DEFAULT_CONFIG_DIR));

        std::iter::once(Path::new(DEFAULT_CONFIG_DIR).to_path_buf())
            .chain(home_candidate)
            .find(|candidate| candidate.is_dir())
            .map(|found| found.to_string_lossy().into_owned())
            .unwrap_or_else(|| DEFAULT_CONFIG_DIR.to_string())
    }

    /// Validates and prepares a config directory
    fn validate_config_dir(path: &Path) -> Result<()> {
        if !path.exists() {
            fs::create_dir_all(path)?;
        }

        if !path.is_dir() {
            return Err(anyhow!("{} is not a directory", path.display()));
        }

        // Test write permission
        let test_file = path.join(".write_test");
        fs::write(&test_file, b"test")?;
        fs::remove_file(&test_file)?;

        // Test read permission
        fs::read_dir(path)?;

        Ok(())
    }

    /// Determines and validates the configuration directory
    ///
    /// The directory is searched in the following order:
    /// 1. The provided `directory` parameter if not empty
    /// 2. The `VPLUG_CONFIG` environment variable
    /// 3. `.vplug` in the current directory
    /// 4. `.vplug` in the user's home directory
    ///
    /// The directory is created if it doesn't exist, and validated for read/write permissions.
    pub fn config_dir(directory: &str) -> Result<String> {
        let dir_path = Self::find_config_dir(directory);
        let path = Path::new(&dir_path);

        Self::validate_config_dir(path)
            .with_context(|| format!("Invalid configuration directory {}", dir_path))?;

        Ok(dir_path)
    }

    /// Loads `config.yaml` from `directory` (empty for the default search)
    ///
    /// The embedded defaults are overlaid with the user file, keys are
    /// lowercased, `VPLUG_CONFIG__*` variables are applied and the result is
    /// written back so that new default keys appear in the user file.
    pub fn load_config(directory: &str) -> Result<Self> {
        let config_dir = Self::config_dir(directory)?;
        info!(config_dir=%config_dir, "Using config directory");

        let config_file_path = Path::new(&config_dir).join("config.yaml");
        let path = config_file_path.to_string_lossy().to_string();

        let mut default_value: Value = serde_yaml::from_str(DEFAULT_CONFIG)?;

        let yaml_data = if let Ok(data) = fs::read(&path) {
            info!(config_file=%path, "Loaded config file");
            data
        } else {
            info!(config_file=%path, "Config file not found, using default embedded config");
            DEFAULT_CONFIG.as_bytes().to_vec()
        };

        let external_value: Value = serde_yaml::from_slice(&yaml_data)
            .with_context(|| format!("Malformed configuration file {}", path))?;
        merge_yaml(&mut default_value, &external_value);
        let mut config_value = lowercase_keys(default_value);

        Self::apply_env_overrides(&mut config_value);

        let config = Config {
            config_dir,
            path,
            data: Mutex::new(config_value),
        };

        config.save()?;
        Ok(config)
    }

    /// Répertoire de configuration effectivement utilisé
    pub fn directory(&self) -> &str {
        &self.config_dir
    }

    /// Chemin du fichier config.yaml
    pub fn file_path(&self) -> &str {
        &self.path
    }

    fn lock_data(&self) -> Result<std::sync::MutexGuard<'_, Value>> {
        self.data
            .lock()
            .map_err(|_| anyhow!("Configuration lock poisoned"))
    }

    /// Saves the current configuration to the config.yaml file
    pub fn save(&self) -> Result<()> {
        let data = self.lock_data()?;
        let yaml = serde_yaml::to_string(&*data)?;
        fs::write(&self.path, yaml).with_context(|| format!("Cannot write {}", self.path))?;
        Ok(())
    }

    /// Sets the value at `path` (e.g. `&["host", "server_ip"]`) and saves
    pub fn set_value(&self, path: &[&str], value: Value) -> Result<()> {
        insert_at(&mut *self.lock_data()?, path, value)?;
        self.save()
    }

    /// Returns a copy of the value at `path`
    ///
    /// # Errors
    ///
    /// Fails when a key of the path is missing or crosses a non-mapping node.
    pub fn get_value(&self, path: &[&str]) -> Result<Value> {
        lookup(&*self.lock_data()?, path).cloned()
    }

    /// Applies every `VPLUG_CONFIG__A__B=value` variable of the environment
    fn apply_env_overrides(config: &mut Value) {
        let overrides = env::vars().filter_map(|(key, value)| {
            key.strip_prefix(ENV_PREFIX)
                .map(|path| (path.to_string(), parse_env_value(&value)))
        });

        for (path, value) in overrides {
            let path: Vec<&str> = path.split("__").collect();
            if let Err(err) = insert_at(config, &path, value) {
                tracing::warn!("Ignoring override {}: {}", path.join("."), err);
            }
        }
    }

    /// Gets the IP address the virtual devices bind to
    ///
    /// Returns the configured address, or attempts to guess the local IP address if not configured.
    pub fn get_server_ip(&self) -> String {
        match self.get_value(&["host", "server_ip"]) {
            Ok(Value::String(s)) if !s.is_empty() => s,
            Ok(_) => {
                tracing::warn!("Server IP is not configured, guessing local address");
                guess_local_ip()
            }
            Err(err) => {
                tracing::warn!("Failed to get server IP: {}, guessing local address", err);
                guess_local_ip()
            }
        }
    }

    /// Returns the identity records of the configured virtual devices
    ///
    /// # Errors
    ///
    /// Fails if the `devices` section exists but cannot be decoded.
    pub fn get_devices(&self) -> Result<Vec<DeviceRecord>> {
        match self.get_value(&["devices"]) {
            Ok(Value::Null) | Err(_) => Ok(Vec::new()),
            Ok(value) => {
                serde_yaml::from_value(value).context("Malformed devices section in configuration")
            }
        }
    }

    /// Replaces the identity records of the virtual devices and saves them
    pub fn set_devices(&self, devices: &[DeviceRecord]) -> Result<()> {
        let value = serde_yaml::to_value(devices)?;
        self.set_value(&["devices"], value)
    }

    /// Creates one fresh device per name, numbering ports from `base_port`
    ///
    /// The previous device list is replaced. Each device receives a new UUID
    /// so controllers will see them as new plugs.
    pub fn create_devices<S: AsRef<str>>(
        &self,
        names: &[S],
        base_port: u16,
    ) -> Result<Vec<DeviceRecord>> {
        let devices = names
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                let port = u16::try_from(idx)
                    .ok()
                    .and_then(|offset| base_port.checked_add(offset))
                    .ok_or_else(|| anyhow!("No control port left for device {}", name.as_ref()))?;
                Ok(DeviceRecord::generate(name.as_ref(), port))
            })
            .collect::<Result<Vec<_>>>()?;

        self.set_devices(&devices)?;
        info!(count = devices.len(), "✅ Device configuration created");
        Ok(devices)
    }

    /// Appends a new device on the first port after the highest configured one
    pub fn add_device(&self, name: &str) -> Result<DeviceRecord> {
        let mut devices = self.get_devices()?;
        let port = match devices.iter().map(|d| d.port).max() {
            Some(max) => max
                .checked_add(1)
                .ok_or_else(|| anyhow!("No control port left for device {}", name))?,
            None => DEFAULT_BASE_PORT,
        };

        let record = DeviceRecord::generate(name, port);
        devices.push(record.clone());
        self.set_devices(&devices)?;
        Ok(record)
    }

    impl_bool_config!(
        get_log_enable_console,
        &["host", "logger", "enable_console"],
        DEFAULT_LOG_ENABLE_CONSOLE
    );

    impl_bool_config!(
        get_log_json,
        &["host", "logger", "json"],
        DEFAULT_LOG_JSON
    );

    impl_usize_config!(
        get_event_buffer,
        &["host", "logger", "event_buffer"],
        DEFAULT_EVENT_BUFFER
    );

    impl_usize_config!(
        get_ssdp_error_backoff_ms,
        &["host", "ssdp", "error_backoff_ms"],
        DEFAULT_SSDP_ERROR_BACKOFF_MS
    );

    /// Récupère le niveau de log minimum depuis la configuration
    pub fn get_log_min_level(&self) -> Result<String> {
        match self.get_value(&["host", "logger", "min_level"]) {
            Ok(Value::String(s)) => Ok(s),
            _ => Ok(DEFAULT_LOG_MIN_LEVEL.to_string()),
        }
    }

    /// Interface sur laquelle rejoindre le groupe multicast SSDP
    pub fn get_multicast_interface(&self) -> String {
        match self.get_value(&["host", "ssdp", "multicast_interface"]) {
            Ok(Value::String(s)) if !s.is_empty() => s,
            _ => DEFAULT_MULTICAST_INTERFACE.to_string(),
        }
    }
}

/// Recursively merges `external` into `default`
///
/// Mappings are merged key by key; any other node of `external` replaces
/// the default one.
fn merge_yaml(default: &mut Value, external: &Value) {
    match (default, external) {
        (Value::Mapping(defaults), Value::Mapping(overrides)) => {
            for (key, value) in overrides {
                if let Some(slot) = defaults.get_mut(key) {
                    merge_yaml(slot, value);
                } else {
                    defaults.insert(key.clone(), value.clone());
                }
            }
        }
        (slot, value) => *slot = value.clone(),
    }
}

fn lookup<'a>(data: &'a Value, path: &[&str]) -> Result<&'a Value> {
    path.iter().enumerate().try_fold(data, |node, (depth, key)| match node {
        Value::Mapping(map) => map
            .get(&Value::String(key.to_lowercase()))
            .ok_or_else(|| anyhow!("Path {} does not exist", path[..=depth].join("."))),
        _ => Err(anyhow!("Path {} is not a mapping", path[..depth].join("."))),
    })
}

fn insert_at(data: &mut Value, path: &[&str], value: Value) -> Result<()> {
    let Some((key, rest)) = path.split_first() else {
        *data = value;
        return Ok(());
    };

    let Value::Mapping(map) = data else {
        return Err(anyhow!("Cannot set {}: parent is not a mapping", key));
    };

    let key = Value::String(key.to_lowercase());
    if rest.is_empty() {
        map.insert(key, value);
        Ok(())
    } else {
        let child = map.entry(key).or_insert(Value::Mapping(Mapping::new()));
        insert_at(child, rest, value)
    }
}

/// Environment values are read as YAML scalars (`42`, `true`), else as text
fn parse_env_value(raw: &str) -> Value {
    serde_yaml::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn lowercase_keys(value: Value) -> Value {
    match value {
        Value::Mapping(map) => Value::Mapping(
            map.into_iter()
                .map(|(key, child)| {
                    let key = match key {
                        Value::String(s) => Value::String(s.to_lowercase()),
                        other => other,
                    };
                    (key, lowercase_keys(child))
                })
                .collect(),
        ),
        Value::Sequence(items) => Value::Sequence(items.into_iter().map(lowercase_keys).collect()),
        other => other,
    }
}
