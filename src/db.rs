use serde::Serialize;
use serde_json::Value;
use std::{
    fs::{self, OpenOptions},
    io::Write,
    ops::{Deref, DerefMut},
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};

use crate::error::LauncherError;
use crate::host::HostRecord;
use crate::profile::TerminalProfile;

pub const CONFIG_FILE: &str = ".sshconnect";
pub const CONFIG_VERSION: u64 = 2;

/// Both record lists as held in memory.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Config {
    pub hosts: Vec<HostRecord>,
    pub profiles: Vec<TerminalProfile>,
}

#[derive(Serialize)]
struct StoredConfig<'a> {
    version: u64,
    ssh_hosts: &'a [HostRecord],
    terminal_profiles: &'a [TerminalProfile],
}

/// `~/.sshconnect`, or `None` when there is no home directory.
pub fn default_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CONFIG_FILE))
}

/// The JSON config file and the lists loaded from it.
///
/// The in-memory lists are authoritative; `flush` overwrites the whole file.
#[derive(Debug)]
pub struct Db {
    path: PathBuf,
    config: Config,
}

impl Db {
    /// Loads the config at `path`.
    ///
    /// Never fails: when the file cannot be used the lists start empty and
    /// the error is handed back for display. A legacy file is rewritten in
    /// the versioned shape right away.
    pub fn open<P: AsRef<Path>>(path: P) -> (Self, Option<LauncherError>) {
        let path = PathBuf::from(path.as_ref());
        let (config, legacy) = match read_config(&path) {
            Ok(loaded) => loaded,
            Err(e) => {
                warn!("{}", e);
                return (
                    Self {
                        path,
                        config: Config::default(),
                    },
                    Some(e),
                );
            }
        };

        info!(
            hosts = config.hosts.len(),
            profiles = config.profiles.len(),
            "loaded {}",
            path.display()
        );

        let db = Self { path, config };
        if legacy {
            info!("migrating legacy host list in {}", db.path.display());
            if let Err(e) = db.flush() {
                warn!("{}", e);
                return (db, Some(e));
            }
        }
        (db, None)
    }

    /// Writes both lists to disk, readable by the owner only.
    ///
    /// The data goes to a sibling temp file first and is renamed over the
    /// config, so the old file survives a failed write.
    /// A symlinked config is written through: the link target is replaced.
    pub fn flush(&self) -> Result<(), LauncherError> {
        let write_error = |source: std::io::Error| LauncherError::ConfigWrite {
            path: self.path.clone(),
            source,
        };

        let stored = StoredConfig {
            version: CONFIG_VERSION,
            ssh_hosts: &self.config.hosts,
            terminal_profiles: &self.config.profiles,
        };
        let data = serde_json::to_vec_pretty(&stored).map_err(|e| write_error(e.into()))?;

        let target = self.target_path();
        if let Some(parent) = target.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(write_error)?;
            }
        }

        let tmp_path = temp_path(&target);
        let result = write_private(&tmp_path, &data)
            .and_then(|_| fs::rename(&tmp_path, &target))
            .and_then(|_| restrict_permissions(&target));
        if let Err(e) = result {
            let _ = fs::remove_file(&tmp_path);
            return Err(write_error(e));
        }

        debug!("saved {}", self.path.display());
        Ok(())
    }

    /// The file the rename must land on: `path` itself, or the file a
    /// symlink at `path` points to.
    fn target_path(&self) -> PathBuf {
        let is_link = fs::symlink_metadata(&self.path)
            .map(|meta| meta.file_type().is_symlink())
            .unwrap_or(false);
        if !is_link {
            return self.path.clone();
        }
        match fs::canonicalize(&self.path) {
            Ok(target) => target,
            // dangling link: resolve it by hand so the target gets created
            Err(_) => match fs::read_link(&self.path) {
                Ok(link) => self
                    .path
                    .parent()
                    .map(|parent| parent.join(&link))
                    .unwrap_or(link),
                Err(_) => self.path.clone(),
            },
        }
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(|| CONFIG_FILE.into());
    name.push(".tmp");
    path.with_file_name(name)
}

impl Deref for Db {
    type Target = Config;

    fn deref(&self) -> &Self::Target {
        &self.config
    }
}

impl DerefMut for Db {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.config
    }
}

/// Reads and decodes the config file. The flag is true for a legacy bare host list.
fn read_config(path: &Path) -> Result<(Config, bool), LauncherError> {
    if !path.exists() {
        return Ok((Config::default(), false));
    }

    let read_error = |reason: String| LauncherError::ConfigRead {
        path: path.to_path_buf(),
        reason,
    };

    let content = fs::read_to_string(path).map_err(|e| read_error(e.to_string()))?;
    let value: Value = serde_json::from_str(&content).map_err(|source| LauncherError::ConfigParse {
        path: path.to_path_buf(),
        source,
    })?;

    match value {
        Value::Array(hosts) => {
            let hosts = decode_all(&hosts, HostRecord::from_value, "host").map_err(read_error)?;
            Ok((
                Config {
                    hosts,
                    profiles: Vec::new(),
                },
                true,
            ))
        }
        Value::Object(object) => {
            let hosts = match object.get("ssh_hosts") {
                Some(value) => decode_list(value, HostRecord::from_value, "host").map_err(read_error)?,
                None => Vec::new(),
            };
            let profiles = match object.get("terminal_profiles") {
                Some(value) => decode_list(value, TerminalProfile::from_value, "profile")
                    .map_err(read_error)?,
                None => Vec::new(),
            };
            Ok((Config { hosts, profiles }, false))
        }
        _ => Err(read_error(
            "expected a JSON object or a list of hosts".to_string(),
        )),
    }
}

fn decode_list<T>(
    value: &Value,
    decode: fn(&Value) -> Option<T>,
    what: &str,
) -> Result<Vec<T>, String> {
    match value {
        Value::Array(items) => decode_all(items, decode, what),
        _ => Err(format!("expected a list of {what}s")),
    }
}

fn decode_all<T>(
    items: &[Value],
    decode: fn(&Value) -> Option<T>,
    what: &str,
) -> Result<Vec<T>, String> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| decode(item).ok_or_else(|| format!("{what} #{} is not an object", i + 1)))
        .collect()
}

fn write_private(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(data)?;
    file.sync_all()?;
    Ok(())
}

fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::Link;
    use tempfile::TempDir;

    fn config_path() -> (PathBuf, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        (temp_dir.path().join(CONFIG_FILE), temp_dir)
    }

    fn sample_config() -> Config {
        let mut web = HostRecord::new("web", "web.example.com");
        web.username = "deploy".into();
        web.port = 2222;
        web.certificate = "/home/me/.ssh/id web".into();
        web.links = vec![Link {
            name: "Dashboard".into(),
            url: "https://dash.example.com".into(),
        }];

        let mut work = TerminalProfile::new("work", "Jane Doe", "jane@corp.com");
        work.ssh_key_path = "/keys/work".into();
        work.working_dir = "/src/project".into();

        Config {
            hosts: vec![web, HostRecord::new("db", "10.0.0.5")],
            profiles: vec![work],
        }
    }

    #[test]
    fn test_missing_file_starts_empty() {
        let (path, _temp) = config_path();
        let (db, error) = Db::open(&path);
        assert!(error.is_none());
        assert!(db.hosts.is_empty());
        assert!(db.profiles.is_empty());
        assert!(!path.exists());
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let (path, _temp) = config_path();
        let (mut db, _) = Db::open(&path);
        *db = sample_config();
        db.flush().unwrap();

        let (reloaded, error) = Db::open(&path);
        assert!(error.is_none());
        assert_eq!(*reloaded, sample_config());
    }

    #[test]
    fn test_saved_shape_is_versioned() {
        let (path, _temp) = config_path();
        let (mut db, _) = Db::open(&path);
        *db = sample_config();
        db.flush().unwrap();

        let value: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["version"], 2);
        assert_eq!(value["ssh_hosts"][0]["name"], "web");
        assert_eq!(value["ssh_hosts"][0]["port"], 2222);
        assert_eq!(value["ssh_hosts"][1]["links"], serde_json::json!([]));
        assert_eq!(value["terminal_profiles"][0]["git_email"], "jane@corp.com");
    }

    #[cfg(unix)]
    #[test]
    fn test_saved_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let (path, _temp) = config_path();
        fs::write(&path, "[]").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        let (db, _) = Db::open(&path);
        db.flush().unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_legacy_list_is_migrated() {
        let (path, _temp) = config_path();
        fs::write(&path, r#"[{"name":"a","ip":"1.2.3.4"}]"#).unwrap();

        let (db, error) = Db::open(&path);
        assert!(error.is_none());
        assert_eq!(db.hosts, vec![HostRecord::new("a", "1.2.3.4")]);
        assert!(db.profiles.is_empty());

        let value: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["version"], 2);
        assert_eq!(value["ssh_hosts"][0]["ip"], "1.2.3.4");
        assert_eq!(value["terminal_profiles"], serde_json::json!([]));
    }

    #[test]
    fn test_missing_sections_default_to_empty() {
        let (path, _temp) = config_path();
        fs::write(&path, r#"{"version": 2, "ssh_hosts": [{"name": "a", "ip": "h"}]}"#).unwrap();

        let (db, error) = Db::open(&path);
        assert!(error.is_none());
        assert_eq!(db.hosts.len(), 1);
        assert!(db.profiles.is_empty());
    }

    #[test]
    fn test_invalid_json_reports_parse_error() {
        let (path, _temp) = config_path();
        fs::write(&path, "{ not json").unwrap();

        let (db, error) = Db::open(&path);
        assert!(matches!(error, Some(LauncherError::ConfigParse { .. })));
        assert!(db.hosts.is_empty());
        assert!(db.profiles.is_empty());
        // the broken file is left alone
        assert_eq!(fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[test]
    fn test_unexpected_shape_reports_read_error() {
        let (path, _temp) = config_path();
        fs::write(&path, "42").unwrap();
        let (db, error) = Db::open(&path);
        assert!(matches!(error, Some(LauncherError::ConfigRead { .. })));
        assert!(db.hosts.is_empty());

        fs::write(&path, r#"{"ssh_hosts": [1, 2]}"#).unwrap();
        let (_, error) = Db::open(&path);
        assert!(matches!(error, Some(LauncherError::ConfigRead { .. })));

        fs::write(&path, r#"{"ssh_hosts": null, "terminal_profiles": []}"#).unwrap();
        let (db, error) = Db::open(&path);
        assert!(matches!(error, Some(LauncherError::ConfigRead { .. })));
        assert!(db.hosts.is_empty());
    }

    #[test]
    fn test_failed_migration_keeps_loaded_hosts() {
        let (path, temp) = config_path();
        let legacy = r#"[{"name":"a","ip":"1.2.3.4"}]"#;
        fs::write(&path, legacy).unwrap();
        // a directory where the temp file should go makes the write fail
        fs::create_dir(temp.path().join(format!("{CONFIG_FILE}.tmp"))).unwrap();

        let (db, error) = Db::open(&path);
        assert!(matches!(error, Some(LauncherError::ConfigWrite { .. })));
        assert_eq!(db.hosts, vec![HostRecord::new("a", "1.2.3.4")]);
        assert_eq!(fs::read_to_string(&path).unwrap(), legacy);
    }

    #[cfg(unix)]
    #[test]
    fn test_flush_writes_through_symlink() {
        let (path, temp) = config_path();
        let target = temp.path().join("dotfiles.json");
        fs::write(&target, r#"{"version": 2, "ssh_hosts": [], "terminal_profiles": []}"#).unwrap();
        std::os::unix::fs::symlink(&target, &path).unwrap();

        let (mut db, error) = Db::open(&path);
        assert!(error.is_none());
        db.hosts.push(HostRecord::new("a", "h"));
        db.flush().unwrap();

        assert!(fs::symlink_metadata(&path).unwrap().file_type().is_symlink());
        let value: Value = serde_json::from_str(&fs::read_to_string(&target).unwrap()).unwrap();
        assert_eq!(value["ssh_hosts"][0]["name"], "a");
        assert!(!temp.path().join("dotfiles.json.tmp").exists());
    }

    #[test]
    fn test_write_failure_keeps_memory() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("blocker");
        fs::write(&blocker, "").unwrap();

        let (mut db, _) = Db::open(blocker.join(CONFIG_FILE));
        db.hosts.push(HostRecord::new("a", "h"));

        let error = db.flush().unwrap_err();
        assert!(matches!(error, LauncherError::ConfigWrite { .. }));
        assert_eq!(db.hosts.len(), 1);
    }

    #[test]
    fn test_flush_leaves_no_temp_file() {
        let (path, temp) = config_path();
        let (db, _) = Db::open(&path);
        db.flush().unwrap();
        let names: Vec<_> = fs::read_dir(temp.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from(CONFIG_FILE)]);
    }
}
