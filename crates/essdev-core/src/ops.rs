//! The three commands, each one read-modify-write(-dispatch) transaction
//! over the payload file.

use crate::ami::resolve_ami;
use crate::dispatch::{self, Delivery, DispatchSettings};
use crate::document::{Document, InstanceRecord};
use crate::error::Result;
use crate::lock::{FileLock, DEFAULT_LOCK_TIMEOUT};
use crate::store;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempPath;
use tracing::{debug, warn};

pub const DEFAULT_INSTANCE_TYPE: &str = "t3a.large";
pub const DEFAULT_OS: &str = "rhel10";
pub const DEFAULT_VOLUME_SIZE_GB: u32 = 200;

// ---------------------------------------------------------------------------
// Inputs / outputs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct EditOptions {
    pub dry_run: bool,
    /// Keep the dry-run temp payload after the command exits.
    pub keep_temp: bool,
    pub lock_timeout: Duration,
}

impl Default for EditOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            keep_temp: false,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewInstance {
    pub name: String,
    pub instance_type: String,
    pub os: Option<String>,
    pub volume_size_gb: u32,
}

impl NewInstance {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instance_type: DEFAULT_INSTANCE_TYPE.to_string(),
            os: Some(DEFAULT_OS.to_string()),
            volume_size_gb: DEFAULT_VOLUME_SIZE_GB,
        }
    }

    pub fn record(&self) -> InstanceRecord {
        InstanceRecord::new(
            self.instance_type.clone(),
            self.volume_size_gb,
            resolve_ami(self.os.as_deref()),
        )
    }
}

#[derive(Debug)]
pub struct EditOutcome {
    pub document: Document,
    pub delivery: Delivery,
    /// The file that was delivered: the payload itself, or the dry-run copy.
    pub payload_path: PathBuf,
    // Removes an unkept dry-run copy once the outcome is dropped.
    _temp: Option<TempPath>,
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Insert or replace `instance` in `essdev_instances`.
pub fn add(
    file: &Path,
    instance: &NewInstance,
    options: &EditOptions,
    settings: &DispatchSettings,
) -> Result<EditOutcome> {
    let record = instance.record();
    edit(file, options, settings, |doc| {
        doc.upsert_instance(&instance.name, &record)
    })
}

/// Remove `name` from the instance map and both port maps. Unknown names
/// are not an error.
pub fn delete(
    file: &Path,
    name: &str,
    options: &EditOptions,
    settings: &DispatchSettings,
) -> Result<EditOutcome> {
    edit(file, options, settings, |doc| {
        if !doc.remove_instance(name)? {
            debug!(instance = name, "instance not present, nothing removed");
        }
        Ok(())
    })
}

/// Sorted instance names. Read-only, so no lock is taken.
pub fn list(file: &Path) -> Result<Vec<String>> {
    store::load(file)?.instance_names()
}

fn edit<F>(
    file: &Path,
    options: &EditOptions,
    settings: &DispatchSettings,
    mutate: F,
) -> Result<EditOutcome>
where
    F: FnOnce(&mut Document) -> Result<()>,
{
    let deliverer = dispatch::deliverer(settings, options.dry_run)?;
    let _lock = FileLock::acquire(file, options.lock_timeout)?;

    let mut document = store::load(file)?;
    mutate(&mut document)?;

    if options.dry_run {
        let temp = store::write_temp(&document, &store::temp_suffix_for(file))?;
        let delivery = deliverer.deliver(&temp)?;
        let (payload_path, temp) = if options.keep_temp {
            let kept = temp.keep().map_err(|e| e.error)?;
            warn!(path = %kept.display(), "dry-run payload kept");
            (kept, None)
        } else {
            (temp.to_path_buf(), Some(temp))
        };
        return Ok(EditOutcome {
            document,
            delivery,
            payload_path,
            _temp: temp,
        });
    }

    store::write(file, &document)?;
    let delivery = deliverer.deliver(file)?;
    Ok(EditOutcome {
        document,
        delivery,
        payload_path: file.to_path_buf(),
        _temp: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EssdevError;
    use serde_json::json;
    use tempfile::TempDir;

    fn dry_run() -> EditOptions {
        EditOptions {
            dry_run: true,
            ..EditOptions::default()
        }
    }

    #[test]
    fn add_defaults_in_dry_run_leaves_file_alone() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("payload.json");
        store::write(&file, &crate::document::default_document()).unwrap();
        let before = std::fs::read(&file).unwrap();

        let out = add(&file, &NewInstance::new("test01"), &dry_run(), &DispatchSettings::default())
            .unwrap();

        assert_eq!(std::fs::read(&file).unwrap(), before);
        assert_eq!(
            out.document.instance("test01"),
            Some(&json!({
                "instance_type": "t3a.large",
                "volume_size1": "200",
                "ami": "RHEL-10.1.0_HVM-*"
            }))
        );
        assert_ne!(out.payload_path, file);
        assert!(out.payload_path.exists());
        match &out.delivery {
            Delivery::Previewed { command } => {
                assert!(command.contains(&format!("@{}", out.payload_path.display())));
            }
            other => panic!("expected preview, got {other:?}"),
        }

        let temp = out.payload_path.clone();
        drop(out);
        assert!(!temp.exists());
    }

    #[test]
    fn keep_temp_persists_dry_run_copy() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("payload.json");
        let options = EditOptions {
            keep_temp: true,
            ..dry_run()
        };

        let out = add(&file, &NewInstance::new("a"), &options, &DispatchSettings::default()).unwrap();
        let kept = out.payload_path.clone();
        drop(out);

        assert!(kept.exists());
        assert!(!file.exists());
        assert_eq!(list(&kept).unwrap(), vec!["a"]);
        std::fs::remove_file(kept).unwrap();
    }

    #[test]
    fn missing_config_fails_before_writing() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("payload.json");

        let err = add(
            &file,
            &NewInstance::new("a"),
            &EditOptions::default(),
            &DispatchSettings::default(),
        )
        .unwrap_err();

        assert!(matches!(err, EssdevError::MissingDispatchConfig { .. }));
        assert!(!file.exists());
    }

    #[test]
    fn add_then_delete_with_dispatch() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("payload.json");

        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/dispatches")
            .with_status(204)
            .expect(2)
            .create();
        let settings = DispatchSettings {
            token: Some("secret".into()),
            url: Some(format!("{}/dispatches", server.url())),
            ..DispatchSettings::default()
        };

        let app = NewInstance {
            name: "app01".into(),
            instance_type: "m5.large".into(),
            os: Some("rhel9".into()),
            volume_size_gb: 500,
        };
        let out = add(&file, &app, &EditOptions::default(), &settings).unwrap();
        assert_eq!(out.delivery, Delivery::Sent { status: 204 });
        assert_eq!(out.payload_path, file);
        assert_eq!(list(&file).unwrap(), vec!["app01"]);

        let out = delete(&file, "app01", &EditOptions::default(), &settings).unwrap();
        assert_eq!(out.document.instance_names().unwrap(), Vec::<String>::new());
        assert_eq!(list(&file).unwrap(), Vec::<String>::new());
        mock.assert();
    }

    #[test]
    fn delete_unknown_instance_keeps_document() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("payload.json");
        let out = delete(&file, "ghost", &dry_run(), &DispatchSettings::default()).unwrap();
        assert_eq!(out.document, crate::document::default_document());
    }

    #[test]
    fn edit_times_out_when_lock_is_held() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("payload.json");
        let _held = FileLock::acquire(&file, Duration::from_secs(1)).unwrap();

        let options = EditOptions {
            lock_timeout: Duration::from_millis(200),
            ..dry_run()
        };
        let err = add(&file, &NewInstance::new("a"), &options, &DispatchSettings::default())
            .unwrap_err();
        assert!(matches!(err, EssdevError::LockTimeout { .. }));
    }

    #[test]
    fn list_sorts_names() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("payload.json");
        std::fs::write(
            &file,
            r#"{"client_payload": {"essdev_instances": {"web02": {}, "app01": {}, "db01": {}}}}"#,
        )
        .unwrap();
        assert_eq!(list(&file).unwrap(), vec!["app01", "db01", "web02"]);
    }
}
