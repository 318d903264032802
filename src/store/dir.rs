// On-disk backend: one JSON document per record under a data directory
//
// Layout:
//   tutorials/<id>.json
//   software/<id>.json
//   categories/{tutorials,software}.json
//   storage/<bucket>/<key>
//   settings.toml
//   events.jsonl

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use walkdir::WalkDir;

use crate::catalog::{Category, Software, Tutorial};
use crate::stats::UsageEvent;
use crate::store::{
    KeyValueStore, ObjectStorage, SoftwareStore, StoreError, StoreResult, TutorialStore, UsageLog,
};
use crate::votes::VoteDelta;

const SETTINGS_FILE: &str = "settings.toml";
const EVENTS_FILE: &str = "events.jsonl";

pub struct DirStore {
    root: PathBuf,
    values: RefCell<HashMap<String, String>>,
}

impl DirStore {
    /// Open a store rooted at the given directory, creating the layout
    /// on first use
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        for sub in ["tutorials", "software", "categories", "storage"] {
            fs::create_dir_all(root.join(sub))?;
        }
        let values = load_settings(&root.join(SETTINGS_FILE));
        Ok(DirStore {
            root,
            values: RefCell::new(values),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_path(&self, dir: &str, id: &str) -> PathBuf {
        self.root.join(dir).join(format!("{}.json", id))
    }

    fn object_path(&self, bucket: &str, key: &str) -> PathBuf {
        self.root.join("storage").join(bucket).join(key)
    }

    fn categories_path(&self, name: &str) -> PathBuf {
        self.root.join("categories").join(format!("{}.json", name))
    }

    fn list_records<T: DeserializeOwned>(&self, dir: &str) -> StoreResult<Vec<T>> {
        let mut items = Vec::new();
        for entry in WalkDir::new(self.root.join(dir))
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.path().extension().and_then(|x| x.to_str()) == Some("json"))
        {
            items.push(read_record(entry.path(), "record")?);
        }
        Ok(items)
    }

    fn load_categories(&self, name: &str) -> StoreResult<Vec<Category>> {
        let path = self.categories_path(name);
        if !path.exists() {
            return Ok(Vec::new());
        }
        read_record(&path, "category list")
    }

    fn store_category(&self, name: &str, category: &Category) -> StoreResult<()> {
        let mut categories = self.load_categories(name)?;
        match categories.iter_mut().find(|c| c.id == category.id) {
            Some(existing) => *existing = category.clone(),
            None => categories.push(category.clone()),
        }
        write_record(&self.categories_path(name), &categories)
    }

    fn flush_settings(&self) {
        let path = self.root.join(SETTINGS_FILE);
        let values = self.values.borrow();
        match toml::to_string_pretty(&*values) {
            Ok(contents) => {
                if let Err(err) = fs::write(&path, contents) {
                    tracing::warn!("failed to persist settings to {}: {err}", path.display());
                }
            }
            Err(err) => tracing::warn!("failed to encode settings: {err}"),
        }
    }
}

impl TutorialStore for DirStore {
    fn list_tutorials(&self) -> StoreResult<Vec<Tutorial>> {
        let mut items: Vec<Tutorial> = self.list_records("tutorials")?;
        items.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(items)
    }

    fn get_tutorial(&self, id: &str) -> StoreResult<Tutorial> {
        read_record(
            &self.record_path("tutorials", id),
            &format!("tutorial '{}'", id),
        )
    }

    fn save_tutorial(&self, tutorial: &Tutorial) -> StoreResult<()> {
        tracing::info!(id = %tutorial.id, "saving tutorial");
        write_record(&self.record_path("tutorials", &tutorial.id), tutorial)
    }

    fn delete_tutorial(&self, id: &str) -> StoreResult<()> {
        remove_record(&self.record_path("tutorials", id), &format!("tutorial '{}'", id))
    }

    fn apply_vote_delta(&self, id: &str, delta: VoteDelta) -> StoreResult<Tutorial> {
        let mut tutorial = self.get_tutorial(id)?;
        (tutorial.likes, tutorial.dislikes) = delta.apply(tutorial.likes, tutorial.dislikes);
        write_record(&self.record_path("tutorials", id), &tutorial)?;
        Ok(tutorial)
    }

    fn list_tutorial_categories(&self) -> StoreResult<Vec<Category>> {
        self.load_categories("tutorials")
    }

    fn save_tutorial_category(&self, category: &Category) -> StoreResult<()> {
        self.store_category("tutorials", category)
    }
}

impl SoftwareStore for DirStore {
    fn list_software(&self) -> StoreResult<Vec<Software>> {
        let mut items: Vec<Software> = self.list_records("software")?;
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }

    fn get_software(&self, id: &str) -> StoreResult<Software> {
        read_record(
            &self.record_path("software", id),
            &format!("software '{}'", id),
        )
    }

    fn save_software(&self, software: &Software) -> StoreResult<()> {
        tracing::info!(id = %software.id, "saving software record");
        write_record(&self.record_path("software", &software.id), software)
    }

    fn delete_software(&self, id: &str) -> StoreResult<()> {
        remove_record(&self.record_path("software", id), &format!("software '{}'", id))
    }

    fn list_software_categories(&self) -> StoreResult<Vec<Category>> {
        self.load_categories("software")
    }

    fn save_software_category(&self, category: &Category) -> StoreResult<()> {
        self.store_category("software", category)
    }
}

impl ObjectStorage for DirStore {
    fn upload(&self, bucket: &str, key: &str, bytes: &[u8]) -> StoreResult<()> {
        let path = self.object_path(bucket, key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, bytes)?;
        tracing::info!(bucket, key, size = bytes.len(), "stored object");
        Ok(())
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        format!("file://{}", self.object_path(bucket, key).display())
    }

    fn delete(&self, bucket: &str, key: &str) -> StoreResult<()> {
        match fs::remove_file(self.object_path(bucket, key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

impl KeyValueStore for DirStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.values
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        self.flush_settings();
    }

    fn remove(&self, key: &str) {
        self.values.borrow_mut().remove(key);
        self.flush_settings();
    }
}

impl UsageLog for DirStore {
    fn record(&self, event: UsageEvent) -> StoreResult<()> {
        let line = serde_json::to_string(&event).map_err(|e| StoreError::Malformed(e.to_string()))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.root.join(EVENTS_FILE))?;
        writeln!(file, "{}", line)?;
        Ok(())
    }

    fn events(&self) -> StoreResult<Vec<UsageEvent>> {
        let contents = match fs::read_to_string(self.root.join(EVENTS_FILE)) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                serde_json::from_str(line).map_err(|e| StoreError::Malformed(e.to_string()))
            })
            .collect()
    }
}

fn load_settings(path: &Path) -> HashMap<String, String> {
    let Ok(contents) = fs::read_to_string(path) else {
        return HashMap::new();
    };
    match toml::from_str(&contents) {
        Ok(values) => values,
        Err(err) => {
            tracing::warn!("ignoring malformed settings file {}: {err}", path.display());
            HashMap::new()
        }
    }
}

fn read_record<T: DeserializeOwned>(path: &Path, what: &str) -> StoreResult<T> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            return Err(StoreError::NotFound(what.to_string()));
        }
        Err(err) => return Err(err.into()),
    };
    serde_json::from_str(&contents)
        .map_err(|e| StoreError::Malformed(format!("{}: {}", path.display(), e)))
}

fn write_record<T: Serialize>(path: &Path, record: &T) -> StoreResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json =
        serde_json::to_string_pretty(record).map_err(|e| StoreError::Malformed(e.to_string()))?;
    fs::write(path, json)?;
    Ok(())
}

fn remove_record(path: &Path, what: &str) -> StoreResult<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => {
            Err(StoreError::NotFound(what.to_string()))
        }
        Err(err) => Err(err.into()),
    }
}
