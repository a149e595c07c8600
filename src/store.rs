//! Object storage seen by the ingestion pipeline.

use anyhow::{anyhow, Context};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex};

/// A bucket and a key inside it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectLocation {
    bucket: String,
    key: String,
}

impl ObjectLocation {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for ObjectLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}

impl FromStr for ObjectLocation {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (bucket, key) = s
            .split_once('/')
            .ok_or(anyhow!("Missing '/' between bucket and key in {s:?}"))?;
        if bucket.is_empty() || key.is_empty() {
            return Err(anyhow!("Empty bucket or key in {s:?}"));
        }
        Ok(Self::new(bucket, key))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

impl StoredObject {
    pub fn new(bytes: impl Into<Vec<u8>>, content_type: Option<&str>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: content_type.map(str::to_owned),
        }
    }
}

/// Where objects are fetched from and written to.
pub trait ObjectStore: Send + Sync {
    fn get(&self, location: &ObjectLocation) -> anyhow::Result<StoredObject>;

    fn put(&self, location: &ObjectLocation, object: StoredObject) -> anyhow::Result<()>;
}

impl<S: ObjectStore + ?Sized> ObjectStore for Arc<S> {
    fn get(&self, location: &ObjectLocation) -> anyhow::Result<StoredObject> {
        (**self).get(location)
    }

    fn put(&self, location: &ObjectLocation, object: StoredObject) -> anyhow::Result<()> {
        (**self).put(location, object)
    }
}

/// Keeps objects in a map.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<ObjectLocation, StoredObject>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, location: ObjectLocation, object: StoredObject) -> anyhow::Result<()> {
        self.put(&location, object)
    }

    pub fn contains(&self, location: &ObjectLocation) -> bool {
        self.objects
            .lock()
            .map(|objects| objects.contains_key(location))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.objects.lock().map(|objects| objects.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ObjectStore for MemoryStore {
    fn get(&self, location: &ObjectLocation) -> anyhow::Result<StoredObject> {
        let objects = self
            .objects
            .lock()
            .map_err(|_| anyhow!("Object store lock poisoned"))?;
        objects
            .get(location)
            .cloned()
            .ok_or(anyhow!("No such object: {location}"))
    }

    fn put(&self, location: &ObjectLocation, object: StoredObject) -> anyhow::Result<()> {
        let mut objects = self
            .objects
            .lock()
            .map_err(|_| anyhow!("Object store lock poisoned"))?;
        objects.insert(location.clone(), object);
        Ok(())
    }
}

/// Buckets are directories under `root`, keys are paths inside them.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path(&self, location: &ObjectLocation) -> anyhow::Result<PathBuf> {
        let bucket = Path::new(location.bucket());
        let key = Path::new(location.key());
        let single = bucket.components().count() == 1;
        let normal = bucket
            .components()
            .chain(key.components())
            .all(|c| matches!(c, Component::Normal(_)));
        if !single || !normal {
            return Err(anyhow!("Refusing to map {location} outside the store root"));
        }
        Ok(self.root.join(bucket).join(key))
    }
}

impl ObjectStore for FsStore {
    fn get(&self, location: &ObjectLocation) -> anyhow::Result<StoredObject> {
        let path = self.path(location)?;
        let bytes = fs::read(&path).with_context(|| format!("Reading {}", path.display()))?;
        Ok(StoredObject {
            bytes,
            content_type: None,
        })
    }

    fn put(&self, location: &ObjectLocation, object: StoredObject) -> anyhow::Result<()> {
        let path = self.path(location)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Creating {}", parent.display()))?;
        }
        fs::write(&path, object.bytes).with_context(|| format!("Writing {}", path.display()))
    }
}
