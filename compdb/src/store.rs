/*
   Copyright (C) 2026 by the vcdb developers

   This file is part of vcdb.

   vcdb is a live compilation database engine for C/C++ IDE integration.

   vcdb is free software: you can redistribute it and/or modify
   it under the terms of the GNU General Public License as published by
   the Free Software Foundation, either version 3 of the License, or
   (at your option) any later version.

   vcdb is distributed in the hope that it will be useful,
   but WITHOUT ANY WARRANTY; without even the implied warranty of
   MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
   GNU General Public License for more details.

   You should have received a copy of the GNU General Public License
   along with vcdb.  If not, see <https://www.gnu.org/licenses/>.
*/

use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::atomic::{AtomicBool, AtomicU64, Ordering},
};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

#[cfg(test)]
use mockall::automock;

use crate::{Entry, Error};

/// The on-disk file system boundary of the store.
#[cfg_attr(test, automock)]
pub trait FileSystem {
    fn exists(&self, path: &Path) -> bool;

    fn read_all_text(&self, path: &Path) -> io::Result<String>;

    fn write_all_text(&self, path: &Path, content: &str) -> io::Result<()>;

    fn create_directory(&self, path: &Path) -> io::Result<()>;

    fn delete_file(&self, path: &Path) -> io::Result<()>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultFileSystem;

impl FileSystem for DefaultFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn read_all_text(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }

    fn write_all_text(&self, path: &Path, content: &str) -> io::Result<()> {
        fs::write(path, content)
    }

    fn create_directory(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn delete_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }
}

/// On-disk form of one entry. Field names and the `NAME=VALUE` environment
/// encoding are a compatibility contract with the analysis engine consuming
/// the database; do not rename.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SerializableEntry {
    file: String,

    directory: String,

    command: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    arguments: Option<Vec<String>>,

    environment: Vec<String>,
}

impl From<&Entry> for SerializableEntry {
    fn from(entry: &Entry) -> Self {
        Self {
            file: entry.file.to_string_lossy().into_owned(),
            directory: entry.directory.to_string_lossy().into_owned(),
            command: entry.command.clone(),
            arguments: None,
            environment: entry.environment.clone(),
        }
    }
}

impl From<SerializableEntry> for Entry {
    fn from(entry: SerializableEntry) -> Self {
        Self {
            file: entry.file.into(),
            directory: entry.directory.into(),
            command: entry.command,
            environment: entry.environment,
        }
    }
}

/// Owns the database documents on disk. Every mutation is an independent
/// read-whole-file, mutate-in-memory, write-whole-file cycle; a single
/// writer at a time is the caller's responsibility (the controller's lock).
pub struct Store {
    filesystem: Box<dyn FileSystem + Send + Sync>,
    root: PathBuf,
    counter: AtomicU64,
    disposed: AtomicBool,
}

impl Store {
    /// Store rooted in the session directory under the process temp dir.
    pub fn new() -> Self {
        Self::with_filesystem(Box::new(DefaultFileSystem), std::env::temp_dir().join("vcdb"))
    }

    pub fn with_filesystem(filesystem: Box<dyn FileSystem + Send + Sync>, root: PathBuf) -> Self {
        Self {
            filesystem,
            root,
            counter: AtomicU64::new(0),
            disposed: AtomicBool::new(false),
        }
    }

    /// Creates an empty database at a fresh, collision-free path and
    /// returns it.
    pub fn create_database(&self) -> Result<PathBuf, Error> {
        self.check_disposed()?;

        self.filesystem.create_directory(&self.root)?;

        let path = loop {
            let name = format!(
                "compile-commands-{}-{}.json",
                std::process::id(),
                self.counter.fetch_add(1, Ordering::SeqCst)
            );
            let candidate = self.root.join(name);
            if !self.filesystem.exists(&candidate) {
                break candidate;
            }
        };

        self.filesystem.write_all_text(&path, "[]")?;

        debug!("Created compilation database at {:?}.", path);

        Ok(path)
    }

    /// Deletes the backing file. Best effort; a failed delete is logged,
    /// never raised.
    pub fn delete_database(&self, path: &Path) -> Result<(), Error> {
        self.check_disposed()?;

        if let Err(error) = self.filesystem.delete_file(path) {
            warn!("Failed to delete compilation database {:?}: {}.", path, error);
        }

        Ok(())
    }

    /// Replaces the entry with the same file key, or appends it.
    pub fn update_entry(&self, path: &Path, entry: &Entry) -> Result<(), Error> {
        self.check_disposed()?;

        let mut entries = self.load(path);

        let key = entry.file.to_string_lossy();
        match entries
            .iter()
            .position(|existing| util::keys_equivalent(existing.file.to_string_lossy(), &key))
        {
            Some(index) => entries[index] = entry.clone(),
            None => entries.push(entry.clone()),
        }

        self.save(path, &entries)
    }

    /// Removes every entry keyed by `file`. The database is rewritten only
    /// when something was actually removed.
    pub fn remove_entry(&self, path: &Path, file: &Path) -> Result<(), Error> {
        self.check_disposed()?;

        let mut entries = self.load(path);

        let key = file.to_string_lossy();
        let before = entries.len();
        entries.retain(|entry| !util::keys_equivalent(entry.file.to_string_lossy(), &key));

        if entries.len() == before {
            debug!("No entry for {:?} in {:?}, nothing to rewrite.", file, path);
            return Ok(());
        }

        self.save(path, &entries)
    }

    /// After disposal every operation fails with [`Error::Disposed`].
    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
    }

    fn check_disposed(&self) -> Result<(), Error> {
        if self.disposed.load(Ordering::SeqCst) {
            Err(Error::Disposed)
        } else {
            Ok(())
        }
    }

    /// Reads the whole database. Unreadable or corrupt content recovers to
    /// an empty database with a warning; the next write repairs the file.
    fn load(&self, path: &Path) -> Vec<Entry> {
        let content = match self.filesystem.read_all_text(path) {
            Ok(content) => content,
            Err(error) => {
                warn!("Failed to read compilation database {:?}: {}.", path, error);
                return vec![];
            }
        };

        match serde_json::from_str::<Vec<SerializableEntry>>(&content) {
            Ok(entries) => entries.into_iter().map(Entry::from).collect(),
            Err(error) => {
                warn!("Compilation database {:?} is corrupt ({}), starting over.", path, error);
                vec![]
            }
        }
    }

    fn save(&self, path: &Path, entries: &[Entry]) -> Result<(), Error> {
        let serializable: Vec<SerializableEntry> =
            entries.iter().map(SerializableEntry::from).collect();

        let content = serde_json::to_string_pretty(&serializable)?;

        self.filesystem.write_all_text(path, &content)?;

        Ok(())
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn store_in_tempdir() -> (Store, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::with_filesystem(Box::new(DefaultFileSystem), dir.path().to_path_buf());
        (store, dir)
    }

    fn entry(file: &str, command: &str) -> Entry {
        Entry {
            file: PathBuf::from(file),
            directory: PathBuf::from("C:\\src"),
            command: command.to_string(),
            environment: vec!["PATH=C:\\bin".to_string()],
        }
    }

    fn read_entries(store: &Store, path: &Path) -> Vec<Entry> {
        store.load(path)
    }

    #[test]
    fn create_database_writes_empty_array() {
        let (sut, _dir) = store_in_tempdir();

        let path = sut.create_database().unwrap();

        assert_eq!("[]", fs::read_to_string(&path).unwrap());
    }

    #[test]
    fn created_databases_do_not_collide() {
        let (sut, _dir) = store_in_tempdir();

        let first = sut.create_database().unwrap();
        let second = sut.create_database().unwrap();

        assert_ne!(first, second);
        assert!(first.exists() && second.exists());
    }

    #[test]
    fn update_appends_then_replaces() {
        let (sut, _dir) = store_in_tempdir();
        let path = sut.create_database().unwrap();

        sut.update_entry(&path, &entry("C:\\src\\a.cpp", "first")).unwrap();
        sut.update_entry(&path, &entry("C:\\src\\b.cpp", "other")).unwrap();
        sut.update_entry(&path, &entry("C:\\src\\a.cpp", "second")).unwrap();

        let entries = read_entries(&sut, &path);
        assert_eq!(2, entries.len());
        assert_eq!("second", entries[0].command);
        assert_eq!("other", entries[1].command);
    }

    #[test]
    fn update_matches_keys_case_insensitively() {
        let (sut, _dir) = store_in_tempdir();
        let path = sut.create_database().unwrap();

        sut.update_entry(&path, &entry("C:\\src\\a.cpp", "first")).unwrap();
        sut.update_entry(&path, &entry("C:\\SRC\\A.CPP", "second")).unwrap();

        let entries = read_entries(&sut, &path);
        assert_eq!(1, entries.len());
        assert_eq!("second", entries[0].command);
    }

    #[test]
    fn remove_without_match_does_not_rewrite() {
        let (sut, _dir) = store_in_tempdir();
        let path = sut.create_database().unwrap();

        sut.update_entry(&path, &entry("C:\\src\\a.cpp", "cmd")).unwrap();
        let before = fs::read_to_string(&path).unwrap();

        fs::write(&path, format!("{} ", before)).unwrap(); // marker whitespace
        sut.remove_entry(&path, Path::new("C:\\src\\missing.cpp")).unwrap();

        // JSON is whitespace-insensitive on load, so an untouched file still
        // carries the marker; a rewrite would have dropped it.
        assert_eq!(format!("{} ", before), fs::read_to_string(&path).unwrap());
    }

    #[test]
    fn remove_deletes_matching_entry() {
        let (sut, _dir) = store_in_tempdir();
        let path = sut.create_database().unwrap();

        sut.update_entry(&path, &entry("C:\\src\\a.cpp", "cmd")).unwrap();
        sut.update_entry(&path, &entry("C:\\src\\b.cpp", "cmd")).unwrap();

        sut.remove_entry(&path, Path::new("C:\\src\\a.cpp")).unwrap();

        let entries = read_entries(&sut, &path);
        assert_eq!(1, entries.len());
        assert_eq!(PathBuf::from("C:\\src\\b.cpp"), entries[0].file);
    }

    #[test]
    fn delete_database_failure_is_not_raised() {
        let (sut, dir) = store_in_tempdir();

        sut.delete_database(&dir.path().join("never-existed.json")).unwrap();
    }

    #[test]
    fn corrupt_database_recovers_to_empty() {
        let (sut, _dir) = store_in_tempdir();
        let path = sut.create_database().unwrap();

        fs::write(&path, "this is not json").unwrap();

        sut.update_entry(&path, &entry("C:\\src\\a.cpp", "cmd")).unwrap();

        assert_eq!(1, read_entries(&sut, &path).len());
    }

    #[test]
    fn disposed_store_refuses_every_operation() {
        let (sut, dir) = store_in_tempdir();
        let path = dir.path().join("db.json");

        sut.dispose();

        assert!(matches!(sut.create_database(), Err(Error::Disposed)));
        assert!(matches!(sut.delete_database(&path), Err(Error::Disposed)));
        assert!(matches!(
            sut.update_entry(&path, &entry("C:\\src\\a.cpp", "cmd")),
            Err(Error::Disposed)
        ));
        assert!(matches!(
            sut.remove_entry(&path, Path::new("C:\\src\\a.cpp")),
            Err(Error::Disposed)
        ));
    }

    #[test]
    fn serialized_document_keeps_contract_field_names() {
        let (sut, _dir) = store_in_tempdir();
        let path = sut.create_database().unwrap();

        sut.update_entry(&path, &entry("C:\\src\\a.cpp", "\"cl.exe\" \"a.cpp\"")).unwrap();

        let document: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();

        let object = &document[0];
        assert_eq!("C:\\src\\a.cpp", object["file"]);
        assert_eq!("C:\\src", object["directory"]);
        assert_eq!("\"cl.exe\" \"a.cpp\"", object["command"]);
        assert_eq!("PATH=C:\\bin", object["environment"][0]);
        assert!(object.get("arguments").is_none());
    }

    #[test]
    fn mocked_filesystem_sees_one_write_per_update() {
        let mut filesystem = MockFileSystem::new();
        filesystem
            .expect_read_all_text()
            .returning(|_| Ok("[]".to_string()));
        filesystem
            .expect_write_all_text()
            .times(1)
            .returning(|_, _| Ok(()));

        let sut = Store::with_filesystem(Box::new(filesystem), PathBuf::from("unused"));

        sut.update_entry(Path::new("db.json"), &entry("C:\\src\\a.cpp", "cmd"))
            .unwrap();
    }
}
