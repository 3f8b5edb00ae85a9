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
    path::{Path, PathBuf},
    sync::Arc,
};

use log::{debug, warn};
use parking_lot::Mutex;

use crate::{
    entry::EntryBuilder,
    project::{FileConfigResolver, ProjectModel, ProjectThreadCheck},
    store::Store,
    Error,
};

/// The single mutable handle to the session's compilation database.
///
/// Two states: uninitialized and active-at-a-path. One instance exists per
/// session and is passed by handle to every consumer; all four operations
/// and the path observer run under one lock, so state transitions are
/// atomic with respect to each other. In particular, `add_file` and
/// `remove_file` read the current path and then act on it, which without
/// the lock would race a concurrent `drop_database`.
pub struct ActiveDatabase {
    store: Store,
    model: Arc<dyn ProjectModel + Send + Sync>,
    entry_builder: EntryBuilder,
    thread_check: Option<ProjectThreadCheck>,
    path: Mutex<Option<PathBuf>>,
}

impl ActiveDatabase {
    pub fn new(
        model: Arc<dyn ProjectModel + Send + Sync>,
        store: Store,
        entry_builder: EntryBuilder,
    ) -> Self {
        Self {
            store,
            model,
            entry_builder,
            thread_check: None,
            path: Mutex::new(None),
        }
    }

    /// Installs the project-model thread guard. Hosts whose model is bound
    /// to a single thread call this from that thread and marshal every
    /// `add_file` to it.
    pub fn with_thread_check(mut self, check: ProjectThreadCheck) -> Self {
        self.thread_check = Some(check);
        self
    }

    /// Creates the session database. Calling while one is already active is
    /// a caller bug.
    pub fn initialize(&self) -> Result<PathBuf, Error> {
        let mut path = self.path.lock();

        if path.is_some() {
            return Err(Error::AlreadyInitialized);
        }

        let created = self.store.create_database()?;
        *path = Some(created.clone());

        Ok(created)
    }

    /// Deletes the session database. A no-op when nothing is active.
    pub fn drop_database(&self) {
        let mut path = self.path.lock();

        match path.take() {
            Some(active) => {
                if let Err(error) = self.store.delete_database(&active) {
                    warn!("Dropping compilation database {:?} failed: {}.", active, error);
                }
            }
            None => debug!("No active compilation database to drop."),
        }
    }

    /// Resolves `file` and upserts its entry. A file that resolves to no
    /// configuration is silently skipped; not every open file belongs in
    /// the database.
    pub fn add_file(&self, file: &Path) -> Result<(), Error> {
        let path = self.path.lock();
        let active = path.as_ref().ok_or(Error::NotInitialized)?;

        let resolver = match &self.thread_check {
            Some(check) => FileConfigResolver::with_thread_check(&*self.model, check),
            None => FileConfigResolver::new(&*self.model),
        };

        let config = match resolver.resolve(file)? {
            Some(config) => config,
            None => return Ok(()),
        };

        let entry = self.entry_builder.build(&config);

        self.store.update_entry(active, &entry)
    }

    /// Removes the entry keyed by `file`. A no-op when nothing is active;
    /// there is nothing to remove from.
    pub fn remove_file(&self, file: &Path) -> Result<(), Error> {
        let path = self.path.lock();

        match path.as_ref() {
            Some(active) => self.store.remove_entry(active, file),
            None => Ok(()),
        }
    }

    /// Path of the active database, for consumers that hand it to the
    /// analysis engine.
    pub fn current_path(&self) -> Option<PathBuf> {
        self.path.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::project::{MockProjectModel, MockPropertyBag, PropertyBag, PropertyError};
    use crate::store::DefaultFileSystem;

    fn analyzable_model() -> MockProjectModel {
        let mut model = MockProjectModel::new();
        model
            .expect_item_type()
            .returning(|_| Some("ClCompile".to_string()));
        model
            .expect_configuration_type()
            .returning(|_| Some("Application".to_string()));
        model.expect_compile_tool().returning(|_| Some("CL".to_string()));
        model.expect_active_properties().returning(|_| {
            let mut bag = MockPropertyBag::new();
            bag.expect_property()
                .returning(|name| Err(PropertyError::Unsupported(name.to_string())));
            Some(Box::new(bag) as Box<dyn PropertyBag + Send>)
        });
        model.expect_compiler_executable().returning(|_| None);
        model
    }

    fn unanalyzable_model() -> MockProjectModel {
        let mut model = MockProjectModel::new();
        model.expect_item_type().returning(|_| None);
        model
    }

    fn database_with(model: MockProjectModel) -> (ActiveDatabase, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::with_filesystem(Box::new(DefaultFileSystem), dir.path().to_path_buf());
        let database = ActiveDatabase::new(
            Arc::new(model),
            store,
            EntryBuilder::with_environment(vec![]),
        );
        (database, dir)
    }

    fn entry_count(database: &ActiveDatabase) -> usize {
        let path = database.current_path().unwrap();
        let document: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        document.as_array().unwrap().len()
    }

    #[test]
    fn initialize_twice_is_a_caller_error() {
        let (sut, _dir) = database_with(unanalyzable_model());

        sut.initialize().unwrap();

        assert!(matches!(sut.initialize(), Err(Error::AlreadyInitialized)));
    }

    #[test]
    fn drop_is_idempotent() {
        let (sut, _dir) = database_with(unanalyzable_model());

        let path = sut.initialize().unwrap();
        assert!(path.exists());

        sut.drop_database();
        assert!(!path.exists());
        assert_eq!(None, sut.current_path());

        sut.drop_database();
        assert_eq!(None, sut.current_path());
    }

    #[test]
    fn initialize_after_drop_creates_a_fresh_database() {
        let (sut, _dir) = database_with(unanalyzable_model());

        let first = sut.initialize().unwrap();
        sut.drop_database();
        let second = sut.initialize().unwrap();

        assert_ne!(first, second);
        assert_eq!(Some(second), sut.current_path());
    }

    #[test]
    fn add_file_requires_an_active_database() {
        let (sut, _dir) = database_with(analyzable_model());

        assert!(matches!(
            sut.add_file(Path::new("C:\\src\\a.cpp")),
            Err(Error::NotInitialized)
        ));
    }

    #[test]
    fn remove_file_without_database_is_silent() {
        let (sut, _dir) = database_with(unanalyzable_model());

        sut.remove_file(Path::new("C:\\src\\a.cpp")).unwrap();
    }

    #[test]
    fn add_file_persists_an_entry() {
        let (sut, _dir) = database_with(analyzable_model());

        sut.initialize().unwrap();
        sut.add_file(Path::new("C:\\src\\a.cpp")).unwrap();

        assert_eq!(1, entry_count(&sut));
    }

    #[test]
    fn adding_the_same_file_twice_keeps_one_entry() {
        let (sut, _dir) = database_with(analyzable_model());

        sut.initialize().unwrap();
        sut.add_file(Path::new("C:\\src\\a.cpp")).unwrap();
        sut.add_file(Path::new("C:\\src\\a.cpp")).unwrap();

        assert_eq!(1, entry_count(&sut));
    }

    #[test]
    fn unanalyzable_file_is_silently_skipped() {
        let (sut, _dir) = database_with(unanalyzable_model());

        sut.initialize().unwrap();
        sut.add_file(Path::new("C:\\src\\readme.txt")).unwrap();

        assert_eq!(0, entry_count(&sut));
    }

    #[test]
    fn remove_file_deletes_its_entry() {
        let (sut, _dir) = database_with(analyzable_model());

        sut.initialize().unwrap();
        sut.add_file(Path::new("C:\\src\\a.cpp")).unwrap();
        sut.remove_file(Path::new("C:\\src\\a.cpp")).unwrap();

        assert_eq!(0, entry_count(&sut));
    }
}
