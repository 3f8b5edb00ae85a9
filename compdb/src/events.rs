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
    thread,
};

use crossbeam::channel::{self, Sender};
use log::{debug, warn};

use crate::controller::ActiveDatabase;

/// File extensions the editor reports as C-family documents.
const C_FAMILY_EXTENSIONS: [&str; 13] = [
    "c", "cc", "cpp", "cxx", "c++", "h", "hh", "hpp", "hxx", "h++", "inl", "ipp", "tpp",
];

/// A document-lifecycle notification from the editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentEvent {
    Opened(PathBuf),
    Saved(PathBuf),
    Closed(PathBuf),
    Renamed { from: PathBuf, to: PathBuf },
}

pub fn is_c_family(file: &Path) -> bool {
    file.extension()
        .map(|extension| {
            let extension = extension.to_string_lossy().to_lowercase();
            C_FAMILY_EXTENSIONS.contains(&extension.as_str())
        })
        .unwrap_or(false)
}

/// Dispatches fire-and-forget document events onto a bounded worker pool.
///
/// Events for different files carry no ordering guarantee; per-file
/// causality is the host's responsibility. A rename is handled as one unit
/// of work, remove(old) then add(new), which leaves a transient window
/// during which readers see neither path.
pub struct EventPump {
    sender: Option<Sender<DocumentEvent>>,
    workers: Vec<thread::JoinHandle<()>>,
}

impl EventPump {
    pub fn new(database: Arc<ActiveDatabase>, workers: usize, capacity: usize) -> Self {
        let (sender, receiver) = channel::bounded(capacity);

        let workers = (0..workers.max(1))
            .map(|_| {
                let receiver: channel::Receiver<DocumentEvent> = receiver.clone();
                let database = Arc::clone(&database);
                thread::spawn(move || {
                    for event in receiver.iter() {
                        handle(&database, event);
                    }
                })
            })
            .collect();

        Self {
            sender: Some(sender),
            workers,
        }
    }

    /// Queues an event. Non-C-family documents are filtered out here;
    /// dispatch failures are logged and swallowed, matching the
    /// fire-and-forget contract.
    pub fn post(&self, event: DocumentEvent) {
        let relevant = match &event {
            DocumentEvent::Opened(file)
            | DocumentEvent::Saved(file)
            | DocumentEvent::Closed(file) => is_c_family(file),
            DocumentEvent::Renamed { from, to } => is_c_family(from) || is_c_family(to),
        };

        if !relevant {
            debug!("Ignoring non-C-family document event {:?}.", event);
            return;
        }

        if let Some(sender) = &self.sender {
            if let Err(error) = sender.send(event) {
                warn!("Dropped document event: {}.", error);
            }
        }
    }

    /// Stops accepting events and waits for queued work to drain.
    pub fn shutdown(mut self) {
        self.sender.take();

        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                warn!("A document event worker panicked.");
            }
        }
    }
}

impl Drop for EventPump {
    fn drop(&mut self) {
        self.sender.take();
    }
}

fn handle(database: &ActiveDatabase, event: DocumentEvent) {
    match event {
        DocumentEvent::Opened(file) | DocumentEvent::Saved(file) => {
            if let Err(error) = database.add_file(&file) {
                warn!("Adding {:?} to the compilation database failed: {}.", file, error);
            }
        }

        DocumentEvent::Closed(file) => {
            if let Err(error) = database.remove_file(&file) {
                warn!(
                    "Removing {:?} from the compilation database failed: {}.",
                    file, error
                );
            }
        }

        DocumentEvent::Renamed { from, to } => {
            if let Err(error) = database.remove_file(&from) {
                warn!(
                    "Removing renamed file {:?} from the compilation database failed: {}.",
                    from, error
                );
            }
            if let Err(error) = database.add_file(&to) {
                warn!("Adding renamed file {:?} to the compilation database failed: {}.", to, error);
            }
        }
    }
}
