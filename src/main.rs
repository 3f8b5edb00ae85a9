use std::{collections::HashMap, error::Error, fs, path::Path, sync::Arc};

use clap::{App, Arg};
use log::info;
use serde::Deserialize;

use compdb::{
    controller::ActiveDatabase,
    entry::EntryBuilder,
    project::{ProjectModel, PropertyBag, PropertyError},
    store::Store,
};

fn main() -> Result<(), Box<dyn Error>> {
    let matches = App::new("vcdb")
        .about("Builds a live compilation database from a project-model snapshot")
        .arg(
            Arg::with_name("model")
                .short("m")
                .long("model")
                .value_name("FILE")
                .help("JSON project-model snapshot")
                .takes_value(true)
                .required(true),
        )
        .arg(
            Arg::with_name("keep")
                .short("k")
                .long("keep")
                .help("Keep the database file instead of dropping it on exit"),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .multiple(true)
                .help("Increase verbosity (-v, -vv, -vvv)"),
        )
        .arg(
            Arg::with_name("files")
                .value_name("FILE")
                .help("Source files to add to the database")
                .multiple(true)
                .required(true),
        )
        .get_matches();

    stderrlog::new()
        .verbosity(matches.occurrences_of("verbose") as usize)
        .init()?;

    let snapshot = fs::read_to_string(matches.value_of("model").unwrap())?;
    let model: SnapshotModel = serde_json::from_str(&snapshot)?;

    let database = ActiveDatabase::new(Arc::new(model), Store::new(), EntryBuilder::new());

    let path = database.initialize()?;
    info!("Compilation database at {:?}.", path);

    for file in matches.values_of("files").unwrap() {
        database.add_file(Path::new(file))?;
    }

    println!("{}", fs::read_to_string(&path)?);

    if matches.is_present("keep") {
        eprintln!("{}", path.display());
    } else {
        database.drop_database();
    }

    Ok(())
}

/// A project model read from a JSON snapshot: one object per file carrying
/// its item type, configuration kind, compile tool and property values.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotModel {
    #[serde(default)]
    compiler_path: Option<String>,

    files: HashMap<String, SnapshotFile>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotFile {
    #[serde(default = "SnapshotFile::default_item_type")]
    item_type: String,

    #[serde(default = "SnapshotFile::default_configuration_type")]
    configuration_type: String,

    #[serde(default = "SnapshotFile::default_tool")]
    tool: String,

    #[serde(default)]
    properties: HashMap<String, String>,
}

impl SnapshotFile {
    fn default_item_type() -> String {
        "ClCompile".to_string()
    }

    fn default_configuration_type() -> String {
        "Application".to_string()
    }

    fn default_tool() -> String {
        "CL".to_string()
    }
}

impl SnapshotModel {
    fn lookup(&self, file: &Path) -> Option<&SnapshotFile> {
        let key = file.to_string_lossy();
        self.files
            .iter()
            .find(|(candidate, _)| util::keys_equivalent(candidate.as_str(), &key))
            .map(|(_, snapshot)| snapshot)
    }
}

impl ProjectModel for SnapshotModel {
    fn item_type(&self, file: &Path) -> Option<String> {
        self.lookup(file).map(|snapshot| snapshot.item_type.clone())
    }

    fn configuration_type(&self, file: &Path) -> Option<String> {
        self.lookup(file)
            .map(|snapshot| snapshot.configuration_type.clone())
    }

    fn compile_tool(&self, file: &Path) -> Option<String> {
        self.lookup(file).map(|snapshot| snapshot.tool.clone())
    }

    fn active_properties(&self, file: &Path) -> Option<Box<dyn PropertyBag + Send>> {
        self.lookup(file)
            .map(|snapshot| Box::new(SnapshotBag(snapshot.properties.clone())) as _)
    }

    fn compiler_executable(&self, _file: &Path) -> Option<String> {
        self.compiler_path.clone()
    }
}

struct SnapshotBag(HashMap<String, String>);

impl PropertyBag for SnapshotBag {
    fn property(&self, name: &str) -> Result<String, PropertyError> {
        self.0
            .get(name)
            .cloned()
            .ok_or_else(|| PropertyError::Unsupported(name.to_string()))
    }
}
