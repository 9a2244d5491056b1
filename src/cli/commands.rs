//! CLI command implementations
//!
//! Each invocation loads the config, opens the file repository (replaying
//! its journal), runs one operation and prints one JSON response. Library
//! changes are written back to `<data_dir>/libraries.json`.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use crate::config::EngineConfig;
use crate::engine::{shared_libraries, LifecycleEngine};
use crate::library::{Library, LibraryRegistry};
use crate::lifecycle::{JsonCodec, LifecycleItem};
use crate::observability::{log_event_with_fields, Event, Logger, MetricsRegistry};
use crate::payload::GenericPayload;
use crate::repository::journal::journal_path;
use crate::repository::{FileRepository, FindQuery, ItemFilter, Page};
use crate::version::{ItemStatus, VersionNumber};

use super::args::{Command, ItemAction, LibraryAction, TransitionArgs};
use super::errors::{CliError, CliResult};
use super::io::{read_request, write_error, write_response};

type CliEngine = LifecycleEngine<GenericPayload, FileRepository<GenericPayload>>;

/// An opened data directory.
struct Workspace {
    config: EngineConfig,
    registry: Arc<LibraryRegistry>,
    engine: CliEngine,
}

impl Workspace {
    fn open(config_path: &Path) -> CliResult<Self> {
        let config = load_config(config_path)?;
        if !is_initialized(&config) {
            return Err(CliError::not_initialized());
        }

        let registry = Arc::new(LibraryRegistry::load(&config.registry_path())?);
        let libraries = shared_libraries(registry.clone());
        let metrics = Arc::new(MetricsRegistry::new());
        let repository = FileRepository::open(
            config.data_path(),
            libraries.clone(),
            JsonCodec::new(),
            config.repository_options(),
        )?
        .with_metrics(metrics.clone());

        Ok(Self {
            config,
            registry,
            engine: LifecycleEngine::new(repository, libraries, metrics),
        })
    }

    fn save_registry(&self) -> CliResult<()> {
        self.registry.save(&self.config.registry_path())?;
        Ok(())
    }
}

/// Main CLI entry point
///
/// Parses arguments, dispatches, and reports failures as a JSON error
/// response before returning them to `main`.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    let result = run_command(&cli.config, cli.command);
    if let Err(e) = &result {
        write_error(e.code_str(), e.message())?;
    }
    result
}

/// Run the appropriate command based on CLI args
pub fn run_command(config_path: &Path, cmd: Command) -> CliResult<()> {
    let data = match cmd {
        Command::Init => init(config_path)?,
        Command::Library { action } => library(config_path, action)?,
        Command::Item { action } => item(config_path, action)?,
        Command::Audit { page, size } => audit(config_path, Page::new(page, size))?,
    };
    write_response(data)
}

fn load_config(config_path: &Path) -> CliResult<EngineConfig> {
    let config =
        EngineConfig::load(config_path).map_err(|e| CliError::config_error(e.to_string()))?;
    let severity = config
        .log_severity()
        .map_err(|e| CliError::config_error(e.to_string()))?;
    Logger::set_min_severity(severity);

    let path = config_path.display().to_string();
    log_event_with_fields(
        Event::ConfigLoaded,
        &[("path", path.as_str()), ("data_dir", config.data_dir.as_str())],
    );
    Ok(config)
}

fn is_initialized(config: &EngineConfig) -> bool {
    config.registry_path().exists()
}

/// Initialize a new data directory
///
/// - Creates `<data_dir>/journal/`
/// - Writes the library registry with the configured libraries
/// - Writes no journal frames
pub fn init(config_path: &Path) -> CliResult<Value> {
    let config = load_config(config_path)?;
    if is_initialized(&config) {
        return Err(CliError::already_initialized());
    }

    let journal = journal_path(config.data_path());
    if let Some(dir) = journal.parent() {
        fs::create_dir_all(dir).map_err(|e| {
            CliError::io_error(format!("Failed to create {}: {}", dir.display(), e))
        })?;
    }

    let registry = LibraryRegistry::with_libraries(config.libraries.iter().map(Library::from))?;
    registry.save(&config.registry_path())?;
    for library in registry.list() {
        let editable = library.is_editable().to_string();
        log_event_with_fields(
            Event::LibraryProvisioned,
            &[("library", library.name()), ("is_editable", editable.as_str())],
        );
    }

    Ok(json!({
        "data_dir": config.data_dir,
        "libraries": registry.list(),
    }))
}

fn library(config_path: &Path, action: LibraryAction) -> CliResult<Value> {
    let workspace = Workspace::open(config_path)?;
    let engine = &workspace.engine;

    let data = match action {
        LibraryAction::List => json!(engine.libraries()),
        LibraryAction::Add { name, locked } => {
            let library = engine.provision_library(&name, !locked)?;
            workspace.save_registry()?;
            json!(library)
        }
        LibraryAction::SetEditable { name, editable } => {
            let library = engine.set_library_editable(&name, editable)?;
            workspace.save_registry()?;
            json!(library)
        }
    };
    Ok(data)
}

fn item(config_path: &Path, action: ItemAction) -> CliResult<Value> {
    let workspace = Workspace::open(config_path)?;
    let engine = &workspace.engine;

    let data = match action {
        ItemAction::Create {
            library,
            author,
            payload,
        } => {
            let payload = parse_payload(payload)?;
            item_json(&engine.create(&library, payload, &author)?)
        }
        ItemAction::Edit {
            uid,
            author,
            description,
            payload,
        } => {
            let payload = parse_payload(payload)?;
            item_json(&engine.edit(&uid, &author, payload, &description)?)
        }
        ItemAction::Approve(args) => {
            let TransitionArgs {
                uid,
                author,
                description,
            } = args;
            item_json(&engine.approve(&uid, &author, description.as_deref())?)
        }
        ItemAction::NewVersion(args) => item_json(&engine.new_version(
            &args.uid,
            &args.author,
            args.description.as_deref(),
        )?),
        ItemAction::Inactivate(args) => item_json(&engine.inactivate(
            &args.uid,
            &args.author,
            args.description.as_deref(),
        )?),
        ItemAction::Reactivate(args) => item_json(&engine.reactivate(
            &args.uid,
            &args.author,
            args.description.as_deref(),
        )?),
        ItemAction::Delete { uid, author } => {
            let item = engine.delete(&uid, &author)?;
            json!({
                "uid": item.uid(),
                "erased": !item.is_deleted(),
                "is_deleted": item.is_deleted(),
            })
        }
        ItemAction::Show {
            uid,
            version,
            status,
            at,
        } => {
            let query = build_query(version, status, at)?;
            item_json(&engine.get(&uid, &query)?)
        }
        ItemAction::Versions { uid } => json!(engine.versions(&uid)?),
        ItemAction::History { uid } => json!(engine.history(&uid)?),
        ItemAction::Actions { uid } => json!(engine.possible_actions(&uid)?),
        ItemAction::List { library, status } => {
            let filter = ItemFilter {
                library,
                status: status.as_deref().map(str::parse::<ItemStatus>).transpose()?,
            };
            let items = engine.list(&filter)?;
            Value::Array(items.iter().map(item_json).collect())
        }
    };
    Ok(data)
}

fn audit(config_path: &Path, page: Page) -> CliResult<Value> {
    let workspace = Workspace::open(config_path)?;
    Ok(json!(workspace.engine.audit_trail(page)?))
}

/// Payload from `--payload` or, when absent, stdin.
fn parse_payload(inline: Option<String>) -> CliResult<GenericPayload> {
    let value = match inline {
        Some(text) => serde_json::from_str(&text)
            .map_err(|e| CliError::invalid_argument(format!("Invalid payload JSON: {}", e)))?,
        None => read_request()?,
    };
    serde_json::from_value(value)
        .map_err(|e| CliError::invalid_argument(format!("Invalid payload: {}", e)))
}

fn build_query(
    version: Option<String>,
    status: Option<String>,
    at: Option<String>,
) -> CliResult<FindQuery> {
    let mut query = FindQuery::latest();
    if let Some(version) = version {
        query = query.with_version(version.parse::<VersionNumber>()?);
    }
    if let Some(status) = status {
        query = query.with_status(status.parse::<ItemStatus>()?);
    }
    if let Some(at) = at {
        let at = at
            .parse::<DateTime<Utc>>()
            .map_err(|e| CliError::invalid_argument(format!("Invalid --at '{}': {}", at, e)))?;
        query = query.at(at);
    }
    Ok(query)
}

fn item_json(item: &LifecycleItem<GenericPayload>) -> Value {
    json!({
        "uid": item.uid(),
        "library": item.library().name(),
        "metadata": item.metadata(),
        "payload": item.payload(),
        "revision": item.revision(),
        "is_current": item.is_current(),
        "is_deleted": item.is_deleted(),
        "possible_actions": item.possible_actions(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir) -> std::path::PathBuf {
        let path = dir.path().join("mdr.json");
        let config = json!({
            "data_dir": dir.path().join("data").display().to_string(),
            "journal_sync": "none",
            "log_level": "error",
            "libraries": [{"name": "Sponsor"}, {"name": "CDISC", "is_editable": false}],
        });
        fs::write(&path, config.to_string()).unwrap();
        path
    }

    fn create_args(payload: &str) -> ItemAction {
        ItemAction::Create {
            library: "Sponsor".into(),
            author: "alice".into(),
            payload: Some(payload.into()),
        }
    }

    #[test]
    fn test_init_twice_fails() {
        let dir = TempDir::new().unwrap();
        let config = write_config(&dir);
        let data = init(&config).unwrap();
        assert_eq!(data["libraries"].as_array().unwrap().len(), 2);
        assert!(dir.path().join("data").join("journal").is_dir());

        let err = init(&config).unwrap_err();
        assert_eq!(err.code_str(), "MDR_CLI_ALREADY_INITIALIZED");
    }

    #[test]
    fn test_commands_require_init() {
        let dir = TempDir::new().unwrap();
        let config = write_config(&dir);
        let err = item(&config, ItemAction::Versions { uid: "Item_000001".into() }).unwrap_err();
        assert_eq!(err.code_str(), "MDR_CLI_NOT_INITIALIZED");
    }

    #[test]
    fn test_state_survives_invocations() {
        let dir = TempDir::new().unwrap();
        let config = write_config(&dir);
        init(&config).unwrap();

        let created = item(&config, create_args(r#"{"name": "Weight"}"#)).unwrap();
        assert_eq!(created["uid"], "Item_000001");
        assert_eq!(created["metadata"]["version"], "0.1");

        let approved = item(
            &config,
            ItemAction::Approve(TransitionArgs {
                uid: "Item_000001".into(),
                author: "bob".into(),
                description: None,
            }),
        )
        .unwrap();
        assert_eq!(approved["metadata"]["status"], "Final");
        assert_eq!(approved["revision"], 2);

        let shown = item(
            &config,
            ItemAction::Show {
                uid: "Item_000001".into(),
                version: Some("0.1".into()),
                status: None,
                at: None,
            },
        )
        .unwrap();
        assert_eq!(shown["metadata"]["status"], "Draft");

        let trail = audit(&config, Page::all()).unwrap();
        assert_eq!(trail.as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_library_changes_are_persisted() {
        let dir = TempDir::new().unwrap();
        let config = write_config(&dir);
        init(&config).unwrap();

        library(
            &config,
            LibraryAction::SetEditable {
                name: "CDISC".into(),
                editable: true,
            },
        )
        .unwrap();
        let listed = library(&config, LibraryAction::List).unwrap();
        let cdisc = listed
            .as_array()
            .unwrap()
            .iter()
            .find(|l| l["name"] == "CDISC")
            .cloned()
            .unwrap();
        assert_eq!(cdisc["is_editable"], true);
    }

    #[test]
    fn test_invalid_payload() {
        let dir = TempDir::new().unwrap();
        let config = write_config(&dir);
        init(&config).unwrap();

        let err = item(&config, create_args("{not json")).unwrap_err();
        assert_eq!(err.code_str(), "MDR_CLI_INVALID_ARGUMENT");
        let err = item(&config, create_args(r#"{"attributes": {}}"#)).unwrap_err();
        assert_eq!(err.code_str(), "MDR_CLI_INVALID_ARGUMENT");
    }
}
