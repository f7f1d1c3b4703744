use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::info;

pub mod builder;
pub mod charms;
pub mod context;
pub mod controller;
pub mod export;
pub mod hash;
pub mod logic;
pub mod progression;
pub mod randomizer;
pub mod settings;
pub mod state;
pub mod terms;
pub mod variables;
pub mod world;

pub use context::{ItemPlacement, RandoContext, TransitionPlacement};
pub use controller::{GenerationRecord, RandoController};
pub use export::{DirectoryExporter, Exporter, MemorySaveState, SaveStateSink};
pub use logic::{LogicParseError, Requirement};
pub use settings::{GenerationSettings, StartLocationType};
pub use terms::LogicManager;
pub use world::{World, WorldData};

#[derive(Debug, Error)]
pub enum RandoError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("logic error: {0}")]
    Logic(#[from] LogicParseError),
    #[error("could not place stage '{stage}' after {attempts} attempts")]
    Generation { stage: String, attempts: usize },
    #[error("no placement handler for item {item} at location {location}")]
    UnknownPlacement { item: String, location: String },
}

pub type Result<T> = std::result::Result<T, RandoError>;

/// Generates a seed from a world file and writes it under
/// `output_path/Knightrando_{seed}`.
pub fn run(
    settings: GenerationSettings,
    world_path: &Path,
    output_path: &Path,
) -> Result<GenerationRecord> {
    if !world_path.exists() {
        return Err(RandoError::Config(format!(
            "World file does not exist: {}",
            world_path.display()
        )));
    }

    let data = WorldData::from_path(world_path)?;
    let mut controller = RandoController::new(settings, &data)?;
    let record = controller.run()?.clone();

    // Each seed gets its own folder so repeated runs do not collide.
    let out_root = output_path.join(format!("Knightrando_{}", record.ctx.settings.seed));
    fs::create_dir_all(&out_root)?;

    let mut exporter = DirectoryExporter::new(&out_root);
    let mut save_state = MemorySaveState::default();
    controller.save(&mut exporter, &mut save_state)?;
    save_state.write_json(&out_root.join("save_state.json"))?;

    info!(path = %out_root.display(), hash = record.hash, "seed written");
    Ok(record)
}
