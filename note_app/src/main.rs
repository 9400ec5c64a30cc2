//! Notes API: every generated operation of the `notes` resource, stored in a JSON file.
//!
//! Run from the repo root: `cargo run -p note-app` (file path from `JSON_DB_PATH`, default `db.json`).

use scaffold_sdk::externals::DEFAULT_STARTUP_TIMEOUT;
use scaffold_sdk::{
    telemetry, AppConfig, Externals, HttpApp, InputSchema, JsonFileExternal, OperationConfig, Repository,
    ResourceRoutes, Store, TimestampConfig, ValidationRule,
};
use std::sync::Arc;

fn note_schema() -> InputSchema {
    InputSchema::new()
        .field("title", ValidationRule::required().max_length(200))
        .field("body", ValidationRule::optional())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    telemetry::init();
    let config = AppConfig::from_env(&[])?;

    let externals = Externals::register(
        vec![Arc::new(JsonFileExternal::new(config.json_db_path.clone()))],
        DEFAULT_STARTUP_TIMEOUT,
    )
    .await?;
    let store: Arc<dyn Store> = externals.get::<JsonFileExternal>()?.store()?;
    tracing::info!(path = %config.json_db_path.display(), "notes stored in json file");

    let notes: Repository = Repository::new(store, "notes", TimestampConfig::both());
    let routes = ResourceRoutes::new("notes", notes)
        .create(OperationConfig::enabled().input(note_schema()))
        .get_all(OperationConfig::enabled())
        .get_by_id(OperationConfig::enabled())
        .update_by_id(OperationConfig::enabled().input(note_schema()))
        .delete_by_id(OperationConfig::enabled());

    HttpApp::new(config, externals).mount(routes)?.serve().await?;
    Ok(())
}
