//! Server: the `users` resource and the auth routes on PostgreSQL.

use scaffold_sdk::externals::DEFAULT_STARTUP_TIMEOUT;
use scaffold_sdk::{
    telemetry, users_routes, AppConfig, AuthConfig, AuthRoutes, AuthService, Externals, HttpApp, PostgresExternal,
    Repository, Store, TimestampConfig, User, USERS_COLLECTION,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    telemetry::init();
    let config = AppConfig::from_env(&["DATABASE_URL", "JWT_SECRET"])?;
    let auth_config = AuthConfig::from_app_config(&config)?;

    let externals = Externals::register(
        vec![Arc::new(PostgresExternal::from_app_config(&config)?)],
        DEFAULT_STARTUP_TIMEOUT,
    )
    .await?;
    let store: Arc<dyn Store> = externals.get::<PostgresExternal>()?.store()?;

    let users: Repository<User> = Repository::new(store, USERS_COLLECTION, TimestampConfig::both());
    let auth = AuthService::new(auth_config, users);

    HttpApp::new(config, externals)
        .mount(users_routes(&auth))?
        .mount(AuthRoutes::new(auth))?
        .serve()
        .await?;
    Ok(())
}
