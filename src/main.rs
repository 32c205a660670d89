use std::sync::Arc;

use actix_web::web;
use employee_registry::config::{AppConfig, Backend};
use employee_registry::routes::{self, ApiDoc, AppState};
use employee_registry::store::{EmployeeStore, MemoryStore, MongoStore};
use mongodb::Client;
use shuttle_actix_web::ShuttleActixWeb;
use shuttle_runtime::SecretStore;
use shuttle_runtime::__internals::Context;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[shuttle_runtime::main]
async fn main(
    #[shuttle_runtime::Secrets] secrets: SecretStore,
) -> ShuttleActixWeb<impl FnOnce(&mut web::ServiceConfig) + Send + Clone + 'static> {
    let config = AppConfig::from_lookup(|key| secrets.get(key)).context("invalid configuration")?;

    let store: Arc<dyn EmployeeStore> = match &config.backend {
        Backend::Mongo { uri } => {
            let client = Client::with_uri_str(uri)
                .await
                .context("connecting to MongoDB")?;
            let store = MongoStore::new(&client, &config.database, &config.collection);
            store
                .ensure_indexes()
                .await
                .context("creating employee indexes")?;
            tracing::info!(
                database = %config.database,
                collection = %config.collection,
                "using MongoDB employee store"
            );
            Arc::new(store)
        }
        Backend::Memory => {
            tracing::warn!("using in-memory employee store; records are lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let state = web::Data::new(AppState::new(store, config.page_size));

    let service = move |cfg: &mut web::ServiceConfig| {
        cfg.app_data(state.clone())
            .configure(routes::configure)
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            );
    };

    Ok(service.into())
}
