//! SHELF Application Library
//!
//! Wires the book catalog modules to the kernel, store, access control, and
//! HTTP layers, and exposes the bootstrap used by the binary and the CLI.

pub mod modules;

use std::sync::Arc;

use anyhow::Context;

use shelf_authz::AccessControl;
use shelf_kernel::{settings::Settings, InitCtx, ModuleRegistry};
use shelf_store::RecordStore;

/// Build the registry with all application modules registered.
pub fn build_registry(
    store: &Arc<RecordStore>,
    access: &Arc<AccessControl>,
) -> ModuleRegistry {
    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, store, access);
    registry
}

/// Run the full application: initialize modules, seed when configured, and
/// serve HTTP until shutdown.
pub async fn run(settings: Settings) -> anyhow::Result<()> {
    let store = Arc::new(RecordStore::new());
    let access = Arc::new(AccessControl::new(settings.auth.api_tokens.clone()));
    let registry = build_registry(&store, &access);

    let ctx = InitCtx {
        settings: &settings,
        store: &store,
    };

    registry
        .init_all(&ctx)
        .await
        .context("module initialization failed")?;

    if settings.store.seed {
        registry.seed_all(&ctx).await.context("seeding failed")?;
        tracing::info!(records = store.len()?, "store seeded");
    }

    registry
        .start_all(&ctx)
        .await
        .context("module startup failed")?;

    let serve_result = shelf_http::start_server(&registry, &settings).await;

    registry.stop_all().await.context("module shutdown failed")?;

    serve_result
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn test_app() -> (ModuleRegistry, Arc<RecordStore>) {
        let store = Arc::new(RecordStore::new());
        let access = Arc::new(AccessControl::new(Vec::<String>::new()));
        let registry = build_registry(&store, &access);
        (registry, store)
    }

    #[tokio::test]
    async fn books_routes_mount_under_api_prefix() {
        let (registry, _store) = test_app();
        let settings = Settings::default();
        let router = shelf_http::build_router(&registry, &settings);

        let response = router
            .clone()
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = router
            .oneshot(
                Request::builder()
                    .uri("/api/books/")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn seed_hook_populates_the_store_once() {
        let (registry, store) = test_app();
        let settings = Settings::default();
        let ctx = InitCtx {
            settings: &settings,
            store: &store,
        };

        registry.seed_all(&ctx).await.unwrap();
        assert_eq!(store.len().unwrap(), 5);

        // A second pass must not duplicate the catalog.
        registry.seed_all(&ctx).await.unwrap();
        assert_eq!(store.len().unwrap(), 5);
    }
}
