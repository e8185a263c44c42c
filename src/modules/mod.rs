pub mod books;

use std::sync::Arc;

use shelf_authz::AccessControl;
use shelf_kernel::ModuleRegistry;
use shelf_store::RecordStore;

/// Register all project-specific modules with the registry.
pub fn register_all(
    registry: &mut ModuleRegistry,
    store: &Arc<RecordStore>,
    access: &Arc<AccessControl>,
) {
    registry.register_custom(books::create_module(store.clone(), access.clone()));
}
