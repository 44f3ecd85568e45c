pub mod books;

use bookshelf_db::SharedStore;
use bookshelf_kernel::ModuleRegistry;

/// Register all project-specific modules with the registry
pub fn register_all(registry: &mut ModuleRegistry, store: SharedStore) -> anyhow::Result<()> {
    registry.register(books::create_module(store))?;
    Ok(())
}
