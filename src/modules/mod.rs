pub mod books;

use bookstore_db::Database;
use bookstore_kernel::ModuleRegistry;

/// Register all service modules with the registry
pub fn register_all(registry: &mut ModuleRegistry, db: &Database) -> anyhow::Result<()> {
    registry.register(books::create_module(db.clone()))?;
    Ok(())
}
