pub mod app_config;
pub mod database;
pub mod order_repo;
pub mod memory;

pub use database::DbClient;
pub use memory::MemoryOrderStore;
pub use order_repo::PgOrderStore;
