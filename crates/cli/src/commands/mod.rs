pub mod backup;
pub mod inventory;
pub mod query;
pub mod settings;
pub mod tables;
