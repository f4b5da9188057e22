// Модуль хранилища ключей (in-memory; персистентность вне подсистемы)

pub mod memory;
pub mod models;

pub use memory::KeyStore;
pub use models::{DerivedProperties, KeyMaterial, KeyPolicy};
