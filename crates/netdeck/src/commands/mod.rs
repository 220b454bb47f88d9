pub mod devices;
pub mod service;
pub mod stack;
pub mod store;
pub mod tasks;
pub mod templates;
