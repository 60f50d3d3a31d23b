pub mod handlers;
pub mod models;
pub mod service;
pub mod store;
pub mod validation;
