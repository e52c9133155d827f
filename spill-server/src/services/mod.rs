pub mod analytics;
pub mod auth_service;
