pub mod refresh_service;
pub mod scheduler;
