pub mod counter_store;
pub mod memory_store;
pub mod redis_store;
pub mod sweep_service;
