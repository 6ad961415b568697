// Entity records and their references
pub mod model;

// Entity store abstraction and backends
pub mod store;

// Foreign key checks run before insert
pub mod validation;

// Create/list/get per entity type
pub mod service;

// HTTP transport
pub mod api;

// File + environment configuration
pub mod config;
