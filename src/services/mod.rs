pub mod schema_service;
