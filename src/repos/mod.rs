pub mod schema_repo;
