pub mod app_factory;
pub mod config;
pub mod models;
pub mod open_api_spec;
pub mod repos;
pub mod routes;
pub mod services;
#[cfg(test)]
mod test_tools;

/// Installs the global log subscriber. Call once per binary.
pub fn init_tracing() {
    tracing_subscriber::fmt().with_target(false).init();
}

/// Installs the global log subscriber for tests, writing through the test
/// harness. Later calls are no-ops.
pub(crate) fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_target(false)
        .with_test_writer()
        .try_init();
}
