/// Installs the global tracing subscriber.
///
/// Verbosity is controlled by `RUST_LOG`, e.g. `RUST_LOG=identity_lookup=debug`.
/// Calling it a second time is a no-op.
pub fn setup_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .try_init();
}
