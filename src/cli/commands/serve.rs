//! Serve command - HTTP query boundary.

use crate::config::Settings;

/// Run the query server until Ctrl+C.
///
/// The runtime exists only for the server. The store is kept alive here so
/// its blocking HTTP client is dropped outside the runtime.
#[cfg(feature = "http-server")]
pub fn run(settings: &Settings, bind: Option<String>) -> anyhow::Result<()> {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::open_store;
    use crate::io::NoProgress;
    use crate::store::AutoOperator;

    let store = Arc::new(Mutex::new(
        open_store(settings)?
            .with_operator(Arc::new(AutoOperator::no()))
            .with_progress(Arc::new(NoProgress)),
    ));
    let bind = bind.unwrap_or_else(|| settings.server.bind.clone());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let served = runtime.block_on(crate::server::serve_http(
        store.clone(),
        settings.server.clone(),
        bind,
    ));
    drop(runtime);
    drop(store);
    served
}

#[cfg(not(feature = "http-server"))]
pub fn run(_settings: &Settings, _bind: Option<String>) -> anyhow::Result<()> {
    anyhow::bail!(
        "HTTP server support is not compiled in. Rebuild with: cargo build --features http-server"
    )
}
