//! Best-effort registration of new chains with the catalog

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedSender;

use shared::RegisterChainRequest;

use crate::catalog::Catalog;

use super::CacheEvent;

/// Send `request` on a detached task; the outcome comes back as
/// [`CacheEvent::Registered`] and is never awaited by the caller.
pub(crate) fn spawn_registration<C: Catalog>(
    runtime: &Handle,
    catalog: Arc<C>,
    request: RegisterChainRequest,
    events: UnboundedSender<CacheEvent>,
) {
    runtime.spawn(async move {
        let symbol = request.symbol.clone();
        let result = catalog.register_chain(request).await;
        // receiver gone means the session ended; nothing left to report to
        let _ = events.send(CacheEvent::Registered { symbol, result });
    });
}
