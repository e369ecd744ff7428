use std::future::Future;

use futures::stream::{self, Stream};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

use crate::store::StoreChange;

/// Turns store change notifications into a stream of full snapshots.
///
/// The first item is the current snapshot. After that a new snapshot is
/// loaded whenever a change satisfying `relevant` arrives. A lagging
/// receiver skips the missed notifications and reloads once. The stream ends
/// when the change channel closes.
pub fn snapshot_stream<T, P, L, Fut>(
    receiver: broadcast::Receiver<StoreChange>,
    relevant: P,
    load: L,
) -> impl Stream<Item = T> + Send
where
    T: Send + 'static,
    P: Fn(&StoreChange) -> bool + Send + 'static,
    L: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = T> + Send,
{
    stream::unfold(
        (receiver, relevant, load, true),
        |(mut receiver, relevant, load, first)| async move {
            if !first {
                loop {
                    match receiver.recv().await {
                        Ok(change) if relevant(&change) => {
                            debug!("Reloading snapshot after {:?}", change);
                            break;
                        }
                        Ok(_) => continue,
                        Err(RecvError::Lagged(skipped)) => {
                            warn!("Live subscriber lagged by {} change(s), reloading", skipped);
                            break;
                        }
                        Err(RecvError::Closed) => return None,
                    }
                }
            }

            let snapshot = load().await;
            Some((snapshot, (receiver, relevant, load, false)))
        },
    )
}
