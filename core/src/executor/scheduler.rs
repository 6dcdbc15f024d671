use std::sync::Arc;

use futures::stream::FuturesUnordered;
use futures::StreamExt;
use tokio::sync::Semaphore;

use crate::error::ExecutorError;
use crate::task::TaskIdentifier;

use super::resolver::Resolver;

/// Resolve every root concurrently, each on its own tokio task.
///
/// At most `max_concurrency` roots are in flight at once; shared dependencies
/// are still executed only once thanks to the resolver's memo. The first
/// error (a cycle found at resolution time, or a panicked worker) aborts the
/// remaining roots and is returned.
pub async fn dispatch_roots(
    roots: &[TaskIdentifier],
    resolver: Arc<Resolver>,
    max_concurrency: usize,
) -> Result<usize, ExecutorError> {
    let sem = Arc::new(Semaphore::new(max_concurrency.max(1)));
    let mut futs: FuturesUnordered<_> = FuturesUnordered::new();

    for root in roots {
        let root = root.clone();
        let sem = sem.clone();
        let resolver = resolver.clone();

        futs.push(tokio::spawn(async move {
            let _permit = sem
                .acquire_owned()
                .await
                .map_err(|_| ExecutorError::Join("semaphore closed unexpectedly".into()))?;

            resolver.resolve(&root, &[]).await.map(|_| ())
        }));
    }

    let mut completed = 0;
    while let Some(joined) = futs.next().await {
        let err = match joined {
            Ok(Ok(())) => {
                completed += 1;
                continue;
            }
            Ok(Err(e)) => e,
            Err(join_err) => ExecutorError::Join(join_err.to_string()),
        };
        for handle in futs.iter() {
            handle.abort();
        }
        return Err(err);
    }

    Ok(completed)
}
