//! Sequential or pooled execution of root behaviors.
//!
//! The `cfg` logic for the `parallel` feature lives here so the tree's update loop stays the same
//! in both builds. Without the feature every pass is sequential.

#[cfg(feature = "parallel")]
use rayon::prelude::*;
#[cfg(feature = "parallel")]
use std::sync::OnceLock;

/// A lazily built, bounded rayon pool shared by every tree of a registry.
pub struct WorkerPool {
    max_threads: usize,
    #[cfg(feature = "parallel")]
    pool: OnceLock<Option<rayon::ThreadPool>>,
}

impl WorkerPool {
    pub fn new(max_threads: usize) -> Self {
        Self {
            max_threads: max_threads.max(1),
            #[cfg(feature = "parallel")]
            pool: OnceLock::new(),
        }
    }

    pub fn max_threads(&self) -> usize {
        self.max_threads
    }

    /// Map `f` over `items` in order, in parallel unless `force_sequential` is set.
    ///
    /// Results come back in index order either way.
    pub fn map_mut<T, R, F>(&self, items: &mut [T], f: F, force_sequential: bool) -> Vec<R>
    where
        T: Send,
        R: Send,
        F: Fn(usize, &mut T) -> R + Sync + Send,
    {
        #[cfg(feature = "parallel")]
        {
            if !force_sequential && items.len() > 1 {
                if let Some(pool) = self.pool() {
                    return pool.install(|| {
                        items
                            .par_iter_mut()
                            .enumerate()
                            .map(|(i, item)| f(i, item))
                            .collect()
                    });
                }
            }
            items.iter_mut().enumerate().map(|(i, item)| f(i, item)).collect()
        }

        #[cfg(not(feature = "parallel"))]
        {
            let _ = force_sequential;
            items.iter_mut().enumerate().map(|(i, item)| f(i, item)).collect()
        }
    }

    #[cfg(feature = "parallel")]
    fn pool(&self) -> Option<&rayon::ThreadPool> {
        self.pool
            .get_or_init(|| {
                let built = rayon::ThreadPoolBuilder::new()
                    .num_threads(self.max_threads)
                    .thread_name(|i| format!("arbor-worker-{i}"))
                    .build();
                match built {
                    Ok(pool) => Some(pool),
                    Err(err) => {
                        tracing::warn!(error = %err, "worker pool unavailable, running roots sequentially");
                        None
                    }
                }
            })
            .as_ref()
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_MAX_PARALLELISM)
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("max_threads", &self.max_threads)
            .finish()
    }
}
