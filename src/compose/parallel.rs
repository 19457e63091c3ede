use rayon::prelude::*;

use crate::foundation::error::{StackError, StackResult};

/// Threading and chunking controls shared by every compositing and overlay operation.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ComposeThreading {
    /// Distribute work over a dedicated thread pool when `true`.
    pub parallel: bool,
    /// Optional explicit worker thread count. `None` uses rayon defaults.
    pub threads: Option<usize>,
    /// Samples per work unit for whole-buffer passes. `0` is treated as `1`.
    pub chunk_len: usize,
}

impl Default for ComposeThreading {
    fn default() -> Self {
        Self {
            parallel: true,
            threads: None,
            chunk_len: 16 * 1024,
        }
    }
}

/// Index-disjoint chunk runner.
///
/// Every operation hands its output slice (and optionally a second, equally chunked slice)
/// to one of the two primitives below. Chunks never alias, so no locking is needed; the call
/// returns once every chunk has finished.
pub(crate) struct Workers {
    pool: Option<rayon::ThreadPool>,
    chunk_len: usize,
}

impl Workers {
    pub(crate) fn new(threading: &ComposeThreading) -> StackResult<Self> {
        let pool = if threading.parallel {
            Some(build_thread_pool(threading.threads)?)
        } else {
            None
        };
        Ok(Self {
            pool,
            chunk_len: threading.chunk_len.max(1),
        })
    }

    pub(crate) fn serial() -> Self {
        Self {
            pool: None,
            chunk_len: usize::MAX,
        }
    }

    /// Default chunk length for whole-buffer passes.
    pub(crate) fn chunk_len(&self) -> usize {
        self.chunk_len
    }

    /// Run `f(offset, chunk)` over `len`-sized chunks of `buf` and collect the results in
    /// chunk order.
    pub(crate) fn chunks<T, R, F>(&self, buf: &mut [T], len: usize, f: F) -> Vec<R>
    where
        T: Send,
        R: Send,
        F: Fn(usize, &mut [T]) -> R + Sync + Send,
    {
        let len = len.max(1);
        match &self.pool {
            Some(pool) => pool.install(|| {
                buf.par_chunks_mut(len)
                    .enumerate()
                    .map(|(i, chunk)| f(i * len, chunk))
                    .collect()
            }),
            None => buf
                .chunks_mut(len)
                .enumerate()
                .map(|(i, chunk)| f(i * len, chunk))
                .collect(),
        }
    }

    /// Like [`Workers::chunks`] over two equally long slices chunked in lockstep.
    pub(crate) fn chunks2<A, B, R, F>(&self, a: &mut [A], b: &mut [B], len: usize, f: F) -> Vec<R>
    where
        A: Send,
        B: Send,
        R: Send,
        F: Fn(usize, &mut [A], &mut [B]) -> R + Sync + Send,
    {
        debug_assert_eq!(a.len(), b.len());
        let len = len.max(1);
        match &self.pool {
            Some(pool) => pool.install(|| {
                a.par_chunks_mut(len)
                    .zip(b.par_chunks_mut(len))
                    .enumerate()
                    .map(|(i, (ca, cb))| f(i * len, ca, cb))
                    .collect()
            }),
            None => a
                .chunks_mut(len)
                .zip(b.chunks_mut(len))
                .enumerate()
                .map(|(i, (ca, cb))| f(i * len, ca, cb))
                .collect(),
        }
    }
}

fn build_thread_pool(threads: Option<usize>) -> StackResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(StackError::validation(
            "compose threading 'threads' must be >= 1 when set",
        ));
    }

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| StackError::validation(format!("failed to build rayon thread pool: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/compose/parallel.rs"]
mod tests;
