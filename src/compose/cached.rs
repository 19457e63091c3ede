use crate::{
    compose::full::{first_opaque, visible_top_down},
    compose::parallel::Workers,
    foundation::core::{PixelBuffer, Shape},
    foundation::error::{StackError, StackResult},
    stack::stack::LayerStack,
};

/// Per-sample record of the layer that resolved each sample in the previous cached composite.
///
/// An owner of `0` means "resolved to base" and is a valid state. Alongside the owners the
/// cache remembers which stack it was synchronised with, how many layers that stack had and
/// their visibility, which is what lets [`compose_cached`] limit its work to layers that
/// changed since then.
#[derive(Clone, Debug)]
pub struct HistoryCache {
    owners: Vec<u32>,
    stack_id: Option<u64>,
    synced_layers: usize,
    synced_visibility: Vec<bool>,
}

impl HistoryCache {
    /// All-base cache sized for buffers of `shape`.
    pub fn new(shape: Shape) -> StackResult<Self> {
        shape.validate()?;
        Ok(Self {
            owners: vec![0; shape.sample_count()],
            stack_id: None,
            synced_layers: 1,
            synced_visibility: vec![true],
        })
    }

    /// Number of entries (one per sample).
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    /// `true` for a cache sized for an empty image.
    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    /// Layer that resolved sample `i` last time, if `i` is in range.
    pub fn owner(&self, i: usize) -> Option<usize> {
        self.owners.get(i).map(|&o| o as usize)
    }

    /// Layer count of the stack at the last synchronisation.
    pub fn synced_layers(&self) -> usize {
        self.synced_layers
    }

    /// Forget everything; the next cached composite does a full scan.
    pub fn reset(&mut self) {
        self.owners.fill(0);
        self.stack_id = None;
        self.synced_layers = 1;
        self.synced_visibility.clear();
        self.synced_visibility.push(true);
    }

    /// Visible layers whose contribution may differ from the last synchronisation, top-down:
    /// layers pushed since then, plus layers toggled back to visible.
    fn changed_visible<'a>(&self, stack: &'a LayerStack) -> Vec<(usize, &'a [u8])> {
        let vis = stack.visibility();
        let synced = self.synced_layers.min(stack.layer_count());
        (1..stack.layer_count())
            .rev()
            .filter(|&k| vis[k] && (k >= synced || !self.synced_visibility[k]))
            .map(|k| (k, stack.samples(k)))
            .collect()
    }
}

/// Counters describing how a cached composite resolved its samples.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ComposeStats {
    /// Samples processed.
    pub samples: u64,
    /// Samples resolved by a layer pushed or re-shown since the previous call.
    pub changed_hits: u64,
    /// Samples whose cached owner was reused without scanning.
    pub cached_hits: u64,
    /// Samples that needed a scan below a hidden owner.
    pub rescans: u64,
}

impl ComposeStats {
    fn merge(mut self, other: Self) -> Self {
        self.samples += other.samples;
        self.changed_hits += other.changed_hits;
        self.cached_hits += other.cached_hits;
        self.rescans += other.rescans;
        self
    }
}

/// Topmost-wins flatten that reuses the previous call's per-sample owners.
///
/// For a sample owned by layer `o` only three things can change its result: a layer above
/// `o` that was pushed or re-shown since the last sync, or `o` itself being hidden. So each
/// sample first checks the changed layers above `o` (just the new topmost layer in the common
/// one-push-per-frame case), then reuses `o`, and only scans below `o` when `o` was hidden.
/// Output always equals [`compose_full`](crate::compose::full::compose_full).
pub(crate) fn compose_cached(
    stack: &LayerStack,
    history: &mut HistoryCache,
    workers: &Workers,
) -> StackResult<(PixelBuffer, ComposeStats)> {
    let shape = stack.shape();
    if history.len() != shape.sample_count() {
        return Err(StackError::shape(format!(
            "history cache has {} entries, stack shape {shape} has {} samples",
            history.len(),
            shape.sample_count()
        )));
    }
    if history.stack_id != Some(stack.id()) || history.synced_layers > stack.layer_count() {
        if history.stack_id.is_some() {
            tracing::debug!(
                synced_layers = history.synced_layers,
                layers = stack.layer_count(),
                "history cache reset"
            );
        }
        history.reset();
    }

    let changed = history.changed_visible(stack);
    let all = visible_top_down(stack);
    let vis = stack.visibility();
    let layers: Vec<&[u8]> = (0..stack.layer_count()).map(|k| stack.samples(k)).collect();

    let mut out = vec![0u8; shape.sample_count()];
    let stats = workers
        .chunks2(
            &mut out,
            &mut history.owners,
            workers.chunk_len(),
            |offset, out_chunk, owner_chunk| {
                let mut st = ComposeStats::default();
                for (j, (dst, owner)) in out_chunk.iter_mut().zip(owner_chunk.iter_mut()).enumerate()
                {
                    let i = offset + j;
                    let o = *owner as usize;
                    st.samples += 1;

                    let fresh = changed
                        .iter()
                        .take_while(|&&(k, _)| k > o)
                        .find(|&&(_, samples)| samples[i] != 0);
                    if let Some(&(k, samples)) = fresh {
                        *dst = samples[i];
                        *owner = k as u32;
                        st.changed_hits += 1;
                    } else if o == 0 || vis[o] {
                        *dst = layers[o][i];
                        st.cached_hits += 1;
                    } else {
                        let below = all.iter().position(|&(k, _)| k < o).unwrap_or(all.len());
                        match first_opaque(&all[below..], i) {
                            Some((k, v)) => {
                                *dst = v;
                                *owner = k as u32;
                            }
                            None => {
                                *dst = layers[0][i];
                                *owner = 0;
                            }
                        }
                        st.rescans += 1;
                    }
                }
                st
            },
        )
        .into_iter()
        .fold(ComposeStats::default(), ComposeStats::merge);

    history.stack_id = Some(stack.id());
    history.synced_layers = stack.layer_count();
    history.synced_visibility.clear();
    history.synced_visibility.extend_from_slice(vis);

    Ok((PixelBuffer::from_samples(shape, out), stats))
}

#[cfg(test)]
#[path = "../../tests/unit/compose/cached.rs"]
mod tests;
