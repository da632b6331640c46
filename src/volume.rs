//! Label volumes and the one-shot readiness gate guarding them.

use crate::traits::LabelVolume;
use log::info;
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;

/// A fully materialised label grid, indexed `[ap][ml][dv]` with `dv` fastest.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseLabelVolume {
    dimensions: [usize; 3],
    labels: Vec<i32>,
}

impl DenseLabelVolume {
    /// Returns `None` when `labels` does not match `dimensions`.
    pub fn new(dimensions: [usize; 3], labels: Vec<i32>) -> Option<Self> {
        let expected = dimensions.iter().product::<usize>();
        (labels.len() == expected).then_some(Self { dimensions, labels })
    }

    /// Build a volume by evaluating `f(ix, iy, iz)` at every voxel.
    pub fn from_fn(dimensions: [usize; 3], mut f: impl FnMut(usize, usize, usize) -> i32) -> Self {
        let [nx, ny, nz] = dimensions;
        let mut labels = Vec::with_capacity(nx * ny * nz);
        for ix in 0..nx {
            for iy in 0..ny {
                for iz in 0..nz {
                    labels.push(f(ix, iy, iz));
                }
            }
        }
        Self { dimensions, labels }
    }

    /// Every voxel outside tissue.
    pub fn empty(dimensions: [usize; 3]) -> Self {
        Self::from_fn(dimensions, |_, _, _| 0)
    }

    fn offset(&self, ix: i64, iy: i64, iz: i64) -> Option<usize> {
        let [nx, ny, nz] = self.dimensions;
        let ix = usize::try_from(ix).ok().filter(|i| *i < nx)?;
        let iy = usize::try_from(iy).ok().filter(|i| *i < ny)?;
        let iz = usize::try_from(iz).ok().filter(|i| *i < nz)?;
        Some((ix * ny + iy) * nz + iz)
    }
}

impl LabelVolume for DenseLabelVolume {
    fn dimensions(&self) -> [usize; 3] {
        self.dimensions
    }

    fn label_at(&self, ix: i64, iy: i64, iz: i64) -> i32 {
        self.offset(ix, iy, iz).map_or(0, |i| self.labels[i])
    }
}

/// Blocks surface queries until the label volume has been handed over by its loader.
///
/// The volume can be provided from any thread; readers either wait on it or poll.
#[derive(Debug)]
pub struct VolumeGate<V: ?Sized> {
    slot: Mutex<Option<Arc<V>>>,
    ready: Condvar,
}

impl<V: ?Sized> Default for VolumeGate<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: ?Sized> VolumeGate<V> {
    pub const fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            ready: Condvar::new(),
        }
    }

    /// Hand over the loaded volume and wake every waiter. A second call replaces it.
    pub fn provide(&self, volume: Arc<V>) {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(volume);
        info!("label volume ready");
        self.ready.notify_all();
    }

    pub fn is_ready(&self) -> bool {
        self.get().is_some()
    }

    /// The volume if it has arrived, without blocking.
    pub fn get(&self) -> Option<Arc<V>> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Block until the volume is provided.
    pub fn wait(&self) -> Arc<V> {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if let Some(volume) = slot.as_ref() {
                return Arc::clone(volume);
            }
            slot = self.ready.wait(slot).unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Block for at most `timeout`; `None` if the volume is still missing.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Arc<V>> {
        let slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        let (slot, _) = self
            .ready
            .wait_timeout_while(slot, timeout, |slot| slot.is_none())
            .unwrap_or_else(PoisonError::into_inner);
        slot.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn dense_volume_reads_zero_out_of_range() {
        let v = DenseLabelVolume::from_fn([2, 3, 4], |x, y, z| (x * 100 + y * 10 + z) as i32 + 1);
        assert_eq!(v.label_at(1, 2, 3), 124);
        assert_eq!(v.label_at(0, 0, 0), 1);
        assert_eq!(v.label_at(2, 0, 0), 0);
        assert_eq!(v.label_at(-1, 0, 0), 0);
        assert!(DenseLabelVolume::new([2, 2, 2], vec![0; 7]).is_none());
    }

    #[test]
    fn gate_releases_waiter_once_provided() {
        let gate: Arc<VolumeGate<DenseLabelVolume>> = Arc::new(VolumeGate::new());
        assert!(gate.get().is_none());
        assert!(gate.wait_timeout(Duration::from_millis(5)).is_none());

        let loader = Arc::clone(&gate);
        let handle = thread::spawn(move || {
            loader.provide(Arc::new(DenseLabelVolume::empty([1, 1, 1])));
        });
        let volume = gate.wait();
        handle.join().unwrap();
        assert_eq!(volume.dimensions(), [1, 1, 1]);
        assert!(gate.is_ready());
    }
}
