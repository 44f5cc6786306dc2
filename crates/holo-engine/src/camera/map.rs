use std::cell::RefCell;
use std::collections::HashMap;

use parking_lot::Mutex;

use crate::holographic::{CameraId, HolographicCamera};

use super::CameraResources;

/// Camera table handed to [`CameraResourceMap::with_cameras`] callbacks.
pub type CameraTable = HashMap<CameraId, CameraResources>;

thread_local! {
    /// Addresses of the maps whose callbacks are running on this thread.
    static OPEN_SCOPES: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
}

/// Marks the current thread as inside one map's callback.
struct ScopeGuard {
    owner: usize,
}

impl ScopeGuard {
    fn enter(map: &CameraResourceMap) -> Self {
        let owner = map as *const CameraResourceMap as usize;
        OPEN_SCOPES.with(|scopes| {
            let mut scopes = scopes.borrow_mut();
            assert!(
                !scopes.contains(&owner),
                "camera resources accessed re-entrantly; callbacks must not lock the camera map again"
            );
            scopes.push(owner);
        });
        ScopeGuard { owner }
    }
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        OPEN_SCOPES.with(|scopes| {
            let mut scopes = scopes.borrow_mut();
            if let Some(at) = scopes.iter().rposition(|&open| open == self.owner) {
                scopes.remove(at);
            }
        });
    }
}

/// Per-camera resources keyed by camera id, shared between the render thread
/// and the runtime's notification thread.
///
/// All access goes through [`with_cameras`](Self::with_cameras). Callbacks run
/// under one non-reentrant lock and must not call back into the map; doing so
/// panics instead of deadlocking.
#[derive(Default)]
pub struct CameraResourceMap {
    cameras: Mutex<CameraTable>,
}

impl CameraResourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` with exclusive access to the camera table.
    pub fn with_cameras<R>(&self, f: impl FnOnce(&mut CameraTable) -> R) -> R {
        let _scope = ScopeGuard::enter(self);
        let mut cameras = self.cameras.lock();
        f(&mut cameras)
    }

    /// "Camera added" notification. An existing entry with the same id is replaced.
    pub fn add_camera(&self, camera: HolographicCamera) {
        let replaced = self.with_cameras(|cameras| {
            cameras.insert(camera.id, CameraResources::new(camera))
        });
        match replaced {
            Some(_) => log::debug!("camera {} re-added; previous resources dropped", camera.id),
            None => log::info!("camera {} added (stereo={})", camera.id, camera.is_stereo),
        }
    }

    /// "Camera removed" notification. Returns whether the camera was known.
    pub fn remove_camera(&self, id: CameraId) -> bool {
        let removed = self.with_cameras(|cameras| {
            cameras.remove(&id).map(|mut resources| {
                resources.release_resources_for_back_buffer();
            })
        });
        if removed.is_some() {
            log::info!("camera {id} removed");
        }
        removed.is_some()
    }

    /// Releases every camera's back-buffer resources, keeping the entries.
    ///
    /// Returns the number of cameras visited.
    pub fn release_all(&self) -> usize {
        self.with_cameras(|cameras| {
            for resources in cameras.values_mut() {
                resources.release_resources_for_back_buffer();
            }
            cameras.len()
        })
    }

    /// Camera ids, ascending.
    pub fn ids(&self) -> Vec<CameraId> {
        let mut ids = self.with_cameras(|cameras| cameras.keys().copied().collect::<Vec<_>>());
        ids.sort_unstable();
        ids
    }

    pub fn contains(&self, id: CameraId) -> bool {
        self.with_cameras(|cameras| cameras.contains_key(&id))
    }

    pub fn len(&self) -> usize {
        self.with_cameras(|cameras| cameras.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn camera(id: CameraId) -> HolographicCamera {
        HolographicCamera {
            id,
            is_stereo: true,
            is_opaque: false,
        }
    }

    // ── add / remove ──────────────────────────────────────────────────────

    #[test]
    fn add_then_remove() {
        let map = CameraResourceMap::new();
        map.add_camera(camera(1));
        map.add_camera(camera(2));
        assert_eq!(map.ids(), vec![1, 2]);

        assert!(map.remove_camera(1));
        assert_eq!(map.ids(), vec![2]);
        assert!(!map.remove_camera(1));
    }

    #[test]
    fn re_adding_replaces_entry() {
        let map = CameraResourceMap::new();
        map.add_camera(camera(7));
        map.add_camera(HolographicCamera {
            is_opaque: true,
            ..camera(7)
        });

        assert_eq!(map.len(), 1);
        assert!(map.with_cameras(|cameras| cameras[&7].is_opaque()));
    }

    // ── release ───────────────────────────────────────────────────────────

    #[test]
    fn release_without_create_keeps_entry() {
        let map = CameraResourceMap::new();
        map.add_camera(camera(3));

        map.with_cameras(|cameras| {
            let resources = cameras.get_mut(&3).unwrap();
            resources.release_resources_for_back_buffer();
            resources.release_resources_for_back_buffer();
        });

        assert!(map.contains(3));
        assert!(map.with_cameras(|cameras| !cameras[&3].has_back_buffer()));
    }

    #[test]
    fn release_all_keeps_every_id() {
        let map = CameraResourceMap::new();
        for id in [4, 9, 11] {
            map.add_camera(camera(id));
        }

        assert_eq!(map.release_all(), 3);
        assert_eq!(map.ids(), vec![4, 9, 11]);
        map.with_cameras(|cameras| {
            assert!(cameras.values().all(|c| !c.has_back_buffer() && !c.is_frame_pending()));
        });
    }

    // ── locking ───────────────────────────────────────────────────────────

    #[test]
    #[should_panic(expected = "re-entrantly")]
    fn nested_access_panics() {
        let map = CameraResourceMap::new();
        map.with_cameras(|_| map.len());
    }

    #[test]
    fn another_map_inside_callback_is_allowed() {
        let headset = CameraResourceMap::new();
        let spectator = CameraResourceMap::new();
        spectator.add_camera(camera(5));

        let seen = headset.with_cameras(|_| spectator.ids());
        assert_eq!(seen, vec![5]);
        assert!(headset.is_empty());
    }

    #[test]
    #[should_panic(expected = "re-entrantly")]
    fn nested_access_through_another_map_still_panics() {
        let outer = CameraResourceMap::new();
        let inner = CameraResourceMap::new();
        outer.with_cameras(|_| inner.with_cameras(|_| outer.len()));
    }

    #[test]
    fn scope_is_cleared_after_callback() {
        let map = CameraResourceMap::new();
        map.with_cameras(|_| ());
        assert!(map.is_empty());
    }

    #[test]
    fn notifications_from_another_thread() {
        let map = Arc::new(CameraResourceMap::new());
        let runtime = {
            let map = Arc::clone(&map);
            std::thread::spawn(move || {
                for id in 0..32 {
                    map.add_camera(camera(id));
                }
                for id in (0..32).filter(|id| id % 2 == 1) {
                    map.remove_camera(id);
                }
            })
        };

        for _ in 0..32 {
            map.with_cameras(|cameras| {
                for resources in cameras.values_mut() {
                    resources.release_resources_for_back_buffer();
                }
            });
        }
        runtime.join().unwrap();

        assert_eq!(map.ids(), (0..32).filter(|id| id % 2 == 0).collect::<Vec<_>>());
    }
}
