//! Host extension point.
//!
//! Plugins register capability objects here instead of wrapping host
//! methods. The registry keeps weak references only: a plugin lives as long
//! as its owner keeps it, and dead entries are pruned on dispatch.

use log::debug;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

pub trait HostExtension: Send + Sync {
    fn name(&self) -> &str;

    /// Host is asked to fit its container. Return true if the extension
    /// took over the layout (the host then skips its default resize).
    fn on_resize_to_container(&self) -> bool {
        false
    }
}

#[derive(Default)]
pub struct Extensions {
    inner: Mutex<Vec<Weak<dyn HostExtension>>>,
}

impl Extensions {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Weak<dyn HostExtension>>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn register(&self, ext: &Arc<dyn HostExtension>) {
        self.lock().push(Arc::downgrade(ext));
    }

    /// Live extensions in registration order (prunes dead entries).
    pub fn live(&self) -> Vec<Arc<dyn HostExtension>> {
        let mut g = self.lock();
        g.retain(|w| w.strong_count() > 0);
        g.iter().filter_map(Weak::upgrade).collect()
    }

    /// Dispatch resize-to-container. Returns true if any extension handled it.
    pub fn dispatch_resize(&self) -> bool {
        // вызываем вне лока: расширение может обращаться к хосту
        let live = self.live();
        let mut handled = false;
        for ext in live {
            if ext.on_resize_to_container() {
                debug!("host: resize handled by extension '{}'", ext.name());
                handled = true;
            }
        }
        handled
    }

    pub fn len(&self) -> usize {
        self.live().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
