//! Process-wide classifier slot
//!
//! Components receive their `Arc<Classifier>` explicitly. This slot exists
//! for the outermost composition boundary only (e.g. signal handlers or
//! embedding hosts that cannot thread a reference through), and its lifecycle
//! is explicit: nothing is registered until [`configure`] is called.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::service::Classifier;

static CURRENT: RwLock<Option<Arc<Classifier>>> = parking_lot::const_rwlock(None);

/// Install `classifier` as the process-wide instance, returning the previous one
pub fn configure(classifier: Arc<Classifier>) -> Option<Arc<Classifier>> {
    CURRENT.write().replace(classifier)
}

/// The registered instance, if any
pub fn current() -> Option<Arc<Classifier>> {
    CURRENT.read().clone()
}

/// Clear the slot, returning what was registered
pub fn reset() -> Option<Arc<Classifier>> {
    CURRENT.write().take()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_configure_current_reset() {
        let first = Arc::new(Classifier::start(&Config::default()).unwrap());
        let second = Arc::new(Classifier::start(&Config::default()).unwrap());

        reset();
        assert!(current().is_none());

        assert!(configure(first.clone()).is_none());
        assert!(Arc::ptr_eq(&current().unwrap(), &first));

        let previous = configure(second.clone()).unwrap();
        assert!(Arc::ptr_eq(&previous, &first));

        let cleared = reset().unwrap();
        assert!(Arc::ptr_eq(&cleared, &second));
        assert!(current().is_none());
    }
}
