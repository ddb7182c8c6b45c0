use core::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, OnceLock};

/// Allocates globally unique names for generated variables and tensors.
///
/// The allocator is a cheap cloneable handle over a shared counter, so it can
/// be injected into builders and cloned across threads while still producing
/// unique names. [`NameAllocator::process_wide`] returns the instance backing
/// the public entry points; independent instances created with `default` are
/// useful in tests where deterministic names are wanted.
#[derive(Debug, Clone, Default)]
pub struct NameAllocator {
    counter: Arc<AtomicU32>,
}

impl NameAllocator {
    /// The shared process-wide allocator.
    ///
    /// Names drawn from it are unique across every compilation in the
    /// process, including compilations running concurrently.
    pub fn process_wide() -> NameAllocator {
        static INSTANCE: OnceLock<NameAllocator> = OnceLock::new();
        INSTANCE.get_or_init(NameAllocator::default).clone()
    }

    /// Return `prefix` extended with a fresh id, e.g. `kk_42`.
    pub fn unique(&self, prefix: &str) -> String {
        let id = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("{prefix}_{id}")
    }
}
