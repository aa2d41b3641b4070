use std::collections::HashMap;

use pawnlink_amx::Amx;

use crate::dispatch::DispatchError;

/// Process-wide map of resolved native functions.
///
/// One resolver replaces per-function global bindings: entries are
/// populated lazily at first use and dropped wholesale with [`reset`]
/// when the VM module is detached or reloaded (every cached handle is
/// stale at that point).
///
/// [`reset`]: NativeResolver::reset
pub struct NativeResolver<N> {
    cache: HashMap<String, N>,
}

impl<N: Copy> NativeResolver<N> {
    pub fn new() -> Self {
        Self {
            cache: HashMap::new(),
        }
    }

    /// Warn-mode lookup: a miss is logged and yields `None`. Legacy call
    /// sites fall back to a default result on a miss.
    pub fn resolve<A: Amx<Native = N>>(&mut self, amx: &A, name: &str) -> Option<N> {
        let found = self.lookup(amx, name);
        if found.is_none() {
            log::warn!("could not find native {name}");
        }
        found
    }

    /// Required-mode lookup: a miss is an error the caller raises.
    pub fn resolve_required<A: Amx<Native = N>>(
        &mut self,
        amx: &A,
        name: &str,
    ) -> Result<N, DispatchError> {
        self.lookup(amx, name)
            .ok_or_else(|| DispatchError::UnknownNative {
                name: name.to_owned(),
            })
    }

    fn lookup<A: Amx<Native = N>>(&mut self, amx: &A, name: &str) -> Option<N> {
        if let Some(&native) = self.cache.get(name) {
            return Some(native);
        }
        let native = amx.find_native(name)?;
        self.cache.insert(name.to_owned(), native);
        Some(native)
    }

    /// Drop every cached handle. Must be called whenever the VM module is
    /// reattached; handles resolved against the old module are invalid.
    pub fn reset(&mut self) {
        self.cache.clear();
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}

impl<N: Copy> Default for NativeResolver<N> {
    fn default() -> Self {
        Self::new()
    }
}
