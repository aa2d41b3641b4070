use std::collections::HashMap;

use crate::{Amx, AmxError, Arena, Cell};

/// Handle to a native registered on a [`MemoryAmx`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct NativeId(usize);

type NativeFn = Box<dyn FnMut(&mut Arena, &mut [Cell]) -> Result<Cell, AmxError> + Send>;

/// A simple in-memory abstract machine (useful for tests and prototyping).
///
/// Natives are plain closures over the arena; the heap is an [`Arena`].
pub struct MemoryAmx {
    arena: Arena,
    names: HashMap<String, NativeId>,
    natives: Vec<NativeFn>,
}

impl MemoryAmx {
    pub fn new() -> Self {
        Self::with_arena(Arena::new())
    }

    pub fn with_arena(arena: Arena) -> Self {
        Self {
            arena,
            names: HashMap::new(),
            natives: Vec::new(),
        }
    }

    pub fn register_native<F>(&mut self, name: &str, f: F) -> NativeId
    where
        F: FnMut(&mut Arena, &mut [Cell]) -> Result<Cell, AmxError> + Send + 'static,
    {
        let id = NativeId(self.natives.len());
        self.natives.push(Box::new(f));
        self.names.insert(name.to_owned(), id);
        id
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    pub fn arena_mut(&mut self) -> &mut Arena {
        &mut self.arena
    }
}

impl Default for MemoryAmx {
    fn default() -> Self {
        Self::new()
    }
}

impl Amx for MemoryAmx {
    type Native = NativeId;

    fn find_native(&self, name: &str) -> Option<NativeId> {
        self.names.get(name).copied()
    }

    fn allot(&mut self, cells: usize) -> Result<Cell, AmxError> {
        self.arena.allot(cells)
    }

    fn release(&mut self, offset: Cell) -> Result<(), AmxError> {
        self.arena.release(offset)
    }

    fn read_cell(&self, offset: Cell) -> Result<Cell, AmxError> {
        self.arena.read(offset)
    }

    fn write_cell(&mut self, offset: Cell, value: Cell) -> Result<(), AmxError> {
        self.arena.write(offset, value)
    }

    fn pack_string(&mut self, offset: Cell, bytes: &[u8]) -> Result<(), AmxError> {
        self.arena.pack_string(offset, bytes)
    }

    fn read_string(&self, offset: Cell) -> Result<Vec<u8>, AmxError> {
        self.arena.read_string(offset)
    }

    fn invoke(&mut self, native: NativeId, args: &mut [Cell]) -> Result<Cell, AmxError> {
        let f = self.natives.get_mut(native.0).ok_or(AmxError::StaleNative)?;
        f(&mut self.arena, args)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::CELL_BYTES;

    #[test]
    fn register_find_invoke() {
        let mut amx = MemoryAmx::new();
        amx.register_native("Add", |_, args| Ok(args[1] + args[2]));

        let add = amx.find_native("Add").unwrap();
        assert!(amx.find_native("Sub").is_none());

        let mut args = [(2 * CELL_BYTES) as Cell, 20, 22];
        assert_eq!(amx.invoke(add, &mut args).unwrap(), 42);
    }

    #[test]
    fn natives_see_the_live_arena() {
        let mut amx = MemoryAmx::new();
        amx.register_native("WriteBack", |arena, args| {
            arena.write(args[1], 99)?;
            Ok(1)
        });

        let off = amx.allot(1).unwrap();
        let native = amx.find_native("WriteBack").unwrap();
        let mut args = [CELL_BYTES as Cell, off];
        amx.invoke(native, &mut args).unwrap();
        assert_eq!(amx.read_cell(off).unwrap(), 99);
    }
}
