//! VM-side contract for the bridge: the cell type, the float bit-codec and
//! the [`Amx`] trait the marshaling engine drives.
//!
//! The abstract machine owns a flat, relocatable heap addressed by byte
//! offsets. A raw pointer into that heap goes stale on the next allocation,
//! so this API never hands one out: every read and write goes through an
//! offset.

mod arena;
mod memory;

pub use arena::Arena;
pub use memory::{MemoryAmx, NativeId};

/// One VM machine word. Scalar values and heap offsets are both cells.
pub type Cell = i32;

/// Width of a cell in bytes. The argument-array header counts bytes, not
/// cells.
pub const CELL_BYTES: usize = std::mem::size_of::<Cell>();

/// Bit-reinterpret a float into a cell (the VM's native float encoding).
#[inline]
pub fn ftoc(v: f32) -> Cell {
    v.to_bits() as Cell
}

/// Bit-reinterpret a cell back into a float.
#[inline]
pub fn ctof(c: Cell) -> f32 {
    f32::from_bits(c as u32)
}

#[derive(thiserror::Error, Debug)]
pub enum AmxError {
    #[error("heap exhausted: requested {requested} cells, {available} left")]
    HeapExhausted { requested: usize, available: usize },

    #[error("invalid heap offset: 0x{offset:X}")]
    InvalidOffset { offset: Cell },

    #[error("unterminated string at offset 0x{offset:X}")]
    UnterminatedString { offset: Cell },

    #[error("stale native handle")]
    StaleNative,

    #[error("native call aborted: code {code}")]
    NativeAborted { code: i32 },
}

/// The abstract machine as the bridge sees it.
///
/// Implementations wrap a live VM instance. Offsets returned by [`allot`]
/// are stable across calls; they are what goes into argument cells.
///
/// [`allot`]: Amx::allot
pub trait Amx {
    /// Opaque handle to a resolved native function.
    type Native: Copy + Eq;

    /// Look up a native function by name. `None` is not an error at this
    /// level; the caller decides whether a miss is fatal.
    fn find_native(&self, name: &str) -> Option<Self::Native>;

    /// Allocate `cells` cells on the VM heap, returning their offset.
    fn allot(&mut self, cells: usize) -> Result<Cell, AmxError>;

    /// Release `offset` and every allocation made after it.
    ///
    /// The heap is a bump arena: releasing an offset rolls the allocation
    /// top back to it. This is what makes a pass's first-allocation anchor
    /// sufficient to reclaim everything the pass allocated.
    fn release(&mut self, offset: Cell) -> Result<(), AmxError>;

    fn read_cell(&self, offset: Cell) -> Result<Cell, AmxError>;

    fn write_cell(&mut self, offset: Cell, value: Cell) -> Result<(), AmxError>;

    /// Write `bytes` plus a NUL terminator at `offset`, one byte per cell
    /// (the VM's unpacked string layout). The allocation must span
    /// `bytes.len() + 1` cells.
    fn pack_string(&mut self, offset: Cell, bytes: &[u8]) -> Result<(), AmxError>;

    /// Read an unpacked, NUL-terminated string starting at `offset`.
    fn read_string(&self, offset: Cell) -> Result<Vec<u8>, AmxError>;

    /// Invoke a native with a populated argument array (`args[0]` holds
    /// the byte length of the remaining elements).
    fn invoke(&mut self, native: Self::Native, args: &mut [Cell]) -> Result<Cell, AmxError>;
}
