//! The argument marshaling engine.
//!
//! A call into the VM takes a contiguous cell array whose element 0 is the
//! byte length of the remaining elements. Scalars go inline or through a
//! one-cell heap allocation depending on the calling mode; strings always
//! go out-of-line. The heap is a bump arena, so the offset of a pass's
//! first allocation is enough to reclaim everything the pass allocated;
//! callers release that anchor right after the VM call returns.

use pawnlink_amx::{ftoc, Amx, AmxError, Cell, CELL_BYTES};
use pawnlink_nls::{Codec, CodecError};
use smallvec::{smallvec, SmallVec};

use crate::value::Value;

/// How scalar arguments travel: written inline into the argument array, or
/// through a one-cell heap allocation whose offset is passed instead.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CallMode {
    ByValue,
    ByRef,
}

/// What to do with an argument that cannot be converted.
///
/// `Skip` is the legacy wrapper policy: log one diagnostic, leave the slot
/// zero, keep going. `Fail` aborts the pass; required wherever a silent
/// partial call would be unsafe.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ArgPolicy {
    Skip,
    Fail,
}

#[derive(thiserror::Error, Debug)]
pub enum MarshalError {
    #[error("argument {index} has unsupported type {kind}")]
    Unsupported { index: usize, kind: &'static str },

    #[error("argument {index} is not representable in the VM code page")]
    Encode {
        index: usize,
        #[source]
        source: CodecError,
    },

    #[error("argument {index} overflows the argument array")]
    ArrayFull { index: usize },

    #[error(transparent)]
    Amx(#[from] AmxError),
}

/// Number of cells `args` needs once one level of nesting is flattened in
/// place: each direct child sequence's slot is replaced by that child's
/// elements.
///
/// Pure pre-pass; sizes the argument array before anything touches the
/// heap. The byte-length header is computed from this once, never
/// incrementally during marshaling.
pub fn estimate_cells(args: &[Value]) -> usize {
    let mut total = args.len();
    for value in args {
        if let Value::Seq(items) = value {
            total = total - 1 + items.len();
        }
    }
    total
}

/// A VM argument cell array. Slot 0 is the byte-length header; the
/// argument slots follow.
pub struct ArgBlock {
    cells: SmallVec<[Cell; 16]>,
}

impl ArgBlock {
    /// An array with `slots` argument slots, header filled in.
    pub fn for_args(slots: usize) -> Self {
        let mut cells: SmallVec<[Cell; 16]> = smallvec![0; slots + 1];
        cells[0] = (slots * CELL_BYTES) as Cell;
        Self { cells }
    }

    pub fn arg_slots(&self) -> usize {
        self.cells.len() - 1
    }

    pub fn header(&self) -> Cell {
        self.cells[0]
    }

    /// Argument slot `i`, 0-based, header excluded.
    pub fn slot(&self, i: usize) -> Cell {
        self.cells[i + 1]
    }

    pub fn slot_mut(&mut self, i: usize) -> &mut Cell {
        &mut self.cells[i + 1]
    }

    /// The argument slots, header excluded.
    pub fn slots_mut(&mut self) -> &mut [Cell] {
        &mut self.cells[1..]
    }

    /// The whole array, header included; this is what [`Amx::invoke`]
    /// takes.
    pub fn cells_mut(&mut self) -> &mut [Cell] {
        &mut self.cells
    }
}

/// One marshaling pass over a dynamic argument sequence.
///
/// Tracks the release-anchor: the offset of the first out-of-line
/// allocation the pass makes (0 if it never leaves the argument array).
pub struct Marshaler<'c> {
    codec: &'c Codec,
    mode: CallMode,
    policy: ArgPolicy,
    anchor: Cell,
}

impl<'c> Marshaler<'c> {
    pub fn new(codec: &'c Codec, mode: CallMode, policy: ArgPolicy) -> Self {
        Self {
            codec,
            mode,
            policy,
            anchor: 0,
        }
    }

    /// Offset of the first out-of-line allocation made so far, 0 if none.
    pub fn anchor(&self) -> Cell {
        self.anchor
    }

    /// Convert `args` into `dst`, in order. `dst` is the argument slot
    /// span, pre-sized via [`estimate_cells`].
    ///
    /// Heap errors abort the pass regardless of policy; whatever the
    /// anchor already tracks must still be released by the caller.
    pub fn marshal<A: Amx>(
        &mut self,
        amx: &mut A,
        args: &[Value],
        dst: &mut [Cell],
    ) -> Result<(), MarshalError> {
        self.marshal_at(amx, args, dst, 0)
    }

    fn marshal_at<A: Amx>(
        &mut self,
        amx: &mut A,
        args: &[Value],
        dst: &mut [Cell],
        depth: usize,
    ) -> Result<(), MarshalError> {
        let mut slot = 0usize;
        for (index, value) in args.iter().enumerate() {
            match value {
                Value::Bool(b) => self.put_scalar(amx, dst, &mut slot, index, *b as Cell)?,
                Value::Int(v) => self.put_scalar(amx, dst, &mut slot, index, *v as Cell)?,
                Value::Float(v) => self.put_scalar(amx, dst, &mut slot, index, ftoc(*v))?,
                Value::Str(s) => {
                    if slot >= dst.len() {
                        return Err(MarshalError::ArrayFull { index });
                    }
                    match self.codec.encode(s) {
                        Ok(bytes) => {
                            let off = amx.allot(bytes.len() + 1)?;
                            amx.pack_string(off, &bytes)?;
                            if self.anchor == 0 {
                                self.anchor = off;
                            }
                            dst[slot] = off;
                            slot += 1;
                        }
                        Err(source) => {
                            self.skip_or(
                                &mut slot,
                                value,
                                MarshalError::Encode { index, source },
                            )?;
                        }
                    }
                }
                Value::Seq(items) if self.mode == CallMode::ByValue && depth == 0 => {
                    // splice: the flattened members land in the following
                    // slots, order preserved
                    if slot + items.len() > dst.len() {
                        return Err(MarshalError::ArrayFull { index });
                    }
                    self.marshal_at(amx, items, &mut dst[slot..slot + items.len()], depth + 1)?;
                    slot += items.len();
                }
                other => {
                    self.skip_or(
                        &mut slot,
                        other,
                        MarshalError::Unsupported {
                            index,
                            kind: other.kind(),
                        },
                    )?;
                }
            }
        }
        Ok(())
    }

    fn put_scalar<A: Amx>(
        &mut self,
        amx: &mut A,
        dst: &mut [Cell],
        slot: &mut usize,
        index: usize,
        cell: Cell,
    ) -> Result<(), MarshalError> {
        if *slot >= dst.len() {
            return Err(MarshalError::ArrayFull { index });
        }
        match self.mode {
            CallMode::ByValue => dst[*slot] = cell,
            CallMode::ByRef => {
                let off = amx.allot(1)?;
                amx.write_cell(off, cell)?;
                if self.anchor == 0 {
                    self.anchor = off;
                }
                dst[*slot] = off;
            }
        }
        *slot += 1;
        Ok(())
    }

    fn skip_or(
        &self,
        slot: &mut usize,
        value: &Value,
        err: MarshalError,
    ) -> Result<(), MarshalError> {
        match self.policy {
            ArgPolicy::Skip => {
                log::error!("could not convert argument: {value}");
                *slot += 1;
                Ok(())
            }
            ArgPolicy::Fail => Err(err),
        }
    }
}
