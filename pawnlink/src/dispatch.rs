//! Generic named-call paths into the VM.
//!
//! Two public shapes: [`Bridge::call_native`] takes any heterogeneous
//! argument list and no format descriptor (by-value flattening, hard
//! errors), [`Bridge::call_remote`] goes through the VM's remote-dispatch
//! entry with an explicit format descriptor (by-reference, legacy
//! tolerance). The fixed-signature wrappers share [`Bridge::invoke_simple`].

use anyhow::Result;
use pawnlink_amx::{Amx, AmxError, Cell};
use pawnlink_nls::Codec;

use crate::marshal::{estimate_cells, ArgBlock, ArgPolicy, CallMode, MarshalError, Marshaler};
use crate::resolver::NativeResolver;
use crate::value::Value;

/// Name of the VM's remote-dispatch entry used by [`Bridge::call_remote`].
const REMOTE_CALL_NATIVE: &str = "CallRemoteFunction";

#[derive(thiserror::Error, Debug)]
pub enum DispatchError {
    #[error("unknown native function: {name}")]
    UnknownNative { name: String },
}

/// One attached VM plus the state the bridge keeps for it: the lazy
/// native-name cache and the text codec for everything crossing the
/// boundary.
pub struct Bridge<A: Amx> {
    amx: A,
    resolver: NativeResolver<A::Native>,
    codec: Codec,
}

impl<A: Amx> Bridge<A> {
    pub fn new(amx: A) -> Self {
        Self::with_codec(amx, Codec::default())
    }

    pub fn with_codec(amx: A, codec: Codec) -> Self {
        Self {
            amx,
            resolver: NativeResolver::new(),
            codec,
        }
    }

    pub fn amx(&self) -> &A {
        &self.amx
    }

    pub fn amx_mut(&mut self) -> &mut A {
        &mut self.amx
    }

    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    /// Drop every resolved native handle. Call on VM module reload.
    pub fn reset_natives(&mut self) {
        self.resolver.reset();
    }

    /// Warn-mode native lookup for wrapper call sites.
    pub fn native(&mut self, name: &str) -> Option<A::Native> {
        self.resolver.resolve(&self.amx, name)
    }

    /// Free-form call: an arbitrary, possibly one-level-nested argument
    /// list and no format descriptor. The arguments marshal by value
    /// (sequences flatten in place), so the callee sees plain scalars.
    ///
    /// Unlike the legacy paths, failures here are hard: an unknown name
    /// raises [`DispatchError::UnknownNative`] before the VM is touched,
    /// and an unconvertible argument aborts the call.
    pub fn call_native(&mut self, name: &str, args: &[Value]) -> Result<Value> {
        let native = self.resolver.resolve_required(&self.amx, name)?;
        let mut block = ArgBlock::for_args(estimate_cells(args));
        let anchor = self.marshal_into(
            CallMode::ByValue,
            ArgPolicy::Fail,
            args,
            block.slots_mut(),
        )?;
        let ret = self.amx.invoke(native, block.cells_mut());
        self.release_anchor(anchor);
        Ok(Value::Int(ret? as i64))
    }

    /// Explicit-shape call through the VM's remote-dispatch entry: the
    /// target name and the format descriptor travel as the first two
    /// string cells, the arguments by reference after them.
    ///
    /// A missing remote-dispatch entry is the legacy non-fatal case:
    /// logged, `Ok(None)`. Unconvertible arguments are skipped the same
    /// way the fixed wrappers skip them.
    pub fn call_remote(
        &mut self,
        function: &str,
        format: &str,
        args: &[Value],
    ) -> Result<Option<Value>> {
        let Some(native) = self.resolver.resolve(&self.amx, REMOTE_CALL_NATIVE) else {
            return Ok(None);
        };

        let mut block = ArgBlock::for_args(2 + args.len());

        // The name string is the first allocation of the pass, so the
        // anchor reclaims both header strings along with the arguments.
        let anchor = self.alloc_string(function)?;
        *block.slot_mut(0) = anchor;
        match self.alloc_string(format) {
            Ok(off) => *block.slot_mut(1) = off,
            Err(err) => {
                self.release_anchor(anchor);
                return Err(err);
            }
        }

        let rest = &mut block.slots_mut()[2..];
        if let Err(err) = {
            let mut m = Marshaler::new(&self.codec, CallMode::ByRef, ArgPolicy::Skip);
            m.marshal(&mut self.amx, args, rest)
        } {
            self.release_anchor(anchor);
            return Err(err.into());
        }

        let ret = self.amx.invoke(native, block.cells_mut());
        self.release_anchor(anchor);
        Ok(Some(Value::Int(ret? as i64)))
    }

    /// The shared fixed-wrapper path: by-value marshaling under the
    /// legacy skip policy, logged default result when the native is
    /// missing.
    pub fn invoke_simple(&mut self, name: &str, args: &[Value]) -> Result<Cell> {
        let Some(native) = self.resolver.resolve(&self.amx, name) else {
            return Ok(0);
        };
        let mut block = ArgBlock::for_args(estimate_cells(args));
        let anchor = self.marshal_into(
            CallMode::ByValue,
            ArgPolicy::Skip,
            args,
            block.slots_mut(),
        )?;
        let ret = self.amx.invoke(native, block.cells_mut());
        self.release_anchor(anchor);
        Ok(ret?)
    }

    /// Marshal `args` into `dst`, returning the pass's release-anchor.
    /// If marshaling fails, whatever was already allocated is released
    /// before the error is returned.
    pub fn marshal_into(
        &mut self,
        mode: CallMode,
        policy: ArgPolicy,
        args: &[Value],
        dst: &mut [Cell],
    ) -> Result<Cell, MarshalError> {
        let mut m = Marshaler::new(&self.codec, mode, policy);
        let res = m.marshal(&mut self.amx, args, dst);
        let anchor = m.anchor();
        match res {
            Ok(()) => Ok(anchor),
            Err(err) => {
                self.release_anchor(anchor);
                Err(err)
            }
        }
    }

    /// Allocate one heap cell initialized to zero: a by-reference output
    /// slot.
    pub fn alloc_out_cell(&mut self) -> Result<Cell, AmxError> {
        let off = self.amx.allot(1)?;
        self.amx.write_cell(off, 0)?;
        Ok(off)
    }

    /// Allocate and pack a code-page string, returning its offset.
    pub fn alloc_string(&mut self, text: &str) -> Result<Cell> {
        let bytes = self.codec.encode(text)?;
        let off = self.amx.allot(bytes.len() + 1)?;
        self.amx.pack_string(off, &bytes)?;
        Ok(off)
    }

    /// Read back a code-page string from the heap.
    pub fn read_heap_string(&self, offset: Cell) -> Result<String> {
        let bytes = self.amx.read_string(offset)?;
        Ok(self.codec.decode(&bytes)?.into_owned())
    }

    /// Release a marshaling pass's allocations. 0 means the pass never
    /// left the argument array.
    pub fn release_anchor(&mut self, anchor: Cell) {
        if anchor == 0 {
            return;
        }
        if let Err(err) = self.amx.release(anchor) {
            log::error!("failed to release marshal anchor 0x{anchor:X}: {err}");
        }
    }
}
