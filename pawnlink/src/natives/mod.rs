//! Fixed-signature native wrappers: the host-facing call surface.
//!
//! Each wrapper receives the host call's dynamic argument tuple, marshals
//! it best-effort (a bad argument is logged once and its slot left zero, a
//! missing native yields the default result), invokes, releases the
//! pass's allocations and converts the result back. Only a representative
//! slice of the full native table lives here; every other wrapper is an
//! instance of the same primitives.

pub mod player;
pub mod server;
pub mod vehicle;

use anyhow::{bail, Result};
use pawnlink_amx::{Amx, Cell};

use crate::dispatch::Bridge;
use crate::marshal::{ArgBlock, ArgPolicy, CallMode};
use crate::value::Value;

const MAX_PLAYER_NAME: usize = 24;

fn arity<'a>(name: &str, args: &'a [Value], expected: usize) -> Result<&'a [Value]> {
    if args.len() != expected {
        bail!("{name} expects {expected} arguments, got {}", args.len());
    }
    Ok(args)
}

fn arity_between<'a>(
    name: &str,
    args: &'a [Value],
    min: usize,
    max: usize,
) -> Result<&'a [Value]> {
    if args.len() < min || args.len() > max {
        bail!("{name} expects {min}..={max} arguments, got {}", args.len());
    }
    Ok(args)
}

/// Invoke `name` with `ins` marshaled in front of `outs` by-reference
/// output cells, and read the outputs back. `None` when the native is
/// missing (already logged by the resolver).
fn call_with_outputs<A: Amx>(
    b: &mut Bridge<A>,
    name: &str,
    ins: &[Value],
    outs: usize,
) -> Result<Option<Vec<Cell>>> {
    let Some(native) = b.native(name) else {
        return Ok(None);
    };

    let mut block = ArgBlock::for_args(ins.len() + outs);
    let mut anchor = b.marshal_into(
        CallMode::ByValue,
        ArgPolicy::Skip,
        ins,
        &mut block.slots_mut()[..ins.len()],
    )?;

    for i in 0..outs {
        let off = match b.alloc_out_cell() {
            Ok(off) => off,
            Err(err) => {
                b.release_anchor(anchor);
                return Err(err.into());
            }
        };
        if anchor == 0 {
            anchor = off;
        }
        *block.slot_mut(ins.len() + i) = off;
    }

    let ret = b.amx_mut().invoke(native, block.cells_mut());
    let mut cells = Vec::with_capacity(outs);
    let mut read_err = None;
    for i in 0..outs {
        match b.amx().read_cell(block.slot(ins.len() + i)) {
            Ok(cell) => cells.push(cell),
            Err(err) => {
                read_err = Some(err);
                break;
            }
        }
    }
    b.release_anchor(anchor);

    ret?;
    if let Some(err) = read_err {
        return Err(err.into());
    }
    Ok(Some(cells))
}
