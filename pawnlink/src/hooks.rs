//! Callback dispatch: the VM invoking the host.
//!
//! Each recognized hook has a fixed positional shape, known at compile
//! time. One signature table plus one generic adapter replaces a per-hook
//! conversion function: cells become [`Value`]s per the shape, the host's
//! global execution lock is taken, the registered handlers run through the
//! [`HostDispatch`] collaborator, and its aggregated integer goes back to
//! the VM. Failures never cross back into the VM as panics or errors: a
//! malformed argument suppresses the event (logged) and yields 0.

use anyhow::Result;
use parking_lot::{Mutex, MutexGuard};
use pawnlink_amx::{ctof, Amx, Cell, CELL_BYTES};
use pawnlink_nls::Codec;

use crate::value::Value;

/// Shape of one positional hook argument.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum HookArg {
    Int,
    Float,
    Text,
}

use HookArg::{Float, Int, Text};

/// Recognized hooks and their positional shapes.
pub static HOOKS: &[(&str, &[HookArg])] = &[
    ("OnGameModeInit", &[]),
    ("OnGameModeExit", &[]),
    ("OnPlayerConnect", &[Int]),
    ("OnPlayerDisconnect", &[Int, Int]),
    ("OnPlayerSpawn", &[Int]),
    ("OnPlayerDeath", &[Int, Int, Int]),
    ("OnPlayerText", &[Int, Text]),
    ("OnPlayerCommandText", &[Int, Text]),
    ("OnPlayerRequestClass", &[Int, Int]),
    ("OnPlayerEnterVehicle", &[Int, Int, Int]),
    ("OnPlayerExitVehicle", &[Int, Int]),
    ("OnPlayerStateChange", &[Int, Int, Int]),
    ("OnPlayerEnterCheckpoint", &[Int]),
    ("OnPlayerLeaveCheckpoint", &[Int]),
    ("OnPlayerClickPlayer", &[Int, Int, Int]),
    ("OnPlayerGiveDamage", &[Int, Int, Float, Int]),
    ("OnPlayerTakeDamage", &[Int, Int, Float, Int]),
    (
        "OnPlayerEditObject",
        &[Int, Int, Int, Int, Float, Float, Float, Float, Float, Float],
    ),
    ("OnDialogResponse", &[Int, Int, Int, Int, Text]),
    ("OnEnterExitModShop", &[Int, Int, Int]),
    ("OnObjectMoved", &[Int]),
    ("OnVehicleSpawn", &[Int]),
    ("OnVehicleDeath", &[Int, Int]),
    ("OnRconCommand", &[Text]),
];

pub fn hook_signature(name: &str) -> Option<&'static [HookArg]> {
    HOOKS.iter().find(|(n, _)| *n == name).map(|(_, sig)| *sig)
}

/// The host runtime's global execution lock. Held for the full duration
/// of a callback dispatch into host code; the timer queue takes it
/// independently when firing queued invocations.
#[derive(Default)]
pub struct ExecLock(Mutex<()>);

impl ExecLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&self) -> MutexGuard<'_, ()> {
        self.0.lock()
    }
}

/// Registered-handler lookup and result aggregation, owned by the host
/// runtime. The bridge supplies the argument tuple for one hook and
/// consumes one aggregated integer.
pub trait HostDispatch: Send + Sync {
    /// Invoke every handler registered for `hook`, in registration order,
    /// and combine their results.
    fn call_hook(&self, hook: &str, args: &[Value]) -> Result<i32>;
}

/// VM-facing hook adapter (native-callback ABI: cells in, one cell out).
///
/// `params` is the VM's raw callback array: `params[0]` holds the byte
/// length of the positional arguments that follow.
pub fn dispatch_hook<A: Amx>(
    amx: &A,
    codec: &Codec,
    exec: &ExecLock,
    host: &dyn HostDispatch,
    hook: &str,
    params: &[Cell],
) -> Cell {
    let Some(sig) = hook_signature(hook) else {
        log::warn!("unrecognized hook {hook}");
        return 0;
    };

    let supplied = params
        .first()
        .map(|&len| len as usize / CELL_BYTES)
        .unwrap_or(0);
    if supplied < sig.len() || params.len() <= sig.len() {
        log::error!(
            "hook {hook}: expected {} arguments, VM supplied {supplied}",
            sig.len()
        );
        return 0;
    }

    let mut args = Vec::with_capacity(sig.len());
    for (i, kind) in sig.iter().enumerate() {
        let cell = params[i + 1];
        let value = match kind {
            HookArg::Int => Value::Int(cell as i64),
            HookArg::Float => Value::Float(ctof(cell)),
            HookArg::Text => {
                let bytes = match amx.read_string(cell) {
                    Ok(bytes) => bytes,
                    Err(err) => {
                        log::error!("hook {hook}: bad string argument {i}: {err}");
                        return 0;
                    }
                };
                match codec.decode(&bytes) {
                    Ok(text) => Value::Str(text.into_owned()),
                    Err(err) => {
                        log::error!("hook {hook}: argument {i}: {err}; event suppressed");
                        return 0;
                    }
                }
            }
        };
        args.push(value);
    }

    let _guard = exec.acquire();
    match host.call_hook(hook, &args) {
        Ok(ret) => ret as Cell,
        Err(err) => {
            log::error!("hook {hook} dispatch failed: {err:#}");
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    use pawnlink_amx::{ftoc, Amx, MemoryAmx};
    use pretty_assertions::assert_eq;

    use super::*;

    struct Recorder {
        calls: StdMutex<Vec<(String, Vec<Value>)>>,
        ret: i32,
    }

    impl Recorder {
        fn new(ret: i32) -> Self {
            Self {
                calls: StdMutex::new(Vec::new()),
                ret,
            }
        }
    }

    impl HostDispatch for Recorder {
        fn call_hook(&self, hook: &str, args: &[Value]) -> Result<i32> {
            self.calls
                .lock()
                .unwrap()
                .push((hook.to_owned(), args.to_vec()));
            Ok(self.ret)
        }
    }

    fn params(args: &[Cell]) -> Vec<Cell> {
        let mut v = vec![(args.len() * CELL_BYTES) as Cell];
        v.extend_from_slice(args);
        v
    }

    #[test]
    fn cells_become_typed_values_in_order() {
        let mut amx = MemoryAmx::new();
        let text = amx.allot(5).unwrap();
        amx.pack_string(text, b"/pos").unwrap();

        let codec = Codec::default();
        let exec = ExecLock::new();
        let host = Recorder::new(1);

        let ret = dispatch_hook(
            &amx,
            &codec,
            &exec,
            &host,
            "OnPlayerCommandText",
            &params(&[7, text]),
        );
        assert_eq!(ret, 1);

        let calls = host.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "OnPlayerCommandText");
        assert_eq!(
            calls[0].1,
            vec![Value::Int(7), Value::Str("/pos".to_owned())]
        );
    }

    #[test]
    fn float_arguments_are_bit_decoded() {
        let amx = MemoryAmx::new();
        let codec = Codec::default();
        let exec = ExecLock::new();
        let host = Recorder::new(0);

        dispatch_hook(
            &amx,
            &codec,
            &exec,
            &host,
            "OnPlayerTakeDamage",
            &params(&[1, 2, ftoc(12.5), 31]),
        );

        let calls = host.calls.lock().unwrap();
        assert_eq!(
            calls[0].1,
            vec![
                Value::Int(1),
                Value::Int(2),
                Value::Float(12.5),
                Value::Int(31)
            ]
        );
    }

    #[test]
    fn undecodable_text_suppresses_the_event() {
        let mut amx = MemoryAmx::new();
        let text = amx.allot(3).unwrap();
        // 0x81 has no assignment in cp1252
        amx.pack_string(text, &[b'a', 0x81]).unwrap();

        let codec = Codec::default();
        let exec = ExecLock::new();
        let host = Recorder::new(1);

        let ret = dispatch_hook(&amx, &codec, &exec, &host, "OnRconCommand", &params(&[text]));
        assert_eq!(ret, 0);
        assert!(host.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn unrecognized_hooks_and_short_params_yield_zero() {
        let amx = MemoryAmx::new();
        let codec = Codec::default();
        let exec = ExecLock::new();
        let host = Recorder::new(1);

        assert_eq!(
            dispatch_hook(&amx, &codec, &exec, &host, "OnNothing", &params(&[1])),
            0
        );
        assert_eq!(
            dispatch_hook(&amx, &codec, &exec, &host, "OnPlayerDeath", &params(&[1])),
            0
        );
        assert!(host.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn handler_errors_become_a_zero_result() {
        struct Failing(AtomicUsize);
        impl HostDispatch for Failing {
            fn call_hook(&self, _hook: &str, _args: &[Value]) -> Result<i32> {
                self.0.fetch_add(1, Ordering::SeqCst);
                anyhow::bail!("handler blew up")
            }
        }

        let amx = MemoryAmx::new();
        let codec = Codec::default();
        let exec = ExecLock::new();
        let host = Failing(AtomicUsize::new(0));

        let ret = dispatch_hook(&amx, &codec, &exec, &host, "OnPlayerConnect", &params(&[3]));
        assert_eq!(ret, 0);
        assert_eq!(host.0.load(Ordering::SeqCst), 1);
    }
}
