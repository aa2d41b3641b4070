//! pawnlink: a marshaling bridge between a cell-oriented scripting VM
//! and a dynamically typed host runtime.
//!
//! The VM side is a flat, relocatable heap arena and a native-function
//! ABI of contiguous cell arrays (see `pawnlink-amx`); the host side is a
//! dynamic value model with refcounted callables. The bridge converts
//! values across that boundary in both directions, dispatches named
//! native calls without per-function tables, fans VM callbacks out to
//! host handlers, and runs the poll-driven timer queue.

pub mod dispatch;
pub mod hooks;
pub mod marshal;
pub mod natives;
pub mod resolver;
pub mod timers;
pub mod value;

pub use pawnlink_nls::{Codec, CodecError, Encoding};

pub use dispatch::{Bridge, DispatchError};
pub use hooks::{dispatch_hook, hook_signature, ExecLock, HookArg, HostDispatch};
pub use marshal::{estimate_cells, ArgBlock, ArgPolicy, CallMode, MarshalError, Marshaler};
pub use resolver::NativeResolver;
pub use timers::{TimerId, TimerQueue, NO_TIMER};
pub use value::{HostFn, HostFnRef, Value};
