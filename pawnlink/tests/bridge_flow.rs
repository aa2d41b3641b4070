//! End-to-end flows against the in-memory VM: wrappers marshaling in and
//! out, heap hygiene across calls, hook fan-out, and timers driving calls
//! back into the VM.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use anyhow::Result;
use pawnlink::natives::{player, server, vehicle};
use pawnlink::{
    dispatch_hook, Bridge, ExecLock, HostDispatch, HostFnRef, TimerQueue, Value,
};
use pawnlink_amx::{ftoc, Amx, MemoryAmx, CELL_BYTES};
use pretty_assertions::assert_eq;

fn game_server_amx() -> (MemoryAmx, Arc<StdMutex<Vec<String>>>) {
    let messages = Arc::new(StdMutex::new(Vec::new()));
    let mut amx = MemoryAmx::new();

    let sink = messages.clone();
    amx.register_native("SendClientMessage", move |arena, args| {
        assert_eq!(args[0] as usize, 3 * CELL_BYTES);
        let text = arena.read_string(args[3])?;
        sink.lock()
            .unwrap()
            .push(String::from_utf8_lossy(&text).into_owned());
        Ok(1)
    });

    amx.register_native("GetPlayerPos", |arena, args| {
        arena.write(args[2], ftoc(10.0))?;
        arena.write(args[3], ftoc(-3.5))?;
        arena.write(args[4], ftoc(7.25))?;
        Ok(1)
    });

    amx.register_native("GetPlayerName", |arena, args| {
        arena.pack_string(args[2], b"Kalcor")?;
        Ok(6)
    });

    amx.register_native("CreateVehicle", |_, args| {
        assert_eq!(args[0] as usize, 8 * CELL_BYTES);
        Ok(401)
    });

    (amx, messages)
}

#[test]
fn wrapper_marshals_strings_and_leaves_the_heap_clean() {
    let (amx, messages) = game_server_amx();
    let mut bridge = Bridge::new(amx);

    let ret = server::send_client_message(
        &mut bridge,
        &[Value::from(0), Value::from(-1), Value::from("Welcome!")],
    )
    .unwrap();

    assert_eq!(ret, Value::Int(1));
    assert_eq!(*messages.lock().unwrap(), vec!["Welcome!".to_owned()]);
    assert_eq!(bridge.amx().arena().used(), 0);
}

#[test]
fn output_wrappers_read_back_by_reference_results() {
    let (amx, _) = game_server_amx();
    let mut bridge = Bridge::new(amx);

    let pos = player::get_player_pos(&mut bridge, &[Value::from(3)]).unwrap();
    assert_eq!(
        pos,
        Value::Seq(vec![
            Value::Float(10.0),
            Value::Float(-3.5),
            Value::Float(7.25)
        ])
    );

    let name = player::get_player_name(&mut bridge, &[Value::from(3)]).unwrap();
    assert_eq!(name, Value::Str("Kalcor".to_owned()));

    assert_eq!(bridge.amx().arena().used(), 0);
}

#[test]
fn wrappers_on_missing_natives_return_defaults() {
    let mut bridge = Bridge::new(MemoryAmx::new());
    let pos = player::get_player_pos(&mut bridge, &[Value::from(1)]).unwrap();
    assert_eq!(pos, Value::Nil);

    let ret = vehicle::destroy_vehicle(&mut bridge, &[Value::from(1)]).unwrap();
    assert_eq!(ret, Value::Int(0));
}

#[test]
fn unsupported_argument_types_skip_without_raising() {
    let seen = Arc::new(AtomicI32::new(i32::MIN));
    let sink = seen.clone();

    let mut amx = MemoryAmx::new();
    amx.register_native("SetWorldTime", move |_, args| {
        sink.store(args[1], Ordering::SeqCst);
        Ok(1)
    });
    let mut bridge = Bridge::new(amx);

    let ret = server::set_world_time(&mut bridge, &[Value::Table(Default::default())]).unwrap();
    assert_eq!(ret, Value::Nil);
    // the call still went through, with the slot at its default
    assert_eq!(seen.load(Ordering::SeqCst), 0);
}

#[test]
fn repeated_calls_do_not_grow_the_arena() {
    let (amx, _) = game_server_amx();
    let mut bridge = Bridge::new(amx);

    let baseline = bridge.amx_mut().allot(1).unwrap();
    bridge.amx_mut().release(baseline).unwrap();

    for i in 0..50 {
        server::send_client_message(
            &mut bridge,
            &[
                Value::from(i),
                Value::from(0x00FF00),
                Value::from("spam spam spam"),
            ],
        )
        .unwrap();
        player::get_player_pos(&mut bridge, &[Value::from(i)]).unwrap();
    }

    let sentinel = bridge.amx_mut().allot(1).unwrap();
    assert_eq!(sentinel, baseline);
}

#[test]
fn create_vehicle_returns_the_new_id() {
    let (amx, _) = game_server_amx();
    let mut bridge = Bridge::new(amx);

    let id = vehicle::create_vehicle(
        &mut bridge,
        &[
            Value::from(411),
            Value::from(0.0f32),
            Value::from(0.0f32),
            Value::from(3.0f32),
            Value::from(90.0f32),
            Value::from(1),
            Value::from(1),
            Value::from(-1),
        ],
    )
    .unwrap();
    assert_eq!(id, Value::Int(401));
}

struct HandlerTable {
    order: StdMutex<Vec<&'static str>>,
}

impl HostDispatch for HandlerTable {
    fn call_hook(&self, hook: &str, args: &[Value]) -> Result<i32> {
        assert_eq!(hook, "OnPlayerCommandText");
        assert_eq!(args[0], Value::Int(9));
        assert_eq!(args[1], Value::Str("/respawn".to_owned()));
        self.order.lock().unwrap().push("first");
        self.order.lock().unwrap().push("second");
        Ok(1)
    }
}

#[test]
fn hooks_round_trip_text_from_the_vm_heap() {
    let mut amx = MemoryAmx::new();
    let cmd = amx.allot(8).unwrap();
    amx.pack_string(cmd, b"/respawn").unwrap();

    let codec = pawnlink::Codec::default();
    let exec = ExecLock::new();
    let host = HandlerTable {
        order: StdMutex::new(Vec::new()),
    };

    let params = vec![(2 * CELL_BYTES) as i32, 9, cmd];
    let ret = dispatch_hook(&amx, &codec, &exec, &host, "OnPlayerCommandText", &params);
    assert_eq!(ret, 1);
    assert_eq!(*host.order.lock().unwrap(), vec!["first", "second"]);
}

#[test]
fn timers_drive_calls_back_into_the_vm() {
    let fired = Arc::new(AtomicI32::new(0));
    let sink = fired.clone();

    let mut amx = MemoryAmx::new();
    amx.register_native("Heartbeat", move |_, args| {
        sink.fetch_add(args[1], Ordering::SeqCst);
        Ok(0)
    });

    let bridge = Arc::new(parking_lot::Mutex::new(Bridge::new(amx)));
    let queue = TimerQueue::new();

    let shared = bridge.clone();
    let callable: HostFnRef = Arc::new(move |args: &[Value]| -> Result<Value> {
        shared.lock().call_native("Heartbeat", args)
    });

    queue.defer(callable, Some(vec![Value::from(5)]));
    queue.tick();
    queue.tick();

    assert_eq!(fired.load(Ordering::SeqCst), 5);
    assert_eq!(queue.pending(), 0);
}
