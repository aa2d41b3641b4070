use anyhow::Result;
use pawnlink_amx::{ctof, Amx, Cell};

use crate::dispatch::Bridge;
use crate::marshal::{ArgBlock, ArgPolicy, CallMode};
use crate::value::Value;

use super::{arity, arity_between, call_with_outputs, MAX_PLAYER_NAME};

/// SetPlayerPos(playerid, Float:x, Float:y, Float:z)
pub fn set_player_pos<A: Amx>(b: &mut Bridge<A>, args: &[Value]) -> Result<Value> {
    arity("SetPlayerPos", args, 4)?;
    Ok(Value::Int(b.invoke_simple("SetPlayerPos", args)? as i64))
}

/// GetPlayerPos(playerid, &Float:x, &Float:y, &Float:z); returns [x, y, z]
pub fn get_player_pos<A: Amx>(b: &mut Bridge<A>, args: &[Value]) -> Result<Value> {
    arity("GetPlayerPos", args, 1)?;
    match call_with_outputs(b, "GetPlayerPos", args, 3)? {
        Some(cells) => Ok(Value::Seq(
            cells
                .into_iter()
                .map(|c| Value::Float(ctof(c)))
                .collect(),
        )),
        None => Ok(Value::Nil),
    }
}

/// GetPlayerHealth(playerid, &Float:health)
pub fn get_player_health<A: Amx>(b: &mut Bridge<A>, args: &[Value]) -> Result<Value> {
    arity("GetPlayerHealth", args, 1)?;
    match call_with_outputs(b, "GetPlayerHealth", args, 1)? {
        Some(cells) => Ok(Value::Float(ctof(cells[0]))),
        None => Ok(Value::Nil),
    }
}

/// SetPlayerHealth(playerid, Float:health)
pub fn set_player_health<A: Amx>(b: &mut Bridge<A>, args: &[Value]) -> Result<Value> {
    arity("SetPlayerHealth", args, 2)?;
    b.invoke_simple("SetPlayerHealth", args)?;
    Ok(Value::Nil)
}

/// GetPlayerName(playerid, name[], len); returns the name
pub fn get_player_name<A: Amx>(b: &mut Bridge<A>, args: &[Value]) -> Result<Value> {
    arity("GetPlayerName", args, 1)?;
    let Some(native) = b.native("GetPlayerName") else {
        return Ok(Value::Nil);
    };

    let mut block = ArgBlock::for_args(3);
    let anchor = b.marshal_into(
        CallMode::ByValue,
        ArgPolicy::Skip,
        args,
        &mut block.slots_mut()[..1],
    )?;
    let buf = match b.amx_mut().allot(MAX_PLAYER_NAME) {
        Ok(buf) => buf,
        Err(err) => {
            b.release_anchor(anchor);
            return Err(err.into());
        }
    };
    b.amx_mut().write_cell(buf, 0)?;
    let anchor = if anchor == 0 { buf } else { anchor };
    *block.slot_mut(1) = buf;
    *block.slot_mut(2) = MAX_PLAYER_NAME as Cell;

    let ret = b.amx_mut().invoke(native, block.cells_mut());
    let name = b.read_heap_string(buf);
    b.release_anchor(anchor);
    ret?;
    Ok(Value::Str(name?))
}

/// SetPlayerName(playerid, name[])
pub fn set_player_name<A: Amx>(b: &mut Bridge<A>, args: &[Value]) -> Result<Value> {
    arity("SetPlayerName", args, 2)?;
    Ok(Value::Int(b.invoke_simple("SetPlayerName", args)? as i64))
}

/// GetPlayerMoney(playerid)
pub fn get_player_money<A: Amx>(b: &mut Bridge<A>, args: &[Value]) -> Result<Value> {
    arity("GetPlayerMoney", args, 1)?;
    Ok(Value::Int(b.invoke_simple("GetPlayerMoney", args)? as i64))
}

/// GivePlayerMoney(playerid, money)
pub fn give_player_money<A: Amx>(b: &mut Bridge<A>, args: &[Value]) -> Result<Value> {
    arity("GivePlayerMoney", args, 2)?;
    b.invoke_simple("GivePlayerMoney", args)?;
    Ok(Value::Nil)
}

/// GetPlayerState(playerid)
pub fn get_player_state<A: Amx>(b: &mut Bridge<A>, args: &[Value]) -> Result<Value> {
    arity("GetPlayerState", args, 1)?;
    Ok(Value::Int(b.invoke_simple("GetPlayerState", args)? as i64))
}

/// ApplyAnimation(playerid, animlib[], animname[], Float:fDelta, loop,
/// lockx, locky, freeze, time, forcesync = 0)
pub fn apply_animation<A: Amx>(b: &mut Bridge<A>, args: &[Value]) -> Result<Value> {
    arity_between("ApplyAnimation", args, 9, 10)?;
    b.invoke_simple("ApplyAnimation", args)?;
    Ok(Value::Nil)
}
