use anyhow::Result;
use pawnlink_amx::{Amx, Cell};

use crate::dispatch::Bridge;
use crate::marshal::ArgBlock;
use crate::value::Value;

use super::arity;

/// GetMaxPlayers()
pub fn get_max_players<A: Amx>(b: &mut Bridge<A>, args: &[Value]) -> Result<Value> {
    arity("GetMaxPlayers", args, 0)?;
    Ok(Value::Int(b.invoke_simple("GetMaxPlayers", args)? as i64))
}

/// SendClientMessage(playerid, color, message[])
pub fn send_client_message<A: Amx>(b: &mut Bridge<A>, args: &[Value]) -> Result<Value> {
    arity("SendClientMessage", args, 3)?;
    Ok(Value::Int(b.invoke_simple("SendClientMessage", args)? as i64))
}

/// SendClientMessageToAll(color, message[])
pub fn send_client_message_to_all<A: Amx>(b: &mut Bridge<A>, args: &[Value]) -> Result<Value> {
    arity("SendClientMessageToAll", args, 2)?;
    Ok(Value::Int(b.invoke_simple("SendClientMessageToAll", args)? as i64))
}

/// SetGameModeText(text[])
pub fn set_game_mode_text<A: Amx>(b: &mut Bridge<A>, args: &[Value]) -> Result<Value> {
    arity("SetGameModeText", args, 1)?;
    b.invoke_simple("SetGameModeText", args)?;
    Ok(Value::Nil)
}

/// SetWorldTime(hour)
pub fn set_world_time<A: Amx>(b: &mut Bridge<A>, args: &[Value]) -> Result<Value> {
    arity("SetWorldTime", args, 1)?;
    b.invoke_simple("SetWorldTime", args)?;
    Ok(Value::Nil)
}

/// SendRconCommand(command[])
pub fn send_rcon_command<A: Amx>(b: &mut Bridge<A>, args: &[Value]) -> Result<Value> {
    arity("SendRconCommand", args, 1)?;
    b.invoke_simple("SendRconCommand", args)?;
    Ok(Value::Nil)
}

/// Kick(playerid)
pub fn kick<A: Amx>(b: &mut Bridge<A>, args: &[Value]) -> Result<Value> {
    arity("Kick", args, 1)?;
    b.invoke_simple("Kick", args)?;
    Ok(Value::Nil)
}

/// BanEx(playerid, reason[])
pub fn ban_ex<A: Amx>(b: &mut Bridge<A>, args: &[Value]) -> Result<Value> {
    arity("BanEx", args, 2)?;
    b.invoke_simple("BanEx", args)?;
    Ok(Value::Nil)
}

/// GetNetworkStats(retstr[], size); returns the stats text
pub fn get_network_stats<A: Amx>(b: &mut Bridge<A>, args: &[Value]) -> Result<Value> {
    const STATS_LEN: usize = 401;

    arity("GetNetworkStats", args, 0)?;
    let Some(native) = b.native("GetNetworkStats") else {
        return Ok(Value::Nil);
    };

    let mut block = ArgBlock::for_args(2);
    let buf = b.amx_mut().allot(STATS_LEN)?;
    b.amx_mut().write_cell(buf, 0)?;
    *block.slot_mut(0) = buf;
    *block.slot_mut(1) = STATS_LEN as Cell;

    let ret = b.amx_mut().invoke(native, block.cells_mut());
    let text = b.read_heap_string(buf);
    b.release_anchor(buf);
    ret?;
    Ok(Value::Str(text?))
}
