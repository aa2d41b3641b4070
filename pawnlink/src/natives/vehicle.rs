use anyhow::Result;
use pawnlink_amx::{ctof, Amx};

use crate::dispatch::Bridge;
use crate::value::Value;

use super::{arity, call_with_outputs};

/// CreateVehicle(vehicletype, Float:x, Float:y, Float:z, Float:rotation,
/// color1, color2, respawn_delay); returns the vehicle id
pub fn create_vehicle<A: Amx>(b: &mut Bridge<A>, args: &[Value]) -> Result<Value> {
    arity("CreateVehicle", args, 8)?;
    Ok(Value::Int(b.invoke_simple("CreateVehicle", args)? as i64))
}

/// DestroyVehicle(vehicleid)
pub fn destroy_vehicle<A: Amx>(b: &mut Bridge<A>, args: &[Value]) -> Result<Value> {
    arity("DestroyVehicle", args, 1)?;
    Ok(Value::Int(b.invoke_simple("DestroyVehicle", args)? as i64))
}

/// GetVehiclePos(vehicleid, &Float:x, &Float:y, &Float:z); returns [x, y, z]
pub fn get_vehicle_pos<A: Amx>(b: &mut Bridge<A>, args: &[Value]) -> Result<Value> {
    arity("GetVehiclePos", args, 1)?;
    match call_with_outputs(b, "GetVehiclePos", args, 3)? {
        Some(cells) => Ok(Value::Seq(
            cells
                .into_iter()
                .map(|c| Value::Float(ctof(c)))
                .collect(),
        )),
        None => Ok(Value::Nil),
    }
}

/// SetVehiclePos(vehicleid, Float:x, Float:y, Float:z)
pub fn set_vehicle_pos<A: Amx>(b: &mut Bridge<A>, args: &[Value]) -> Result<Value> {
    arity("SetVehiclePos", args, 4)?;
    Ok(Value::Int(b.invoke_simple("SetVehiclePos", args)? as i64))
}

/// GetVehicleZAngle(vehicleid, &Float:z_angle)
pub fn get_vehicle_z_angle<A: Amx>(b: &mut Bridge<A>, args: &[Value]) -> Result<Value> {
    arity("GetVehicleZAngle", args, 1)?;
    match call_with_outputs(b, "GetVehicleZAngle", args, 1)? {
        Some(cells) => Ok(Value::Float(ctof(cells[0]))),
        None => Ok(Value::Nil),
    }
}

/// SetVehicleZAngle(vehicleid, Float:z_angle)
pub fn set_vehicle_z_angle<A: Amx>(b: &mut Bridge<A>, args: &[Value]) -> Result<Value> {
    arity("SetVehicleZAngle", args, 2)?;
    b.invoke_simple("SetVehicleZAngle", args)?;
    Ok(Value::Nil)
}

/// AddVehicleComponent(vehicleid, componentid)
pub fn add_vehicle_component<A: Amx>(b: &mut Bridge<A>, args: &[Value]) -> Result<Value> {
    arity("AddVehicleComponent", args, 2)?;
    b.invoke_simple("AddVehicleComponent", args)?;
    Ok(Value::Nil)
}

/// SetVehicleVelocity(vehicleid, Float:X, Float:Y, Float:Z)
pub fn set_vehicle_velocity<A: Amx>(b: &mut Bridge<A>, args: &[Value]) -> Result<Value> {
    arity("SetVehicleVelocity", args, 4)?;
    b.invoke_simple("SetVehicleVelocity", args)?;
    Ok(Value::Nil)
}
