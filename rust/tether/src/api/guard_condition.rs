use tether_core::{Context, GuardCondition};

use crate::Backend;
use crate::handle::{Handle, HandleData};
use crate::ret::{RetResult, fail};

impl HandleData for GuardCondition<Backend> {
    const KIND: &'static str = "guard condition";
}

pub fn create_guard_condition(context: &Handle) -> RetResult<Handle> {
    const OP: &str = "create_guard_condition";
    let context = context.get::<Context<Backend>>().map_err(fail(OP))?;
    let guard = context.create_guard_condition().map_err(fail(OP))?;
    Ok(Handle::new(guard))
}

pub fn destroy_guard_condition(guard_condition: &mut Option<Handle>) -> RetResult {
    Handle::take::<GuardCondition<Backend>>(guard_condition)
        .map_err(fail("destroy_guard_condition"))?;
    Ok(())
}

pub fn trigger_guard_condition(guard_condition: &Handle) -> RetResult {
    const OP: &str = "trigger_guard_condition";
    let guard = guard_condition
        .get::<GuardCondition<Backend>>()
        .map_err(fail(OP))?;
    guard.trigger().map_err(fail(OP))
}
