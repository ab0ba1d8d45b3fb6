use std::time::Duration;

use parking_lot::Mutex;
use tether_core::{Context, GuardCondition, Result, WaitOutcome, WaitSet};

use super::subscription::SubscriptionData;
use crate::Backend;
use crate::handle::{Handle, HandleData};
use crate::ret::{RetCode, RetResult, fail};

pub(crate) struct WaitSetData {
    wait_set: Mutex<WaitSet<Backend>>,
}

impl HandleData for WaitSetData {
    const KIND: &'static str = "wait set";
}

pub fn create_wait_set(context: &Handle) -> RetResult<Handle> {
    let context = context
        .get::<Context<Backend>>()
        .map_err(fail("create_wait_set"))?;
    Ok(Handle::new(WaitSetData {
        wait_set: Mutex::new(context.create_wait_set()),
    }))
}

pub fn destroy_wait_set(wait_set: &mut Option<Handle>) -> RetResult {
    Handle::take::<WaitSetData>(wait_set).map_err(fail("destroy_wait_set"))?;
    Ok(())
}

/// Block until one of the given sources is ready or `timeout` elapses.
///
/// `None` entries are skipped. On return, every entry that did not become
/// ready is set to `None`; on timeout that is all of them and the result is
/// [`RetCode::Timeout`]. A `None` timeout blocks indefinitely.
pub fn wait(
    subscriptions: &mut [Option<&Handle>],
    guard_conditions: &mut [Option<&Handle>],
    wait_set: &Handle,
    timeout: Option<Duration>,
) -> RetResult {
    const OP: &str = "wait";
    let data = wait_set.get::<WaitSetData>().map_err(fail(OP))?;

    // Resolve every handle before attaching anything, so a bad entry leaves
    // the wait set untouched.
    let subs = resolve::<SubscriptionData>(subscriptions).map_err(fail(OP))?;
    let guards = resolve::<GuardCondition<Backend>>(guard_conditions).map_err(fail(OP))?;

    let mut ws = data.wait_set.lock();
    for sub in subs.iter().flatten() {
        ws.attach(&*sub.subscriber.lock());
    }
    for guard in guards.iter().flatten() {
        ws.attach(*guard);
    }

    match ws.wait(timeout).map_err(fail(OP))? {
        WaitOutcome::Triggered(ready) => {
            for (slot, sub) in subscriptions.iter_mut().zip(&subs) {
                if let Some(sub) = sub
                    && !ready.is_ready(&*sub.subscriber.lock())
                {
                    *slot = None;
                }
            }
            for (slot, guard) in guard_conditions.iter_mut().zip(&guards) {
                if let Some(guard) = guard
                    && !ready.is_ready(*guard)
                {
                    *slot = None;
                }
            }
            Ok(())
        }
        WaitOutcome::TimedOut => {
            subscriptions.fill(None);
            guard_conditions.fill(None);
            Err(RetCode::Timeout)
        }
    }
}

fn resolve<'h, D: HandleData>(entries: &[Option<&'h Handle>]) -> Result<Vec<Option<&'h D>>> {
    entries
        .iter()
        .map(|entry| (*entry).map(Handle::get::<D>).transpose())
        .collect()
}
