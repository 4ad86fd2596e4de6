//! Built-in checks.
//!
//! - [`StallCheck`]: per-entity, per-series silence longer than a threshold
//! - [`ZeroCheck`]: latest values pinned inside a near-zero band

mod stall;
mod zero;

pub use stall::{StallCheck, StallCheckBuilder, DEFAULT_COOLDOWN, DEFAULT_SERIES, DEFAULT_THRESHOLD};
pub use zero::ZeroCheck;

#[cfg(test)]
pub(crate) fn collect_events<F>(f: F) -> Vec<sensorwatch_types::Event>
where
    F: FnOnce(&mut crate::Emitter<'_>),
{
    let mut events = Vec::new();
    let mut sink = |e: sensorwatch_types::Event| events.push(e);
    let mut emit = crate::Emitter::new(&mut sink);
    f(&mut emit);
    drop(emit);
    events
}
