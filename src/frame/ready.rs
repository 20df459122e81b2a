use std::mem;

use tracing::trace;

use super::event_loop::{EventLoopContext, Task};

/// One-shot "document is interactive" signal.
///
/// Callbacks registered before the gate fires are drained in registration
/// order when it fires. Anything registered afterwards, including from inside
/// a draining callback, is scheduled on the context's task queue instead.
pub struct ReadyGate<C> {
    fired: bool,
    fire_scheduled: bool,
    pending: Vec<Task<C>>,
}

impl<C> Default for ReadyGate<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> ReadyGate<C> {
    pub fn new() -> Self {
        Self {
            fired: false,
            fire_scheduled: false,
            pending: Vec::new(),
        }
    }

    pub fn has_fired(&self) -> bool {
        self.fired
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

/// A context that owns a [`ReadyGate`] and knows its document's ready state.
pub trait ReadyContext: EventLoopContext {
    fn ready_gate(&mut self) -> &mut ReadyGate<Self>;
    fn document_is_ready(&self) -> bool;
}

/// Register `callback` to run once the document is ready. Never runs it
/// synchronously.
pub fn on_ready<C: ReadyContext>(ctx: &mut C, callback: Task<C>) {
    if ctx.ready_gate().fired {
        ctx.tasks().schedule(callback);
        return;
    }

    ctx.ready_gate().pending.push(callback);

    if ctx.document_is_ready() && !ctx.ready_gate().fire_scheduled {
        ctx.ready_gate().fire_scheduled = true;
        ctx.tasks().schedule(Box::new(|ctx: &mut C| {
            fire(ctx);
        }));
    }
}

/// Fire the gate. Only the first call drains callbacks; the rest return 0.
pub fn fire<C: ReadyContext>(ctx: &mut C) -> usize {
    let gate = ctx.ready_gate();
    if gate.fired {
        return 0;
    }
    // Must be set before draining so re-entrant registrations get deferred.
    gate.fired = true;
    let batch = mem::take(&mut gate.pending);
    let count = batch.len();
    trace!(target = "frame", callbacks = count, "ready gate fired");
    for callback in batch {
        callback(ctx);
    }
    count
}
