use std::collections::VecDeque;

/// Work deferred to a later turn of the frame's event loop.
pub type Task<C> = Box<dyn FnOnce(&mut C)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

/// Single-threaded FIFO of deferred tasks.
///
/// A task scheduled while a turn is running never executes in that same turn;
/// see [`run_turn`].
pub struct TaskQueue<C> {
    next_id: u64,
    queue: VecDeque<(TaskId, Task<C>)>,
}

impl<C> Default for TaskQueue<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> TaskQueue<C> {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            queue: VecDeque::new(),
        }
    }

    pub fn schedule(&mut self, task: Task<C>) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        self.queue.push_back((id, task));
        id
    }

    pub fn pop(&mut self) -> Option<(TaskId, Task<C>)> {
        self.queue.pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

/// Access to the task queue owned by an event-loop context.
pub trait EventLoopContext: Sized + 'static {
    fn tasks(&mut self) -> &mut TaskQueue<Self>;
}

/// Run exactly the tasks that were queued when the turn began.
///
/// Returns the number of tasks executed.
pub fn run_turn<C: EventLoopContext>(ctx: &mut C) -> usize {
    let budget = ctx.tasks().len();
    let mut executed = 0;
    while executed < budget {
        let Some((_, task)) = ctx.tasks().pop() else {
            break;
        };
        task(ctx);
        executed += 1;
    }
    executed
}

/// Run turns until no task is left.
pub fn run_until_idle<C: EventLoopContext>(ctx: &mut C) -> usize {
    let mut executed = 0;
    loop {
        let ran = run_turn(ctx);
        if ran == 0 {
            return executed;
        }
        executed += ran;
    }
}
