use std::{cell::Cell, thread::LocalKey};

/// Depth at which a handler family refuses to produce any more output.
pub const MAX_RECURSION_DEPTH: usize = 2;

/// Counts how often a handler family is active on the current call path.
///
/// Formatting a message can itself trigger a report (e.g. a `Display` implementation
/// that logs), and a failing write may be reported through the very handler that failed.
/// The guard lets one such nested report through and makes deeper ones fail fast,
/// without formatting or writing anything.
///
/// The depth lives in a thread-local counter, so reports of other threads never count
/// as nesting. Each handler family has one guard in a `static`, shared by all its
/// instances:
///
/// ```rust
/// use failure_log::RecursionGuard;
/// use std::cell::Cell;
///
/// thread_local! {
///     static DEPTH: Cell<usize> = const { Cell::new(0) };
/// }
/// static GUARD: RecursionGuard = RecursionGuard::new(&DEPTH);
/// ```
#[derive(Debug)]
pub struct RecursionGuard {
    depth: &'static LocalKey<Cell<usize>>,
}

impl RecursionGuard {
    /// A guard that counts in `depth`.
    #[must_use]
    pub const fn new(depth: &'static LocalKey<Cell<usize>>) -> Self {
        Self { depth }
    }

    /// Enters the guarded region, or returns `None` if the depth limit is reached
    /// on the current thread.
    ///
    /// The depth is decremented when the returned ticket is dropped.
    /// While the thread is shutting down and its counter is gone, entering always succeeds.
    #[must_use]
    pub fn enter(&self) -> Option<GuardTicket<'_>> {
        let entered = self.depth.try_with(|depth| {
            let current = depth.get();
            if current >= MAX_RECURSION_DEPTH {
                false
            } else {
                depth.set(current + 1);
                true
            }
        });
        match entered {
            Ok(true) => Some(GuardTicket {
                guard: self,
                counted: true,
            }),
            Ok(false) => None,
            Err(_) => Some(GuardTicket {
                guard: self,
                counted: false,
            }),
        }
    }

    /// Current depth on the current thread.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth.try_with(Cell::get).unwrap_or(0)
    }
}

/// Proof of having entered a [`RecursionGuard`].
#[derive(Debug)]
pub struct GuardTicket<'a> {
    guard: &'a RecursionGuard,
    counted: bool,
}

impl Drop for GuardTicket<'_> {
    fn drop(&mut self) {
        if self.counted {
            self.guard
                .depth
                .try_with(|depth| depth.set(depth.get().saturating_sub(1)))
                .ok();
        }
    }
}
