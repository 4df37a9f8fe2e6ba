//! Routing state shared between an input backend and its notification thread.

use crate::capability::{CallbackToken, DispatchFn, IgnoreFlags};
use crate::error::{BackendFailure, BackendResult};
use arc_swap::ArcSwapOption;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

#[derive(Clone, Copy)]
struct Sink {
    dispatch: DispatchFn,
    token: CallbackToken,
}

/// Lock-free on the notification side: ignore flags are an atomic bitset and the
/// callback sink is swapped in and out with arc-swap.
pub(crate) struct Delivery {
    ignore: AtomicU8,
    sink: ArcSwapOption<Sink>,
}

impl Delivery {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            ignore: AtomicU8::new(IgnoreFlags::default().to_bits()),
            sink: ArcSwapOption::empty(),
        })
    }

    pub(crate) fn set_ignore(&self, flags: IgnoreFlags) {
        self.ignore.store(flags.to_bits(), Ordering::Release);
    }

    pub(crate) fn ignores(&self, message: &[u8]) -> bool {
        IgnoreFlags::from_bits(self.ignore.load(Ordering::Acquire)).filters(message)
    }

    pub(crate) fn set_sink(
        &self,
        prefix: &str,
        dispatch: DispatchFn,
        token: CallbackToken,
    ) -> BackendResult<()> {
        if self.sink.load().is_some() {
            return Err(BackendFailure::new(format!(
                "{}: a callback function is already set",
                prefix
            )));
        }
        self.sink.store(Some(Arc::new(Sink { dispatch, token })));
        Ok(())
    }

    pub(crate) fn clear_sink(&self, prefix: &str) -> BackendResult<()> {
        if self.sink.swap(None).is_none() {
            return Err(BackendFailure::new(format!(
                "{}: no callback function was set",
                prefix
            )));
        }
        Ok(())
    }

    /// Drops any sink without reporting whether one was set. Used on close.
    pub(crate) fn detach_sink(&self) {
        self.sink.store(None);
    }

    pub(crate) fn has_sink(&self) -> bool {
        self.sink.load().is_some()
    }

    /// Hands `message` to the registered callback. Returns false when none is
    /// set and the caller should queue it instead.
    pub(crate) fn dispatch(&self, delta: f64, message: &[u8]) -> bool {
        match self.sink.load_full() {
            Some(sink) => {
                (sink.dispatch)(delta, message, sink.token);
                true
            }
            None => false,
        }
    }
}
