//! Tracks whether the current thread is a backend notification thread.
//!
//! Receivers run inside this scope, so application code can tell whether it is
//! on a backend thread. Backend teardown never joins a notification thread
//! itself: the loopback detaches its delivery thread and the native input hands
//! midir's joining close to a reaper thread.

use std::cell::Cell;

thread_local! {
    static IN_NOTIFICATION: Cell<bool> = const { Cell::new(false) };
}

pub(crate) struct NotificationScope {
    previous: bool,
}

impl NotificationScope {
    pub(crate) fn enter() -> Self {
        let previous = IN_NOTIFICATION.with(|flag| flag.replace(true));
        Self { previous }
    }
}

impl Drop for NotificationScope {
    fn drop(&mut self) {
        IN_NOTIFICATION.with(|flag| flag.set(self.previous));
    }
}

/// True while running inside a backend's message delivery path.
pub fn is_notification_thread() -> bool {
    IN_NOTIFICATION.with(|flag| flag.get())
}
