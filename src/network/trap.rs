// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Escaping panic trap
//!
//! A process-wide panic hook, installed once and chained to whatever hook was
//! there before. While a session holds the traffic diversion, panic messages
//! go to that session's sink instead of the previous hook.

use std::cell::Cell;
use std::panic;
use std::sync::{Arc, Once};

use parking_lot::RwLock;

/// Receiver of panic messages for the active session
pub type PanicSink = Arc<dyn Fn(String) + Send + Sync>;

static INSTALL: Once = Once::new();

lazy_static::lazy_static! {
    static ref SINK: RwLock<Option<PanicSink>> = RwLock::new(None);
}

thread_local! {
    static SUPPRESSED: Cell<bool> = Cell::new(false);
}

/// Install the hook (idempotent)
pub fn install() {
    INSTALL.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if SUPPRESSED.with(Cell::get) {
                return;
            }

            let sink = SINK.read().clone();
            match sink {
                Some(sink) => {
                    let message = panic_message(info.payload());
                    let message = match info.location() {
                        Some(location) => format!("{} at {}", message, location),
                        None => message,
                    };
                    sink(message);
                }
                None => previous(info),
            }
        }));
    });
}

/// Route panics to a sink until `clear` is called
pub fn set_sink(sink: PanicSink) {
    install();
    *SINK.write() = Some(sink);
}

/// Stop routing panics to a sink
pub fn clear() {
    SINK.write().take();
}

/// Run `f` with the trap muted on this thread
///
/// Used where a panic is caught and reported by the caller itself.
pub fn suppressed<R>(f: impl FnOnce() -> R) -> R {
    struct Restore(bool);

    impl Drop for Restore {
        fn drop(&mut self) {
            SUPPRESSED.with(|s| s.set(self.0));
        }
    }

    let _restore = Restore(SUPPRESSED.with(|s| s.replace(true)));
    f()
}

/// Text of a caught panic payload
pub fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "Box<dyn Any>".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message() {
        let caught = panic::catch_unwind(|| suppressed(|| panic!("boom {}", 1))).unwrap_err();
        assert_eq!(panic_message(caught.as_ref()), "boom 1");

        let caught = panic::catch_unwind(|| suppressed(|| panic!("static"))).unwrap_err();
        assert_eq!(panic_message(caught.as_ref()), "static");
    }
}
