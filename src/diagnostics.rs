//! Global fault reporting for the frame loop.
//!
//! A panic inside one frame's update is caught, reported with its message and
//! origin, and the loop carries on with the next frame.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};

static FAULTS: AtomicU64 = AtomicU64::new(0);

/// Install the process-wide hook that logs every panic with its origin.
pub fn install_panic_hook() {
    panic::set_hook(Box::new(|info| {
        let message = payload_message(info.payload());
        match info.location() {
            Some(location) => log::error!(
                "Frame fault: {message} at {}:{}:{}",
                location.file(),
                location.line(),
                location.column()
            ),
            None => log::error!("Frame fault: {message} at unknown location"),
        }
    }));
}

/// Run one frame, catching any panic.
///
/// Returns `None` if the frame faulted. The fault has already been reported
/// by the panic hook; this only counts it.
pub fn guard_frame<R>(frame: impl FnOnce() -> R) -> Option<R> {
    match panic::catch_unwind(AssertUnwindSafe(frame)) {
        Ok(value) => Some(value),
        Err(payload) => {
            let total = FAULTS.fetch_add(1, Ordering::Relaxed) + 1;
            log::warn!(
                "Frame skipped after fault ({}); {total} fault(s) so far",
                payload_message(payload.as_ref())
            );
            None
        }
    }
}

/// Number of frames that faulted since start.
pub fn fault_count() -> u64 {
    FAULTS.load(Ordering::Relaxed)
}

fn payload_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_passes_value_through() {
        assert_eq!(guard_frame(|| 41 + 1), Some(42));
    }

    #[test]
    fn test_guard_catches_fault_and_counts() {
        let before = fault_count();
        let result: Option<()> = guard_frame(|| panic!("bad frame"));
        assert!(result.is_none());
        assert!(fault_count() > before);
        // The next frame still runs
        assert_eq!(guard_frame(|| "next"), Some("next"));
    }

    #[test]
    fn test_payload_message_variants() {
        let s: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(payload_message(s.as_ref()), "static");
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(payload_message(owned.as_ref()), "owned");
        let other: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(payload_message(other.as_ref()), "non-string panic payload");
    }
}
