//! Panic containment for user handlers

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

/// Run `f`, turning a panic into an error carrying the panic message.
///
/// Handlers are foreign code; a panic inside one must not unwind into the
/// frame loop or take down the timer worker.
pub(crate) fn run_guarded<F: FnOnce()>(f: F) -> Result<(), String> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| panic_message(payload.as_ref()))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
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
    fn ok_when_no_panic() {
        let mut ran = false;
        assert!(run_guarded(|| ran = true).is_ok());
        assert!(ran);
    }

    #[test]
    fn captures_panic_message() {
        let err = run_guarded(|| panic!("handler exploded")).unwrap_err();
        assert_eq!(err, "handler exploded");

        let code = 7;
        let err = run_guarded(|| panic!("bad code {code}")).unwrap_err();
        assert_eq!(err, "bad code 7");
    }
}
