//! Minimal single-threaded executor for channel futures.
//!
//! Channel futures make progress by pumping the transport on every poll, so
//! the driver only has to re-poll until completion; no wake-ups are needed.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Drive a future to completion on the current thread.
pub fn block_on<F: Future>(mut future: F) -> F::Output {
    let waker = noop_waker();
    let mut cx = Context::from_waker(&waker);
    // SAFETY: the future lives on this stack frame and is never moved again.
    let mut future = unsafe { Pin::new_unchecked(&mut future) };

    loop {
        if let Poll::Ready(output) = future.as_mut().poll(&mut cx) {
            return output;
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

fn noop_waker() -> Waker {
    unsafe { Waker::from_raw(noop_raw_waker()) }
}

fn noop_raw_waker() -> RawWaker {
    RawWaker::new(std::ptr::null(), &NOOP_WAKER_VTABLE)
}

fn noop_clone(_: *const ()) -> RawWaker {
    noop_raw_waker()
}

fn noop(_: *const ()) {}

static NOOP_WAKER_VTABLE: RawWakerVTable = RawWakerVTable::new(noop_clone, noop, noop, noop);
