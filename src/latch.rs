// Copyright (c) 2018-2023  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Counting latch awaiting completion of all scenario units.

use parking_lot::{Condvar, Mutex};

/// One-shot countdown latch.
///
/// Constructed with a fixed count, decremented exactly once per scenario unit
/// outcome and awaited by the dispatching thread. Expects exactly as many
/// [`count_down()`] calls as its initial count. Not reusable: one latch per
/// scheduler invocation.
///
/// [`count_down()`]: CountdownLatch::count_down
#[derive(Debug)]
pub struct CountdownLatch {
    /// Number of signals still outstanding.
    remaining: Mutex<usize>,

    /// Notified once `remaining` reaches zero.
    zeroed: Condvar,
}

impl CountdownLatch {
    /// Creates a new [`CountdownLatch`] expecting `count` signals.
    #[must_use]
    pub fn new(count: usize) -> Self {
        Self { remaining: Mutex::new(count), zeroed: Condvar::new() }
    }

    /// Signals one outcome, releasing all waiters on the last signal.
    pub fn count_down(&self) {
        let mut remaining = self.remaining.lock();
        debug_assert!(*remaining > 0, "latch signaled more than its count");
        *remaining = remaining.saturating_sub(1);
        if *remaining == 0 {
            self.zeroed.notify_all();
        }
    }

    /// Blocks the calling thread until every signal has arrived.
    ///
    /// Returns immediately if the latch was constructed with a zero count.
    pub fn wait(&self) {
        let mut remaining = self.remaining.lock();
        while *remaining > 0 {
            self.zeroed.wait(&mut remaining);
        }
    }

    /// Number of signals still outstanding.
    #[must_use]
    pub fn remaining(&self) -> usize {
        *self.remaining.lock()
    }
}
