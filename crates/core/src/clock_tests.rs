// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::Duration;

#[test]
fn fake_clock_advances() {
    let clock = FakeClock::new();
    let before = clock.now();
    clock.advance(Duration::seconds(90));
    assert_eq!(clock.now() - before, Duration::seconds(90));
}

#[test]
fn fake_clock_is_shared_across_clones() {
    let clock = FakeClock::new();
    let other = clock.clone();
    clock.advance(Duration::milliseconds(250));
    assert_eq!(other.now(), clock.now());
}
