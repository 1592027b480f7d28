//! Cross-module scenarios driven through the public API with a manual clock.

use std::time::Duration;

use crate::{IterationAccumulator, ManualClock};


fn manual_timer() -> (ManualClock, IterationAccumulator<ManualClock>) {
    let clock = ManualClock::new();
    (clock.clone(), IterationAccumulator::with_clock(clock))
}

/// Run one committed iteration where each `(name, ms)` phase lasts `ms`.
fn run_iteration(
    clock: &ManualClock,
    timer: &mut IterationAccumulator<ManualClock>,
    phases: &[(&str, u64)],
) {
    for (name, ms) in phases {
        timer.open_timepoint(*name);
        clock.advance(Duration::from_millis(*ms));
    }
    timer.close_timepoint().unwrap();
    timer.commit_iteration().unwrap();
}
