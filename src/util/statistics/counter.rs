use std::time::Instant;

use crate::util::statistics::stats::MAX_PHASES;

/// A statistic accumulated per epoch. Epochs alternate mutator/GC, so
/// even slots hold mutator figures and odd slots collection figures.
pub trait Counter {
    fn name(&self) -> &'static str;
    fn start(&mut self);
    fn stop(&mut self, phase: usize);
    /// Close the current epoch at `old_phase` and roll into the next.
    fn phase_change(&mut self, old_phase: usize);
    fn print_count(&self, phase: usize);
    fn print_total(&self, mutator: Option<bool>, last_phase: usize);
    fn merge_phases(&self) -> bool;
}

pub trait Diffable {
    type Val;
    fn current_value() -> Self::Val;
    fn diff(current: &Self::Val, earlier: &Self::Val) -> u64;
    fn print_diff(val: u64);
}

pub struct MonotoneNanoTime;

impl Diffable for MonotoneNanoTime {
    type Val = Instant;

    fn current_value() -> Instant {
        Instant::now()
    }

    fn diff(current: &Instant, earlier: &Instant) -> u64 {
        let delta = current.duration_since(*earlier);
        delta.as_secs() * 1_000_000_000 + u64::from(delta.subsec_nanos())
    }

    fn print_diff(val: u64) {
        print!("{:.2}", val as f64 / 1e6f64);
    }
}

pub struct LongCounter<T: Diffable> {
    name: &'static str,
    merge_phases: bool,
    count: Box<[u64; MAX_PHASES]>,
    start_value: Option<T::Val>,
    total_count: u64,
    running: bool,
}

impl<T: Diffable> Counter for LongCounter<T> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn start(&mut self) {
        debug_assert!(!self.running);
        self.running = true;
        self.start_value = Some(T::current_value());
    }

    fn stop(&mut self, phase: usize) {
        debug_assert!(self.running);
        self.running = false;
        let delta = T::diff(&T::current_value(), self.start_value.as_ref().unwrap());
        self.count[phase] += delta;
        self.total_count += delta;
    }

    fn phase_change(&mut self, old_phase: usize) {
        if self.running {
            let now = T::current_value();
            let delta = T::diff(&now, self.start_value.as_ref().unwrap());
            self.count[old_phase] += delta;
            self.total_count += delta;
            self.start_value = Some(now);
        }
    }

    fn print_count(&self, phase: usize) {
        if self.merge_phases() {
            debug_assert!((phase | 1) == (phase + 1));
            self.print_value(self.count[phase] + self.count[phase + 1]);
        } else {
            self.print_value(self.count[phase]);
        }
    }

    fn print_total(&self, mutator: Option<bool>, last_phase: usize) {
        match mutator {
            None => self.print_value(self.total_count),
            Some(m) => {
                let mut total = 0;
                let mut p = if m { 0 } else { 1 };
                while p <= last_phase {
                    total += self.count[p];
                    p += 2;
                }
                self.print_value(total);
            }
        }
    }

    fn merge_phases(&self) -> bool {
        self.merge_phases
    }
}

impl<T: Diffable> LongCounter<T> {
    pub fn new(name: &'static str, merge_phases: bool) -> Self {
        LongCounter {
            name,
            merge_phases,
            count: Box::new([0; MAX_PHASES]),
            start_value: None,
            total_count: 0,
            running: false,
        }
    }

    fn print_value(&self, val: u64) {
        T::print_diff(val);
    }
}

pub type Timer = LongCounter<MonotoneNanoTime>;
