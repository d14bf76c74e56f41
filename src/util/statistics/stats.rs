use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::util::statistics::counter::{Counter, Timer};

pub const MAX_PHASES: usize = 1 << 12;

/// Per-plan collection statistics. Time is accounted against alternating
/// mutator/GC epochs; nothing is gathered until the harness opens a
/// measurement window.
pub struct Stats {
    gc_count: AtomicUsize,
    phase: AtomicUsize,
    gathering: AtomicBool,
    exceeded_phase_limit: AtomicBool,
    total_time: Mutex<Timer>,
}

impl Stats {
    pub fn new() -> Self {
        Stats {
            gc_count: AtomicUsize::new(0),
            phase: AtomicUsize::new(0),
            gathering: AtomicBool::new(false),
            exceeded_phase_limit: AtomicBool::new(false),
            total_time: Mutex::new(Timer::new("time", false)),
        }
    }

    pub fn get_gc_count(&self) -> usize {
        self.gc_count.load(Ordering::Relaxed)
    }

    pub fn get_phase(&self) -> usize {
        self.phase.load(Ordering::SeqCst)
    }

    pub fn gathering_stats(&self) -> bool {
        self.gathering.load(Ordering::SeqCst)
    }

    pub fn gc_start(&self) {
        self.gc_count.fetch_add(1, Ordering::Relaxed);
        if !self.gathering_stats() {
            return;
        }
        self.roll_phase();
    }

    pub fn gc_end(&self) {
        if !self.gathering_stats() {
            return;
        }
        self.roll_phase();
    }

    fn roll_phase(&self) {
        let phase = self.get_phase();
        if phase < MAX_PHASES - 1 {
            self.total_time.lock().unwrap().phase_change(phase);
            self.phase.store(phase + 1, Ordering::SeqCst);
        } else if !self.exceeded_phase_limit.swap(true, Ordering::SeqCst) {
            warn!("Number of GC phases exceeds MAX_PHASES");
        }
    }

    /// Open the measurement window. Called by the harness once the
    /// workload's warmup is done.
    pub fn start_all(&self) {
        if self.gathering_stats() {
            error!("Calling Stats.start_all() while stats running");
            debug_assert!(false);
        }
        self.gathering.store(true, Ordering::SeqCst);
        self.total_time.lock().unwrap().start();
    }

    /// Close the measurement window and report.
    pub fn stop_all(&self) {
        self.total_time
            .lock()
            .unwrap()
            .stop(self.get_phase());
        self.gathering.store(false, Ordering::SeqCst);
        self.print_stats();
    }

    pub fn print_stats(&self) {
        println!("========================== gctk Statistics Totals ==========================");
        let timer = self.total_time.lock().unwrap();
        let last_phase = self.get_phase();
        println!("GC\t{}.mu\t{}.gc", timer.name(), timer.name());
        print!("{}\t", last_phase / 2);
        if timer.merge_phases() {
            timer.print_total(None, last_phase);
        } else {
            timer.print_total(Some(true), last_phase);
            print!("\t");
            timer.print_total(Some(false), last_phase);
        }
        println!();
        print!("Total time: ");
        timer.print_total(None, last_phase);
        println!(" ms");
        println!("======================== End gctk Statistics Totals ========================");
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epochs_alternate_only_inside_the_window() {
        let stats = Stats::new();
        stats.gc_start();
        stats.gc_end();
        assert_eq!(stats.get_gc_count(), 1);
        assert_eq!(stats.get_phase(), 0);

        stats.start_all();
        stats.gc_start();
        assert_eq!(stats.get_phase(), 1);
        stats.gc_end();
        assert_eq!(stats.get_phase(), 2);
        assert_eq!(stats.get_gc_count(), 2);
    }
}
