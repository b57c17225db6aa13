//! Scoped wall-clock accounting for the step phases. Guards are free when
//! the `profiling` feature is off: the macro below simply does not
//! construct them.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Cumulative time and call count per named section.
#[derive(Default)]
pub struct Profiler {
    sections: HashMap<&'static str, (Duration, u64)>,
}

impl Profiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, name: &'static str, elapsed: Duration) {
        let entry = self.sections.entry(name).or_default();
        entry.0 += elapsed;
        entry.1 += 1;
    }

    /// Sections sorted heaviest-first by cumulative time.
    pub fn report(&self) -> Vec<(&'static str, Duration, u64)> {
        let mut v: Vec<_> = self
            .sections
            .iter()
            .map(|(name, (total, calls))| (*name, *total, *calls))
            .collect();
        v.sort_by(|a, b| b.1.cmp(&a.1));
        v
    }

    pub fn print_and_clear(&mut self) {
        for (name, total, calls) in self.report() {
            let mean = total.checked_div(calls.max(1) as u32).unwrap_or_default();
            println!("{name:<12} total {total:>12?}  calls {calls:>8}  mean {mean:?}");
        }
        self.sections.clear();
    }
}

pub struct ScopeGuard {
    name: &'static str,
    start: Instant,
}

/// Start a section; the guard reports into the global profiler on drop.
pub fn scope(name: &'static str) -> ScopeGuard {
    ScopeGuard {
        name,
        start: Instant::now(),
    }
}

#[cfg(feature = "profiling")]
impl Drop for ScopeGuard {
    fn drop(&mut self) {
        crate::PROFILER.lock().record(self.name, self.start.elapsed());
    }
}

/// Time a scope under the `profiling` feature; expands to nothing
/// otherwise.
#[macro_export]
macro_rules! profile_scope {
    ($name:expr) => {
        #[cfg(feature = "profiling")]
        let _guard = $crate::profiler::scope($name);
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_orders_by_cumulative_time() {
        let mut profiler = Profiler::new();
        profiler.record("fast", Duration::from_millis(1));
        profiler.record("slow", Duration::from_millis(5));
        profiler.record("slow", Duration::from_millis(5));
        let report = profiler.report();
        assert_eq!(report[0].0, "slow");
        assert_eq!(report[0].2, 2);
        assert_eq!(report[1].0, "fast");
    }
}
