//! Rolling thirty-day traded volume.

pub const THIRTY_DAY_HOURS: u32 = 720;

#[derive(Debug, Clone, Copy, PartialEq)]
struct VolumeEntry {
    age: u32,
    volume: f64,
}

/// Per-step traded volumes tagged with their age in steps (hours).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VolumeWindow {
    entries: Vec<VolumeEntry>,
    total: f64,
}

impl VolumeWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record volume traded on the current step. It counts towards the
    /// total from the next call to [`advance`](Self::advance) onwards.
    pub fn record(&mut self, volume: f64) {
        if volume > 0.0 {
            self.entries.push(VolumeEntry { age: 0, volume });
        }
    }

    /// Close the current step: entries aged [`THIRTY_DAY_HOURS`] or more are
    /// evicted, the rest are summed and aged by one step.
    pub fn advance(&mut self) {
        self.entries.retain(|e| e.age < THIRTY_DAY_HOURS);
        self.total = self.entries.iter().map(|e| e.volume).sum();
        for entry in &mut self.entries {
            entry.age += 1;
        }
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_window_has_zero_total() {
        let mut window = VolumeWindow::new();
        window.advance();
        assert_eq!(window.total(), 0.0);
        assert!(window.is_empty());
    }

    #[test]
    fn recorded_volume_counts_after_advance() {
        let mut window = VolumeWindow::new();
        window.record(500.0);
        assert_eq!(window.total(), 0.0);
        window.advance();
        assert_eq!(window.total(), 500.0);
    }

    #[test]
    fn zero_volume_is_not_recorded() {
        let mut window = VolumeWindow::new();
        window.record(0.0);
        assert!(window.is_empty());
    }

    #[test]
    fn entries_evicted_after_thirty_days() {
        let mut window = VolumeWindow::new();
        window.record(100.0);
        for _ in 0..THIRTY_DAY_HOURS {
            window.advance();
            assert_eq!(window.total(), 100.0);
        }
        window.advance();
        assert_eq!(window.total(), 0.0);
        assert_eq!(window.len(), 0);
    }

    #[test]
    fn total_sums_live_entries() {
        let mut window = VolumeWindow::new();
        window.record(100.0);
        window.advance();
        window.record(250.0);
        window.advance();
        assert_eq!(window.total(), 350.0);
        assert_eq!(window.len(), 2);
    }
}
