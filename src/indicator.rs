//! Progress indicator: how far through the wizard the active step is

use serde::Serialize;

/// Progress through the steps, as shown by a progress bar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    /// 1-based number of the active step
    pub current: usize,
    /// Step count (at least 1, so an empty wizard never divides by zero)
    pub total: usize,
    /// Rounded percentage, clamped to 100
    pub percent: u8,
}

impl Progress {
    pub fn of(active: usize, count: usize) -> Self {
        let total = count.max(1);
        let current = active.saturating_add(1);
        let ratio = current as f64 / total as f64;
        let percent = (ratio * 100.0).round().min(100.0) as u8;
        Self {
            current,
            total,
            percent,
        }
    }

    /// Text progress bar, e.g. `[#####-----]  50%`
    pub fn render_bar(&self, width: usize) -> String {
        let filled = (width * usize::from(self.percent) + 50) / 100;
        format!(
            "[{}{}] {:>3}%",
            "#".repeat(filled),
            "-".repeat(width.saturating_sub(filled)),
            self.percent
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_rounds() {
        assert_eq!(Progress::of(0, 3).percent, 33);
        assert_eq!(Progress::of(1, 3).percent, 67);
        assert_eq!(Progress::of(2, 3).percent, 100);
    }

    #[test]
    fn test_progress_empty_wizard() {
        let progress = Progress::of(0, 0);
        assert_eq!(progress.total, 1);
        assert_eq!(progress.percent, 100);
    }

    #[test]
    fn test_progress_clamps_past_end() {
        assert_eq!(Progress::of(5, 2).percent, 100);
    }

    #[test]
    fn test_render_bar() {
        assert_eq!(Progress::of(1, 4).render_bar(10), "[#####-----]  50%");
        assert_eq!(Progress::of(3, 4).render_bar(4), "[####] 100%");
    }
}
