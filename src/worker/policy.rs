//! Policies deciding when a worker should pause itself.

use crate::evo::GenerationStats;

/// Decides after each generation whether the worker should pause and
/// wait for an explicit resume.
pub trait PausePolicy: Send + 'static {
    fn should_pause(&mut self, stats: &GenerationStats) -> bool;

    /// Called when the worker resumes after a pause triggered by this
    /// policy. Default is a no-op.
    fn on_resume(&mut self) {}
}

/// Never pauses; the worker runs until the generation ceiling or an
/// explicit stop.
#[derive(Debug, Default, Clone, Copy)]
pub struct NeverPause;

impl PausePolicy for NeverPause {
    fn should_pause(&mut self, _stats: &GenerationStats) -> bool {
        false
    }
}

/// Pauses every `budget` generations, growing the budget by `growth`
/// after each resume so later checkpoints come further apart.
#[derive(Debug, Clone)]
pub struct GenerationBudget {
    current: f64,
    growth: f64,
    seen: usize,
}

impl GenerationBudget {
    pub fn new(budget: usize) -> Self {
        Self {
            current: budget.max(1) as f64,
            growth: 1.0,
            seen: 0,
        }
    }

    pub fn with_growth(mut self, factor: f64) -> Self {
        self.growth = factor.max(1.0);
        self
    }
}

impl PausePolicy for GenerationBudget {
    fn should_pause(&mut self, _stats: &GenerationStats) -> bool {
        self.seen += 1;
        if self.seen as f64 >= self.current {
            self.seen = 0;
            true
        } else {
            false
        }
    }

    fn on_resume(&mut self) {
        self.current *= self.growth;
    }
}

/// Pauses when the best fitness has not improved for `window`
/// consecutive generations. The window doubles after each resume so a
/// plateau does not immediately pause again.
#[derive(Debug, Clone)]
pub struct Stagnation {
    window: usize,
    min_improvement: f64,
    best: f64,
    stale: usize,
}

impl Stagnation {
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
            min_improvement: 1e-9,
            best: f64::INFINITY,
            stale: 0,
        }
    }

    pub fn with_min_improvement(mut self, delta: f64) -> Self {
        self.min_improvement = delta.max(0.0);
        self
    }
}

impl PausePolicy for Stagnation {
    fn should_pause(&mut self, stats: &GenerationStats) -> bool {
        if self.best - stats.best > self.min_improvement {
            self.best = stats.best;
            self.stale = 0;
            return false;
        }
        self.stale += 1;
        if self.stale >= self.window {
            self.stale = 0;
            true
        } else {
            false
        }
    }

    fn on_resume(&mut self) {
        self.window *= 2;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(generation: usize, best: f64) -> GenerationStats {
        GenerationStats {
            generation,
            best,
            mean: best,
        }
    }

    #[test]
    fn test_generation_budget_pauses_on_schedule() {
        let mut policy = GenerationBudget::new(3);
        assert!(!policy.should_pause(&frame(1, 9.0)));
        assert!(!policy.should_pause(&frame(2, 8.0)));
        assert!(policy.should_pause(&frame(3, 7.0)));
        // Counter restarts after a pause.
        assert!(!policy.should_pause(&frame(4, 6.0)));
    }

    #[test]
    fn test_generation_budget_growth() {
        let mut policy = GenerationBudget::new(2).with_growth(2.0);
        assert!(!policy.should_pause(&frame(1, 9.0)));
        assert!(policy.should_pause(&frame(2, 8.0)));
        policy.on_resume();
        for generation in 3..6 {
            assert!(!policy.should_pause(&frame(generation, 7.0)));
        }
        assert!(policy.should_pause(&frame(6, 7.0)));
    }

    #[test]
    fn test_stagnation_resets_on_improvement() {
        let mut policy = Stagnation::new(3);
        assert!(!policy.should_pause(&frame(1, 10.0)));
        assert!(!policy.should_pause(&frame(2, 10.0)));
        assert!(!policy.should_pause(&frame(3, 9.0)));
        assert!(!policy.should_pause(&frame(4, 9.0)));
        assert!(!policy.should_pause(&frame(5, 9.0)));
        assert!(policy.should_pause(&frame(6, 9.0)));
    }

    #[test]
    fn test_stagnation_window_relaxes_after_resume() {
        let mut policy = Stagnation::new(2);
        assert!(!policy.should_pause(&frame(1, 5.0)));
        assert!(!policy.should_pause(&frame(2, 5.0)));
        assert!(policy.should_pause(&frame(3, 5.0)));
        policy.on_resume();
        for generation in 4..7 {
            assert!(!policy.should_pause(&frame(generation, 5.0)));
        }
        assert!(policy.should_pause(&frame(7, 5.0)));
    }
}
