//! Engine configuration.

use super::selection::Selection;

/// Parameters for the evolutionary engine.
///
/// Termination is not configured here: the engine steps one generation
/// at a time and the owning worker decides when to stop.
///
/// # Builder pattern
///
/// ```
/// use binshift::evo::{EvoConfig, Selection};
///
/// let config = EvoConfig::default()
///     .with_population_size(200)
///     .with_selection(Selection::Tournament(5))
///     .with_mutation_rate(0.3);
/// ```
#[derive(Debug, Clone)]
pub struct EvoConfig {
    /// Number of individuals in the population. Typical range: 50–500.
    pub population_size: usize,

    /// Selection strategy for choosing parents.
    pub selection: Selection,

    /// Fraction of the population preserved unchanged as elites (0.0–1.0).
    pub elite_ratio: f64,

    /// Probability of applying crossover to a pair of parents (0.0–1.0).
    pub crossover_rate: f64,

    /// Probability of applying mutation to an offspring (0.0–1.0).
    pub mutation_rate: f64,

    /// Whether to evaluate individuals in parallel using rayon.
    pub parallel: bool,

    /// Random seed. `None` uses a random seed.
    pub seed: Option<u64>,
}

impl Default for EvoConfig {
    fn default() -> Self {
        Self {
            population_size: 300,
            selection: Selection::default(),
            elite_ratio: 0.1,
            crossover_rate: 0.5,
            mutation_rate: 0.2,
            parallel: true,
            seed: None,
        }
    }
}

impl EvoConfig {
    pub fn with_population_size(mut self, n: usize) -> Self {
        self.population_size = n;
        self
    }

    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = selection;
        self
    }

    pub fn with_elite_ratio(mut self, ratio: f64) -> Self {
        self.elite_ratio = ratio.clamp(0.0, 1.0);
        self
    }

    pub fn with_crossover_rate(mut self, rate: f64) -> Self {
        self.crossover_rate = rate.clamp(0.0, 1.0);
        self
    }

    pub fn with_mutation_rate(mut self, rate: f64) -> Self {
        self.mutation_rate = rate.clamp(0.0, 1.0);
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.population_size < 2 {
            return Err("population_size must be at least 2".into());
        }
        let elite_count = (self.population_size as f64 * self.elite_ratio) as usize;
        if elite_count >= self.population_size {
            return Err("elite_ratio too high: elites fill entire population".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = EvoConfig::default();
        assert_eq!(config.population_size, 300);
        assert_eq!(config.selection, Selection::Tournament(3));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_pattern() {
        let config = EvoConfig::default()
            .with_population_size(50)
            .with_selection(Selection::Rank)
            .with_elite_ratio(0.2)
            .with_crossover_rate(0.8)
            .with_mutation_rate(0.05)
            .with_parallel(false)
            .with_seed(42);

        assert_eq!(config.population_size, 50);
        assert_eq!(config.selection, Selection::Rank);
        assert!((config.elite_ratio - 0.2).abs() < 1e-10);
        assert!((config.crossover_rate - 0.8).abs() < 1e-10);
        assert!((config.mutation_rate - 0.05).abs() < 1e-10);
        assert!(!config.parallel);
        assert_eq!(config.seed, Some(42));
    }

    #[test]
    fn test_rates_clamped() {
        let config = EvoConfig::default()
            .with_elite_ratio(1.5)
            .with_crossover_rate(-0.5)
            .with_mutation_rate(2.0);
        assert!((config.elite_ratio - 1.0).abs() < 1e-10);
        assert!((config.crossover_rate - 0.0).abs() < 1e-10);
        assert!((config.mutation_rate - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_validate_population_too_small() {
        assert!(EvoConfig::default().with_population_size(1).validate().is_err());
    }

    #[test]
    fn test_validate_elite_too_high() {
        let config = EvoConfig::default()
            .with_population_size(10)
            .with_elite_ratio(1.0);
        assert!(config.validate().is_err());
    }
}
