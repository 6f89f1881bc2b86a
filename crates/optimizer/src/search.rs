use crate::error::OptimizerError;
use crate::fitness::FitnessFn;
use crate::genome;
use configuration::{SearchConfig, SelectionKind, StrategyParams};
use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use std::cmp::Ordering;

/// One member of a generation: a parameter vector and, once the evaluation
/// pass has touched it, its score.
#[derive(Debug, Clone)]
pub struct Individual {
    pub params: StrategyParams,
    pub fitness: Option<f64>,
}

/// What the search hands back: the best vector seen across *all*
/// generations, not just the last one — the genetic loop is not monotonic.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub best_params: StrategyParams,
    pub best_fitness: f64,
    pub generations_run: usize,
}

/// Picks a parent from a generation that has been ranked best-first.
pub trait SelectionPolicy: Send + Sync {
    fn select<'a>(&self, ranked: &'a [Individual], rng: &mut StdRng) -> &'a Individual;
}

/// Rank selection among the `k` fittest members, the steady-state scheme
/// the original search ran with four parents.
struct TopK {
    k: usize,
}

impl SelectionPolicy for TopK {
    fn select<'a>(&self, ranked: &'a [Individual], rng: &mut StdRng) -> &'a Individual {
        let k = self.k.min(ranked.len()).max(1);
        &ranked[rng.random_range(0..k)]
    }
}

/// K-way tournament over the whole generation. Because `ranked` is sorted
/// best-first, the fittest entrant is simply the lowest drawn index.
struct Tournament {
    k: usize,
}

impl SelectionPolicy for Tournament {
    fn select<'a>(&self, ranked: &'a [Individual], rng: &mut StdRng) -> &'a Individual {
        let mut winner = rng.random_range(0..ranked.len());
        for _ in 1..self.k {
            winner = winner.min(rng.random_range(0..ranked.len()));
        }
        &ranked[winner]
    }
}

/// The generational genetic search over [`StrategyParams`] space.
///
/// Each generation is evaluated in parallel, ranked, and bred: the
/// `num_parents` fittest members carry over unchanged (with their scores,
/// so they are not re-simulated), and the rest of the next generation is
/// produced by crossover and mutation of selected parents. A candidate
/// whose evaluation fails is scored at `f64::NEG_INFINITY` and the search
/// moves on; one bad vector must never halt an optimization run.
pub struct PopulationSearch<F: FitnessFn> {
    config: SearchConfig,
    fitness: F,
    selection: Box<dyn SelectionPolicy>,
}

impl<F: FitnessFn> PopulationSearch<F> {
    /// Validates the configuration and fixes the selection policy. All
    /// configuration problems surface here, before any simulation runs.
    pub fn new(config: SearchConfig, fitness: F) -> Result<Self, OptimizerError> {
        config.validate()?;
        let selection: Box<dyn SelectionPolicy> = match config.selection {
            SelectionKind::TopK => Box::new(TopK { k: config.num_parents }),
            SelectionKind::Tournament => Box::new(Tournament { k: config.tournament_size }),
        };
        Ok(Self { config, fitness, selection })
    }

    pub fn run(&self) -> Result<SearchOutcome, OptimizerError> {
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let mut population: Vec<Individual> = (0..self.config.population_size)
            .map(|_| Individual {
                params: genome::sample(&self.config.bounds, &mut rng),
                fitness: None,
            })
            .collect();

        let progress_bar = ProgressBar::new(self.config.generations as u64);
        progress_bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")?
                .progress_chars("=>-"),
        );

        let mut best: Option<(StrategyParams, f64)> = None;
        let mut stagnant_generations = 0usize;
        let mut generations_run = 0usize;

        for generation in 0..self.config.generations {
            self.evaluate_population(&mut population);
            population.sort_by(|a, b| {
                b.fitness.partial_cmp(&a.fitness).unwrap_or(Ordering::Equal)
            });

            let generation_best = population[0].fitness.unwrap_or(f64::NEG_INFINITY);
            let improved = best.map_or(true, |(_, all_time)| generation_best > all_time);
            if improved {
                best = Some((population[0].params, generation_best));
                stagnant_generations = 0;
            } else {
                stagnant_generations += 1;
            }

            generations_run = generation + 1;
            tracing::info!(
                generation = generations_run,
                generation_best,
                all_time_best = best.map(|(_, fitness)| fitness),
                "generation evaluated"
            );
            progress_bar.set_message(format!("best {generation_best:.2}"));
            progress_bar.inc(1);

            if let Some(limit) = self.config.stagnation_generations {
                if stagnant_generations >= limit {
                    tracing::info!(
                        generations_run,
                        "stopping early: no improvement for {limit} generations"
                    );
                    break;
                }
            }
            if generations_run == self.config.generations {
                break;
            }

            population = self.reproduce(&population, &mut rng);
        }

        progress_bar.finish_and_clear();

        // The generation budget is validated to be at least 1, so the loop
        // above has always recorded a best by the time we get here.
        let (best_params, best_fitness) = best.expect("search ran at least one generation");
        Ok(SearchOutcome { best_params, best_fitness, generations_run })
    }

    /// Scores every unevaluated member. This is the dominant cost of a
    /// generation and is data-parallel: candidates share nothing but the
    /// read-only objective.
    fn evaluate_population(&self, population: &mut [Individual]) {
        population.par_iter_mut().for_each(|individual| {
            if individual.fitness.is_some() {
                return; // Elite carried over with its score.
            }
            let fitness = match self.fitness.evaluate(&individual.params) {
                Ok(score) => score,
                Err(error) => {
                    tracing::warn!(%error, "candidate evaluation failed; scoring as worst");
                    f64::NEG_INFINITY
                }
            };
            individual.fitness = Some(fitness);
        });
    }

    fn reproduce(&self, ranked: &[Individual], rng: &mut StdRng) -> Vec<Individual> {
        let mut next = Vec::with_capacity(self.config.population_size);

        // Elitism: the parent pool survives verbatim, scores included.
        next.extend(ranked.iter().take(self.config.num_parents).cloned());

        while next.len() < self.config.population_size {
            let parent_a = self.selection.select(ranked, rng);
            let parent_b = self.selection.select(ranked, rng);
            let mut child =
                genome::crossover(&parent_a.params, &parent_b.params, &self.config.bounds, rng);
            genome::mutate(&mut child, &self.config.bounds, self.config.mutation_num_genes, rng);
            next.push(Individual { params: child, fitness: None });
        }

        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fitness::FitnessError;
    use crate::genome::tests::bounds;

    fn config(seed: u64) -> SearchConfig {
        SearchConfig {
            population_size: 12,
            generations: 6,
            num_parents: 4,
            mutation_num_genes: 4,
            selection: SelectionKind::TopK,
            tournament_size: 3,
            stagnation_generations: None,
            seed: Some(seed),
            bounds: bounds(),
        }
    }

    /// Deterministic stand-in for the walk-forward objective: rewards large
    /// gene values.
    struct SumFitness;

    impl FitnessFn for SumFitness {
        fn evaluate(&self, params: &StrategyParams) -> Result<f64, FitnessError> {
            Ok(params.as_genes().iter().map(|&g| f64::from(g)).sum())
        }
    }

    /// Fails on every candidate, exercising the worst-case scoring path.
    struct AlwaysFails;

    impl FitnessFn for AlwaysFails {
        fn evaluate(&self, params: &StrategyParams) -> Result<f64, FitnessError> {
            Err(FitnessError::Collaborator {
                window: format!("stub for {}", params.rsi_period),
                source: backtester::error::BacktestError::InsufficientData {
                    required: 100,
                    actual: 0,
                },
            })
        }
    }

    #[test]
    fn returned_vector_satisfies_every_invariant() {
        let search = PopulationSearch::new(config(11), SumFitness).unwrap();
        let outcome = search.run().unwrap();

        assert!(bounds().contains(&outcome.best_params));
        assert!(outcome.best_params.validate().is_ok());
        assert!(outcome.best_params.macd_short_period < outcome.best_params.macd_long_period);
        assert!(outcome.best_params.rsi_oversold < outcome.best_params.rsi_overbought);
    }

    #[test]
    fn best_never_regresses_below_the_initial_generation() {
        let config = config(42);
        let seed = config.seed.unwrap();
        let search = PopulationSearch::new(config.clone(), SumFitness).unwrap();
        let outcome = search.run().unwrap();

        // Rebuild the seeded initial population: sampling is the first and
        // only RNG consumer before generation zero is evaluated.
        let mut rng = StdRng::seed_from_u64(seed);
        let initial_best = (0..config.population_size)
            .map(|_| genome::sample(&config.bounds, &mut rng))
            .map(|params| SumFitness.evaluate(&params).unwrap())
            .fold(f64::NEG_INFINITY, f64::max);

        assert!(outcome.best_fitness >= initial_best);
    }

    #[test]
    fn failing_candidates_score_worst_but_do_not_abort() {
        let search = PopulationSearch::new(config(7), AlwaysFails).unwrap();
        let outcome = search.run().unwrap();

        assert_eq!(outcome.best_fitness, f64::NEG_INFINITY);
        assert_eq!(outcome.generations_run, 6);
    }

    #[test]
    fn empty_population_is_rejected_up_front() {
        let mut config = config(1);
        config.population_size = 0;
        assert!(PopulationSearch::new(config, SumFitness).is_err());
    }

    #[test]
    fn stagnation_limit_stops_the_search_early() {
        struct Constant;
        impl FitnessFn for Constant {
            fn evaluate(&self, _params: &StrategyParams) -> Result<f64, FitnessError> {
                Ok(1.0)
            }
        }

        let mut config = config(5);
        config.generations = 50;
        config.stagnation_generations = Some(3);
        let outcome = PopulationSearch::new(config, Constant).unwrap().run().unwrap();

        // Generation one sets the best; three flat generations follow.
        assert_eq!(outcome.generations_run, 4);
    }

    #[test]
    fn tournament_selection_runs_to_completion() {
        let mut config = config(9);
        config.selection = SelectionKind::Tournament;
        let outcome = PopulationSearch::new(config, SumFitness).unwrap().run().unwrap();
        assert!(outcome.best_fitness.is_finite());
    }
}
