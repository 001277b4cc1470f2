//! Return-to-player calibration for the slot machine.
//!
//! Starting from a machine, the optimizer runs three strategies in turn and
//! keeps whichever candidate lands closest to the target return:
//!
//! 1. global scaling of every payout factor,
//! 2. a genetic search over symbol weights and payout factors,
//! 3. a proportional hill-climb on the payout factors.
//!
//! Every estimate comes from [simulate_roi_seeded], the same spin and line
//! evaluation code the live casino uses. The winner is re-measured with an
//! independent, larger simulation before it is reported.

use coinbot_execution::casino::{slots::simulate_roi_seeded, GameRng};
use coinbot_types::casino::{
    Decimal, FrequencyTable, Machine, PayoutTable, Symbol, FACTOR_DECIMALS, MIN_FACTOR,
};
use rayon::prelude::*;
use std::fmt;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    #[error("target return must be positive, got {0}")]
    InvalidTarget(f64),
    #[error("{0} must be positive")]
    ZeroTrials(&'static str),
    #[error("population of {population} cannot keep {elite} elite candidates")]
    InvalidPopulation { population: usize, elite: usize },
    #[error("mutation intensity range {min}..{max} is empty")]
    InvalidIntensity { min: f64, max: f64 },
    #[error("factors can be rounded to at most 4 decimals, got {0}")]
    InvalidDecimals(u32),
}

/// Tunables of a calibration run.
#[derive(Clone, Debug)]
pub struct Config {
    /// Return per unit bet to aim for (0.98 = 98%).
    pub target_roi: f64,
    /// Base trial budget. The starting point is measured with a tenth of it
    /// and the scaled table with a fifth.
    pub trials: u64,
    /// Trials for the final verification pass.
    pub verify_trials: u64,
    /// Seed for mutations and simulation streams.
    pub seed: u64,
    /// Decimals every payout factor is rounded to.
    pub decimals: u32,
    /// Mutated factors at or below this are left unchanged.
    pub min_factor: Decimal,

    pub population: usize,
    pub elite: usize,
    /// Zero skips the genetic search.
    pub generations: usize,
    /// Trials per candidate per generation.
    pub generation_trials: u64,
    /// Chance that a mutation touches a given symbol weight.
    pub weight_mutation_rate: f64,
    /// Chance that a mutation touches a given payout factor.
    pub factor_mutation_rate: f64,
    /// Intensity used to seed the first generation.
    pub seed_intensity: f64,
    pub min_intensity: f64,
    pub max_intensity: f64,

    /// Zero skips the hill-climb.
    pub hill_iterations: usize,
    /// Trials of the first hill-climb step; step `n` uses `n` times as many.
    pub hill_trials: u64,
    /// Proportional correction applied per unit of error.
    pub hill_gain: f64,
    /// The hill-climb stops once the error is below this.
    pub tolerance: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target_roi: 0.98,
            trials: 5_000_000,
            verify_trials: 5_000_000,
            seed: 0,
            decimals: FACTOR_DECIMALS,
            min_factor: MIN_FACTOR,
            population: 20,
            elite: 5,
            generations: 50,
            generation_trials: 10_000,
            weight_mutation_rate: 0.3,
            factor_mutation_rate: 0.2,
            seed_intensity: 0.1,
            min_intensity: 0.05,
            max_intensity: 0.15,
            hill_iterations: 30,
            hill_trials: 20_000,
            hill_gain: 0.5,
            tolerance: 0.0005,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), Error> {
        if self.target_roi.is_nan() || self.target_roi <= 0.0 {
            return Err(Error::InvalidTarget(self.target_roi));
        }
        if self.trials < 10 {
            return Err(Error::ZeroTrials("trials"));
        }
        if self.verify_trials == 0 {
            return Err(Error::ZeroTrials("verify_trials"));
        }
        if self.generations > 0 {
            if self.elite == 0 || self.elite > self.population {
                return Err(Error::InvalidPopulation {
                    population: self.population,
                    elite: self.elite,
                });
            }
            if self.generation_trials == 0 {
                return Err(Error::ZeroTrials("generation_trials"));
            }
        }
        if self.hill_iterations > 0 && self.hill_trials == 0 {
            return Err(Error::ZeroTrials("hill_trials"));
        }
        if self.min_intensity > self.max_intensity {
            return Err(Error::InvalidIntensity {
                min: self.min_intensity,
                max: self.max_intensity,
            });
        }
        if self.decimals > 4 {
            return Err(Error::InvalidDecimals(self.decimals));
        }
        Ok(())
    }
}

/// A machine together with its simulated return.
#[derive(Clone, Debug, PartialEq)]
pub struct Candidate {
    pub machine: Machine,
    pub roi: f64,
}

impl Candidate {
    pub fn distance(&self, target: f64) -> f64 {
        (self.roi - target).abs()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    Scale,
    Genetic,
    HillClimb,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Strategy::Scale => "scale",
            Strategy::Genetic => "genetic",
            Strategy::HillClimb => "hill-climb",
        };
        f.write_str(name)
    }
}

/// Where a strategy left the best candidate.
#[derive(Clone, Debug, PartialEq)]
pub struct StrategyReport {
    pub strategy: Strategy,
    /// Best return after the strategy ran.
    pub roi: f64,
    pub improved: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Report {
    pub target_roi: f64,
    pub initial_roi: f64,
    pub strategies: Vec<StrategyReport>,
    /// Best machine, with the return measured by the verification pass.
    pub best: Candidate,
}

pub struct Optimizer {
    config: Config,
    rng: GameRng,
}

impl Optimizer {
    pub fn new(config: Config) -> Result<Self, Error> {
        config.validate()?;
        let rng = GameRng::new(config.seed);
        Ok(Self { config, rng })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Simulate `machine` on a fresh stream.
    fn simulate(&mut self, machine: &Machine, trials: u64) -> f64 {
        let seed = self.rng.next_u64();
        simulate_roi_seeded(trials, &machine.frequencies, &machine.payouts, seed)
    }

    /// Measure `machine` with its factors rounded to the configured decimals.
    pub fn candidate(&mut self, machine: Machine, trials: u64) -> Candidate {
        let machine = Machine {
            payouts: machine.payouts.scaled(Decimal::ONE, self.config.decimals),
            frequencies: machine.frequencies,
        };
        let roi = self.simulate(&machine, trials);
        Candidate { machine, roi }
    }

    /// Run every strategy from `initial` and verify the winner.
    pub fn optimize(&mut self, initial: Machine) -> Report {
        let target = self.config.target_roi;
        let mut best = self.candidate(initial, self.config.trials / 10);
        let initial_roi = best.roi;
        info!(
            target,
            roi = initial_roi,
            error = best.distance(target),
            "starting calibration"
        );

        let mut strategies = vec![self.scale(&mut best)];
        if self.config.generations > 0 {
            strategies.push(self.genetic(&mut best));
        }
        if self.config.hill_iterations > 0 {
            strategies.push(self.hill_climb(&mut best));
        }

        best.roi = self.simulate(&best.machine, self.config.verify_trials);
        info!(
            roi = best.roi,
            error = best.distance(target),
            trials = self.config.verify_trials,
            "verified best machine"
        );
        Report {
            target_roi: target,
            initial_roi,
            strategies,
            best,
        }
    }

    /// Multiply every factor by `target / roi` and keep the result if it
    /// lands closer.
    pub fn scale(&mut self, best: &mut Candidate) -> StrategyReport {
        let target = self.config.target_roi;
        if best.roi <= 0.0 {
            info!(strategy = %Strategy::Scale, "nothing pays, cannot scale");
            return self.report(Strategy::Scale, best, false);
        }

        let factor = target / best.roi;
        let machine = Machine {
            frequencies: best.machine.frequencies.clone(),
            payouts: best
                .machine
                .payouts
                .scaled(Decimal::from_f64(factor), self.config.decimals),
        };
        let roi = self.simulate(&machine, self.config.trials / 5);
        let scaled = Candidate { machine, roi };
        let improved = scaled.distance(target) < best.distance(target);
        info!(
            strategy = %Strategy::Scale,
            factor,
            roi,
            error = scaled.distance(target),
            improved,
            "scaled payouts"
        );
        if improved {
            *best = scaled;
        }
        self.report(Strategy::Scale, best, improved)
    }

    /// Evolve a population seeded from `best`, keeping the elite of every
    /// generation and refilling the rest with their mutants.
    pub fn genetic(&mut self, best: &mut Candidate) -> StrategyReport {
        let target = self.config.target_roi;
        let size = self.config.population.max(1);
        let mut improved = false;

        let mut population = Vec::with_capacity(size);
        population.push(best.machine.clone());
        while population.len() < size {
            let mutant = self.mutate(&best.machine, self.config.seed_intensity);
            population.push(mutant);
        }

        for generation in 0..self.config.generations {
            let mut scored = self.evaluate(population);
            scored.sort_by(|a, b| a.distance(target).total_cmp(&b.distance(target)));

            let leader = &scored[0];
            if leader.distance(target) < best.distance(target) {
                *best = leader.clone();
                improved = true;
            }
            if generation % 10 == 0 {
                info!(
                    strategy = %Strategy::Genetic,
                    generation,
                    roi = leader.roi,
                    error = leader.distance(target),
                    "generation evaluated"
                );
            } else {
                debug!(generation, roi = leader.roi, "generation evaluated");
            }

            let elite = self.config.elite.min(scored.len());
            population = scored
                .into_iter()
                .take(elite)
                .map(|candidate| candidate.machine)
                .collect();
            for i in elite..size {
                let intensity = self.intensity();
                let mutant = self.mutate(&population[i % elite], intensity);
                population.push(mutant);
            }
        }

        info!(
            strategy = %Strategy::Genetic,
            roi = best.roi,
            error = best.distance(target),
            improved,
            "genetic search finished"
        );
        self.report(Strategy::Genetic, best, improved)
    }

    /// Nudge every factor against the current error until it is within
    /// tolerance, re-measuring with more trials each step.
    pub fn hill_climb(&mut self, best: &mut Candidate) -> StrategyReport {
        let target = self.config.target_roi;
        let mut improved = false;

        for iteration in 0..self.config.hill_iterations {
            let trials = self.config.hill_trials.saturating_mul(iteration as u64 + 1);
            best.roi = self.simulate(&best.machine, trials);
            let error = best.roi - target;
            if error.abs() < self.config.tolerance {
                info!(
                    strategy = %Strategy::HillClimb,
                    iteration,
                    roi = best.roi,
                    "within tolerance"
                );
                break;
            }

            let adjustment = 1.0 - error * self.config.hill_gain;
            let machine = Machine {
                frequencies: best.machine.frequencies.clone(),
                payouts: best
                    .machine
                    .payouts
                    .scaled(Decimal::from_f64(adjustment), self.config.decimals),
            };
            if machine.payouts == best.machine.payouts {
                debug!(iteration, adjustment, "adjustment lost to rounding");
                continue;
            }
            let roi = self.simulate(&machine, trials);
            let nudged = Candidate { machine, roi };
            let accepted = nudged.distance(target) < best.distance(target);
            if accepted {
                *best = nudged;
                improved = true;
            }
            if iteration % 5 == 0 {
                info!(
                    strategy = %Strategy::HillClimb,
                    iteration,
                    trials,
                    adjustment,
                    roi,
                    accepted,
                    "hill-climb step"
                );
            }
        }

        self.report(Strategy::HillClimb, best, improved)
    }

    fn report(&self, strategy: Strategy, best: &Candidate, improved: bool) -> StrategyReport {
        StrategyReport {
            strategy,
            roi: best.roi,
            improved,
        }
    }

    /// Simulate every machine of a generation, each on its own stream.
    fn evaluate(&mut self, population: Vec<Machine>) -> Vec<Candidate> {
        let trials = self.config.generation_trials;
        let seeds: Vec<u64> = population.iter().map(|_| self.rng.next_u64()).collect();
        population
            .into_par_iter()
            .zip(seeds)
            .map(|(machine, seed)| {
                let roi =
                    simulate_roi_seeded(trials, &machine.frequencies, &machine.payouts, seed);
                Candidate { machine, roi }
            })
            .collect()
    }

    fn intensity(&mut self) -> f64 {
        let span = self.config.max_intensity - self.config.min_intensity;
        self.config.min_intensity + self.rng.next_f64() * span
    }

    fn mutate(&mut self, machine: &Machine, intensity: f64) -> Machine {
        Machine {
            frequencies: mutate_frequencies(
                &mut self.rng,
                &machine.frequencies,
                self.config.weight_mutation_rate,
                intensity,
            ),
            payouts: mutate_payouts(
                &mut self.rng,
                &machine.payouts,
                self.config.factor_mutation_rate,
                intensity,
                self.config.min_factor,
                self.config.decimals,
            ),
        }
    }
}

/// Shift each weight with probability `rate` by up to `intensity` of itself
/// in either direction. Weights never drop below 1.
pub fn mutate_frequencies(
    rng: &mut GameRng,
    frequencies: &FrequencyTable,
    rate: f64,
    intensity: f64,
) -> FrequencyTable {
    let mut mutated = frequencies.clone();
    for symbol in Symbol::ALL {
        if !rng.chance(rate) {
            continue;
        }
        let weight = frequencies.weight(symbol) as i64;
        let change = (weight as f64 * intensity * rng.next_signed()) as i64;
        let weight = (weight + change).clamp(1, u32::MAX as i64) as u32;
        mutated.set_weight(symbol, weight);
    }
    mutated
}

/// Shift each factor with probability `rate` by up to `intensity` of itself
/// in either direction, rounded to `decimals`. A shift that would land at or
/// below `floor` is dropped.
pub fn mutate_payouts(
    rng: &mut GameRng,
    payouts: &PayoutTable,
    rate: f64,
    intensity: f64,
    floor: Decimal,
    decimals: u32,
) -> PayoutTable {
    payouts.map_factors(|_, factor| {
        if !rng.chance(rate) {
            return factor;
        }
        let shifted = factor.to_f64() * (1.0 + intensity * rng.next_signed());
        let shifted = Decimal::from_f64(shifted).round_to(decimals);
        if shifted > floor {
            shifted
        } else {
            factor
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use coinbot_execution::casino::slots::expected_roi;

    fn small_config(seed: u64) -> Config {
        Config {
            trials: 200_000,
            verify_trials: 100_000,
            seed,
            population: 6,
            elite: 2,
            generations: 4,
            generation_trials: 5_000,
            hill_iterations: 4,
            hill_trials: 10_000,
            ..Config::default()
        }
    }

    /// The production machine with payouts scaled to return about `roi`.
    fn machine_returning(roi: f64, decimals: u32) -> Machine {
        let standard = Machine::standard();
        let exact = expected_roi(&standard.frequencies, &standard.payouts);
        Machine {
            payouts: standard
                .payouts
                .scaled(Decimal::from_f64(roi / exact), decimals),
            frequencies: standard.frequencies,
        }
    }

    fn assert_rounded(payouts: &PayoutTable, decimals: u32) {
        let step = 10i64.pow(4 - decimals);
        for (key, factor) in payouts.iter() {
            assert_eq!(factor.raw() % step, 0, "{key} = {factor}");
            assert!(*factor >= Decimal::ZERO);
        }
    }

    #[test]
    fn test_config_validation() {
        assert!(Config::default().validate().is_ok());
        assert_eq!(
            Config {
                target_roi: 0.0,
                ..Config::default()
            }
            .validate(),
            Err(Error::InvalidTarget(0.0))
        );
        assert_eq!(
            Config {
                elite: 21,
                ..Config::default()
            }
            .validate(),
            Err(Error::InvalidPopulation {
                population: 20,
                elite: 21
            })
        );
        // Without a genetic search the population does not matter
        assert!(Config {
            elite: 0,
            generations: 0,
            ..Config::default()
        }
        .validate()
        .is_ok());
        assert!(Optimizer::new(Config {
            decimals: 5,
            ..Config::default()
        })
        .is_err());
    }

    #[test]
    fn test_scaling_reaches_target() {
        let machine = machine_returning(1.40, 2);
        let exact = expected_roi(&machine.frequencies, &machine.payouts);
        assert!((exact - 1.40).abs() < 0.01, "starting return {exact}");

        let mut optimizer = Optimizer::new(Config {
            target_roi: 0.98,
            decimals: 2,
            seed: 7,
            ..Config::default()
        })
        .unwrap();
        let trials = optimizer.config().trials / 10;
        let mut best = optimizer.candidate(machine, trials);
        let report = optimizer.scale(&mut best);

        assert!(report.improved);
        assert_eq!(report.strategy, Strategy::Scale);
        assert!((best.roi - 0.98).abs() < 0.03, "simulated {}", best.roi);
        let exact = expected_roi(&best.machine.frequencies, &best.machine.payouts);
        assert!((exact - 0.98).abs() < 0.03, "exact {exact}");
        assert_rounded(&best.machine.payouts, 2);
    }

    #[test]
    fn test_scaling_needs_a_paying_table() {
        let mut optimizer = Optimizer::new(small_config(1)).unwrap();
        let mut best = Candidate {
            machine: Machine {
                frequencies: FrequencyTable::standard(),
                payouts: PayoutTable::new(),
            },
            roi: 0.0,
        };
        let report = optimizer.scale(&mut best);
        assert!(!report.improved);
        assert!(best.machine.payouts.is_empty());
    }

    #[test]
    fn test_mutation_respects_floors() {
        let mut rng = GameRng::new(3);
        let mut frequencies = FrequencyTable::standard();
        frequencies.set_weight(Symbol::Jackpot, 1);
        for _ in 0..200 {
            frequencies = mutate_frequencies(&mut rng, &frequencies, 1.0, 0.9);
            assert!(frequencies.weights().iter().all(|w| *w >= 1));
        }

        let payouts = PayoutTable::standard();
        for _ in 0..50 {
            let mutated = mutate_payouts(&mut rng, &payouts, 1.0, 0.95, MIN_FACTOR, 1);
            assert_eq!(mutated.len(), payouts.len());
            for (key, factor) in mutated.iter() {
                assert!(*factor > MIN_FACTOR || payouts.factor(key) == Some(*factor));
            }
            assert_rounded(&mutated, 1);
        }
    }

    #[test]
    fn test_zero_rate_mutation_is_identity() {
        let mut rng = GameRng::new(3);
        let machine = Machine::standard();
        assert_eq!(
            mutate_frequencies(&mut rng, &machine.frequencies, 0.0, 0.5),
            machine.frequencies
        );
        assert_eq!(
            mutate_payouts(&mut rng, &machine.payouts, 0.0, 0.5, MIN_FACTOR, 1),
            machine.payouts
        );
    }

    #[test]
    fn test_genetic_never_loses_best() {
        let mut optimizer = Optimizer::new(small_config(5)).unwrap();
        let mut best = optimizer.candidate(machine_returning(1.2, 1), 20_000);
        let before = best.distance(0.98);
        let report = optimizer.genetic(&mut best);
        assert!(best.distance(0.98) <= before);
        assert_eq!(report.improved, best.distance(0.98) < before);
        assert!(best.machine.frequencies.weights().iter().all(|w| *w >= 1));
        assert_rounded(&best.machine.payouts, 1);
    }

    #[test]
    fn test_hill_climb_moves_toward_target() {
        let mut optimizer = Optimizer::new(Config {
            decimals: 2,
            ..small_config(11)
        })
        .unwrap();
        let mut best = optimizer.candidate(machine_returning(1.1, 2), 50_000);
        let report = optimizer.hill_climb(&mut best);
        assert_eq!(report.strategy, Strategy::HillClimb);
        let exact = expected_roi(&best.machine.frequencies, &best.machine.payouts);
        assert!(exact < 1.1, "exact {exact}");
    }

    #[test]
    fn test_optimize_is_reproducible() {
        let machine = machine_returning(1.3, 1);
        let first = Optimizer::new(small_config(42))
            .unwrap()
            .optimize(machine.clone());
        let second = Optimizer::new(small_config(42)).unwrap().optimize(machine);
        assert_eq!(first, second);

        let order: Vec<_> = first.strategies.iter().map(|s| s.strategy).collect();
        assert_eq!(
            order,
            vec![Strategy::Scale, Strategy::Genetic, Strategy::HillClimb]
        );
        assert!(first.best.distance(0.98) < (first.initial_roi - 0.98).abs());
    }
}
