//! Slot machine engine.
//!
//! A spin fills a 3x3 board by weighted sampling, then each of the eight
//! lines is read and looked up in the payout table. Lines are scored by
//! geometry: two lines reading the same symbols both pay.
//!
//! The live controller and the calibration optimizer both go through
//! [spin] and [return_factor], so a calibrated table behaves the same in
//! production as it did in simulation.

use super::GameRng;
use coinbot_types::{
    api::WinningLine,
    casino::{Board, Decimal, FrequencyTable, Line, LineKey, PayoutTable, Symbol},
};

/// Trials simulated per independent random stream.
pub const SIMULATION_CHUNK: u64 = 1 << 16;

/// Outcome of evaluating one board.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpinResult {
    pub board: Board,
    /// Exact payout in coins (fixed point).
    pub payout: Decimal,
    pub winning_lines: Vec<WinningLine>,
}

impl SpinResult {
    pub fn is_win(&self) -> bool {
        !self.winning_lines.is_empty()
    }

    /// Payout credited to the ledger, rounded to the nearest coin.
    pub fn payout_coins(&self) -> i64 {
        self.payout.to_int_rounded()
    }
}

/// Draw a fresh board.
pub fn spin(frequencies: &FrequencyTable, rng: &mut GameRng) -> Board {
    let total = frequencies.total();
    let mut cells = [[Symbol::Blank; 3]; 3];
    for row in cells.iter_mut() {
        for cell in row.iter_mut() {
            *cell = frequencies.pick(rng.next_bounded(total));
        }
    }
    Board(cells)
}

/// Lines of `board` present in `payouts`, with their factor.
fn paying_lines<'a>(
    board: &'a Board,
    payouts: &'a PayoutTable,
) -> impl Iterator<Item = (Line, LineKey, Decimal)> + 'a {
    Line::ALL.into_iter().filter_map(move |line| {
        let key = board.key(line);
        payouts.factor(&key).map(|factor| (line, key, factor))
    })
}

/// Score every line of `board` for a wager of `bet` coins.
pub fn evaluate(board: &Board, payouts: &PayoutTable, bet: i64) -> SpinResult {
    let winning_lines: Vec<WinningLine> = paying_lines(board, payouts)
        .map(|(line, key, factor)| WinningLine {
            line,
            key,
            factor,
            payout: factor.mul_int(bet),
        })
        .collect();
    let payout = winning_lines.iter().map(|line| line.payout).sum();
    SpinResult {
        board: *board,
        payout,
        winning_lines,
    }
}

/// Payout of `board` for a unit bet.
pub fn return_factor(board: &Board, payouts: &PayoutTable) -> Decimal {
    paying_lines(board, payouts)
        .map(|(_, _, factor)| factor)
        .sum()
}

/// Largest possible payout of one board for a unit bet: every line paying
/// the top factor.
pub fn max_return(payouts: &PayoutTable) -> Decimal {
    payouts.max_factor().mul_int(Line::ALL.len() as i64)
}

/// Exact long-run unit-bet payout.
///
/// Cells are drawn independently and every line covers three distinct
/// cells, so each line reads a key with the product of its symbols'
/// probabilities.
pub fn expected_roi(frequencies: &FrequencyTable, payouts: &PayoutTable) -> f64 {
    let per_line: f64 = payouts
        .iter()
        .map(|(key, factor)| {
            let [a, b, c] = key.0;
            factor.to_f64()
                * frequencies.probability(a)
                * frequencies.probability(b)
                * frequencies.probability(c)
        })
        .sum();
    per_line * Line::ALL.len() as f64
}

/// Average unit-bet payout over `trials` spins drawn from `rng`.
pub fn simulate_roi(
    trials: u64,
    frequencies: &FrequencyTable,
    payouts: &PayoutTable,
    rng: &mut GameRng,
) -> f64 {
    if trials == 0 {
        return 0.0;
    }
    let total = simulate_raw(trials, frequencies, payouts, rng);
    raw_to_roi(total, trials)
}

/// Average unit-bet payout over `trials` spins, split into fixed-size chunks
/// that each draw from their own stream of `seed`.
///
/// The result only depends on the arguments, whether or not the `parallel`
/// feature spreads chunks across threads.
pub fn simulate_roi_seeded(
    trials: u64,
    frequencies: &FrequencyTable,
    payouts: &PayoutTable,
    seed: u64,
) -> f64 {
    if trials == 0 {
        return 0.0;
    }
    let chunks = trials.div_ceil(SIMULATION_CHUNK);
    let run = |chunk: u64| {
        let start = chunk * SIMULATION_CHUNK;
        let len = SIMULATION_CHUNK.min(trials - start);
        let mut rng = GameRng::stream(seed, chunk);
        simulate_raw(len, frequencies, payouts, &mut rng)
    };

    #[cfg(feature = "parallel")]
    let total: i128 = {
        use rayon::prelude::*;
        (0..chunks).into_par_iter().map(run).sum()
    };
    #[cfg(not(feature = "parallel"))]
    let total: i128 = (0..chunks).map(run).sum();

    raw_to_roi(total, trials)
}

fn simulate_raw(
    trials: u64,
    frequencies: &FrequencyTable,
    payouts: &PayoutTable,
    rng: &mut GameRng,
) -> i128 {
    let mut total: i128 = 0;
    for _ in 0..trials {
        let board = spin(frequencies, rng);
        total += return_factor(&board, payouts).raw() as i128;
    }
    total
}

fn raw_to_roi(total: i128, trials: u64) -> f64 {
    total as f64 / Decimal::ONE.raw() as f64 / trials as f64
}
