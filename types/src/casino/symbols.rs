use super::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{collections::BTreeMap, fmt, str::FromStr};
use thiserror::Error;

/// Errors raised while building or decoding machine tables.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TableError {
    #[error("unknown symbol: {0}")]
    UnknownSymbol(String),
    #[error("malformed line key: {0}")]
    MalformedKey(String),
    #[error("weight for {0} must be at least 1")]
    ZeroWeight(Symbol),
    #[error("missing weight for {0}")]
    MissingWeight(Symbol),
    #[error("payout for {key} must not be negative: {factor}")]
    NegativeFactor { key: LineKey, factor: Decimal },
}

/// A reel symbol.
///
/// Declaration order is significant: weighted sampling walks symbols in this
/// order, so it is part of the reproducibility contract of a seeded machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Symbol {
    Blank = 0,
    Wild = 1,
    Cherry = 2,
    Lemon = 3,
    Orange = 4,
    Grape = 5,
    Star = 6,
    Gem = 7,
    Jackpot = 8,
}

impl Symbol {
    pub const COUNT: usize = 9;

    pub const ALL: [Symbol; Symbol::COUNT] = [
        Symbol::Blank,
        Symbol::Wild,
        Symbol::Cherry,
        Symbol::Lemon,
        Symbol::Orange,
        Symbol::Grape,
        Symbol::Star,
        Symbol::Gem,
        Symbol::Jackpot,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Emoji shown to players.
    pub fn glyph(self) -> &'static str {
        match self {
            Symbol::Blank => "❌",
            Symbol::Wild => "❓",
            Symbol::Cherry => "🍒",
            Symbol::Lemon => "🍋",
            Symbol::Orange => "🍊",
            Symbol::Grape => "🍇",
            Symbol::Star => "⭐",
            Symbol::Gem => "💎",
            Symbol::Jackpot => "💰",
        }
    }

    /// Stable name used in machine files.
    pub fn name(self) -> &'static str {
        match self {
            Symbol::Blank => "blank",
            Symbol::Wild => "wild",
            Symbol::Cherry => "cherry",
            Symbol::Lemon => "lemon",
            Symbol::Orange => "orange",
            Symbol::Grape => "grape",
            Symbol::Star => "star",
            Symbol::Gem => "gem",
            Symbol::Jackpot => "jackpot",
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.glyph())
    }
}

impl FromStr for Symbol {
    type Err = TableError;

    /// Accepts either the name or the glyph.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Symbol::ALL
            .into_iter()
            .find(|symbol| symbol.name().eq_ignore_ascii_case(s) || symbol.glyph() == s)
            .ok_or_else(|| TableError::UnknownSymbol(s.to_string()))
    }
}

/// Relative weight of every symbol on the reels.
///
/// All weights are at least 1; the total is cached.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<Symbol, u32>",
    into = "BTreeMap<Symbol, u32>"
)]
pub struct FrequencyTable {
    weights: [u32; Symbol::COUNT],
    total: u64,
}

impl FrequencyTable {
    pub fn new(weights: [u32; Symbol::COUNT]) -> Result<Self, TableError> {
        for symbol in Symbol::ALL {
            if weights[symbol.index()] == 0 {
                return Err(TableError::ZeroWeight(symbol));
            }
        }
        let total = weights.iter().map(|w| *w as u64).sum();
        Ok(Self { weights, total })
    }

    /// Weights used by the live machine.
    pub fn standard() -> Self {
        Self::from_weights([10, 13, 25, 20, 15, 13, 9, 5, 1])
    }

    /// Weights the calibration search starts from.
    pub fn baseline() -> Self {
        Self::from_weights([9, 13, 20, 15, 12, 11, 7, 3, 1])
    }

    fn from_weights(weights: [u32; Symbol::COUNT]) -> Self {
        let total = weights.iter().map(|w| *w as u64).sum();
        Self { weights, total }
    }

    pub fn weight(&self, symbol: Symbol) -> u32 {
        self.weights[symbol.index()]
    }

    /// Replace one weight, clamping to the minimum of 1.
    pub fn set_weight(&mut self, symbol: Symbol, weight: u32) {
        self.weights[symbol.index()] = weight.max(1);
        self.total = self.weights.iter().map(|w| *w as u64).sum();
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn weights(&self) -> [u32; Symbol::COUNT] {
        self.weights
    }

    pub fn iter(&self) -> impl Iterator<Item = (Symbol, u32)> + '_ {
        Symbol::ALL.into_iter().map(|symbol| (symbol, self.weight(symbol)))
    }

    /// Map a uniform draw in `[0, total)` onto a symbol by walking the
    /// cumulative weights in declaration order.
    pub fn pick(&self, draw: u64) -> Symbol {
        let mut cumulative = 0u64;
        for (symbol, weight) in self.iter() {
            cumulative += weight as u64;
            if draw < cumulative {
                return symbol;
            }
        }
        Symbol::Jackpot
    }

    pub fn probability(&self, symbol: Symbol) -> f64 {
        self.weight(symbol) as f64 / self.total as f64
    }
}

impl Default for FrequencyTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl TryFrom<BTreeMap<Symbol, u32>> for FrequencyTable {
    type Error = TableError;

    fn try_from(map: BTreeMap<Symbol, u32>) -> Result<Self, Self::Error> {
        let mut weights = [0u32; Symbol::COUNT];
        for symbol in Symbol::ALL {
            weights[symbol.index()] = *map.get(&symbol).ok_or(TableError::MissingWeight(symbol))?;
        }
        Self::new(weights)
    }
}

impl From<FrequencyTable> for BTreeMap<Symbol, u32> {
    fn from(table: FrequencyTable) -> Self {
        table.iter().collect()
    }
}

/// An ordered triple of symbols read along a line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LineKey(pub [Symbol; 3]);

impl LineKey {
    pub fn new(a: Symbol, b: Symbol, c: Symbol) -> Self {
        Self([a, b, c])
    }

    /// Name form used in machine files, e.g. `cherry-cherry-wild`.
    pub fn name(&self) -> String {
        let [a, b, c] = self.0;
        format!("{}-{}-{}", a.name(), b.name(), c.name())
    }
}

impl fmt::Display for LineKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c] = self.0;
        write!(f, "{a}{b}{c}")
    }
}

impl FromStr for LineKey {
    type Err = TableError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('-').collect();
        let [a, b, c] = parts.as_slice() else {
            return Err(TableError::MalformedKey(s.to_string()));
        };
        Ok(Self([a.parse()?, b.parse()?, c.parse()?]))
    }
}

impl Serialize for LineKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.name())
    }
}

impl<'de> Deserialize<'de> for LineKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Payout factor per exact line key. Keys not present pay nothing.
///
/// The wild symbol is not a substitute: every combination involving it is
/// enumerated explicitly.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<LineKey, Decimal>",
    into = "BTreeMap<LineKey, Decimal>"
)]
pub struct PayoutTable {
    factors: BTreeMap<LineKey, Decimal>,
}

impl PayoutTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table used by the live machine.
    pub fn standard() -> Self {
        use Symbol::*;

        let mut table = Self::new();
        let f = Decimal::from_f64;

        for (symbol, factor) in [
            (Wild, 3.0),
            (Cherry, 4.0),
            (Lemon, 5.0),
            (Orange, 10.0),
            (Grape, 20.0),
            (Star, 40.0),
            (Gem, 100.0),
            (Jackpot, 500.0),
        ] {
            table.factors.insert(LineKey::new(symbol, symbol, symbol), f(factor));
        }

        // A pair completed by a wild
        for (symbol, factor) in [
            (Cherry, 0.8),
            (Lemon, 1.0),
            (Orange, 1.5),
            (Grape, 3.0),
            (Star, 5.0),
            (Gem, 10.0),
            (Jackpot, 20.0),
        ] {
            table.insert_pair(symbol, Wild, f(factor));
        }

        // Two jackpots with any fruit
        for (symbol, factor) in [
            (Cherry, 40.0),
            (Lemon, 50.0),
            (Orange, 60.0),
            (Grape, 80.0),
            (Star, 100.0),
            (Gem, 200.0),
        ] {
            table.insert_pair(Jackpot, symbol, f(factor));
        }

        // A pair completed by a jackpot
        for (symbol, factor) in [
            (Wild, 10.0),
            (Cherry, 20.0),
            (Lemon, 25.0),
            (Orange, 30.0),
            (Grape, 40.0),
            (Star, 50.0),
            (Gem, 100.0),
        ] {
            table.insert_pair(symbol, Jackpot, f(factor));
        }

        table
    }

    /// Insert `pair pair odd` in all three positions of the odd symbol.
    fn insert_pair(&mut self, pair: Symbol, odd: Symbol, factor: Decimal) {
        for key in [
            LineKey::new(pair, pair, odd),
            LineKey::new(pair, odd, pair),
            LineKey::new(odd, pair, pair),
        ] {
            self.factors.insert(key, factor);
        }
    }

    pub fn insert(&mut self, key: LineKey, factor: Decimal) -> Result<(), TableError> {
        if factor < Decimal::ZERO {
            return Err(TableError::NegativeFactor { key, factor });
        }
        self.factors.insert(key, factor);
        Ok(())
    }

    pub fn factor(&self, key: &LineKey) -> Option<Decimal> {
        self.factors.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.factors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&LineKey, &Decimal)> {
        self.factors.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &LineKey> {
        self.factors.keys()
    }

    /// Largest factor of any key, zero for an empty table.
    pub fn max_factor(&self) -> Decimal {
        self.factors.values().copied().max().unwrap_or(Decimal::ZERO)
    }

    /// Multiply every factor by `scale`, rounding each to `decimals`.
    pub fn scaled(&self, scale: Decimal, decimals: u32) -> Self {
        self.map_factors(|_, factor| factor.mul(scale).round_to(decimals))
    }

    /// Replace every factor with `f(key, factor)`, floored at zero.
    pub fn map_factors(&self, mut f: impl FnMut(&LineKey, Decimal) -> Decimal) -> Self {
        Self {
            factors: self
                .factors
                .iter()
                .map(|(key, factor)| (*key, f(key, *factor).max(Decimal::ZERO)))
                .collect(),
        }
    }
}

impl TryFrom<BTreeMap<LineKey, Decimal>> for PayoutTable {
    type Error = TableError;

    fn try_from(map: BTreeMap<LineKey, Decimal>) -> Result<Self, Self::Error> {
        let mut table = Self::new();
        for (key, factor) in map {
            table.insert(key, factor)?;
        }
        Ok(table)
    }
}

impl From<PayoutTable> for BTreeMap<LineKey, Decimal> {
    fn from(table: PayoutTable) -> Self {
        table.factors
    }
}

/// Everything needed to run a slot machine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Machine {
    pub frequencies: FrequencyTable,
    pub payouts: PayoutTable,
}

impl Machine {
    pub fn standard() -> Self {
        Self {
            frequencies: FrequencyTable::standard(),
            payouts: PayoutTable::standard(),
        }
    }
}
