use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Macroeconomic regime labels, ordered from strongest to weakest growth
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Regime {
    Boom,
    Expansion,
    Recovery,
    Slowdown,
    Stagflation,
    Recession,
}

impl Regime {
    pub const ALL: [Regime; 6] = [
        Regime::Boom,
        Regime::Expansion,
        Regime::Recovery,
        Regime::Slowdown,
        Regime::Stagflation,
        Regime::Recession,
    ];

    /// Labels used for `k` clusters, highest growth score first.
    #[must_use]
    pub fn ladder(k: usize) -> Option<&'static [Regime]> {
        use Regime::*;
        match k {
            2 => Some(&[Boom, Recession]),
            3 => Some(&[Boom, Recovery, Recession]),
            4 => Some(&[Boom, Recovery, Stagflation, Recession]),
            5 => Some(&[Boom, Expansion, Recovery, Stagflation, Recession]),
            6 => Some(&[Boom, Expansion, Recovery, Slowdown, Stagflation, Recession]),
            _ => None,
        }
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Regime::Boom => "Boom",
            Regime::Expansion => "Expansion",
            Regime::Recovery => "Recovery",
            Regime::Slowdown => "Slowdown",
            Regime::Stagflation => "Stagflation",
            Regime::Recession => "Recession",
        }
    }
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Risk strategy used to pick a row of the allocation rule table
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Strategy {
    Conservative,
    Balanced,
    Growth,
}

impl Strategy {
    pub const ALL: [Strategy; 3] = [Strategy::Conservative, Strategy::Balanced, Strategy::Growth];

    /// Default strategy when the caller does not override it.
    #[must_use]
    pub fn for_regime(regime: Regime) -> Self {
        match regime {
            Regime::Boom | Regime::Expansion => Strategy::Growth,
            Regime::Recovery | Regime::Slowdown => Strategy::Balanced,
            Regime::Stagflation | Regime::Recession => Strategy::Conservative,
        }
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Strategy::Conservative => "Conservative",
            Strategy::Balanced => "Balanced",
            Strategy::Growth => "Growth",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "conservative" => Ok(Strategy::Conservative),
            "balanced" => Ok(Strategy::Balanced),
            "growth" => Ok(Strategy::Growth),
            other => Err(format!(
                "unknown strategy '{other}' (expected conservative, balanced or growth)"
            )),
        }
    }
}
