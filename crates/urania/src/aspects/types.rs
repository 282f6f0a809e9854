use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::ephemeris::Body;

/// Major (Ptolemaic) aspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AspectKind {
    Conjunction,
    Sextile,
    Square,
    Trine,
    Opposition,
}

impl AspectKind {
    pub const ALL: [AspectKind; 5] = [
        AspectKind::Conjunction,
        AspectKind::Sextile,
        AspectKind::Square,
        AspectKind::Trine,
        AspectKind::Opposition,
    ];

    pub fn angle(self) -> f64 {
        match self {
            AspectKind::Conjunction => 0.0,
            AspectKind::Sextile => 60.0,
            AspectKind::Square => 90.0,
            AspectKind::Trine => 120.0,
            AspectKind::Opposition => 180.0,
        }
    }
}

impl fmt::Display for AspectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AspectKind::Conjunction => "conjunction",
            AspectKind::Sextile => "sextile",
            AspectKind::Square => "square",
            AspectKind::Trine => "trine",
            AspectKind::Opposition => "opposition",
        };
        f.write_str(name)
    }
}

/// An aspect between two bodies of the same chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aspect {
    pub from: Body,
    pub to: Body,
    pub kind: AspectKind,
    pub exact_angle: f64,
    /// Deviation from the exact angle, degrees
    pub orb: f64,
    /// Whether the aspect is applying (approaching exact)
    pub is_applying: bool,
    /// Within 0.1 degrees
    pub is_exact: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AspectSettings {
    /// Orb for aspects without an override
    pub default_orb: f64,
    pub orb_overrides: HashMap<AspectKind, f64>,
}

impl AspectSettings {
    pub fn with_orb(default_orb: f64) -> Self {
        Self {
            default_orb,
            orb_overrides: HashMap::new(),
        }
    }

    pub fn orb_for(&self, kind: AspectKind) -> f64 {
        self.orb_overrides
            .get(&kind)
            .copied()
            .unwrap_or(self.default_orb)
    }
}

impl Default for AspectSettings {
    fn default() -> Self {
        Self::with_orb(4.0)
    }
}
