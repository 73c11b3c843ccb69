//! Spatiality: which universe axes participate in distance computation.

use cline_core::ConfigError;
use std::fmt;
use std::str::FromStr;

/// The axis selection of an interaction type.
///
/// Parsed from the spatiality strings `""`, `"x"`, `"y"`, `"z"`, `"xy"`,
/// `"xz"`, `"yz"`, `"xyz"`. The number of selected axes — the
/// *spatiality* proper — is what the engine branches on; the identity of
/// the axes only matters when positions are snapshotted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Spatiality {
    /// Non-spatial: distances are undefined, strengths are distance-free.
    #[default]
    None,
    /// 1-D along x.
    X,
    /// 1-D along y.
    Y,
    /// 1-D along z.
    Z,
    /// 2-D over (x, y).
    Xy,
    /// 2-D over (x, z).
    Xz,
    /// 2-D over (y, z).
    Yz,
    /// 3-D over (x, y, z).
    Xyz,
}

impl Spatiality {
    /// Number of participating dimensions: 0, 1, 2, or 3.
    pub fn dimensions(self) -> usize {
        self.axes().len()
    }

    /// Whether any axis participates.
    pub fn is_spatial(self) -> bool {
        self != Self::None
    }

    /// The selected original axes, in packed-slot order.
    ///
    /// `axes()[d]` is the original axis whose coordinate lands in packed
    /// slot `d`.
    pub fn axes(self) -> &'static [char] {
        match self {
            Self::None => &[],
            Self::X => &['x'],
            Self::Y => &['y'],
            Self::Z => &['z'],
            Self::Xy => &['x', 'y'],
            Self::Xz => &['x', 'z'],
            Self::Yz => &['y', 'z'],
            Self::Xyz => &['x', 'y', 'z'],
        }
    }
}

impl FromStr for Spatiality {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" => Ok(Self::None),
            "x" => Ok(Self::X),
            "y" => Ok(Self::Y),
            "z" => Ok(Self::Z),
            "xy" => Ok(Self::Xy),
            "xz" => Ok(Self::Xz),
            "yz" => Ok(Self::Yz),
            "xyz" => Ok(Self::Xyz),
            other => Err(ConfigError::IllegalSpatiality {
                given: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Spatiality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for axis in self.axes() {
            write!(f, "{axis}")?;
        }
        Ok(())
    }
}
