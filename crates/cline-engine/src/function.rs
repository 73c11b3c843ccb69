//! The interaction function: the distance-to-strength mapping.

use cline_core::ConfigError;
use std::fmt;

/// The base distance-to-strength mapping of an interaction type.
///
/// The first parameter of every kind is the maximum strength, reached at
/// distance zero (for `Fixed`, at every distance). Kinds are addressed by
/// the single-letter codes hosts use in configuration: `"f"`, `"l"`,
/// `"e"`, `"n"`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InteractionFunction {
    /// `f(d) = strength`, independent of distance. The only kind
    /// non-spatial interactions admit.
    Fixed {
        /// The constant strength.
        strength: f64,
    },
    /// `f(d) = strength * (1 - d / max_distance)`: linear falloff hitting
    /// zero exactly at the maximum interaction distance.
    Linear {
        /// Strength at distance zero.
        strength: f64,
    },
    /// `f(d) = strength * exp(-rate * d)`.
    Exponential {
        /// Strength at distance zero.
        strength: f64,
        /// Decay rate.
        rate: f64,
    },
    /// `f(d) = strength * exp(-d^2 / (2 * sigma^2))`: Gaussian in the
    /// distance.
    Normal {
        /// Strength at distance zero.
        strength: f64,
        /// Standard deviation of the Gaussian.
        sigma: f64,
    },
}

impl Default for InteractionFunction {
    fn default() -> Self {
        Self::Fixed { strength: 1.0 }
    }
}

impl InteractionFunction {
    /// Parse a kind code and parameter list, as hosts supply them.
    ///
    /// Kinds `"f"` and `"l"` take one parameter, `"e"` and `"n"` take
    /// two. Parameter values are deliberately not bounds-checked; hosts
    /// may use negative or zero strengths if they wish.
    pub fn from_parts(kind: &str, params: &[f64]) -> Result<Self, ConfigError> {
        let (name, expected): (&'static str, usize) = match kind {
            "f" => ("f", 1),
            "l" => ("l", 1),
            "e" => ("e", 2),
            "n" => ("n", 2),
            other => {
                return Err(ConfigError::UnknownFunctionKind {
                    given: other.to_string(),
                })
            }
        };
        if params.len() != expected {
            return Err(ConfigError::WrongParameterCount {
                kind: name,
                expected,
                given: params.len(),
            });
        }
        Ok(match name {
            "f" => Self::Fixed {
                strength: params[0],
            },
            "l" => Self::Linear {
                strength: params[0],
            },
            "e" => Self::Exponential {
                strength: params[0],
                rate: params[1],
            },
            _ => Self::Normal {
                strength: params[0],
                sigma: params[1],
            },
        })
    }

    /// The kind code: `"f"`, `"l"`, `"e"`, or `"n"`.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Fixed { .. } => "f",
            Self::Linear { .. } => "l",
            Self::Exponential { .. } => "e",
            Self::Normal { .. } => "n",
        }
    }

    /// The maximum strength (the first parameter).
    pub fn max_strength(&self) -> f64 {
        match *self {
            Self::Fixed { strength }
            | Self::Linear { strength }
            | Self::Exponential { strength, .. }
            | Self::Normal { strength, .. } => strength,
        }
    }

    /// Evaluate the base strength at distance `d`.
    ///
    /// Callers must filter `d <= max_distance` first; this kernel does
    /// not. `d` may be NaN for non-spatial interactions, where only
    /// `Fixed` is legal and the distance is never consulted.
    #[inline]
    pub fn value_at(&self, d: f64, max_distance: f64) -> f64 {
        match *self {
            Self::Fixed { strength } => strength,
            Self::Linear { strength } => strength * (1.0 - d / max_distance),
            Self::Exponential { strength, rate } => strength * (-rate * d).exp(),
            Self::Normal { strength, sigma } => {
                strength * (-(d * d) / (2.0 * sigma * sigma)).exp()
            }
        }
    }
}

impl fmt::Display for InteractionFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Fixed { strength } => write!(f, "f({strength})"),
            Self::Linear { strength } => write!(f, "l({strength})"),
            Self::Exponential { strength, rate } => write!(f, "e({strength}, {rate})"),
            Self::Normal { strength, sigma } => write!(f, "n({strength}, {sigma})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_ignores_distance() {
        let func = InteractionFunction::Fixed { strength: 0.7 };
        assert_eq!(func.value_at(0.0, 2.0), 0.7);
        assert_eq!(func.value_at(1.9, 2.0), 0.7);
        assert_eq!(func.value_at(f64::NAN, f64::INFINITY), 0.7);
    }

    #[test]
    fn linear_hits_zero_at_max_distance() {
        let func = InteractionFunction::Linear { strength: 1.0 };
        assert_eq!(func.value_at(0.0, 2.0), 1.0);
        assert_eq!(func.value_at(1.0, 2.0), 0.5);
        assert_eq!(func.value_at(2.0, 2.0), 0.0);
    }

    #[test]
    fn exponential_and_normal_match_hand_values() {
        let exp = InteractionFunction::Exponential {
            strength: 1.0,
            rate: 1.0,
        };
        assert!((exp.value_at(1.0, f64::INFINITY) - (-1.0_f64).exp()).abs() < 1e-12);

        let norm = InteractionFunction::Normal {
            strength: 2.0,
            sigma: 1.0,
        };
        assert!((norm.value_at(0.0, f64::INFINITY) - 2.0).abs() < 1e-12);
        assert!((norm.value_at(1.0, f64::INFINITY) - 2.0 * (-0.5_f64).exp()).abs() < 1e-12);
    }

    #[test]
    fn from_parts_enforces_arity() {
        assert_eq!(
            InteractionFunction::from_parts("f", &[0.7]).unwrap(),
            InteractionFunction::Fixed { strength: 0.7 },
        );
        match InteractionFunction::from_parts("e", &[1.0]) {
            Err(ConfigError::WrongParameterCount {
                kind: "e",
                expected: 2,
                given: 1,
            }) => {}
            other => panic!("expected WrongParameterCount, got {other:?}"),
        }
        match InteractionFunction::from_parts("q", &[1.0]) {
            Err(ConfigError::UnknownFunctionKind { given }) => assert_eq!(given, "q"),
            other => panic!("expected UnknownFunctionKind, got {other:?}"),
        }
    }

    #[test]
    fn strength_never_exceeds_first_parameter() {
        let funcs = [
            InteractionFunction::Fixed { strength: 0.9 },
            InteractionFunction::Linear { strength: 0.9 },
            InteractionFunction::Exponential {
                strength: 0.9,
                rate: 0.5,
            },
            InteractionFunction::Normal {
                strength: 0.9,
                sigma: 2.0,
            },
        ];
        for func in funcs {
            for step in 0..100 {
                let d = step as f64 * 0.05;
                assert!(func.value_at(d, 5.0) <= 0.9 + 1e-12, "{func} at d={d}");
            }
        }
    }
}
