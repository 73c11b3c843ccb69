//! Error types for the cline interaction engine.
//!
//! Organized by operation: construction and reconfiguration
//! ([`ConfigError`]), evaluation ([`EvaluateError`]), and the query
//! surface ([`QueryError`]). Every failure is fatal to the current call
//! and carries enough context to diagnose it; none is silent.

use crate::id::SubpopId;
use std::error::Error;
use std::fmt;

/// A strength callback returned a non-finite or negative value.
///
/// Produced by the strength kernel and converted into the error enum of
/// whichever operation was running: [`QueryError::CallbackReturn`] on the
/// query surface, [`EvaluateError::CallbackReturn`] during an eager fill.
#[derive(Clone, Debug, PartialEq)]
pub struct CallbackError {
    /// Name of the offending callback.
    pub callback: String,
    /// The value it returned.
    pub value: f64,
}

impl fmt::Display for CallbackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "strength callback '{}' must return a finite value >= 0, got {}",
            self.callback, self.value,
        )
    }
}

impl Error for CallbackError {}

/// Errors detected while constructing an interaction type or changing
/// its configuration.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// The spatiality string is not one of `""`, `"x"`, `"y"`, `"z"`,
    /// `"xy"`, `"xz"`, `"yz"`, `"xyz"`.
    IllegalSpatiality {
        /// The string that failed to parse.
        given: String,
    },
    /// The maximum interaction distance is negative or NaN.
    InvalidMaxDistance {
        /// The offending value.
        value: f64,
    },
    /// A linear interaction function requires a finite maximum distance
    /// greater than zero.
    LinearRequiresFiniteMaxDistance {
        /// The maximum distance in effect when the function was set.
        max_distance: f64,
    },
    /// Non-spatial interactions admit only the fixed interaction function.
    NonSpatialRequiresFixed,
    /// The interaction function kind string is not `"f"`, `"l"`, `"e"`,
    /// or `"n"`.
    UnknownFunctionKind {
        /// The string that failed to parse.
        given: String,
    },
    /// The interaction function was given the wrong number of parameters.
    WrongParameterCount {
        /// Function kind the parameters were supplied for.
        kind: &'static str,
        /// How many parameters that kind takes.
        expected: usize,
        /// How many were supplied.
        given: usize,
    },
    /// Attempt to change `max_distance` or the interaction function while
    /// at least one subpopulation is evaluated. Call `unevaluate()` first.
    InFlightChange,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IllegalSpatiality { given } => {
                write!(f, "illegal spatiality string {given:?}")
            }
            Self::InvalidMaxDistance { value } => {
                write!(f, "max_distance must be a non-negative number, got {value}")
            }
            Self::LinearRequiresFiniteMaxDistance { max_distance } => {
                write!(
                    f,
                    "linear interaction function requires a finite positive \
                     max_distance, got {max_distance}"
                )
            }
            Self::NonSpatialRequiresFixed => {
                write!(
                    f,
                    "non-spatial interactions admit only the fixed interaction function"
                )
            }
            Self::UnknownFunctionKind { given } => {
                write!(
                    f,
                    "interaction function kind {given:?} must be \"f\", \"l\", \"e\", or \"n\""
                )
            }
            Self::WrongParameterCount {
                kind,
                expected,
                given,
            } => {
                write!(
                    f,
                    "interaction function \"{kind}\" takes {expected} parameter{}, got {given}",
                    if *expected == 1 { "" } else { "s" },
                )
            }
            Self::InFlightChange => {
                write!(
                    f,
                    "configuration cannot change while evaluated; call unevaluate() first"
                )
            }
        }
    }
}

impl Error for ConfigError {}

/// Errors raised by `evaluate()`.
#[derive(Clone, Debug, PartialEq)]
pub enum EvaluateError {
    /// An individual's coordinate lies outside `[0, bound]` along a
    /// periodic axis. The engine's periodic replication depends on all
    /// positions being inside the primary box.
    OutOfPeriodicBounds {
        /// Subpopulation being evaluated.
        subpop: SubpopId,
        /// Subpopulation-local index of the offending individual.
        individual: usize,
        /// Original axis label: `'x'`, `'y'`, or `'z'`.
        axis: char,
        /// The out-of-bounds coordinate.
        coordinate: f64,
        /// The upper bound of the axis.
        bound: f64,
    },
    /// The maximum interaction distance reaches half the extent of a
    /// periodic axis, which would let a pair interact through more than
    /// one periodic image.
    MaxDistanceExceedsPeriodicBounds {
        /// Original axis label: `'x'`, `'y'`, or `'z'`.
        axis: char,
        /// The extent of the axis.
        bound: f64,
        /// The configured maximum interaction distance.
        max_distance: f64,
    },
    /// `evaluate()` may not be called during offspring generation; the
    /// positions it would snapshot are in flux.
    DuringOffspringGeneration,
    /// A strength callback misbehaved during an eager fill.
    CallbackReturn {
        /// Name of the offending callback.
        callback: String,
        /// The value it returned.
        value: f64,
    },
}

impl From<CallbackError> for EvaluateError {
    fn from(e: CallbackError) -> Self {
        Self::CallbackReturn {
            callback: e.callback,
            value: e.value,
        }
    }
}

impl fmt::Display for EvaluateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfPeriodicBounds {
                subpop,
                individual,
                axis,
                coordinate,
                bound,
            } => {
                write!(
                    f,
                    "individual {individual} of {subpop} has {axis} = {coordinate}, \
                     outside the periodic bounds [0, {bound}]"
                )
            }
            Self::MaxDistanceExceedsPeriodicBounds {
                axis,
                bound,
                max_distance,
            } => {
                write!(
                    f,
                    "max_distance {max_distance} is at least half the extent {bound} \
                     of periodic axis {axis}"
                )
            }
            Self::DuringOffspringGeneration => {
                write!(f, "evaluate() may not be called during offspring generation")
            }
            Self::CallbackReturn { callback, value } => {
                write!(
                    f,
                    "strength callback '{callback}' must return a finite value >= 0, \
                     got {value}"
                )
            }
        }
    }
}

impl Error for EvaluateError {}

/// Errors raised by the query surface.
#[derive(Clone, Debug, PartialEq)]
pub enum QueryError {
    /// A spatial query was made on a non-spatial interaction.
    NotSpatial,
    /// The subpopulation has not been evaluated (or was invalidated).
    NotEvaluated {
        /// The subpopulation the query addressed.
        subpop: SubpopId,
    },
    /// A query point lies outside `[0, bound]` along a periodic axis.
    OutOfPeriodicBounds {
        /// Original axis label: `'x'`, `'y'`, or `'z'`.
        axis: char,
        /// The out-of-bounds coordinate.
        coordinate: f64,
        /// The upper bound of the axis.
        bound: f64,
    },
    /// A pair query was given two non-singleton argument vectors; exactly
    /// one side must be a single individual.
    NeitherSideSingleton {
        /// Length of the first argument.
        count1: usize,
        /// Length of the second argument.
        count2: usize,
    },
    /// A query point has the wrong number of coordinates for this
    /// interaction's spatiality.
    PointLength {
        /// Coordinates required (the spatiality).
        expected: usize,
        /// Coordinates supplied.
        given: usize,
    },
    /// An individual index is outside the evaluated subpopulation.
    IndexOutOfRange {
        /// The offending index.
        index: usize,
        /// The evaluated individual count.
        count: usize,
    },
    /// A strength callback returned a non-finite or negative value.
    CallbackReturn {
        /// Name of the offending callback.
        callback: String,
        /// The value it returned.
        value: f64,
    },
}

impl From<CallbackError> for QueryError {
    fn from(e: CallbackError) -> Self {
        Self::CallbackReturn {
            callback: e.callback,
            value: e.value,
        }
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotSpatial => {
                write!(f, "this query requires that the interaction be spatial")
            }
            Self::NotEvaluated { subpop } => {
                write!(f, "{subpop} has not been evaluated for this interaction")
            }
            Self::OutOfPeriodicBounds {
                axis,
                coordinate,
                bound,
            } => {
                write!(
                    f,
                    "query point has {axis} = {coordinate}, outside the periodic \
                     bounds [0, {bound}]"
                )
            }
            Self::NeitherSideSingleton { count1, count2 } => {
                write!(
                    f,
                    "pair queries require one singleton side, got lengths {count1} and {count2}"
                )
            }
            Self::PointLength { expected, given } => {
                write!(
                    f,
                    "point has {given} coordinate{}, spatiality requires {expected}",
                    if *given == 1 { "" } else { "s" },
                )
            }
            Self::IndexOutOfRange { index, count } => {
                write!(
                    f,
                    "individual index {index} is outside the evaluated subpopulation \
                     of size {count}"
                )
            }
            Self::CallbackReturn { callback, value } => {
                write!(
                    f,
                    "strength callback '{callback}' must return a finite value >= 0, \
                     got {value}"
                )
            }
        }
    }
}

impl Error for QueryError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display_names_the_spatiality() {
        let err = ConfigError::IllegalSpatiality {
            given: "xq".to_string(),
        };
        assert!(err.to_string().contains("\"xq\""));
    }

    #[test]
    fn wrong_parameter_count_pluralizes() {
        let one = ConfigError::WrongParameterCount {
            kind: "f",
            expected: 1,
            given: 3,
        };
        assert!(one.to_string().contains("1 parameter,"));
        let two = ConfigError::WrongParameterCount {
            kind: "n",
            expected: 2,
            given: 1,
        };
        assert!(two.to_string().contains("2 parameters"));
    }

    #[test]
    fn evaluate_error_carries_individual_context() {
        let err = EvaluateError::OutOfPeriodicBounds {
            subpop: SubpopId(2),
            individual: 14,
            axis: 'y',
            coordinate: -0.25,
            bound: 10.0,
        };
        let msg = err.to_string();
        assert!(msg.contains("individual 14"));
        assert!(msg.contains("p2"));
        assert!(msg.contains("y = -0.25"));
    }

    #[test]
    fn callback_return_names_the_callback() {
        let err = QueryError::CallbackReturn {
            callback: "competition_ramp".to_string(),
            value: -1.0,
        };
        assert!(err.to_string().contains("competition_ramp"));
    }
}
