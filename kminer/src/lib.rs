//! Presence condition analysis against Kconfig feature models.
//!
//! Presence conditions are parsed into [`Formula`]s by the grammars of `kminer-parser`. This crate
//! converts them into conjunctive normal form, numbers their variables consistently with a DIMACS
//! feature model and checks them for satisfiability using the [varisat] SAT solver. Source files
//! whose presence condition contradicts the feature model can be skipped by later, expensive
//! analysis steps.
//!
//! Logging goes through the [`log`] facade. Installing a logger is left to the application.
//!
//! [varisat]: https://crates.io/crates/varisat

pub mod cnf;
pub mod config;
pub mod numbering;
pub mod presence;
pub mod solver;

pub use kminer_dimacs::{FeatureModel, VariableMap, VariableNotFound};
pub use kminer_formula::{Assignment, Formula, Variable, VariableCache};
pub use kminer_parser::{parse, ExpressionFormatError};

pub use cnf::{CnfConverter, ConstraintError, Strategy};
pub use config::{SatConfig, SatConfigUpdate};
pub use solver::{SatSolver, SolverError, UnknownVariablePolicy};
