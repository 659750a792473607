//! Satisfiability checks of presence conditions against a feature model.
use std::path::Path;
use std::str::FromStr;
use std::sync::{mpsc, Arc};
use std::time::Duration;
use std::{io, thread};

use log::{debug, info, warn};
use rustc_hash::FxHashSet as HashSet;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use varisat::solver::{Solver, SolverError as EngineError};
use varisat_formula::{CnfFormula, ExtendFormula, Lit};

use kminer_dimacs::{FeatureModel, VariableMap, VariableNotFound};
use kminer_formula::Formula;

use crate::cnf::{CnfConverter, ConstraintError};
use crate::config::{SatConfig, SatConfigUpdate};
use crate::numbering::{clause_to_lits, ClauseError};

/// How to handle variables that are not part of the feature model.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnknownVariablePolicy {
    /// Report [`SolverError::VariableNotFound`].
    #[serde(rename = "fail")]
    Fail,
    /// Treat the variable as unconstrained.
    #[serde(rename = "open")]
    TreatAsOpen,
    /// Treat the variable as always disabled.
    #[serde(rename = "closed")]
    TreatAsClosed,
}

impl UnknownVariablePolicy {
    pub fn name(self) -> &'static str {
        match self {
            UnknownVariablePolicy::Fail => "fail",
            UnknownVariablePolicy::TreatAsOpen => "open",
            UnknownVariablePolicy::TreatAsClosed => "closed",
        }
    }
}

/// An unknown policy name.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("Unknown variable policy '{}', expected fail, open or closed", name)]
pub struct InvalidPolicy {
    pub name: String,
}

impl FromStr for UnknownVariablePolicy {
    type Err = InvalidPolicy;

    fn from_str(name: &str) -> Result<UnknownVariablePolicy, InvalidPolicy> {
        match name {
            "fail" => Ok(UnknownVariablePolicy::Fail),
            "open" => Ok(UnknownVariablePolicy::TreatAsOpen),
            "closed" => Ok(UnknownVariablePolicy::TreatAsClosed),
            _ => Err(InvalidPolicy {
                name: name.to_owned(),
            }),
        }
    }
}

/// Possible errors during a satisfiability check.
#[derive(Debug, Error)]
pub enum SolverError {
    #[error("Failed to load feature model: {}", cause)]
    Model {
        #[source]
        cause: anyhow::Error,
    },
    #[error("Invalid constraint: {}", cause)]
    Constraint {
        #[from]
        cause: ConstraintError,
    },
    #[error(transparent)]
    VariableNotFound(#[from] VariableNotFound),
    #[error("SAT check exceeded the time limit of {:?}", timeout)]
    Timeout { timeout: Duration },
    #[error("SAT engine failed: {}", cause)]
    Engine {
        #[source]
        cause: EngineError,
    },
    #[error("SAT worker thread terminated without a result")]
    WorkerFailed,
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl From<ClauseError> for SolverError {
    fn from(err: ClauseError) -> SolverError {
        match err {
            ClauseError::Constraint(cause) => SolverError::Constraint { cause },
            ClauseError::VariableNotFound(err) => SolverError::VariableNotFound(err),
        }
    }
}

/// Checks presence conditions against a feature model.
///
/// The parsed feature model is kept for the lifetime of the checker. Every check loads it into a
/// fresh instance of the SAT engine, so checks never influence each other and a `SatSolver` can
/// be shared between threads.
pub struct SatSolver {
    model: Arc<FeatureModel>,
    units: HashSet<Lit>,
    config: SatConfig,
}

impl Default for SatSolver {
    fn default() -> SatSolver {
        SatSolver::from_model(FeatureModel::default())
    }
}

impl SatSolver {
    /// A checker without any feature model constraints.
    pub fn new() -> SatSolver {
        SatSolver::default()
    }

    /// A checker using an already parsed feature model.
    pub fn from_model(model: FeatureModel) -> SatSolver {
        let units = model
            .formula
            .iter()
            .filter(|clause| clause.len() == 1)
            .map(|clause| clause[0])
            .collect();

        SatSolver {
            model: Arc::new(model),
            units,
            config: SatConfig::default(),
        }
    }

    /// Reads a DIMACS CNF feature model.
    ///
    /// Variable names are prefixed with the configured `name_prefix`.
    pub fn from_dimacs(input: impl io::Read, config: SatConfig) -> Result<SatSolver, SolverError> {
        let model = FeatureModel::parse(input, &config.name_prefix)
            .map_err(|cause| SolverError::Model { cause })?;
        Ok(SatSolver::with_loaded_model(model, config))
    }

    /// Reads a DIMACS CNF feature model from a file.
    pub fn open(path: impl AsRef<Path>, config: SatConfig) -> Result<SatSolver, SolverError> {
        info!("Reading feature model '{}'", path.as_ref().display());
        let model = FeatureModel::open(path, &config.name_prefix)
            .map_err(|cause| SolverError::Model { cause })?;
        Ok(SatSolver::with_loaded_model(model, config))
    }

    fn with_loaded_model(model: FeatureModel, config: SatConfig) -> SatSolver {
        info!(
            "Feature model has {} variables ({} named) and {} clauses",
            model.formula.var_count(),
            model.variables.len(),
            model.formula.len()
        );
        let mut solver = SatSolver::from_model(model);
        solver.config = config;
        solver
    }

    /// Changes the configuration.
    ///
    /// A changed `name_prefix` only affects models loaded afterwards.
    pub fn config(&mut self, update: &SatConfigUpdate) {
        update.apply(&mut self.config);
    }

    pub fn sat_config(&self) -> &SatConfig {
        &self.config
    }

    pub fn model(&self) -> &FeatureModel {
        &self.model
    }

    /// Named variables of the feature model.
    pub fn variables(&self) -> &VariableMap {
        &self.model.variables
    }

    /// Whether the feature model on its own is satisfiable.
    pub fn is_model_satisfiable(&self) -> Result<bool, SolverError> {
        self.solve(None)
    }

    /// Whether the feature model together with `formula` is satisfiable.
    pub fn is_satisfiable(
        &self,
        formula: &Formula,
        policy: UnknownVariablePolicy,
    ) -> Result<bool, SolverError> {
        let encoding = self.encode(formula, policy)?;

        if let Some(conflict) = self.find_unit_conflict(&encoding.formula) {
            debug!("Trivial contradiction in clauses of {}: {}", formula, conflict);
            return Ok(false);
        }

        self.solve(Some(encoding.formula))
    }

    /// Numbered clauses for `formula`.
    ///
    /// The returned model contains only the clauses of `formula`, numbered consistently with the
    /// feature model. Its variable map extends the feature model's map by all variables the
    /// conversion and the `policy` introduced.
    pub fn encode(
        &self,
        formula: &Formula,
        policy: UnknownVariablePolicy,
    ) -> Result<FeatureModel, SolverError> {
        let mut variables = self.model.variables.clone();
        let converter =
            CnfConverter::new(self.config.strategy).with_max_depth(self.config.max_depth);
        let clauses = converter.convert_with_variables(formula, &mut variables)?;

        let mut cnf = CnfFormula::new();
        for clause in clauses.iter() {
            let lits = number_clause(clause, policy, &mut variables, &mut cnf)?;
            cnf.add_clause(&lits);
        }
        cnf.set_var_count(variables.max_var_count());

        Ok(FeatureModel {
            formula: cnf,
            variables,
        })
    }

    /// A literal whose negation is asserted as a unit clause as well, or the empty clause.
    fn find_unit_conflict(&self, query: &CnfFormula) -> Option<String> {
        let mut units: HashSet<Lit> = HashSet::default();
        for clause in query.iter() {
            match clause {
                [] => return Some("empty clause".to_owned()),
                &[lit] => {
                    if self.units.contains(&!lit) || units.contains(&!lit) {
                        return Some(lit.to_string());
                    }
                    units.insert(lit);
                }
                _ => (),
            }
        }
        None
    }

    fn solve(&self, query: Option<CnfFormula>) -> Result<bool, SolverError> {
        let model = Arc::clone(&self.model);
        let run = move || -> Result<bool, EngineError> {
            let mut solver = Solver::new();
            solver.add_formula(&model.formula);
            if let Some(query) = &query {
                solver.add_formula(query);
            }
            solver.solve()
        };

        let timeout = match self.config.timeout() {
            None => return run().map_err(|cause| SolverError::Engine { cause }),
            Some(timeout) => timeout,
        };

        let (sender, receiver) = mpsc::channel();
        thread::Builder::new()
            .name("kminer-sat".to_owned())
            .spawn(move || {
                // The receiver is gone if the check timed out
                let _ = sender.send(run());
            })?;

        match receiver.recv_timeout(timeout) {
            Ok(result) => result.map_err(|cause| SolverError::Engine { cause }),
            Err(mpsc::RecvTimeoutError::Timeout) => {
                warn!("SAT check exceeded the time limit of {:?}", timeout);
                Err(SolverError::Timeout { timeout })
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(SolverError::WorkerFailed),
        }
    }
}

/// Numbers a clause, registering unknown variables according to `policy`.
///
/// Variables treated as closed get a negative unit clause in `cnf`.
fn number_clause(
    clause: &Formula,
    policy: UnknownVariablePolicy,
    variables: &mut VariableMap,
    cnf: &mut CnfFormula,
) -> Result<Vec<Lit>, SolverError> {
    loop {
        let missing = match clause_to_lits(variables, clause) {
            Ok(lits) => return Ok(lits),
            Err(ClauseError::VariableNotFound(missing)) => missing,
            Err(err) => return Err(err.into()),
        };

        match policy {
            UnknownVariablePolicy::Fail => return Err(missing.into()),
            UnknownVariablePolicy::TreatAsOpen => {
                let var = variables.add_variable(&missing.name);
                debug!("Unknown variable {} is open as {}", missing.name, var);
            }
            UnknownVariablePolicy::TreatAsClosed => {
                let var = variables.add_variable(&missing.name);
                debug!("Unknown variable {} is closed as {}", missing.name, var);
                cnf.add_clause(&[var.negative()]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use kminer_formula::var;

    fn model(dimacs: &str) -> SatSolver {
        SatSolver::from_dimacs(dimacs.as_bytes(), SatConfig::default()).unwrap()
    }

    #[test]
    fn empty_model() {
        let solver = SatSolver::new();
        assert!(solver.is_model_satisfiable().unwrap());
        assert!(solver
            .is_satisfiable(&var!("X"), UnknownVariablePolicy::TreatAsOpen)
            .unwrap());
        assert!(!solver
            .is_satisfiable(&(var!("X") & !var!("X")), UnknownVariablePolicy::TreatAsOpen)
            .unwrap());
    }

    #[test]
    fn policy_names() {
        for policy in [
            UnknownVariablePolicy::Fail,
            UnknownVariablePolicy::TreatAsOpen,
            UnknownVariablePolicy::TreatAsClosed,
        ]
        .iter()
        {
            assert_eq!(policy.name().parse::<UnknownVariablePolicy>(), Ok(*policy));
        }
        assert!("maybe".parse::<UnknownVariablePolicy>().is_err());
    }

    #[test]
    fn unit_conflicts_short_circuit() {
        let solver = model("c 1 A\nc 2 B\np cnf 2 1\n-1 0\n");
        let a = Formula::variable("CONFIG_A");
        let b = Formula::variable("CONFIG_B");

        let encoding = solver.encode(&a, UnknownVariablePolicy::Fail).unwrap();
        assert!(solver.find_unit_conflict(&encoding.formula).is_some());
        assert!(!solver.is_satisfiable(&a, UnknownVariablePolicy::Fail).unwrap());

        let encoding = solver
            .encode(&(b.clone() & !b.clone()), UnknownVariablePolicy::Fail)
            .unwrap();
        assert!(solver.find_unit_conflict(&encoding.formula).is_some());

        let encoding = solver.encode(&b, UnknownVariablePolicy::Fail).unwrap();
        assert!(solver.find_unit_conflict(&encoding.formula).is_none());
    }

    #[test]
    fn encoding_extends_variable_map() {
        let solver = model("c 1 A\nc 2 B\np cnf 3 0\n");
        let formula = (var!("CONFIG_A") & var!("CONFIG_B")) | (var!("CONFIG_C") & Formula::TRUE);

        let encoding = solver
            .encode(&formula, UnknownVariablePolicy::TreatAsClosed)
            .unwrap();

        let variables = &encoding.variables;
        assert_eq!(variables.var("CONFIG_A"), solver.variables().var("CONFIG_A"));
        assert!(variables.var("temp_0").is_some());
        assert!(variables.var("PSEUDO_TRUE").is_some());
        for name in &["temp_0", "PSEUDO_TRUE", "PSEUDO_FALSE", "CONFIG_C"] {
            let var = variables.lookup(name).unwrap();
            assert!(var.index() >= 3, "{} reuses an unnamed model variable", name);
        }
        assert_eq!(encoding.formula.var_count(), variables.max_var_count());
        assert_eq!(solver.variables().len(), 2);
    }

    #[test]
    fn constraint_errors_surface() {
        let mut solver = SatSolver::new();
        let mut update = SatConfigUpdate::new();
        update.max_depth = Some(1);
        solver.config(&update);

        match solver.is_satisfiable(
            &(var!("A") & (var!("B") | var!("C"))),
            UnknownVariablePolicy::TreatAsOpen,
        ) {
            Err(SolverError::Constraint {
                cause: ConstraintError::TooDeep { max_depth: 1 },
            }) => (),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn deep_formulas_are_rejected() {
        let formula = kminer_formula::test::deep_conjunction(200_000);
        match SatSolver::new().is_satisfiable(&formula, UnknownVariablePolicy::TreatAsOpen) {
            Err(SolverError::Constraint {
                cause: ConstraintError::TooDeep { .. },
            }) => (),
            other => panic!("unexpected result {:?}", other),
        }
        std::mem::forget(formula);
    }
}
