//! Boolean formula data types for presence conditions.
//!
//! A presence condition is a boolean expression over build-configuration symbols describing
//! under which configurations a piece of source code is compiled. This crate provides the
//! [`Formula`] syntax tree used throughout kminer together with the session-scoped
//! [`VariableCache`] and the [`Assignment`] used for evaluation.

/// Shortcut for tests
#[cfg(any(test, feature = "internal-testing"))]
#[doc(hidden)]
#[macro_export]
macro_rules! var {
    ($x:expr) => {
        $crate::formula::Formula::variable($x)
    };
}

pub mod assignment;
pub mod cache;
pub mod formula;


pub use assignment::Assignment;
pub use cache::VariableCache;
pub use formula::{Formula, Variable};

#[cfg(test)]
mod tests {
    use super::test::*;
    use super::*;

    use proptest::prelude::*;

    #[test]
    fn chain_shape() {
        let chain = disjunction_chain(3);
        assert_eq!(
            chain.to_string(),
            "((A0 && B0) || ((A1 && B1) || (A2 && B2)))"
        );
    }

    #[test]
    fn enumerate_assignments() {
        let formula = var!("A") & !var!("B");
        let vars = formula.variables();
        let models = all_assignments(&vars)
            .filter(|assignment| formula.evaluate(assignment))
            .count();
        assert_eq!(models, 1);
        assert!(brute_force_satisfiable(&formula));
        assert!(!brute_force_satisfiable(&(var!("A") & !var!("A"))));
    }

    #[test]
    fn pigeonhole_formulas() {
        assert!(brute_force_satisfiable(&pigeonhole(2, 2)));
        assert!(!brute_force_satisfiable(&pigeonhole(3, 2)));
        assert_eq!(pigeonhole(4, 3).variables().len(), 12);
        assert!(pigeonhole(9, 8).depth() < 20);
    }

    proptest! {
        #[test]
        fn generated_formula_is_satisfied(
            (formula, assignment) in sat_formula(2..10usize, 1..20usize, 0.1..0.5),
        ) {
            prop_assert!(formula.evaluate(&assignment));
        }
    }
}
