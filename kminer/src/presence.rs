//! Presence condition listings of the build-system fact miner.
//!
//! A listing has one `<file>: <condition>` line per source file, with conditions written in the
//! build-system dialect.
use std::io;

use log::{info, warn};

use kminer_formula::Formula;
use kminer_parser::{Grammar, KbuildGrammar, Parser};

use crate::solver::{SatSolver, SolverError, UnknownVariablePolicy};

/// Marker the fact miner writes for conditions it couldn't compute.
const INVALID_EXPRESSION: &str = "InvalidExpression()";

/// A source file and the condition under which it is compiled.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PresenceCondition {
    pub file: String,
    /// `None` if the listing had no usable condition for the file.
    pub condition: Option<Formula>,
}

/// Reads a listing with the build-system grammar.
pub fn read_kbuild_listing(input: impl io::BufRead) -> io::Result<Vec<PresenceCondition>> {
    read_listing(input, &Parser::new(KbuildGrammar::new()))
}

/// Reads a listing, parsing conditions with `parser`.
///
/// Conditions that are marked invalid or fail to parse are logged and kept as `None`. Lines
/// without a `:` separator are logged and skipped.
pub fn read_listing<G: Grammar>(
    input: impl io::BufRead,
    parser: &Parser<G>,
) -> io::Result<Vec<PresenceCondition>> {
    let mut result = vec![];

    for (index, line) in input.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let (file, condition) = match line.find(':') {
            Some(pos) => (&line[..pos], line[pos + 1..].trim()),
            None => {
                warn!("line {}: Missing ':' in presence condition listing", index + 1);
                continue;
            }
        };

        let condition = if condition.contains(INVALID_EXPRESSION) {
            warn!("Presence condition for file {} is invalid", file);
            None
        } else {
            match parser.parse(condition) {
                Ok(formula) => Some(formula),
                Err(err) => {
                    warn!("Couldn't parse expression \"{}\": {}", condition, err);
                    None
                }
            }
        };

        result.push(PresenceCondition {
            file: file.to_owned(),
            condition,
        });
    }

    info!("Read {} file locations", result.len());

    Ok(result)
}

/// Files whose presence condition contradicts the feature model.
///
/// Files without a condition are never pruned. Neither are files whose condition names a variable
/// the feature model doesn't know under [`UnknownVariablePolicy::Fail`]; those are logged.
pub fn unsatisfiable_files<'a>(
    solver: &SatSolver,
    conditions: &'a [PresenceCondition],
    policy: UnknownVariablePolicy,
) -> Result<Vec<&'a PresenceCondition>, SolverError> {
    let mut pruned = vec![];
    for entry in conditions {
        if let Some(condition) = &entry.condition {
            match solver.is_satisfiable(condition, policy) {
                Ok(true) => (),
                Ok(false) => {
                    info!("Presence condition of {} is unsatisfiable", entry.file);
                    pruned.push(entry);
                }
                Err(SolverError::VariableNotFound(err)) => {
                    warn!("Keeping {}: {}", entry.file, err);
                }
                Err(err) => return Err(err),
            }
        }
    }
    Ok(pruned)
}

#[cfg(test)]
mod tests {
    use super::*;

    use kminer_formula::var;

    const LISTING: &str = "\
arch/x86/crypto/aes_glue.c: ((CRYPTO_AES_586 == \"y\") || (CRYPTO_AES_586 == \"m\"))
kernel/kallsyms.c: [TRUE]
drivers/broken.c: InvalidExpression()

no separator here
drivers/odd.c: (A == \"y\"
";

    #[test]
    fn reads_listing() {
        let conditions = read_kbuild_listing(LISTING.as_bytes()).unwrap();

        assert_eq!(conditions.len(), 4);
        assert_eq!(conditions[0].file, "arch/x86/crypto/aes_glue.c");
        assert_eq!(
            conditions[0].condition,
            Some(var!("CONFIG_CRYPTO_AES_586") | var!("CONFIG_CRYPTO_AES_586_MODULE"))
        );
        assert_eq!(
            conditions[0].condition.as_ref().map(|c| c.to_string()),
            Some("(CONFIG_CRYPTO_AES_586 || CONFIG_CRYPTO_AES_586_MODULE)".to_owned())
        );
        assert_eq!(conditions[1].condition, Some(Formula::TRUE));
        assert_eq!(conditions[2].condition, None);
        assert_eq!(conditions[3].file, "drivers/odd.c");
        assert_eq!(conditions[3].condition, None);
    }

    #[test]
    fn prunes_contradicting_files() {
        let solver =
            SatSolver::from_dimacs(&b"c 1 A\nc 2 B\np cnf 2 1\n-1 0\n"[..], Default::default())
                .unwrap();
        let conditions = read_kbuild_listing(
            &b"a.c: A == \"y\"\nb.c: B == \"y\"\nc.c: InvalidExpression()\nd.c: A != \"y\"\n"[..],
        )
        .unwrap();

        let pruned = unsatisfiable_files(&solver, &conditions, UnknownVariablePolicy::Fail)
            .unwrap();
        let files: Vec<_> = pruned.iter().map(|entry| &entry.file[..]).collect();
        assert_eq!(files, vec!["a.c"]);
    }

    #[test]
    fn unknown_symbols_keep_their_files() {
        let solver =
            SatSolver::from_dimacs(&b"c 1 A\nc 2 B\np cnf 2 1\n-1 0\n"[..], Default::default())
                .unwrap();
        let conditions = read_kbuild_listing(
            &b"a.c: A == \"y\"\nx.c: MISSING == \"y\"\nb.c: A == \"y\" && B == \"y\"\n"[..],
        )
        .unwrap();

        let pruned = unsatisfiable_files(&solver, &conditions, UnknownVariablePolicy::Fail)
            .unwrap();
        let files: Vec<_> = pruned.iter().map(|entry| &entry.file[..]).collect();
        assert_eq!(files, vec!["a.c", "b.c"]);

        let solver = SatSolver::new();
        let pruned = unsatisfiable_files(&solver, &conditions, UnknownVariablePolicy::Fail)
            .unwrap();
        assert!(pruned.is_empty());
    }
}
