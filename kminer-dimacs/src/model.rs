//! Feature models: a CNF formula together with its variable names.
use std::{fs, io, path::Path};

use anyhow::{Context, Error};

use varisat_formula::CnfFormula;

use crate::{write_dimacs, write_dimacs_names, DimacsParser, VariableMap};

/// A feature model in conjunctive normal form with named variables.
#[derive(Debug, Default)]
pub struct FeatureModel {
    pub formula: CnfFormula,
    pub variables: VariableMap,
}

impl FeatureModel {
    /// Parses a DIMACS CNF feature model, prepending `prefix` to every variable name.
    ///
    /// The variable map of the result reserves every variable number used by the name comments,
    /// the clauses or the header.
    pub fn parse(input: impl io::Read, prefix: &str) -> Result<FeatureModel, Error> {
        let mut parser = DimacsParser::with_name_prefix(prefix).parse_input(input, |_| Ok(()))?;
        let formula = parser.take_formula();
        let mut variables = parser.take_variables();
        variables.reserve(formula.var_count());
        Ok(FeatureModel { formula, variables })
    }

    /// Reads a DIMACS CNF feature model from a file.
    pub fn open(path: impl AsRef<Path>, prefix: &str) -> Result<FeatureModel, Error> {
        let path = path.as_ref();
        let file = fs::File::open(path)
            .with_context(|| format!("Failed to open DIMACS model '{}'", path.display()))?;
        FeatureModel::parse(file, prefix)
            .with_context(|| format!("Failed to parse DIMACS model '{}'", path.display()))
    }

    /// Writes the model as DIMACS CNF preceded by its name comments.
    ///
    /// `prefix` is stripped from names so the output can be read back with the same prefix. Names
    /// without it are left out.
    pub fn write(&self, target: &mut impl io::Write, prefix: &str) -> io::Result<()> {
        write_dimacs_names(&mut *target, &self.variables, prefix)?;
        write_dimacs(&mut *target, &self.formula)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    use varisat_formula::{cnf_formula, var};

    #[test]
    fn reserves_unnamed_variables() -> Result<(), Error> {
        let model = FeatureModel::parse(&b"c 1 A\np cnf 5 1\n1 -2 0\n"[..], "CONFIG_")?;
        assert_eq!(model.variables.var("CONFIG_A"), Some(var!(1)));
        assert_eq!(model.variables.max_var_count(), 5);

        let mut expected = cnf_formula![1, -2;];
        expected.set_var_count(5);
        assert_eq!(model.formula, expected);
        Ok(())
    }

    #[test]
    fn open_and_write_back() -> Result<(), Error> {
        let mut file = tempfile::NamedTempFile::new()?;
        file.write_all(b"c 1 A\nc 2 B\np cnf 2 2\n1 2 0\n-1 0\n")?;

        let model = FeatureModel::open(file.path(), "CONFIG_")?;
        assert_eq!(model.variables.len(), 2);

        let mut buf = vec![];
        model.write(&mut buf, "CONFIG_")?;
        assert_eq!(
            String::from_utf8(buf)?,
            "c 1 A\nc 2 B\np cnf 2 2\n1 2 0\n-1 0\n"
        );

        assert!(FeatureModel::open(file.path().with_extension("missing"), "").is_err());
        Ok(())
    }
}
