use std::{fs, io};

use anyhow::Error;
use clap::{App, ArgMatches, SubCommand};

use kminer::presence::{read_listing, unsatisfiable_files, PresenceCondition};
use kminer_parser::{CStyleGrammar, KbuildGrammar, Parser, TypeChefGrammar};

use super::{banner, dialect_arg, init_logging, load_solver, model_args, print_config_help};

pub fn prune_args() -> App<'static, 'static> {
    model_args(
        SubCommand::with_name("prune")
            .about("List files whose presence condition contradicts the feature model")
            .arg(dialect_arg("kbuild"))
            .arg_from_usage("[INPUT] 'The presence condition listing (stdin if omitted)'"),
    )
}

fn read_conditions(
    input: impl io::BufRead,
    dialect: &str,
) -> Result<Vec<PresenceCondition>, Error> {
    let conditions = match dialect {
        "c" => read_listing(input, &Parser::new(CStyleGrammar))?,
        "typechef" => read_listing(input, &Parser::new(TypeChefGrammar))?,
        _ => read_listing(input, &Parser::new(KbuildGrammar::new()))?,
    };
    Ok(conditions)
}

pub fn prune_main(matches: &ArgMatches) -> Result<i32, Error> {
    if print_config_help(matches) {
        return Ok(0);
    }

    init_logging();
    banner();

    let solver = load_solver(matches)?;

    let dialect = matches
        .value_of("dialect")
        .unwrap_or("kbuild")
        .to_ascii_lowercase();

    let stdin = io::stdin();

    let mut locked_stdin;
    let mut opened_file;

    let file = match matches.value_of("INPUT") {
        Some(path) => {
            log::info!("Reading listing '{}'", path);
            opened_file = fs::File::open(path)?;
            &mut opened_file as &mut dyn io::Read
        }
        None => {
            log::info!("Reading listing from stdin");
            locked_stdin = stdin.lock();
            &mut locked_stdin as &mut dyn io::Read
        }
    };

    let conditions = read_conditions(io::BufReader::new(file), &dialect)?;

    let policy = solver.sat_config().unknown_variables;
    let pruned = unsatisfiable_files(&solver, &conditions, policy)?;

    log::info!(
        "{} of {} files can never be compiled",
        pruned.len(),
        conditions.len()
    );

    for entry in pruned {
        println!("{}", entry.file);
    }

    Ok(0)
}
