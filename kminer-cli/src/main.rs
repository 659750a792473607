use std::env;
use std::fs;
use std::io::{self, Read, Write};

use anyhow::{Context, Error};
use clap::{values_t, App, AppSettings, Arg, ArgMatches, SubCommand};
use env_logger::{fmt, Builder, Target};
use log::{error, info};
use log::{Level, LevelFilter, Record};

use kminer::{CnfConverter, Formula, SatConfig, SatConfigUpdate, SatSolver, SolverError};
use kminer_parser::{CStyleGrammar, KbuildGrammar, Parser, TypeChefGrammar};

mod prune;

fn main() {
    let exit_code = match main_with_err() {
        Err(err) => {
            error!("{:#}", err);
            1
        }
        Ok(exit_code) => exit_code,
    };
    std::process::exit(exit_code);
}

fn init_logging() {
    let format = |buf: &mut fmt::Formatter, record: &Record| {
        if record.level() == Level::Info {
            writeln!(buf, "c {}", record.args())
        } else {
            writeln!(buf, "c {}: {}", record.level(), record.args())
        }
    };

    let mut builder = Builder::new();
    builder
        .target(Target::Stdout)
        .format(format)
        .filter(None, LevelFilter::Info);

    if let Ok(ref env_var) = env::var("KMINER_LOG") {
        builder.parse_filters(env_var);
    }

    builder.init();
}

fn banner() {
    info!("This is kminer {}", env!("CARGO_PKG_VERSION"));
}

fn dialect_arg(default: &'static str) -> Arg<'static, 'static> {
    Arg::from_usage("[dialect] --dialect=[DIALECT] 'Syntax of the presence conditions'")
        .possible_values(&["c", "kbuild", "typechef"])
        .default_value(default)
        .case_insensitive(true)
}

/// Options shared by all subcommands that check against a feature model.
fn model_args(command: App<'static, 'static>) -> App<'static, 'static> {
    command
        .arg_from_usage("[model] --model=[FILE] 'DIMACS feature model (unconstrained if omitted)'")
        .arg_from_usage("[config-file] --config=[FILE] 'Read parameters from configuration file'")
        .arg(
            Arg::from_usage("[config-option] -C --config-option")
                .value_name("OPTION>=<VALUE")
                .help("Specify a single config option, use '-C help' for a list of options.")
                .multiple(true)
                .number_of_values(1),
        )
}

fn main_with_err() -> Result<i32, Error> {
    let matches = App::new("kminer")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Checks presence conditions of source files against a Kconfig feature model")
        .setting(AppSettings::DisableHelpSubcommand)
        .setting(AppSettings::VersionlessSubcommands)
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .subcommand(
            SubCommand::with_name("parse")
                .about("Parse a presence condition and print it in C syntax")
                .arg(dialect_arg("c"))
                .arg_from_usage("<EXPR> 'The presence condition'"),
        )
        .subcommand(model_args(
            SubCommand::with_name("cnf")
                .about("Convert a presence condition into conjunctive normal form")
                .arg(dialect_arg("c"))
                .arg_from_usage("--dimacs 'Print numbered DIMACS clauses instead of formulas'")
                .arg_from_usage("<EXPR> 'The presence condition'"),
        ))
        .subcommand(model_args(
            SubCommand::with_name("sat")
                .about("Check a presence condition against the feature model")
                .arg(dialect_arg("c"))
                .arg_from_usage("[EXPR] 'The presence condition (the model alone if omitted)'"),
        ))
        .subcommand(prune::prune_args())
        .get_matches();

    match matches.subcommand() {
        ("parse", Some(matches)) => parse_main(matches),
        ("cnf", Some(matches)) => cnf_main(matches),
        ("sat", Some(matches)) => sat_main(matches),
        ("prune", Some(matches)) => prune::prune_main(matches),
        _ => Ok(1),
    }
}

/// Parses the `EXPR` argument in the selected dialect.
fn parse_expression(text: &str, matches: &ArgMatches) -> Result<Formula, Error> {
    let dialect = matches
        .value_of("dialect")
        .unwrap_or("c")
        .to_ascii_lowercase();

    let formula = match &dialect[..] {
        "kbuild" => Parser::new(KbuildGrammar::new()).parse(text),
        "typechef" => Parser::new(TypeChefGrammar).parse(text),
        _ => Parser::new(CStyleGrammar).parse(text),
    };
    formula.with_context(|| format!("Couldn't parse expression \"{}\"", text))
}

/// Whether `-C help` was given, after printing the option list.
fn print_config_help(matches: &ArgMatches) -> bool {
    let requested = values_t!(matches, "config-option", String)
        .unwrap_or_default()
        .iter()
        .any(|option| option == "help");
    if requested {
        print!("{}", SatConfig::help());
    }
    requested
}

/// Sets up a checker from the configuration and model options.
fn load_solver(matches: &ArgMatches) -> Result<SatSolver, Error> {
    let mut config_update = SatConfigUpdate::new();

    if let Some(config_path) = matches.value_of("config-file") {
        let mut config_contents = String::new();
        fs::File::open(config_path)
            .with_context(|| format!("Couldn't open configuration file '{}'", config_path))?
            .read_to_string(&mut config_contents)?;

        config_update.merge(toml::from_str(&config_contents)?);
    }

    for config_option in values_t!(matches, "config-option", String).unwrap_or_default() {
        config_update.merge(toml::from_str(&config_option)?);
    }

    let solver = match matches.value_of("model") {
        Some(path) => {
            let mut config = SatConfig::default();
            config_update.apply(&mut config);
            SatSolver::open(path, config)?
        }
        None => {
            info!("No feature model given, all variables are unconstrained");
            let mut solver = SatSolver::new();
            solver.config(&config_update);
            solver
        }
    };

    Ok(solver)
}

fn parse_main(matches: &ArgMatches) -> Result<i32, Error> {
    init_logging();

    let formula = parse_expression(matches.value_of("EXPR").unwrap_or_default(), matches)?;
    println!("{}", formula);
    Ok(0)
}

fn cnf_main(matches: &ArgMatches) -> Result<i32, Error> {
    if print_config_help(matches) {
        return Ok(0);
    }

    init_logging();
    banner();

    let formula = parse_expression(matches.value_of("EXPR").unwrap_or_default(), matches)?;
    let solver = load_solver(matches)?;
    let config = solver.sat_config();

    let stdout = io::stdout();
    let mut stdout = stdout.lock();

    if matches.is_present("dimacs") {
        let encoding = solver.encode(&formula, config.unknown_variables)?;
        info!(
            "{} clauses over {} variables",
            encoding.formula.len(),
            encoding.formula.var_count()
        );
        encoding.write(&mut stdout, &config.name_prefix)?;
    } else {
        let clauses = CnfConverter::new(config.strategy)
            .with_max_depth(config.max_depth)
            .convert(&formula)?;
        info!("{} clauses ({} strategy)", clauses.len(), config.strategy.name());
        for clause in clauses {
            writeln!(stdout, "{}", clause)?;
        }
    }

    Ok(0)
}

fn sat_main(matches: &ArgMatches) -> Result<i32, Error> {
    if print_config_help(matches) {
        return Ok(0);
    }

    init_logging();
    banner();

    let solver = load_solver(matches)?;

    let result = match matches.value_of("EXPR") {
        Some(text) => {
            let formula = parse_expression(text, matches)?;
            info!("Checking {}", formula);
            solver.is_satisfiable(&formula, solver.sat_config().unknown_variables)
        }
        None => solver.is_model_satisfiable(),
    };

    match result {
        Ok(true) => {
            println!("s SATISFIABLE");
            Ok(10)
        }
        Ok(false) => {
            println!("s UNSATISFIABLE");
            Ok(20)
        }
        Err(err @ SolverError::Timeout { .. }) => {
            error!("{}", err);
            println!("s UNKNOWN");
            Ok(0)
        }
        Err(err) => Err(err.into()),
    }
}
