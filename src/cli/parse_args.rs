use num_traits::Signed;

use dlinear::{config::Config, rational, sat::DefaultPhase};

const USAGE: &str = "usage: dlinear <file.smt2> [--lp-solver={qsoptex,soplex}] [--precision=<delta>] [--exhaustive] [--random-seed=<n>] [--sat-default-phase={false,true,jw,rjw}] [--model]";

/// Parses CLI arguments into a [Config], returning the input file path.
///
/// An unrecognised argument or invalid option prints a message and terminates the process.
pub fn parse_args(args: &[String], cfg: &mut Config) -> String {
    let mut file = None;

    'arg_examination: for arg in args.iter().skip(1) {
        if !arg.starts_with("--") {
            if file.is_some() {
                println!("More than one input file given");
                std::process::exit(1);
            }
            file = Some(arg.clone());
            continue 'arg_examination;
        }

        let mut split = arg.split('=');
        match split.next() {
            Some("--exhaustive") => {
                // Equivalent to a precision of zero: a full satisfiability proof is required.
                cfg.precision = rational::Rational::from_integer(0.into());
            }

            Some("--model") => {
                cfg.produce_models = true;
            }

            // The remaining cases follow a common template.
            // If a value is present, may be parsed appropriately, and is valid, the config is updated.
            // Otherwise, a message is sent.
            Some("--lp-solver") => {
                if let Some(request) = split.next() {
                    if let Ok(value) = request.parse() {
                        cfg.lp_solver = value;
                        continue 'arg_examination;
                    }
                }

                println!("lp-solver requires one of: qsoptex, soplex");
                std::process::exit(1);
            }

            Some("--precision") => {
                if let Some(request) = split.next() {
                    if let Some(value) = rational::from_decimal(request) {
                        if value.is_positive() {
                            cfg.precision = value;
                            continue 'arg_examination;
                        }
                    }
                }

                println!("precision requires a rational value greater than zero");
                std::process::exit(1);
            }

            Some("--random-seed") => {
                if let Some(request) = split.next() {
                    if let Ok(value) = request.parse::<u64>() {
                        cfg.random_seed = value;
                        continue 'arg_examination;
                    }
                }

                println!("random-seed requires a non-negative integer");
                std::process::exit(1);
            }

            Some("--sat-default-phase") => {
                if let Some(request) = split.next() {
                    if let Ok(value) = request.parse::<DefaultPhase>() {
                        cfg.sat_default_phase = value;
                        continue 'arg_examination;
                    }
                }

                println!("sat-default-phase requires one of: false, true, jw, rjw");
                std::process::exit(1);
            }

            Some(_) | None => {
                println!("Unable to parse argument: {arg:?}");
                println!("{USAGE}");
                std::process::exit(1);
            }
        }
    }

    match file {
        Some(file) => file,
        None => {
            println!("{USAGE}");
            std::process::exit(1);
        }
    }
}
