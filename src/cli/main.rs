//! The dlinear CLI: `dlinear <file.smt2> [flags]`.
//!
//! Reads an SMT-LIB2 file, executes its commands, and prints `delta-sat` or `unsat` --- with a model, on request.
//! Exits 0 on any completed check and 1 on a parse error or internal failure; an interrupt falls through to the default handler and a non-zero exit.

mod parse_args;

use dlinear::{config::Config, rational::InftyGuard, smt2::Smt2Driver, solver::context::Context};

fn main() {
    let args: Vec<String> = std::env::args().collect();

    let mut config = Config::default();
    let file = parse_args::parse_args(&args, &mut config);

    let _infty = InftyGuard::default();

    let mut driver = Smt2Driver::new(Context::new(config));
    driver.print_immediately();

    match driver.parse_file(&file) {
        Ok(()) => {}
        Err(e) => {
            eprintln!("dlinear: {e}");
            std::process::exit(1);
        }
    }
}
