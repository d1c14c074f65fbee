//! Check a few classic properties of the natural numbers.
//!
//! Run with: `cargo run --example check`
//! With options: `cargo run --example check -- --max-states 5000 --dot even.dot`

use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;

use autologic::config::EvalConfig;
use autologic::driver::{Definition, Session};
use autologic::ir::{add, call, eq, exists, forall, int, lt, mul, not, or, var};
use autologic::program::NamedPredicate;
use autologic::unify::TruthValue;

#[derive(Parser, Debug)]
#[command(name = "check")]
#[command(about = "Decide properties of natural numbers with automata")]
struct Args {
    /// Abort when an automaton grows past this many states
    #[arg(long)]
    max_states: Option<usize>,

    /// Skip simplification of predicate bodies
    #[arg(long)]
    no_optimize: bool,

    /// Write the automaton of `Even` in DOT format
    #[arg(long)]
    dot: Option<PathBuf>,

    /// Load a HOA automaton and report its truth value
    #[arg(long)]
    load: Option<PathBuf>,

    /// Show debug logs
    #[arg(short, long)]
    verbose: bool,
}

fn definitions() -> Vec<Definition> {
    let pred = |name: &str, args: &[&str], body| Definition::Predicate(NamedPredicate::new(name, args, body));
    let check = |name: &str, expected| Definition::AssertProp {
        expected,
        name: name.into(),
    };
    let even = |x: &str| call("Even", vec![var(x)]);

    vec![
        pred("Even", &["x"], exists("y", eq(var("x"), add(var("y"), var("y"))))),
        pred("Odd", &["x"], not(even("x"))),
        check("Even", TruthValue::Sometimes),
        pred(
            "EvenOrNext",
            &[],
            forall("x", or(even("x"), call("Even", vec![add(var("x"), int(1))]))),
        ),
        check("EvenOrNext", TruthValue::True),
        pred(
            "NoLargest",
            &[],
            forall("x", exists("y", lt(var("x"), var("y")))),
        ),
        check("NoLargest", TruthValue::True),
        pred(
            "Postage",
            &["n"],
            exists("a", exists("b", eq(var("n"), add(mul(int(3), var("a")), mul(int(5), var("b")))))),
        ),
        check("Postage", TruthValue::Sometimes),
        pred(
            "PostageFrom8",
            &[],
            forall("n", or(lt(var("n"), int(8)), call("Postage", vec![var("n")]))),
        ),
        check("PostageFrom8", TruthValue::True),
    ]
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    simplelog::TermLogger::init(
        if args.verbose {
            simplelog::LevelFilter::Debug
        } else {
            simplelog::LevelFilter::Info
        },
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let mut config = EvalConfig::default().with_optimize(!args.no_optimize);
    if let Some(limit) = args.max_states {
        config = config.with_max_states(limit);
    }

    let time_total = Instant::now();
    let mut session = Session::new(config)?;
    let report = session.run(definitions())?;
    println!("{}", report);
    let passed = report.passed();

    if let Some(path) = &args.dot {
        let even = session.program_mut().call_predicate("Even", None)?;
        std::fs::write(path, even.to_dot()?)?;
        println!("Even: {} states, written to {}", even.num_states(), path.display());
    }

    if let Some(path) = &args.load {
        let (aut, aps) = autologic::automaton::Automaton::load_hoa(session.program().alphabet(), path)?;
        let truth = autologic::program::classify(&aut);
        println!("{}: {} AP(s), {} states, {}", path.display(), aps.len(), aut.num_states(), truth);
    }

    println!("Total time: {:.3}s", time_total.elapsed().as_secs_f64());
    if !passed {
        color_eyre::eyre::bail!("some assertions failed");
    }
    Ok(())
}
