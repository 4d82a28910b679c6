//! Kirchhoff - netlist to equation system
//!
//! Parses a netlist, assembles its equation system and prints a summary.
//!
//! # Usage
//!
//! ```bash
//! kirchhoff rectifier.cir --equations --events -v
//! ```

use std::path::PathBuf;

use clap::Parser;
use kirchhoff::{
    circuit::{validate_circuit, Circuit, CircuitConfig},
    dsl,
    error::Result,
    hybrid::Effect,
};

/// Assemble the equations of a lumped electrical network
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the netlist file
    #[arg(value_name = "NETLIST")]
    netlist: PathBuf,

    /// Print every equation of the initial discrete state
    #[arg(long)]
    equations: bool,

    /// Print the event table
    #[arg(long)]
    events: bool,

    /// Reference temperature in K
    #[arg(long, default_value_t = kirchhoff::DEFAULT_REFERENCE_TEMPERATURE)]
    reference_temperature: f64,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        _ => log::LevelFilter::Debug,
    };
    env_logger::Builder::from_default_env().filter_level(level).init();

    let ast = dsl::parse_file(&args.netlist)?;
    let config = CircuitConfig::new().with_reference_temperature(args.reference_temperature);
    let circuit = Circuit::from_ast(&ast, config)?;
    validate_circuit(&circuit)?;

    let balance = circuit.balance();
    println!("components: {}", circuit.components().len());
    println!("unknowns:   {}", balance.unknowns);
    println!("equations:  {}", balance.equations);
    println!("modes:      {}", circuit.machines().len());
    println!("events:     {}", circuit.events().len());
    if !balance.is_balanced() {
        println!("warning: system is not balanced");
    }

    if args.equations {
        println!();
        print!("{}", circuit);
    }

    if args.events {
        println!();
        for event in circuit.events().events() {
            let effect = match &event.effect {
                Effect::Transition(t) => format!("{}: {} -> {}", t.mode, t.from, t.to),
                Effect::Restart => "restart".to_string(),
            };
            println!(
                "{} {}: {:?} => {}",
                event.id,
                circuit.component_name(event.component),
                event.trigger,
                effect
            );
        }
    }

    Ok(())
}
