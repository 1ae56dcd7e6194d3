use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use pddl_core::pddl::{enumerate_groundings, Domain, Plan, Problem, Result};

/// Parses a PDDL domain and problem, then lists applicable actions or checks a plan.
#[derive(Parser, Debug)]
#[command(name = "pddl-core", version)]
struct Args {
    /// Domain file
    domain: PathBuf,

    /// Problem file
    problem: PathBuf,

    /// Plan to validate and simulate, one `(action args...)` per line
    #[arg(long)]
    plan: Option<PathBuf>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log: String,
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .try_init()
        .ok();
}

fn run(args: &Args) -> Result<bool> {
    let domain = Domain::from_file(&args.domain)?;
    let problem = Problem::from_file(&args.problem, &domain)?;
    println!(
        "domain {}: {} types, {} predicates, {} actions",
        domain.name,
        domain.types.len(),
        domain.predicates.len(),
        domain.operators.len()
    );
    println!("problem {}: {} objects, {} initial facts", problem.name, problem.objects.len(), problem.init.len());

    let plan = match &args.plan {
        Some(path) => Plan::from_file(path)?,
        None => {
            let objects = problem.all_objects();
            for operator in &domain.operators {
                for grounded in enumerate_groundings(operator, &objects, &problem.init)? {
                    println!("{}", grounded.short_str());
                }
            }
            return Ok(true);
        }
    };

    let errors = plan.validate(&domain, &problem);
    for e in &errors {
        eprintln!("{}", e);
    }
    if !errors.is_empty() {
        return Ok(false);
    }
    let achieved = plan.achieves_goal(&domain, &problem)?;
    println!("plan of {} steps {}", plan.len(), if achieved { "achieves the goal" } else { "does not achieve the goal" });
    Ok(achieved)
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(&args.log);
    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::from(2)
        }
    }
}
