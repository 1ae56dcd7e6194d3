//! The boundary to external planners and plan validators.
//!
//! Implementations run the actual tools; this module only turns their
//! output into plans and verdicts.

use std::io::Write;
use std::path::Path;
use std::time::{Duration, Instant};

use regex::Regex;
use tracing::{debug, info};

use super::atom::GroundAtom;
use super::domain::Domain;
use super::error::{Error, Result};
use super::parser::parse_ground_literal;
use super::plan::Plan;
use super::problem::Problem;

const FAILED_PLANS: &str = "Failed plans:";
const EXECUTED: &str = "Plan executed successfully";
const BAD_PLAN: &str = "Bad plan description";
const UNSATISFIED: [&str; 2] = ["has an unsatisfied precondition", "The goal is not satisfied"];

const REPAIR_ADVICE: &str = r"Plan Repair Advice:\n([\w\W]*?)\nFailed plans:";
const TYPE_PROBLEM: &str = r"Type problem in action([\w\W]+)Bad plan";
const ADVICE_LITERAL: &str = r"(\([\w\-]+[\w ]*\)) to (false|true)";

#[derive(Clone, Debug)]
pub struct PlanOptions {
    pub timeout: Duration,
    /// Longest acceptable plan.
    pub horizon: Option<usize>,
}

impl Default for PlanOptions {
    fn default() -> Self {
        PlanOptions { timeout: Duration::from_secs(10), horizon: None }
    }
}

pub trait Planner {
    /// Runs the planner on the task files and returns its raw output.
    fn run(&mut self, domain: &Path, problem: &Path, timeout: Duration) -> Result<String>;

    /// Extracts the plan lines from raw planner output.
    fn output_to_plan(&self, output: &str) -> Result<Vec<String>>;

    fn cleanup(&mut self) {}

    fn plan_from_pddl(&mut self, domain: &Path, problem: &Path, options: &PlanOptions) -> Result<Plan> {
        let start = Instant::now();
        let output = self.run(domain, problem, options.timeout);
        self.cleanup();
        let output = output?;
        let elapsed = start.elapsed();
        if elapsed > options.timeout {
            return Err(Error::Timeout(elapsed));
        }
        let lines = self.output_to_plan(&output)?;
        if let Some(horizon) = options.horizon {
            if lines.len() > horizon {
                return Err(Error::Planning(format!("plan has {} steps, horizon is {}", lines.len(), horizon)));
            }
        }
        let plan: Plan = lines.join("\n").parse()?;
        info!(steps = plan.len(), elapsed = ?elapsed, "planner finished");
        Ok(plan)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Validation {
    pub success: bool,
    pub output: String,
}

impl Validation {
    pub fn executed_successfully(&self) -> bool {
        self.output.contains(EXECUTED)
    }

    /// The part of the output explaining why the plan failed: the type
    /// problem for malformed plans, the repair advice otherwise.
    pub fn failure_report(&self) -> Result<Option<String>> {
        if self.executed_successfully() {
            return Ok(None);
        }
        let pattern = if self.output.contains(BAD_PLAN) { TYPE_PROBLEM } else { REPAIR_ADVICE };
        let found = Regex::new(pattern)?.captures(&self.output).and_then(|c| c.get(1));
        Ok(found.map(|m| m.as_str().trim().to_owned()))
    }

    /// Literals whose truth would repair the failing step or goal.
    ///
    /// `(p a) to true` yields `(p a)`, `(p a) to false` yields `(not (p a))`.
    /// Empty when the plan succeeded or the failure is not an unsatisfied
    /// precondition or goal.
    pub fn repair_advice(&self) -> Result<Vec<String>> {
        if self.success {
            return Ok(Vec::new());
        }
        let section = match Regex::new(REPAIR_ADVICE)?.captures(&self.output).and_then(|c| c.get(1)) {
            Some(m) => m.as_str().trim(),
            None => return Ok(Vec::new()),
        };
        let mut lines = section.lines();
        let unsatisfied = lines.next().map_or(false, |first| UNSATISFIED.iter().any(|u| first.contains(u)));
        if !unsatisfied {
            return Ok(Vec::new());
        }
        let literal = Regex::new(ADVICE_LITERAL)?;
        Ok(lines
            .filter_map(|line| literal.captures(line))
            .map(|c| if &c[2] == "true" { c[1].to_owned() } else { format!("(not {})", &c[1]) })
            .collect())
    }

    /// [`repair_advice`](Validation::repair_advice) as ground atoms of `problem`.
    pub fn repair_atoms(&self, domain: &Domain, problem: &Problem) -> Result<Vec<GroundAtom>> {
        let objects = problem.all_objects();
        self.repair_advice()?
            .iter()
            .map(|literal| parse_ground_literal(literal, domain, &objects).map_err(|e| e.context("reading repair advice")))
            .collect()
    }
}

pub trait Validator {
    /// Runs the validator and returns its verdict and raw output.
    fn run(&mut self, domain: &Path, problem: Option<&Path>, plan: Option<&Path>) -> Result<(bool, String)>;

    /// Writes `plan` to a temporary file and validates it.
    fn validate(&mut self, domain: &Path, problem: Option<&Path>, plan: Option<&Plan>) -> Result<Validation> {
        let (success, output) = match plan {
            Some(plan) => {
                let mut file = tempfile::NamedTempFile::new()?;
                write!(file, "{}", plan)?;
                file.flush()?;
                self.run(domain, problem, Some(file.path()))?
            }
            None => self.run(domain, problem, None)?,
        };
        let success = success && !output.contains(FAILED_PLANS);
        debug!(success, "validator finished");
        Ok(Validation { success, output })
    }
}
