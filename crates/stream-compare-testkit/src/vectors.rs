//! Scenario vectors: scripted source pairs with known verdicts.
//!
//! The table lives in `vectors/scenarios.json` so other implementations of
//! the comparison engine can replay the same cases.

use serde::Deserialize;
use serde_json::Value;
use stream_compare::{deep_equal, CompareConfig, CompareError, CompareOptions, Mismatch};

use crate::fixtures::{block_on, SourcePair, Step};

const SCENARIOS: &str = include_str!("../vectors/scenarios.json");

/// One scripted action, as written in the table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptStep {
    /// Write a text chunk.
    Write(String),
    /// Write a byte chunk, hex encoded.
    WriteHex(String),
    /// Write a JSON value chunk.
    WriteValue(Value),
    /// Emit an arbitrary notification.
    Emit {
        name: String,
        #[serde(default)]
        args: Vec<Value>,
    },
    End,
    Fail(Value),
}

impl ScriptStep {
    /// Convert to a playable step.
    pub fn to_step(&self) -> Result<Step, hex::FromHexError> {
        Ok(match self {
            ScriptStep::Write(s) => Step::text(s),
            ScriptStep::WriteHex(h) => Step::bytes(&hex::decode(h)?),
            ScriptStep::WriteValue(v) => Step::Write(v.clone().into()),
            ScriptStep::Emit { name, args } => Step::Emit(name.clone(), args.clone()),
            ScriptStep::End => Step::End,
            ScriptStep::Fail(error) => Step::Fail(error.clone()),
        })
    }
}

/// How a scenario is expected to resolve under [`deep_equal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expected {
    Equal,
    Mismatch,
    DataShape,
    SourceFailed,
    Rejected,
}

/// A scenario vector.
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    /// Human-readable name for the scenario.
    pub name: String,
    /// Comparison options; defaults apply to missing fields.
    #[serde(default)]
    pub config: CompareConfig,
    /// Script for the first source.
    pub first: Vec<ScriptStep>,
    /// Script for the second source.
    pub second: Vec<ScriptStep>,
    /// Expected verdict.
    pub expected: Expected,
}

/// Load all scenario vectors.
pub fn all_scenarios() -> serde_json::Result<Vec<Scenario>> {
    serde_json::from_str(SCENARIOS)
}

/// Map a comparison result to its verdict class.
pub fn classify(result: &Result<Option<()>, CompareError<Mismatch>>) -> Expected {
    match result {
        Ok(_) => Expected::Equal,
        Err(CompareError::Comparator(_)) => Expected::Mismatch,
        Err(CompareError::DataShape { .. }) => Expected::DataShape,
        Err(CompareError::SourceFailed { .. }) => Expected::SourceFailed,
        Err(_) => Expected::Rejected,
    }
}

/// Play a scenario against two fresh sources and return the verdict.
pub fn run_scenario(scenario: &Scenario) -> Result<Expected, hex::FromHexError> {
    let first = to_steps(&scenario.first)?;
    let second = to_steps(&scenario.second)?;

    let pair = SourcePair::new();
    let handle = pair.compare(CompareOptions::new(deep_equal).config(scenario.config.clone()));
    pair.play(&first, &second);

    Ok(classify(&block_on(handle)))
}

fn to_steps(script: &[ScriptStep]) -> Result<Vec<Step>, hex::FromHexError> {
    script.iter().map(ScriptStep::to_step).collect()
}

/// Run every scenario, returning (name, passed, actual verdict).
pub fn verify_all_scenarios() -> Vec<(String, bool, Expected)> {
    let scenarios = match all_scenarios() {
        Ok(scenarios) => scenarios,
        Err(err) => return vec![(format!("scenario table: {err}"), false, Expected::Rejected)],
    };

    scenarios
        .iter()
        .map(|s| match run_scenario(s) {
            Ok(actual) => (s.name.clone(), actual == s.expected, actual),
            Err(_) => (s.name.clone(), false, Expected::Rejected),
        })
        .collect()
}
