//! Saved test suites: ordered calls kept as JSON files.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use idlforge_core::form::CallInputState;
use idlforge_core::parse::{coerce, render};
use idlforge_core::schema::CallDefinition;
use idlforge_core::session::Session;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum SuiteError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not a valid suite file: {source}")]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("no test case matches `{0}`")]
    CaseNotFound(String),
}

/// One saved call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub id: Uuid,
    pub name: String,
    pub instruction: String,
    #[serde(default)]
    pub args: BTreeMap<String, JsonValue>,
    #[serde(default)]
    pub accounts: BTreeMap<String, String>,
}

impl TestCase {
    pub fn new(name: impl Into<String>, instruction: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            instruction: instruction.into(),
            args: BTreeMap::new(),
            accounts: BTreeMap::new(),
        }
    }

    /// Capture the current form. Arguments that coerce are stored in their
    /// rendered form; the rest are kept as entered.
    pub fn from_state(name: impl Into<String>, session: &Session, state: &CallInputState) -> Self {
        let mut case = Self::new(name, state.call.clone());
        let call = session.call(&state.call);
        for (arg, raw) in &state.args {
            let canonical = call
                .and_then(|c| session.schema().resolve_arg(c, arg).ok())
                .and_then(|shape| coerce(raw, &shape).ok().map(|v| render(&v, &shape)));
            case.args.insert(arg.clone(), canonical.unwrap_or_else(|| raw.clone()));
        }
        case.accounts = state.account_addresses();
        case
    }

    /// Form state for replaying this case against `call`.
    pub fn to_state(&self, call: &CallDefinition) -> CallInputState {
        CallInputState::from_values(call, &self.args, &self.accounts)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestSuite {
    pub id: Uuid,
    pub name: String,
    /// Program the suite was recorded against.
    pub program_id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default)]
    pub test_cases: Vec<TestCase>,
}

impl TestSuite {
    pub fn new(name: impl Into<String>, program_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            program_id: program_id.into(),
            created_at: OffsetDateTime::now_utc(),
            test_cases: Vec::new(),
        }
    }

    pub fn load(path: &Path) -> Result<Self, SuiteError> {
        let text = fs::read_to_string(path).map_err(|source| SuiteError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| SuiteError::Format {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), SuiteError> {
        let text = serde_json::to_string_pretty(self).map_err(|source| SuiteError::Format {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, text).map_err(|source| SuiteError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn add_case(&mut self, case: TestCase) -> Uuid {
        let id = case.id;
        self.test_cases.push(case);
        id
    }

    /// Remove a case by id, id prefix or exact name.
    pub fn remove_case(&mut self, key: &str) -> Result<TestCase, SuiteError> {
        let index = self
            .test_cases
            .iter()
            .position(|c| c.name == key || (!key.is_empty() && c.id.to_string().starts_with(key)))
            .ok_or_else(|| SuiteError::CaseNotFound(key.to_string()))?;
        Ok(self.test_cases.remove(index))
    }
}
