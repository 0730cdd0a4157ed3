//! Relation operators and dependency-spec parsing.

use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid relation operator \"{0}\", expected one of: <, <=, =, >=, >")]
    InvalidRelation(String),
    #[error("malformed dependency spec \"{0}\"")]
    MalformedSpec(String),
}

/// A version relation operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Relation {
    Less,
    LessEqual,
    Equal,
    GreaterEqual,
    Greater,
}

impl Relation {
    pub(crate) fn allows_less(self) -> bool {
        matches!(self, Relation::Less | Relation::LessEqual)
    }

    pub(crate) fn allows_equal(self) -> bool {
        matches!(
            self,
            Relation::LessEqual | Relation::Equal | Relation::GreaterEqual
        )
    }

    pub(crate) fn allows_greater(self) -> bool {
        matches!(self, Relation::GreaterEqual | Relation::Greater)
    }
}

impl FromStr for Relation {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, ParseError> {
        match s {
            "<" => Ok(Relation::Less),
            "<=" => Ok(Relation::LessEqual),
            "=" | "==" => Ok(Relation::Equal),
            ">=" => Ok(Relation::GreaterEqual),
            ">" => Ok(Relation::Greater),
            other => Err(ParseError::InvalidRelation(other.to_string())),
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Relation::Less => "<",
            Relation::LessEqual => "<=",
            Relation::Equal => "=",
            Relation::GreaterEqual => ">=",
            Relation::Greater => ">",
        })
    }
}

lazy_static! {
    static ref SPEC_RE: Regex =
        Regex::new(r"^\s*(\S+?)\s*(<=|>=|==|<|=|>)\s*(\S+)\s*$").unwrap();
}

/// A parsed dependency specification: a name with an optional version
/// relation, e.g. `libssl >= 1.0-2`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepSpec {
    pub name: String,
    pub relation: Option<Relation>,
    pub version: Option<String>,
}

impl DepSpec {
    /// A bare name with no version constraint.
    pub fn name_only(name: impl Into<String>) -> Self {
        DepSpec {
            name: name.into(),
            relation: None,
            version: None,
        }
    }
}

impl FromStr for DepSpec {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, ParseError> {
        if let Some(caps) = SPEC_RE.captures(s) {
            return Ok(DepSpec {
                name: caps[1].to_string(),
                relation: Some(caps[2].parse()?),
                version: Some(caps[3].to_string()),
            });
        }
        let name = s.trim();
        if name.is_empty() || name.contains(char::is_whitespace) {
            return Err(ParseError::MalformedSpec(s.to_string()));
        }
        Ok(DepSpec::name_only(name))
    }
}

impl fmt::Display for DepSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.relation, &self.version) {
            (Some(rel), Some(ver)) => write!(f, "{} {} {}", self.name, rel, ver),
            _ => f.write_str(&self.name),
        }
    }
}
