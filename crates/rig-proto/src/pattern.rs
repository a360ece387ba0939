//! Command match patterns with typed capture groups
//!
//! A [`CommandPattern`] pairs a regular expression with the declared
//! [`ArgKind`] of each capture group. Patterns are compiled once at table
//! construction, anchored so they must match an entire framed request,
//! and checked against their declared argument list; a mismatch between
//! group count and declaration is a [`PatternError`].

use regex::Regex;

use crate::error::{PatternError, ProtocolError};

/// Declared type of one captured argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgKind {
    /// Signed integer
    Int,
    /// Floating-point number
    Float,
    /// Raw string, passed through as captured
    Str,
    /// One of a fixed set of allowed strings
    Choice(Vec<String>),
}

impl ArgKind {
    /// A `Choice` over the given options
    pub fn choice(options: &[&str]) -> Self {
        ArgKind::Choice(options.iter().map(|s| s.to_string()).collect())
    }

    fn describe(&self) -> String {
        match self {
            ArgKind::Int => "int".to_string(),
            ArgKind::Float => "float".to_string(),
            ArgKind::Str => "str".to_string(),
            ArgKind::Choice(options) => format!("one of {options:?}"),
        }
    }

    fn decode(&self, text: &str) -> Result<Arg, ProtocolError> {
        let fail = || ProtocolError::ArgumentDecode {
            text: text.to_string(),
            expected: self.describe(),
        };
        match self {
            ArgKind::Int => text.parse::<i64>().map(Arg::Int).map_err(|_| fail()),
            ArgKind::Float => text.parse::<f64>().map(Arg::Float).map_err(|_| fail()),
            ArgKind::Str => Ok(Arg::Str(text.to_string())),
            ArgKind::Choice(options) => {
                if options.iter().any(|o| o == text) {
                    Ok(Arg::Str(text.to_string()))
                } else {
                    Err(fail())
                }
            }
        }
    }
}

/// A decoded argument handed to a command handler
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    /// Decoded integer
    Int(i64),
    /// Decoded float
    Float(f64),
    /// Raw or choice string
    Str(String),
}

impl Arg {
    /// Integer value, if this is an `Int`
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Arg::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Numeric value; integers coerce losslessly
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Arg::Float(f) => Some(*f),
            Arg::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    /// String value, if this is a `Str`
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Arg::Str(s) => Some(s),
            _ => None,
        }
    }
}

/// Compiled match pattern with declared capture kinds
#[derive(Debug, Clone)]
pub struct CommandPattern {
    regex: Regex,
    args: Vec<ArgKind>,
    pattern: String,
}

impl CommandPattern {
    /// Compile a pattern; `args` declares each capture group in order
    ///
    /// The pattern is anchored to the whole frame, so `"TEMP\\?"` matches
    /// the request `TEMP?` and nothing longer.
    pub fn new(pattern: &str, args: Vec<ArgKind>) -> Result<Self, PatternError> {
        let anchored = format!("^(?:{pattern})$");
        let regex = Regex::new(&anchored).map_err(|source| PatternError::InvalidPattern {
            pattern: pattern.to_string(),
            source: Box::new(source),
        })?;

        // Group 0 is the whole match
        let groups = regex.captures_len() - 1;
        if groups != args.len() {
            return Err(PatternError::CaptureCountMismatch {
                pattern: pattern.to_string(),
                groups,
                declared: args.len(),
            });
        }

        Ok(Self {
            regex,
            args,
            pattern: pattern.to_string(),
        })
    }

    /// Pattern matching a fixed verb exactly (metacharacters escaped)
    pub fn literal(text: &str) -> Result<Self, PatternError> {
        Self::new(&regex::escape(text), Vec::new())
    }

    /// Whether the whole frame matches this pattern
    pub fn matches(&self, frame: &str) -> bool {
        self.regex.is_match(frame)
    }

    /// Decode the frame's capture groups per the declared kinds
    ///
    /// Callers check [`matches`](Self::matches) first; a non-matching
    /// frame decodes to no arguments.
    pub fn decode(&self, frame: &str) -> Result<Vec<Arg>, ProtocolError> {
        let Some(caps) = self.regex.captures(frame) else {
            return Ok(Vec::new());
        };
        self.args
            .iter()
            .enumerate()
            .map(|(i, kind)| {
                let text = caps.get(i + 1).map(|m| m.as_str()).unwrap_or("");
                kind.decode(text)
            })
            .collect()
    }

    /// The source pattern as written
    pub fn source(&self) -> &str {
        &self.pattern
    }
}
