// SPDX-License-Identifier: MIT OR Apache-2.0
//! Editable operation parameters ("knobs").
//!
//! An operation declares its parameters once, when its node is created.
//! The UI edits values by label; the parameter state is what feeds the
//! node's content hash.

use crate::hash::digest_hex;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of value a parameter holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamKind {
    /// Free text
    Text,
    /// Whole number
    Integer,
    /// Checkbox
    Bool,
    /// Index into a fixed list of options
    Choice,
    /// Path picked through a file dialog
    FilePath,
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Text => "text",
            Self::Integer => "integer",
            Self::Bool => "bool",
            Self::Choice => "choice",
            Self::FilePath => "file path",
        };
        f.write_str(name)
    }
}

/// Value stored in a parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamValue {
    /// Free text
    Text(String),
    /// Whole number
    Integer(i64),
    /// Checkbox state
    Bool(bool),
    /// Selected option index
    Choice(usize),
    /// File path
    FilePath(String),
}

impl ParamValue {
    /// Get the kind of this value
    pub fn kind(&self) -> ParamKind {
        match self {
            Self::Text(_) => ParamKind::Text,
            Self::Integer(_) => ParamKind::Integer,
            Self::Bool(_) => ParamKind::Bool,
            Self::Choice(_) => ParamKind::Choice,
            Self::FilePath(_) => ParamKind::FilePath,
        }
    }

    /// Digest of this value alone
    pub fn digest(&self) -> String {
        let text = match self {
            Self::Text(s) | Self::FilePath(s) => s.clone(),
            Self::Integer(v) => v.to_string(),
            Self::Bool(v) => u8::from(*v).to_string(),
            Self::Choice(i) => i.to_string(),
        };
        digest_hex(&text)
    }
}

/// A declared parameter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    /// Label shown next to the widget; also the lookup key
    pub label: String,
    /// Current value
    pub value: ParamValue,
    /// Inclusive bounds for integer parameters
    pub range: Option<(i64, i64)>,
    /// Options for choice parameters
    pub options: Vec<String>,
}

/// Error when editing a parameter
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParameterError {
    /// No parameter with this label
    #[error("Unknown parameter: {0}")]
    Unknown(String),

    /// Value kind does not match the declaration
    #[error("Parameter '{label}' expects {expected}, got {found}")]
    TypeMismatch {
        /// Parameter label
        label: String,
        /// Declared kind
        expected: ParamKind,
        /// Kind that was supplied
        found: ParamKind,
    },

    /// Integer outside the declared bounds
    #[error("Parameter '{label}' value {value} outside {min}..={max}")]
    OutOfRange {
        /// Parameter label
        label: String,
        /// Rejected value
        value: i64,
        /// Lower bound
        min: i64,
        /// Upper bound
        max: i64,
    },

    /// Choice index past the option list
    #[error("Parameter '{label}' has no option {index} ({count} options)")]
    InvalidChoice {
        /// Parameter label
        label: String,
        /// Rejected index
        index: usize,
        /// Number of options
        count: usize,
    },
}

/// Ordered parameter store of one node
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Parameters {
    params: IndexMap<String, Parameter>,
}

impl Parameters {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn declare(&mut self, parameter: Parameter) -> &mut Self {
        self.params.insert(parameter.label.clone(), parameter);
        self
    }

    /// Declare a text parameter
    pub fn text(&mut self, label: impl Into<String>, default: impl Into<String>) -> &mut Self {
        self.declare(Parameter {
            label: label.into(),
            value: ParamValue::Text(default.into()),
            range: None,
            options: Vec::new(),
        })
    }

    /// Declare an integer parameter with inclusive bounds.
    ///
    /// Bounds given in the wrong order are swapped.
    pub fn integer_range(
        &mut self,
        label: impl Into<String>,
        default: i64,
        min: i64,
        max: i64,
    ) -> &mut Self {
        let (min, max) = (min.min(max), min.max(max));
        self.declare(Parameter {
            label: label.into(),
            value: ParamValue::Integer(default.clamp(min, max)),
            range: Some((min, max)),
            options: Vec::new(),
        })
    }

    /// Declare a checkbox parameter
    pub fn boolean(&mut self, label: impl Into<String>, default: bool) -> &mut Self {
        self.declare(Parameter {
            label: label.into(),
            value: ParamValue::Bool(default),
            range: None,
            options: Vec::new(),
        })
    }

    /// Declare a choice parameter; `default` is an index into `options`
    pub fn choice<S: Into<String>>(
        &mut self,
        label: impl Into<String>,
        options: impl IntoIterator<Item = S>,
        default: usize,
    ) -> &mut Self {
        let options: Vec<String> = options.into_iter().map(Into::into).collect();
        let default = default.min(options.len().saturating_sub(1));
        self.declare(Parameter {
            label: label.into(),
            value: ParamValue::Choice(default),
            range: None,
            options,
        })
    }

    /// Declare a file path parameter
    pub fn file_path(&mut self, label: impl Into<String>, default: impl Into<String>) -> &mut Self {
        self.declare(Parameter {
            label: label.into(),
            value: ParamValue::FilePath(default.into()),
            range: None,
            options: Vec::new(),
        })
    }

    /// Get a parameter by label
    pub fn parameter(&self, label: &str) -> Option<&Parameter> {
        self.params.get(label)
    }

    /// Get a value by label
    pub fn get(&self, label: &str) -> Option<&ParamValue> {
        self.params.get(label).map(|p| &p.value)
    }

    /// Text of a text or file path parameter
    pub fn text_value(&self, label: &str) -> Option<&str> {
        match self.get(label)? {
            ParamValue::Text(s) | ParamValue::FilePath(s) => Some(s),
            _ => None,
        }
    }

    /// Value of an integer parameter
    pub fn integer_value(&self, label: &str) -> Option<i64> {
        match self.get(label)? {
            ParamValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Value of a checkbox parameter
    pub fn bool_value(&self, label: &str) -> Option<bool> {
        match self.get(label)? {
            ParamValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Selected option text of a choice parameter
    pub fn choice_value(&self, label: &str) -> Option<&str> {
        let parameter = self.params.get(label)?;
        match parameter.value {
            ParamValue::Choice(i) => parameter.options.get(i).map(String::as_str),
            _ => None,
        }
    }

    /// Set a value, checking kind and bounds
    pub fn set(&mut self, label: &str, value: ParamValue) -> Result<(), ParameterError> {
        let parameter = self
            .params
            .get_mut(label)
            .ok_or_else(|| ParameterError::Unknown(label.to_string()))?;

        if parameter.value.kind() != value.kind() {
            return Err(ParameterError::TypeMismatch {
                label: label.to_string(),
                expected: parameter.value.kind(),
                found: value.kind(),
            });
        }

        match (&value, parameter.range) {
            (ParamValue::Integer(v), Some((min, max))) if *v < min || *v > max => {
                return Err(ParameterError::OutOfRange {
                    label: label.to_string(),
                    value: *v,
                    min,
                    max,
                });
            }
            (ParamValue::Choice(index), _) if *index >= parameter.options.len() => {
                return Err(ParameterError::InvalidChoice {
                    label: label.to_string(),
                    index: *index,
                    count: parameter.options.len(),
                });
            }
            _ => {}
        }

        parameter.value = value;
        Ok(())
    }

    /// Iterate over declared parameters in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.params.values()
    }

    /// Snapshot of all values by label
    pub fn values(&self) -> IndexMap<String, ParamValue> {
        self.params
            .iter()
            .map(|(label, p)| (label.clone(), p.value.clone()))
            .collect()
    }

    /// Number of declared parameters
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Whether no parameters are declared
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Digest of the whole parameter state.
    ///
    /// Concatenates each value's own digest in declaration order and digests
    /// the result.
    pub fn hash(&self) -> String {
        let combined: String = self.params.values().map(|p| p.value.digest()).collect();
        digest_hex(&combined)
    }
}
