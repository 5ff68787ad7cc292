// SPDX-License-Identifier: MIT OR Apache-2.0
//! Operation capability boundary.
//!
//! An [`Operation`] is the unit of work a node wraps. The graph never looks
//! inside it: it reads the descriptor once, lets the operation declare its
//! parameters, and asks it for one command per evaluation.

use crate::hash::dataset_ref;
use crate::node::{NodeClass, NodeId};
use crate::parameter::Parameters;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unit of work wrapped by a node
pub trait Operation: fmt::Debug + Send + Sync {
    /// Descriptor in the form `<Class>/<Name>;<Description>/<MaxInputs>`
    fn description(&self) -> String;

    /// Register editable parameters
    fn declare_parameters(&self, params: &mut Parameters);

    /// Build one textual command for the execution engine.
    ///
    /// Returns an empty string when there is nothing to do, for example when
    /// a required input is missing.
    fn build_command(&self, ctx: &CommandContext<'_>) -> String;
}

/// Parsed operation descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationDescriptor {
    /// Class token, e.g. `Input`
    pub class_name: String,
    /// Operation name, e.g. `Open Table`
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// Number of input slots
    pub max_inputs: usize,
}

/// Error when parsing an operation descriptor
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DescriptorError {
    /// Separator missing from the descriptor
    #[error("Invalid operation descriptor '{descriptor}': missing '{separator}'")]
    MissingSeparator {
        /// Descriptor text
        descriptor: String,
        /// Separator that was expected
        separator: char,
    },

    /// Required field is empty
    #[error("Invalid operation descriptor '{descriptor}': empty {field}")]
    EmptyField {
        /// Descriptor text
        descriptor: String,
        /// Field name
        field: &'static str,
    },

    /// Input count is not a non-negative integer
    #[error("Invalid operation descriptor '{descriptor}': bad input count '{value}'")]
    InvalidInputCount {
        /// Descriptor text
        descriptor: String,
        /// Token that failed to parse
        value: String,
    },
}

impl OperationDescriptor {
    /// Parse `<Class>/<Name>;<Description>/<MaxInputs>`.
    ///
    /// The first `;` segment yields the class (first `/` token) and name
    /// (last `/` token); the last `;` segment yields the description (first
    /// `/` token) and input count (last `/` token).
    pub fn parse(descriptor: &str) -> Result<Self, DescriptorError> {
        let missing = |separator| DescriptorError::MissingSeparator {
            descriptor: descriptor.to_string(),
            separator,
        };
        let empty = |field| DescriptorError::EmptyField {
            descriptor: descriptor.to_string(),
            field,
        };

        if !descriptor.contains(';') {
            return Err(missing(';'));
        }
        let head = descriptor.split(';').next().unwrap_or_default();
        let tail = descriptor.split(';').next_back().unwrap_or_default();
        if !head.contains('/') || !tail.contains('/') {
            return Err(missing('/'));
        }

        let class_name = head.split('/').next().unwrap_or_default().trim();
        let name = head.split('/').next_back().unwrap_or_default().trim();
        let description = tail.split('/').next().unwrap_or_default().trim();
        let count = tail.split('/').next_back().unwrap_or_default().trim();

        if class_name.is_empty() {
            return Err(empty("class"));
        }
        if name.is_empty() {
            return Err(empty("name"));
        }

        let max_inputs = count
            .parse::<usize>()
            .map_err(|_| DescriptorError::InvalidInputCount {
                descriptor: descriptor.to_string(),
                value: count.to_string(),
            })?;

        Ok(Self {
            class_name: class_name.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            max_inputs,
        })
    }

    /// Node class derived from the class token
    pub fn class(&self) -> NodeClass {
        NodeClass::from_class_name(&self.class_name)
    }
}

impl FromStr for OperationDescriptor {
    type Err = DescriptorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for OperationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{};{}/{}",
            self.class_name, self.name, self.description, self.max_inputs
        )
    }
}

/// What an operation sees when it builds its command
#[derive(Debug, Clone, Copy)]
pub struct CommandContext<'a> {
    /// Node the command is built for
    pub node: NodeId,
    /// Display name of that node
    pub name: &'a str,
    hash: &'a str,
    parameters: &'a Parameters,
    inputs: &'a [Option<String>],
}

impl<'a> CommandContext<'a> {
    /// Create a context
    pub fn new(
        node: NodeId,
        name: &'a str,
        hash: &'a str,
        parameters: &'a Parameters,
        inputs: &'a [Option<String>],
    ) -> Self {
        Self {
            node,
            name,
            hash,
            parameters,
            inputs,
        }
    }

    /// Content hash of the node
    pub fn hash(&self) -> &'a str {
        self.hash
    }

    /// Dataset identifier this node's result should be stored under
    pub fn output_ref(&self) -> String {
        dataset_ref(self.hash)
    }

    /// Parameter state of the node
    pub fn parameters(&self) -> &'a Parameters {
        self.parameters
    }

    /// Number of input slots
    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    /// Hash of the upstream result feeding `slot`, or `None` for no input
    pub fn input(&self, slot: usize) -> Option<&'a str> {
        self.inputs.get(slot)?.as_deref()
    }

    /// Dataset identifier of the upstream result feeding `slot`
    pub fn input_ref(&self, slot: usize) -> Option<String> {
        self.input(slot).map(dataset_ref)
    }

    /// Whether any slot is fed
    pub fn has_inputs(&self) -> bool {
        self.inputs.iter().any(Option::is_some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_descriptor() {
        let d = OperationDescriptor::parse("Input/Open Table;Open data table./0").unwrap();
        assert_eq!(d.class_name, "Input");
        assert_eq!(d.name, "Open Table");
        assert_eq!(d.description, "Open data table.");
        assert_eq!(d.max_inputs, 0);
        assert_eq!(d.class(), NodeClass::Source);
        assert_eq!(d.to_string(), "Input/Open Table;Open data table./0");
    }

    #[test]
    fn test_parse_takes_outer_tokens() {
        let d: OperationDescriptor = "Query/Sub/Select;Simple select./extra/2".parse().unwrap();
        assert_eq!(d.class_name, "Query");
        assert_eq!(d.name, "Select");
        assert_eq!(d.description, "Simple select.");
        assert_eq!(d.max_inputs, 2);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(matches!(
            OperationDescriptor::parse("Input/Open Table"),
            Err(DescriptorError::MissingSeparator { separator: ';', .. })
        ));
        assert!(matches!(
            OperationDescriptor::parse("Open Table;Open data table./0"),
            Err(DescriptorError::MissingSeparator { separator: '/', .. })
        ));
        assert!(matches!(
            OperationDescriptor::parse("Input/Open Table;Open data table."),
            Err(DescriptorError::MissingSeparator { separator: '/', .. })
        ));
        assert!(matches!(
            OperationDescriptor::parse("Input/Open Table;Open data table./many"),
            Err(DescriptorError::InvalidInputCount { .. })
        ));
        assert!(matches!(
            OperationDescriptor::parse("/Open Table;x/1"),
            Err(DescriptorError::EmptyField { field: "class", .. })
        ));
        assert!(matches!(
            OperationDescriptor::parse("Input/;x/1"),
            Err(DescriptorError::EmptyField { field: "name", .. })
        ));
    }

    #[test]
    fn test_command_context_inputs() {
        let params = Parameters::new();
        let inputs = vec![Some("abc".to_string()), None];
        let ctx = CommandContext::new(NodeId::new(), "Select", "123", &params, &inputs);
        assert_eq!(ctx.output_ref(), "_123");
        assert_eq!(ctx.input_ref(0).as_deref(), Some("_abc"));
        assert_eq!(ctx.input(1), None);
        assert_eq!(ctx.input(5), None);
        assert!(ctx.has_inputs());
        assert_eq!(ctx.input_count(), 2);
    }
}
