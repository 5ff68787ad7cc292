// SPDX-License-Identifier: MIT OR Apache-2.0
//! Registry of available operations.

use crate::node::NodeClass;
use crate::operation::{DescriptorError, Operation, OperationDescriptor};
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

/// Creates fresh operation instances
pub type OperationFactory = Arc<dyn Fn() -> Box<dyn Operation> + Send + Sync>;

/// A registered operation type
#[derive(Clone)]
pub struct OperationType {
    /// Parsed descriptor
    pub descriptor: OperationDescriptor,
    factory: OperationFactory,
}

impl OperationType {
    /// Create a new instance
    pub fn instantiate(&self) -> Box<dyn Operation> {
        (self.factory)()
    }

    /// Factory for this type
    pub fn factory(&self) -> OperationFactory {
        Arc::clone(&self.factory)
    }
}

impl fmt::Debug for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationType")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

/// Registry of operation types keyed by name
#[derive(Debug, Clone, Default)]
pub struct OperationRegistry {
    types: IndexMap<String, OperationType>,
}

impl OperationRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an operation type.
    ///
    /// The descriptor is parsed here; a malformed one refuses the
    /// registration. Registering a name twice replaces the earlier entry.
    pub fn register<F>(&mut self, factory: F) -> Result<&OperationDescriptor, DescriptorError>
    where
        F: Fn() -> Box<dyn Operation> + Send + Sync + 'static,
    {
        let descriptor = OperationDescriptor::parse(&factory().description())?;
        let name = descriptor.name.clone();
        tracing::debug!("Registered operation {}", descriptor);

        let entry = OperationType {
            descriptor,
            factory: Arc::new(factory),
        };
        self.types.insert(name.clone(), entry);
        Ok(&self.types[&name].descriptor)
    }

    /// Get an operation type by name
    pub fn get(&self, name: &str) -> Option<&OperationType> {
        self.types.get(name)
    }

    /// Whether a name is registered
    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Create an operation instance by name
    pub fn create(&self, name: &str) -> Option<Box<dyn Operation>> {
        self.get(name).map(OperationType::instantiate)
    }

    /// Get all registered types
    pub fn types(&self) -> impl Iterator<Item = &OperationType> {
        self.types.values()
    }

    /// Get types by node class
    pub fn types_in_class(&self, class: NodeClass) -> impl Iterator<Item = &OperationType> {
        self.types.values().filter(move |t| t.descriptor.class() == class)
    }

    /// Class tokens in first-registration order, for building menus
    pub fn class_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for t in self.types.values() {
            let name = t.descriptor.class_name.as_str();
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }

    /// Types registered under a class token
    pub fn types_in_menu<'a>(&'a self, class_name: &'a str) -> impl Iterator<Item = &'a OperationType> {
        self.types
            .values()
            .filter(move |t| t.descriptor.class_name == class_name)
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::CommandContext;
    use crate::parameter::Parameters;

    #[derive(Debug)]
    struct Fixed(&'static str);

    impl Operation for Fixed {
        fn description(&self) -> String {
            self.0.to_string()
        }

        fn declare_parameters(&self, _params: &mut Parameters) {}

        fn build_command(&self, _ctx: &CommandContext<'_>) -> String {
            String::new()
        }
    }

    #[test]
    fn test_register_and_create() {
        let mut registry = OperationRegistry::new();
        registry
            .register(|| Box::new(Fixed("Input/Open Table;Open data table./0")))
            .unwrap();
        registry
            .register(|| Box::new(Fixed("Query/Select;Simple select./1")))
            .unwrap();
        registry
            .register(|| Box::new(Fixed("Input/New Table;Create table./0")))
            .unwrap();

        assert_eq!(registry.len(), 3);
        assert!(registry.contains("Select"));
        assert!(registry.create("Open Table").is_some());
        assert!(registry.create("Buffer").is_none());
        assert_eq!(registry.class_names(), ["Input", "Query"]);
        assert_eq!(registry.types_in_menu("Input").count(), 2);
        assert_eq!(registry.types_in_class(NodeClass::Source).count(), 2);
    }

    #[test]
    fn test_malformed_descriptor_refused_at_registration() {
        let mut registry = OperationRegistry::new();
        let result = registry.register(|| Box::new(Fixed("Broken descriptor")));
        assert!(result.is_err());
        assert!(registry.is_empty());
    }
}
