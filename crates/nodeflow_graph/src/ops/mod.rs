// SPDX-License-Identifier: MIT OR Apache-2.0
//! Built-in operations.

mod query;
mod table;
mod view;

pub use query::Select;
pub use table::{OpenTable, SaveTable};
pub use view::{Dot, Viewer};

use crate::operation::Operation;
use crate::registry::OperationRegistry;

/// Create a registry holding every built-in operation
pub fn create_default_registry() -> OperationRegistry {
    let factories: [fn() -> Box<dyn Operation>; 5] = [
        || Box::new(OpenTable),
        || Box::new(Select),
        || Box::new(SaveTable),
        || Box::new(Dot),
        || Box::new(Viewer),
    ];

    let mut registry = OperationRegistry::new();
    for factory in factories {
        if let Err(err) = registry.register(factory) {
            tracing::error!("Failed to register built-in operation: {}", err);
        }
    }
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeClass;

    #[test]
    fn test_default_registry() {
        let registry = create_default_registry();
        assert_eq!(registry.len(), 5);
        assert_eq!(
            registry.class_names(),
            ["Input", "Query", "Output", "Other", "Viewer"]
        );
        assert_eq!(registry.types_in_class(NodeClass::Sink).count(), 1);
        assert_eq!(registry.get("Dot").unwrap().descriptor.class(), NodeClass::PassThrough);
        assert_eq!(registry.get("Open Table").unwrap().descriptor.max_inputs, 0);
    }
}
