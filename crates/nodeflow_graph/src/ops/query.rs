// SPDX-License-Identifier: MIT OR Apache-2.0
//! Query operations.

use crate::operation::{CommandContext, Operation};
use crate::parameter::Parameters;

/// Selects rows of the upstream table, optionally filtered
#[derive(Debug, Clone, Copy, Default)]
pub struct Select;

impl Operation for Select {
    fn description(&self) -> String {
        "Query/Select;Simple select./1".to_string()
    }

    fn declare_parameters(&self, params: &mut Parameters) {
        params.text("Where", "");
    }

    fn build_command(&self, ctx: &CommandContext<'_>) -> String {
        let Some(input) = ctx.input_ref(0) else {
            return String::new();
        };
        let condition = ctx
            .parameters()
            .text_value("Where")
            .map(str::trim)
            .unwrap_or_default();

        let mut command = format!("Select * From {input}");
        if !condition.is_empty() {
            command.push_str(" Where ");
            command.push_str(condition);
        }
        command.push_str(" Into ");
        command.push_str(&ctx.output_ref());
        command
    }
}
