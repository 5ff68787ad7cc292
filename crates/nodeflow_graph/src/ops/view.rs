// SPDX-License-Identifier: MIT OR Apache-2.0
//! Viewers and routing.

use crate::operation::{CommandContext, Operation};
use crate::parameter::Parameters;

/// Shows the upstream table in a browser or map window
#[derive(Debug, Clone, Copy, Default)]
pub struct Viewer;

impl Operation for Viewer {
    fn description(&self) -> String {
        "Viewer/Viewer;Browse viewed table./1".to_string()
    }

    fn declare_parameters(&self, params: &mut Parameters) {
        params.choice("Mode", ["Browse", "Map"], 0);
    }

    fn build_command(&self, ctx: &CommandContext<'_>) -> String {
        let Some(input) = ctx.input_ref(0) else {
            return String::new();
        };
        match ctx.parameters().choice_value("Mode") {
            Some("Map") => format!("Map From {input}"),
            _ => format!("Browse * From {input}"),
        }
    }
}

/// Routing dot; bends an edge without doing any work
#[derive(Debug, Clone, Copy, Default)]
pub struct Dot;

impl Operation for Dot {
    fn description(&self) -> String {
        "Other/Dot;Pass-through dot./1".to_string()
    }

    fn declare_parameters(&self, _params: &mut Parameters) {}

    fn build_command(&self, _ctx: &CommandContext<'_>) -> String {
        String::new()
    }
}
