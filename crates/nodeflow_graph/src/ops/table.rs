// SPDX-License-Identifier: MIT OR Apache-2.0
//! Table input and output.

use crate::operation::{CommandContext, Operation};
use crate::parameter::Parameters;
use std::path::Path;

/// Opens a table file and copies it under the node's dataset name
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenTable;

impl Operation for OpenTable {
    fn description(&self) -> String {
        "Input/Open Table;Open data table./0".to_string()
    }

    fn declare_parameters(&self, params: &mut Parameters) {
        params.file_path("File", "");
    }

    fn build_command(&self, ctx: &CommandContext<'_>) -> String {
        let file = ctx.parameters().text_value("File").unwrap_or_default();
        if file.is_empty() {
            return String::new();
        }
        format!(
            "Open Table \"{file}\" Select * From {} Into {}",
            table_alias(file),
            ctx.output_ref()
        )
    }
}

/// Table name the engine opens a file under: the file name up to its first `.`
fn table_alias(file: &str) -> &str {
    let name = Path::new(file)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(file);
    name.split('.').next().unwrap_or(name)
}

/// Commits the upstream table to a file
#[derive(Debug, Clone, Copy, Default)]
pub struct SaveTable;

impl Operation for SaveTable {
    fn description(&self) -> String {
        "Output/Save Table;Save table to file./1".to_string()
    }

    fn declare_parameters(&self, params: &mut Parameters) {
        params.file_path("File", "");
    }

    fn build_command(&self, ctx: &CommandContext<'_>) -> String {
        let file = ctx.parameters().text_value("File").unwrap_or_default();
        match ctx.input_ref(0) {
            Some(input) if !file.is_empty() => format!("Commit Table {input} As \"{file}\""),
            _ => String::new(),
        }
    }
}
