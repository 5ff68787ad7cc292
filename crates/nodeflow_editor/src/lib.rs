// SPDX-License-Identifier: MIT OR Apache-2.0
//! `NodeFlow` editor.
//!
//! Headless editing sessions over a `nodeflow_graph` graph: settings,
//! undo/redo history and dispatch of evaluated commands.

pub mod config;
pub mod history;
pub mod session;

pub use config::{ConfigError, DispatchTarget, EditorSettings};
pub use history::{History, HistoryError};
pub use session::{starter_document, EditorSession, SessionError};
