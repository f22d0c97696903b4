//! `atlas-editor` - editor session and file model for the Atlas coding workbench.
//!
//! The crate keeps the in-memory mapping of open files to buffers, projects
//! it into a folder tree and a tab strip, binds the active buffer to a single
//! editor surface and wires AI completion and rectification around it. The
//! remote file store is only reached through [`remote::RemoteFiles`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

/// Buffers and the path-keyed buffer registry.
pub mod buffer;
/// AI completion requests and per-language provider registrations.
pub mod completion;
/// Editor errors.
pub mod error;
/// File extension to language id mapping.
pub mod language;
/// Transient popup layer (rectify box, settings menu, file visualizer).
pub mod popup;
/// Inline AI rectification popup state.
pub mod rectify;
/// Remote file store interface and wire types.
pub mod remote;
/// Background save worker.
pub mod save;
/// Editor session bound to the shared surface.
pub mod session;
/// Sidebar command dispatch.
pub mod sidebar;
/// Editor surface abstraction and an in-memory implementation.
pub mod surface;
/// Tab strip projection.
pub mod tabs;
/// Line/column positions and text helpers.
pub mod text;
/// Folder tree projection.
pub mod tree;
/// Workbench tying registry, projections and session together.
pub mod workbench;

#[cfg(test)]
mod test_support;

pub use buffer::{Buffer, BufferId, BufferRegistry, RegistryEvent, RemoteState};
pub use error::{EditorError, RemoteError, RemoteErrorKind, RemoteOp};
pub use remote::RemoteFiles;
pub use session::EditorSession;
pub use sidebar::{NodeRegion, SidebarAction};
pub use surface::{EditorSurface, TextSurface};
pub use text::{Position, TextRange};
pub use workbench::{Workbench, WorkbenchOptions};
