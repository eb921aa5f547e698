//! Output generation for archived articles.
//!
//! # Submodules
//!
//! - [`document`]: Renders saved articles as Markdown documents with a
//!   frontmatter header, names them, and writes the local mirror copy
//!
//! # Output Structure
//!
//! ```text
//! out/
//! ├── 2025-05-06_1f2e3d4c5b6a7988_City Council approves budget.md
//! ├── 2025-05-07_aa11bb22cc33dd44_New Orleans levee inspection.md
//! └── ...
//! ```
//!
//! The same documents are mirrored into the remote folder under the
//! same names, alongside the `articles.json` ledger.

pub mod document;
