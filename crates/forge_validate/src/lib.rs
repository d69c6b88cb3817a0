//! # forge_validate
//!
//! Validates generated source files and aggregates the results into a
//! project-wide [`ValidationReport`] with per-file fix suggestions.
//!
//! Python and JavaScript files are checked through the host's own toolchain
//! (`python3`, `node --check`) when available; a missing interpreter degrades
//! silently to success so validation works on minimal hosts. HTML and CSS get
//! lightweight structural checks. Validation of an individual file never
//! aborts the project run: a broken file contributes error messages, nothing
//! more.

pub mod fix;
pub mod report;
pub mod syntax;

pub use fix::fix_code;
pub use report::{validate_project, ValidationReport};
pub use syntax::validate_file;
