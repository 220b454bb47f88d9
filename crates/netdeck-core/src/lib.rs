//! netdeck core
//!
//! Shared data model for stacks, service definitions and deployed service
//! instances, plus the template renderer and the stack bundle parser.

pub mod error;
pub mod model;
pub mod parser;
pub mod scaffold;
pub mod template;

pub use error::{CoreError, Result};
pub use model::*;
pub use parser::{parse_stack_file, parse_stack_json, parse_stack_kdl};
pub use scaffold::{ScaffoldPaths, scaffold_service_templates, template_base_name};
pub use template::{TemplateRenderer, TeraRenderer};
