pub mod alias;
pub mod resolver;
pub mod scanner;
pub mod similarity;
mod workspace;

pub use alias::{AliasEntry, AliasTracker, AliasUpdate, parse_alias_declaration};
pub use resolver::{ResolveContext, resolve};
pub use scanner::{DELIMITERS, LOCALIZER_MARKER, ScanOptions, scan_line};
pub use similarity::order_by_path_similarity;
pub use workspace::Workspace;
