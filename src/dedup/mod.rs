pub mod semantic;
pub mod structural;

pub use semantic::SemanticDeduper;
pub use structural::collapse_groups;
