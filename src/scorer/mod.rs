pub mod trending;

pub use trending::{score, select_trending};
