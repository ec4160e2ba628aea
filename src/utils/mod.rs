pub mod similarity;
pub mod formatting;
pub mod truncation;

pub use similarity::{is_similar, similarity_ratio};
pub use formatting::{format_cost, format_duration};
pub use truncation::{truncate_error, truncate_output};
