pub mod persian;
pub mod test_utils;

pub use persian::{to_english_digits, to_persian_digits};
