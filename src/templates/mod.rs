pub mod email;

pub use email::{compose, test_message, Email, InlineImage};
