mod code;

pub use code::{Code, ParseError};
