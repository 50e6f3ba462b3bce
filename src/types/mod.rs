pub mod conversions;
pub mod token;

pub use conversions::ConversionError;
pub use token::{Token, TokenRegistry, TokenValue};
