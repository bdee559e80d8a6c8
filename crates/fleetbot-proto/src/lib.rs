pub mod conversion;
pub mod protocol;


pub use conversion::ConversionError;
pub use protocol::*;
