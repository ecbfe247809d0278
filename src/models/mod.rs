pub mod comparison;
pub mod period;
pub mod record;

pub use comparison::*;
pub use period::*;
pub use record::*;
