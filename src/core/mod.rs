pub mod error;
pub mod mode;
pub mod record;
pub mod value;

pub use error::{DbError, Result};
pub use mode::Mode;
pub use record::Record;
pub use value::Value;
