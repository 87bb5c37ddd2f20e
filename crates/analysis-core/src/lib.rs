pub mod currency;
pub mod error;
pub mod growth;
pub mod numeric;
pub mod traits;
pub mod types;

pub use currency::*;
pub use error::*;
pub use growth::*;
pub use traits::*;
pub use types::*;
