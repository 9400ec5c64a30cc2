pub mod env;
pub mod types;
pub mod validator;

pub use env::*;
pub use types::*;
pub use validator::*;
