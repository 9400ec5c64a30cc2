//! SQL for the JSONB document tables: validated table names, everything else bound as parameters.

mod builder;
pub mod params;
pub use builder::*;
pub use params::*;
