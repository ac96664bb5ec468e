mod credentials;
pub mod field_errors;
mod list_query;
mod profile;
mod session;
pub mod token;

pub use credentials::*;
pub use list_query::*;
pub use profile::*;
pub use session::*;
