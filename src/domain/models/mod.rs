mod api;
mod event;
mod identity;
mod page;
mod profile;
mod query;
mod resource;

pub use api::*;
pub use event::*;
pub use identity::*;
pub use page::*;
pub use profile::*;
pub use query::*;
pub use resource::*;
