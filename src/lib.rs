pub mod feedback;
pub mod form;
pub mod post;
pub mod prelude;

pub use form::{FormSession, Schema};
pub use post::{ImageSource, PostSession, PostValues};
