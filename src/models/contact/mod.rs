pub mod queries;
pub mod types;

pub use types::Contact;
