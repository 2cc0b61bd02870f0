pub mod error;
pub mod field_set;
pub mod manager;
pub mod models;
pub mod resource;
pub mod statements;
pub mod store;

pub use error::ResourceError;
pub use field_set::{FieldSet, FieldValue};
pub use manager::{DatabaseError, DatabaseManager};
pub use resource::{Resource, ResourceSchema, Transition};
pub use statements::{FieldCriterion, Page, SearchMode};
pub use store::{Listing, PendingMutation, ResourceStore, UpdateOutcome};
