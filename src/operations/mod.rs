pub mod creation;
pub mod drainage;
pub mod query;
