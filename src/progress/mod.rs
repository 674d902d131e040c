mod aggregate;
pub use aggregate::{derive_course_percentage, snapshot_percentage};

mod store;
pub use store::ProgressStore;
