pub mod migrations;
pub mod period;

pub use migrations::MigrationQuery;
pub use period::Period;
