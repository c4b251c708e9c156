pub mod allocation_reporter;
pub mod table;
