pub mod aggregate_pullup;
pub mod constant_fold;
pub mod convention_conversion;
pub mod join_reorder;
pub mod push_filter;
pub mod push_project;
