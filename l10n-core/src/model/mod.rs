pub mod mapping;
pub mod report;
pub mod unit;
pub mod validation;
