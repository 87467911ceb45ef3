pub mod employee;
pub mod policy;
pub mod transcript;
