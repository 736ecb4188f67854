pub mod serve;
pub mod tables;
pub mod token;
