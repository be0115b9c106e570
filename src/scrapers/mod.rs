pub mod base;
pub mod cache;
pub mod yahoo;
