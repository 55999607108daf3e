pub mod complete;
pub mod generate;
pub mod providers;
