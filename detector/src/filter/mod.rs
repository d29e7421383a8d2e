pub mod diff;
pub mod scanner;
pub mod traits;
