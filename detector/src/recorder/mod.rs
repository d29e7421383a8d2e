pub mod counter;
pub mod keys;
pub mod pipeline;
pub mod scale;
