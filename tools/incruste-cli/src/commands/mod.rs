pub mod check;
pub mod info;
pub mod plan;
pub mod preview;
