pub mod check;
pub mod item_ops;
pub mod rank;
pub mod relocate;
pub mod tree;
