pub mod list;
pub mod push;
