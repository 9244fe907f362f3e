pub mod text;
pub mod weekend;
