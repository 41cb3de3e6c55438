pub mod answers;
pub mod catalog;
pub mod feed;
pub mod seed;
pub mod sessions;
