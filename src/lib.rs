pub mod cache;
pub mod region;
pub mod sample;
pub mod tree;
pub mod window;

pub use flamecache_labels as labels;
