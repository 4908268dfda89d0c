pub mod lister;
pub mod loader;
pub mod path;
pub mod selection;
pub mod tree;
