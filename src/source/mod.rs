pub mod multi;
pub mod single;
pub mod timestamp;

pub use multi::{MultiFileError, MultiFileReader};
pub use single::{SingleFileError, SingleFileReader};
