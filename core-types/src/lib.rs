pub mod filesize;

pub use filesize::{format_size, parse_size, SizeFormatError};
