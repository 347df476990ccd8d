#![allow(clippy::len_zero, clippy::should_implement_trait, clippy::manual_map, clippy::from_over_into)]

#[macro_use] extern crate snafu;
#[macro_use] extern crate log;

#[macro_use]
pub mod error;
pub mod object;
pub mod primitive;
pub mod context;
pub mod enc;
pub mod parser;
pub mod xref;
pub mod copier;
pub mod page_tree;
pub mod fontkit;
pub mod embed;
pub mod util;
pub mod writer;
pub mod document;

pub use crate::document::Document;
pub use crate::error::PdfError;
