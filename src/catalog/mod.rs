pub mod categories;
pub mod error;
pub mod extractor;
pub mod field_parser;
pub mod locator;
pub mod model;
pub mod urls;
