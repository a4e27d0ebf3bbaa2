pub mod content_stream;
pub mod font;
pub mod reader;
pub mod region;
pub mod text_layout;
pub mod writer;
