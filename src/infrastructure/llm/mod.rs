//! Reply generation providers

mod openai;

pub use openai::{OpenAiReplyGenerator, OpenAiSettings};
