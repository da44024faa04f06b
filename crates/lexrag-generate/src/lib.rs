//! Hosted chat-completion backends.

mod groq;

pub use groq::GroqClient;
