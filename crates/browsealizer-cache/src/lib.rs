// In-memory result cache
// Everything we've seen this session, so recommendations can replay it later

pub mod cache;

pub use cache::{Cacheable, ResultCache};
