pub mod base;
pub mod ytdlp;

pub use base::MetadataSource;
