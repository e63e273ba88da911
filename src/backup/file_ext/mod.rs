use std::sync::Arc;

/// File extension, without the leading dot, of the files a config produces.
pub trait FileExtProvider {
    fn file_ext(&self) -> Option<Arc<str>>;
}
