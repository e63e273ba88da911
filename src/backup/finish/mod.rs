use liblzma::write::XzEncoder;
use std::io::{Error, Write};

/// Writers that need an explicit final flush, handing back the inner writer.
pub trait Finish<O> {
    fn finish(self) -> Result<O, Error>;
}

impl<W: Write> Finish<W> for XzEncoder<W> {
    fn finish(self) -> Result<W, Error> {
        self.finish()
    }
}
