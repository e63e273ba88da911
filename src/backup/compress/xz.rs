use crate::backup::compress::{Compressor, CompressorBuilder};
use crate::backup::result_error::result::Result;
use bon::Builder;
use liblzma::stream::{Check, MtStreamBuilder};
use liblzma::write::XzEncoder;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use std::io::Write;
use std::num::NonZero;
use validator::Validate;

const DEFAULT_COMPRESSION_LEVEL: u32 = 3;
const DEFAULT_MAX_PARALLELIZATION: usize = 32;

/// XZ (LZMA) settings for compressed backups.
///
/// Several paths may be compressed at the same time, so the automatic thread count
/// divides the available cores by the number of concurrent backup jobs.
#[skip_serializing_none]
#[derive(Clone, Default, Validate, Serialize, Deserialize, Debug, Builder, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct XzConfig {
    /// Preset 0 (fast) to 9 (small), 3 when unset.
    #[validate(range(min = 0, max = 9))]
    pub level: Option<u32>,
    /// Encoder threads per archive, derived from the core count when unset.
    #[validate(range(min = 1))]
    pub thread: Option<u32>,
}

impl XzConfig {
    fn thread_count(&self) -> u32 {
        self.thread.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(NonZero::get)
                .map(|core| core / rayon::current_num_threads().max(1))
                .map(|t| t.clamp(1, DEFAULT_MAX_PARALLELIZATION) as u32)
                .unwrap_or(1)
        })
    }
}

impl<W: Write> CompressorBuilder<W> for XzConfig {
    fn build_compressor(&self, writer: W) -> Result<Compressor<W>> {
        let level = self.level.unwrap_or(DEFAULT_COMPRESSION_LEVEL);
        let thread = self.thread_count();

        tracing::debug!("Creating XZ compressor with level={level}, threads={thread}");

        if thread == 1 {
            Ok(XzEncoder::new(writer, level).into())
        } else {
            let stream = MtStreamBuilder::new()
                .preset(level)
                .check(Check::Crc64)
                .threads(thread)
                .encoder()?;
            Ok(XzEncoder::new_stream(writer, stream).into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::finish::Finish;
    use liblzma::read::XzDecoder;
    use std::io::{Cursor, Read};

    fn round_trip(config: &XzConfig, data: &[u8]) -> Vec<u8> {
        let mut compressor = config.build_compressor(Cursor::new(Vec::new())).unwrap();
        compressor.write_all(data).unwrap();
        let compressed = compressor.finish().unwrap().into_inner();

        let mut out = Vec::new();
        XzDecoder::new(compressed.as_slice())
            .read_to_end(&mut out)
            .unwrap();
        out
    }

    #[test]
    fn test_xz_config_validation() {
        assert!(XzConfig::default().validate().is_ok());
        assert!(XzConfig::builder().level(9).thread(8).build().validate().is_ok());
        assert!(XzConfig::builder().level(10).build().validate().is_err());
        assert!(XzConfig::builder().thread(0).build().validate().is_err());
    }

    #[test]
    fn test_single_and_multi_thread_decode() {
        let data = b"backup ".repeat(1000);
        for thread in [1, 4] {
            let config = XzConfig::builder().level(1).thread(thread).build();
            assert_eq!(round_trip(&config, &data), data);
        }
    }

    #[test]
    fn test_auto_thread_count_is_positive() {
        assert!(XzConfig::default().thread_count() >= 1);
        assert_eq!(XzConfig::builder().thread(3).build().thread_count(), 3);
    }

    #[test]
    fn test_xz_config_yaml() {
        let config: XzConfig = serde_yml::from_str("level: 6\n").unwrap();
        assert_eq!(config.level, Some(6));
        assert_eq!(config.thread, None);
        assert!(serde_yml::from_str::<XzConfig>("levle: 6\n").is_err());
    }
}
