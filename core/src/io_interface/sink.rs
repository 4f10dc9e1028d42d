use ndarray::{Array2, ArrayView2};
use rand::RngCore;

use crate::io_interface::header::FilterbankHeader;
use crate::measurement::noise::{digitise, gaussian_background, NoiseLevel};
use crate::prelude::{SimError, SimResult};

/// Destination for digitised dynamic-spectrum blocks, in time order.
pub trait BlockSink {
    fn write_header(&mut self, header: &FilterbankHeader) -> SimResult<()>;

    /// Appends a `(nsamp, nchan)` block.
    fn write_block(&mut self, block: ArrayView2<u8>) -> SimResult<()>;

    fn close(&mut self) -> SimResult<()>;

    /// Number of channels the sink was opened with, if a header has been written.
    fn nchans(&self) -> Option<usize>;

    /// Appends `nsamp` samples of pure background noise.
    fn write_noise(
        &mut self,
        nsamp: usize,
        noise: NoiseLevel,
        rng: &mut dyn RngCore,
    ) -> SimResult<()> {
        let nchans = self.nchans().ok_or_else(|| {
            SimError::InvalidParameter("noise written before the header".into())
        })?;
        let background = gaussian_background((nsamp, nchans), noise, rng)?;
        self.write_block(digitise(background.view()).view())
    }
}

/// Checks that `block` matches the channel count the sink was opened with.
pub fn check_block(block: &ArrayView2<u8>, nchans: Option<usize>) -> SimResult<()> {
    match nchans {
        Some(expected) if block.ncols() == expected => Ok(()),
        Some(expected) => Err(SimError::ShapeMismatch {
            expected: format!("{} channels", expected),
            found: format!("{} channels", block.ncols()),
        }),
        None => Err(SimError::InvalidParameter(
            "block written before the header".into(),
        )),
    }
}

/// Sink that keeps every block in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub header: Option<FilterbankHeader>,
    pub blocks: Vec<Array2<u8>>,
    pub closed: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_samples(&self) -> usize {
        self.blocks.iter().map(|b| b.nrows()).sum()
    }
}

impl BlockSink for MemorySink {
    fn write_header(&mut self, header: &FilterbankHeader) -> SimResult<()> {
        self.header = Some(header.clone());
        Ok(())
    }

    fn write_block(&mut self, block: ArrayView2<u8>) -> SimResult<()> {
        check_block(&block, self.nchans())?;
        self.blocks.push(block.to_owned());
        Ok(())
    }

    fn close(&mut self) -> SimResult<()> {
        self.closed = true;
        Ok(())
    }

    fn nchans(&self) -> Option<usize> {
        self.header.as_ref().map(|h| h.nchans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn noise_blocks_follow_the_header() {
        let mut sink = MemorySink::new();
        let mut rng = StdRng::seed_from_u64(2);
        assert!(sink.write_noise(10, NoiseLevel::default(), &mut rng).is_err());

        sink.write_header(&FilterbankHeader::new(1100.0, 1.0, 4, 1.0, 8))
            .unwrap();
        sink.write_noise(10, NoiseLevel::default(), &mut rng).unwrap();
        sink.write_noise(5, NoiseLevel::default(), &mut rng).unwrap();
        sink.close().unwrap();

        assert_eq!(sink.total_samples(), 15);
        assert_eq!(sink.blocks[0].dim(), (10, 4));
        assert!(sink.closed);
    }

    #[test]
    fn wrong_channel_count_is_a_shape_mismatch() {
        let mut sink = MemorySink::new();
        sink.write_header(&FilterbankHeader::new(1100.0, 1.0, 4, 1.0, 8))
            .unwrap();
        let block = Array2::<u8>::zeros((3, 5));
        assert!(matches!(
            sink.write_block(block.view()),
            Err(SimError::ShapeMismatch { .. })
        ));
    }
}
