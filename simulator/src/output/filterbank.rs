use byteorder::{LittleEndian, WriteBytesExt};
use ndarray::ArrayView2;
use pulsecore::io_interface::{check_block, BlockSink, FilterbankHeader};
use pulsecore::prelude::{SimError, SimResult};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Sigproc `data_type` for filterbank data.
const DATA_TYPE_FILTERBANK: i32 = 1;

/// Streams 8-bit blocks to a sigproc filterbank file.
pub struct FilterbankWriter {
    path: PathBuf,
    file: Option<BufWriter<File>>,
    nchans: Option<usize>,
    samples_written: usize,
}

impl FilterbankWriter {
    /// Creates `path`, truncating any existing file. Nothing is written until the header.
    pub fn create<P: AsRef<Path>>(path: P) -> SimResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = BufWriter::new(File::create(&path)?);
        Ok(Self {
            path,
            file: Some(file),
            nchans: None,
            samples_written: 0,
        })
    }

    /// Creates the file and writes `header` in one go.
    pub fn open<P: AsRef<Path>>(path: P, header: &FilterbankHeader) -> SimResult<Self> {
        let mut writer = Self::create(path)?;
        writer.write_header(header)?;
        Ok(writer)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn samples_written(&self) -> usize {
        self.samples_written
    }

    fn file(&mut self) -> SimResult<&mut BufWriter<File>> {
        self.file.as_mut().ok_or_else(|| {
            SimError::InvalidParameter(format!("{} is already closed", self.path.display()))
        })
    }
}

fn write_keyword<W: Write>(out: &mut W, keyword: &str) -> std::io::Result<()> {
    out.write_i32::<LittleEndian>(keyword.len() as i32)?;
    out.write_all(keyword.as_bytes())
}

fn write_int<W: Write>(out: &mut W, keyword: &str, value: i32) -> std::io::Result<()> {
    write_keyword(out, keyword)?;
    out.write_i32::<LittleEndian>(value)
}

fn write_double<W: Write>(out: &mut W, keyword: &str, value: f64) -> std::io::Result<()> {
    write_keyword(out, keyword)?;
    out.write_f64::<LittleEndian>(value)
}

fn header_count(keyword: &str, value: usize) -> SimResult<i32> {
    i32::try_from(value).map_err(|_| {
        SimError::InvalidParameter(format!("{}={} does not fit a sigproc header", keyword, value))
    })
}

/// Serialises `header` as a sigproc keyword block.
pub fn encode_header<W: Write>(out: &mut W, header: &FilterbankHeader) -> SimResult<()> {
    let nchans = header_count("nchans", header.nchans)?;
    let nbits = header_count("nbits", header.nbits as usize)?;
    let nsamples = header
        .nsamples
        .map(|n| header_count("nsamples", n))
        .transpose()?;

    write_keyword(out, "HEADER_START")?;
    write_int(out, "telescope_id", header.telescope_id)?;
    write_int(out, "data_type", DATA_TYPE_FILTERBANK)?;
    write_double(out, "fch1", header.fch1)?;
    write_double(out, "foff", header.foff)?;
    write_int(out, "nchans", nchans)?;
    write_int(out, "nifs", 1)?;
    write_double(out, "tsamp", header.tsamp)?;
    write_int(out, "nbits", nbits)?;
    if let Some(nsamples) = nsamples {
        write_int(out, "nsamples", nsamples)?;
    }
    write_keyword(out, "HEADER_END")?;
    Ok(())
}

impl BlockSink for FilterbankWriter {
    fn write_header(&mut self, header: &FilterbankHeader) -> SimResult<()> {
        if self.nchans.is_some() {
            return Err(SimError::InvalidParameter(format!(
                "header already written to {}",
                self.path.display()
            )));
        }
        if header.nbits != 8 {
            return Err(SimError::InvalidParameter(format!(
                "only 8-bit filterbanks are written, got nbits={}",
                header.nbits
            )));
        }
        encode_header(self.file()?, header)?;
        self.nchans = Some(header.nchans);
        Ok(())
    }

    fn write_block(&mut self, block: ArrayView2<u8>) -> SimResult<()> {
        check_block(&block, self.nchans)?;
        let file = self.file()?;
        match block.as_slice() {
            Some(bytes) => file.write_all(bytes)?,
            None => {
                for row in block.rows() {
                    file.write_all(&row.to_vec())?;
                }
            }
        }
        self.samples_written += block.nrows();
        Ok(())
    }

    fn close(&mut self) -> SimResult<()> {
        if let Some(mut file) = self.file.take() {
            file.flush()?;
            log::debug!(
                "closed {} after {} samples",
                self.path.display(),
                self.samples_written
            );
        }
        Ok(())
    }

    fn nchans(&self) -> Option<usize> {
        self.nchans
    }
}

impl Drop for FilterbankWriter {
    fn drop(&mut self) {
        if let Some(mut file) = self.file.take() {
            let _ = file.flush();
        }
    }
}
