use std::fs::{self, File};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::models::audio_models::StreamFormat;
use crate::models::error::RecordError;
use crate::processing::wav_format;

/// Streaming PCM WAV file writer.
///
/// ```text
/// [44-byte WAV header, sizes zeroed until close]
/// [raw PCM data...]
/// ```
pub struct WavFileWriter {
    file_path: PathBuf,
    format: StreamFormat,
    file: Option<BufWriter<File>>,
    data_bytes: u64,
}

impl WavFileWriter {
    pub fn new(file_path: PathBuf, format: StreamFormat) -> Self {
        Self {
            file_path,
            format,
            file: None,
            data_bytes: 0,
        }
    }

    /// Create (or truncate) the file and write the placeholder header.
    pub fn open(&mut self) -> Result<(), RecordError> {
        if self.file.is_some() {
            return Ok(());
        }
        if self.format.checked_byte_rate().is_none() {
            return Err(RecordError::ConfigurationFailed(format!(
                "byte rate of {} Hz x {} bytes per frame does not fit a WAV header",
                self.format.sample_rate,
                self.format.bytes_per_frame()
            )));
        }

        if let Some(parent) = self.file_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| RecordError::StorageError(format!("failed to create directory: {}", e)))?;
            }
        }

        let file = File::create(&self.file_path)
            .map_err(|e| RecordError::StorageError(format!("failed to create file: {}", e)))?;
        let mut file = BufWriter::new(file);

        let header = wav_format::generate_wav_header(&self.format, 0);
        file.write_all(&header)
            .map_err(|e| RecordError::StorageError(format!("failed to write header: {}", e)))?;

        self.file = Some(file);
        self.data_bytes = 0;
        Ok(())
    }

    /// Append PCM bytes.
    pub fn write(&mut self, data: &[u8]) -> Result<(), RecordError> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| RecordError::StorageError("file is not open for writing".into()))?;
        file.write_all(data)
            .map_err(|e| RecordError::StorageError(format!("write failed: {}", e)))?;
        self.data_bytes += data.len() as u64;
        Ok(())
    }

    /// Patch the header sizes, close the file and return its SHA-256 digest.
    pub fn close(&mut self) -> Result<String, RecordError> {
        let mut file = self
            .file
            .take()
            .ok_or_else(|| RecordError::StorageError("file is not open".into()))?;

        let (riff_size, data_size) = wav_format::size_fields(self.data_bytes);

        file.seek(SeekFrom::Start(wav_format::RIFF_SIZE_OFFSET))?;
        file.write_all(&riff_size.to_le_bytes())?;
        file.seek(SeekFrom::Start(wav_format::DATA_SIZE_OFFSET))?;
        file.write_all(&data_size.to_le_bytes())?;
        file.flush()?;
        drop(file);

        log::info!(
            "WAV file saved: {} ({} data bytes)",
            self.file_path.display(),
            self.data_bytes
        );
        sha256_file(&self.file_path)
    }

    /// Close without finalizing and delete the file.
    pub fn discard(&mut self) -> Result<(), RecordError> {
        self.file = None;
        match fs::remove_file(&self.file_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(RecordError::StorageError(format!("failed to delete file: {}", e))),
        }
    }

    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    /// PCM bytes written so far, excluding the header.
    pub fn data_bytes(&self) -> u64 {
        self.data_bytes
    }
}

/// SHA-256 hex digest of a file.
pub fn sha256_file(path: &Path) -> Result<String, RecordError> {
    let data = fs::read(path)
        .map_err(|e| RecordError::StorageError(format!("failed to read file for checksum: {}", e)))?;
    Ok(hex_encode(&Sha256::digest(&data)))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
