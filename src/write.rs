//! Types for creating ZIP archives

use std::fs::File;
use std::io;
use std::io::prelude::*;
use std::io::BufWriter;
use std::path::Path;

use byteorder::{LittleEndian, WriteBytesExt};
use crc32fast::Hasher;
use log::{debug, trace};

use crate::deflate::Deflate;
use crate::result::{ZipError, ZipResult};
use crate::spec;
use crate::types::{DateTime, ZipFileData};

/// Byte-counting adapter in front of the user sink.
///
/// Tracks the absolute archive offset and latches the first I/O failure:
/// once a write has failed, every later one is refused without touching the
/// sink again, so a broken archive is never extended.
pub(crate) struct OffsetWriter<W: Write> {
    inner: W,
    offset: u64,
    poisoned: bool,
}

impl<W: Write> OffsetWriter<W> {
    pub(crate) fn new(inner: W) -> OffsetWriter<W> {
        OffsetWriter {
            inner,
            offset: 0,
            poisoned: false,
        }
    }

    /// Absolute offset of the next byte, equal to everything accepted so far.
    pub(crate) fn position(&self) -> u64 {
        self.offset
    }

    pub(crate) fn put(&mut self, buf: &[u8]) -> ZipResult<()> {
        Ok(self.write_all(buf)?)
    }

    pub(crate) fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for OffsetWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.poisoned {
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "output sink failed earlier",
            ));
        }
        match self.inner.write(buf) {
            Ok(0) if !buf.is_empty() => {
                self.poisoned = true;
                Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "output sink accepted no bytes",
                ))
            }
            Ok(count) => {
                self.offset += count as u64;
                Ok(count)
            }
            Err(err) => {
                if err.kind() != io::ErrorKind::Interrupted {
                    self.poisoned = true;
                }
                Err(err)
            }
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Streaming ZIP64 archive generator.
///
/// Entry bodies are compressed on the fly with the embedded fixed-Huffman
/// DEFLATE encoder and their sizes announced after the fact through data
/// descriptors and ZIP64 extra fields, so the writer never seeks. Any
/// `io::Write` sink works, including pipes.
///
/// ```
/// fn doit() -> zipstream::result::ZipResult<()> {
///     use std::io::Write;
///
///     // For this example we write to a buffer, but normally you should use a File
///     let mut zip = zipstream::ZipWriter::new(std::io::Cursor::new(Vec::new()));
///
///     zip.start_file("hello_world.txt")?;
///     zip.write_all(b"Hello, World!")?;
///
///     zip.finish()?;
///     Ok(())
/// }
///
/// doit().unwrap();
/// ```
pub struct ZipWriter<W: Write> {
    sink: OffsetWriter<W>,
    deflate: Deflate,
    files: Vec<ZipFileData>,
    stats: ZipWriterStats,
    writing_to_file: bool,
    stamp: DateTime,
}

#[derive(Default)]
struct ZipWriterStats {
    hasher: Hasher,
    start: u64,
    bytes_written: u64,
}

impl ZipWriterStats {
    fn update(&mut self, buf: &[u8]) {
        self.hasher.update(buf);
        self.bytes_written += buf.len() as u64;
    }
}

impl<W: Write> Write for ZipWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !self.writing_to_file {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                "No file has been started",
            ));
        }
        self.deflate
            .write(&mut self.sink, buf)
            .map_err(into_io_error)?;
        self.stats.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.sink.flush()
    }
}

impl ZipWriter<BufWriter<File>> {
    /// Creates an archive writing to a new file at `path`.
    pub fn create<P: AsRef<Path>>(path: P) -> ZipResult<ZipWriter<BufWriter<File>>> {
        let file = File::create(path)?;
        Ok(ZipWriter::new(BufWriter::new(file)))
    }
}

impl<W: Write> ZipWriter<W> {
    /// Initializes the archive.
    ///
    /// Before writing to this object, the [`ZipWriter::start_file`] function
    /// should be called. The entry timestamp is captured from the local
    /// clock once, here, and shared by every entry.
    pub fn new(inner: W) -> ZipWriter<W> {
        ZipWriter::with_date_time(inner, DateTime::now_local())
    }

    /// Initializes the archive with an explicit entry timestamp.
    pub fn with_date_time(inner: W, stamp: DateTime) -> ZipWriter<W> {
        ZipWriter {
            sink: OffsetWriter::new(inner),
            deflate: Deflate::new(),
            files: Vec::new(),
            stats: Default::default(),
            writing_to_file: false,
            stamp,
        }
    }

    /// Returns true if a file is currently open for writing.
    pub fn is_writing_file(&self) -> bool {
        self.writing_to_file
    }

    /// Create a file in the archive and start writing its contents.
    ///
    /// Any previously started file is finished first. Names longer than
    /// 0xFFFE bytes are truncated to fit the header's length field.
    ///
    /// The data should be written using the [`Write`] implementation on this
    /// [`ZipWriter`].
    pub fn start_file<S>(&mut self, name: S) -> ZipResult<()>
    where
        S: Into<String>,
    {
        self.finish_file()?;

        let mut file_name_raw = name.into().into_bytes();
        if file_name_raw.is_empty() {
            return Err(ZipError::InvalidArchive("file name must not be empty"));
        }
        file_name_raw.truncate(0xfffe);

        let header_start = self.sink.position();
        let file = ZipFileData {
            file_name_raw,
            crc32: 0,
            compressed_size: 0,
            uncompressed_size: 0,
            header_start,
        };
        write_local_file_header(&mut self.sink, &file, self.stamp)?;
        trace!(
            "entry {:?} starts at offset {}",
            String::from_utf8_lossy(&file.file_name_raw),
            header_start
        );

        self.stats.start = self.sink.position();
        self.stats.bytes_written = 0;
        self.stats.hasher = Hasher::new();

        self.deflate.begin_block(&mut self.sink)?;
        self.files.push(file);
        self.writing_to_file = true;
        Ok(())
    }

    fn finish_file(&mut self) -> ZipResult<()> {
        if !self.writing_to_file {
            return Ok(());
        }
        self.deflate.finish_block(&mut self.sink)?;

        let body_end = self.sink.position();
        let file = match self.files.last_mut() {
            None => return Ok(()),
            Some(f) => f,
        };
        file.crc32 = self.stats.hasher.clone().finalize();
        file.uncompressed_size = self.stats.bytes_written;
        file.compressed_size = body_end - self.stats.start;

        write_data_descriptor(&mut self.sink, file)?;
        trace!(
            "entry done, {} bytes in, {} bytes compressed",
            file.uncompressed_size,
            file.compressed_size
        );
        self.writing_to_file = false;
        Ok(())
    }

    /// Finish the last file and write the central directory and trailer
    /// records, then flush and return the sink.
    ///
    /// The archive is only complete once this has returned successfully.
    pub fn finish(mut self) -> ZipResult<W> {
        self.finalize()?;
        Ok(self.sink.into_inner())
    }

    fn finalize(&mut self) -> ZipResult<()> {
        self.finish_file()?;

        let central_start = self.sink.position();
        for file in self.files.iter() {
            write_central_directory_header(&mut self.sink, file, self.stamp)?;
        }
        let central_size = self.sink.position() - central_start;
        debug!(
            "writing trailer: {} entries, central directory of {} bytes at offset {}",
            self.files.len(),
            central_size,
            central_start
        );

        let zip64_footer = spec::Zip64CentralDirectoryEnd {
            version_made_by: spec::VERSION_NEEDED_TO_EXTRACT,
            version_needed_to_extract: spec::VERSION_NEEDED_TO_EXTRACT,
            disk_number: 0,
            disk_with_central_directory: 0,
            number_of_files_on_this_disk: self.files.len() as u64,
            number_of_files: self.files.len() as u64,
            central_directory_size: central_size,
            central_directory_offset: central_start,
        };
        zip64_footer.write(&mut self.sink)?;

        let zip64_locator = spec::Zip64CentralDirectoryEndLocator {
            disk_with_central_directory: 0,
            end_of_central_directory_offset: central_start + central_size,
            number_of_disks: 1,
        };
        zip64_locator.write(&mut self.sink)?;

        // every numeric field of the legacy record defers to the ZIP64 one
        let footer = spec::CentralDirectoryEnd {
            disk_number: u16::MAX,
            disk_with_central_directory: u16::MAX,
            number_of_files_on_this_disk: u16::MAX,
            number_of_files: u16::MAX,
            central_directory_size: u32::MAX,
            central_directory_offset: u32::MAX,
        };
        footer.write(&mut self.sink)?;

        Ok(self.sink.flush()?)
    }
}

fn into_io_error(err: ZipError) -> io::Error {
    match err {
        ZipError::Io(err) => err,
        other => io::Error::new(io::ErrorKind::Other, other),
    }
}

fn write_local_file_header<T: Write>(
    writer: &mut T,
    file: &ZipFileData,
    stamp: DateTime,
) -> ZipResult<()> {
    // local file header signature
    writer.write_u32::<LittleEndian>(spec::LOCAL_FILE_HEADER_SIGNATURE)?;
    // version needed to extract
    writer.write_u16::<LittleEndian>(spec::VERSION_NEEDED_TO_EXTRACT)?;
    // general purpose bit flag
    writer.write_u16::<LittleEndian>(spec::FLAG_HAS_DATA_DESCRIPTOR)?;
    // compression method
    writer.write_u16::<LittleEndian>(spec::METHOD_DEFLATED)?;
    // last mod file time and last mod file date
    writer.write_u16::<LittleEndian>(stamp.timepart())?;
    writer.write_u16::<LittleEndian>(stamp.datepart())?;
    // crc-32, compressed size and uncompressed size are not known yet; the
    // data descriptor and the central directory carry the real values
    writer.write_u32::<LittleEndian>(0)?;
    writer.write_u32::<LittleEndian>(0)?;
    writer.write_u32::<LittleEndian>(0)?;
    // file name length
    writer.write_u16::<LittleEndian>(file.file_name_raw.len() as u16)?;
    // extra field length
    writer.write_u16::<LittleEndian>(0)?;
    // file name
    writer.write_all(&file.file_name_raw)?;
    Ok(())
}

fn write_data_descriptor<T: Write>(writer: &mut T, file: &ZipFileData) -> ZipResult<()> {
    writer.write_u32::<LittleEndian>(file.crc32)?;
    // 32-bit sizes are sentinels; readers take the real ones from the
    // central directory's ZIP64 extra field
    writer.write_u32::<LittleEndian>(spec::ZIP64_BYTES_THR as u32)?;
    writer.write_u32::<LittleEndian>(spec::ZIP64_BYTES_THR as u32)?;
    Ok(())
}

fn write_central_directory_header<T: Write>(
    writer: &mut T,
    file: &ZipFileData,
    stamp: DateTime,
) -> ZipResult<()> {
    // central file header signature
    writer.write_u32::<LittleEndian>(spec::CENTRAL_DIRECTORY_HEADER_SIGNATURE)?;
    // version made by
    let version_made_by = (spec::FILE_SYSTEM_FAT as u16) << 8 | spec::VERSION_NEEDED_TO_EXTRACT;
    writer.write_u16::<LittleEndian>(version_made_by)?;
    // version needed to extract
    writer.write_u16::<LittleEndian>(spec::VERSION_NEEDED_TO_EXTRACT)?;
    // general purpose bit flag
    writer.write_u16::<LittleEndian>(spec::FLAG_HAS_DATA_DESCRIPTOR)?;
    // compression method
    writer.write_u16::<LittleEndian>(spec::METHOD_DEFLATED)?;
    // last mod file time and last mod file date
    writer.write_u16::<LittleEndian>(stamp.timepart())?;
    writer.write_u16::<LittleEndian>(stamp.datepart())?;
    // crc-32
    writer.write_u32::<LittleEndian>(file.crc32)?;
    // compressed and uncompressed size, deferred to the zip64 extra field
    writer.write_u32::<LittleEndian>(spec::ZIP64_BYTES_THR as u32)?;
    writer.write_u32::<LittleEndian>(spec::ZIP64_BYTES_THR as u32)?;
    // file name length
    writer.write_u16::<LittleEndian>(file.file_name_raw.len() as u16)?;
    // extra field length
    writer.write_u16::<LittleEndian>(spec::ZIP64_EXTRA_FIELD_LENGTH)?;
    // file comment length
    writer.write_u16::<LittleEndian>(0)?;
    // disk number start
    writer.write_u16::<LittleEndian>(0)?;
    // internal file attributes
    writer.write_u16::<LittleEndian>(0)?;
    // external file attributes
    writer.write_u32::<LittleEndian>(0)?;
    // relative offset of local header, deferred to the zip64 extra field
    writer.write_u32::<LittleEndian>(spec::ZIP64_BYTES_THR as u32)?;
    // file name
    writer.write_all(&file.file_name_raw)?;
    // zip64 extra field
    write_central_zip64_extra_field(writer, file)?;
    Ok(())
}

fn write_central_zip64_extra_field<T: Write>(writer: &mut T, file: &ZipFileData) -> ZipResult<()> {
    // all three 64-bit fields are present unconditionally because the
    // corresponding 32-bit header fields are always sentinels
    writer.write_u16::<LittleEndian>(spec::ZIP64_EXTRA_FIELD_ID)?;
    writer.write_u16::<LittleEndian>(spec::ZIP64_EXTRA_FIELD_LENGTH - 4)?;
    writer.write_u64::<LittleEndian>(file.uncompressed_size)?;
    writer.write_u64::<LittleEndian>(file.compressed_size)?;
    writer.write_u64::<LittleEndian>(file.header_start)?;
    Ok(())
}

#[cfg(test)]
mod test {
    use std::io;
    use std::io::prelude::*;
    use std::io::Cursor;

    use super::ZipWriter;
    use crate::types::DateTime;

    #[test]
    fn empty_archive_is_only_trailer_records() {
        let writer = ZipWriter::new(Cursor::new(Vec::new()));
        let bytes = writer.finish().unwrap().into_inner();

        // EOCD64 + EOCD64 locator + legacy EOCD
        assert_eq!(bytes.len(), 56 + 20 + 22);
        assert_eq!(&bytes[0..4], &0x06064b50u32.to_le_bytes());
        assert_eq!(&bytes[56..60], &0x07064b50u32.to_le_bytes());
        assert_eq!(&bytes[76..80], &0x06054b50u32.to_le_bytes());
        // locator points at offset 0
        assert_eq!(&bytes[64..72], &0u64.to_le_bytes());
        // legacy record is all sentinels with an empty comment
        assert!(bytes[80..96].iter().all(|&b| b == 0xff));
        assert_eq!(&bytes[96..98], &[0, 0]);
    }

    #[test]
    fn write_without_file_is_refused() {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let err = writer.write(b"data").unwrap_err();
        assert!(err.to_string().contains("No file has been started"));
    }

    #[test]
    fn empty_file_name_is_refused() {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        assert!(writer.start_file("").is_err());
        assert!(!writer.is_writing_file());
    }

    #[test]
    fn local_header_carries_the_stamp() {
        let stamp = DateTime::from_date_and_time(2024, 5, 17, 12, 34, 56);
        let mut writer = ZipWriter::with_date_time(Cursor::new(Vec::new()), stamp);
        writer.start_file("stamped").unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        assert_eq!(&bytes[10..12], &stamp.timepart().to_le_bytes());
        assert_eq!(&bytes[12..14], &stamp.datepart().to_le_bytes());
    }

    /// Sink that hard-fails every write after the first `accept` calls.
    struct FailingSink {
        accept: usize,
    }

    impl Write for FailingSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.accept == 0 {
                return Err(io::Error::new(io::ErrorKind::Other, "sink gave up"));
            }
            self.accept -= 1;
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn sink_failure_poisons_the_archive() {
        // the header and name go through, the compressed body does not
        let mut writer = ZipWriter::new(FailingSink { accept: 16 });
        writer.start_file("doomed").unwrap();

        // incompressible data, so staging keeps flushing into the dead sink
        let mut state = 0x12345678u32;
        let chunk: Vec<u8> = (0..16 * 1024)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                (state >> 8) as u8
            })
            .collect();

        let mut saw_error = false;
        for _ in 0..64 {
            if writer.write_all(&chunk).is_err() {
                saw_error = true;
                break;
            }
        }
        assert!(saw_error);

        // the trailer cannot reach the sink either; finish reports failure
        assert!(writer.finish().is_err());
    }
}
