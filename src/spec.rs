//! Signatures, shared constants and trailer records of the ZIP format.
//!
//! See the PKWARE application note, §4.3 and §4.3.14:
//! <https://pkware.cachefly.net/webdocs/casestudies/APPNOTE.TXT>

use std::io::Write;

use byteorder::{LittleEndian, WriteBytesExt};

use crate::result::ZipResult;

pub const LOCAL_FILE_HEADER_SIGNATURE: u32 = 0x04034b50;
pub const CENTRAL_DIRECTORY_HEADER_SIGNATURE: u32 = 0x02014b50;
pub const CENTRAL_DIRECTORY_END_SIGNATURE: u32 = 0x06054b50;
pub const ZIP64_CENTRAL_DIRECTORY_END_SIGNATURE: u32 = 0x06064b50;
pub const ZIP64_CENTRAL_DIRECTORY_END_LOCATOR_SIGNATURE: u32 = 0x07064b50;

/// Sentinel for 32-bit size and offset fields; the real value lives in the
/// ZIP64 extra field or the ZIP64 end-of-central-directory record.
pub const ZIP64_BYTES_THR: u64 = u32::MAX as u64;

/// Version 4.5, the first revision of the format with ZIP64 support.
pub const VERSION_NEEDED_TO_EXTRACT: u16 = 45;
/// Host system declared in "version made by": MS-DOS / FAT.
pub const FILE_SYSTEM_FAT: u8 = 0;
/// General purpose flag bit 3: CRC and sizes follow the data in a descriptor.
pub const FLAG_HAS_DATA_DESCRIPTOR: u16 = 1 << 3;
/// Compression method 8, DEFLATE.
pub const METHOD_DEFLATED: u16 = 8;
/// Header ID of the ZIP64 extended information extra field.
pub const ZIP64_EXTRA_FIELD_ID: u16 = 0x0001;
/// Total size of the ZIP64 extra field this writer emits: a 4-byte header
/// plus uncompressed size, compressed size and local header offset.
pub const ZIP64_EXTRA_FIELD_LENGTH: u16 = 4 + 3 * 8;

/// ZIP64 end of central directory record, 56 bytes.
pub struct Zip64CentralDirectoryEnd {
    pub version_made_by: u16,
    pub version_needed_to_extract: u16,
    pub disk_number: u32,
    pub disk_with_central_directory: u32,
    pub number_of_files_on_this_disk: u64,
    pub number_of_files: u64,
    pub central_directory_size: u64,
    pub central_directory_offset: u64,
}

impl Zip64CentralDirectoryEnd {
    pub fn write<T: Write>(&self, writer: &mut T) -> ZipResult<()> {
        writer.write_u32::<LittleEndian>(ZIP64_CENTRAL_DIRECTORY_END_SIGNATURE)?;
        // size of the remainder of this record, i.e. 56 minus the signature
        // and this field (APPNOTE 4.3.14.1)
        writer.write_u64::<LittleEndian>(44)?;
        writer.write_u16::<LittleEndian>(self.version_made_by)?;
        writer.write_u16::<LittleEndian>(self.version_needed_to_extract)?;
        writer.write_u32::<LittleEndian>(self.disk_number)?;
        writer.write_u32::<LittleEndian>(self.disk_with_central_directory)?;
        writer.write_u64::<LittleEndian>(self.number_of_files_on_this_disk)?;
        writer.write_u64::<LittleEndian>(self.number_of_files)?;
        writer.write_u64::<LittleEndian>(self.central_directory_size)?;
        writer.write_u64::<LittleEndian>(self.central_directory_offset)?;
        Ok(())
    }
}

/// ZIP64 end of central directory locator, 20 bytes.
pub struct Zip64CentralDirectoryEndLocator {
    pub disk_with_central_directory: u32,
    pub end_of_central_directory_offset: u64,
    pub number_of_disks: u32,
}

impl Zip64CentralDirectoryEndLocator {
    pub fn write<T: Write>(&self, writer: &mut T) -> ZipResult<()> {
        writer.write_u32::<LittleEndian>(ZIP64_CENTRAL_DIRECTORY_END_LOCATOR_SIGNATURE)?;
        writer.write_u32::<LittleEndian>(self.disk_with_central_directory)?;
        writer.write_u64::<LittleEndian>(self.end_of_central_directory_offset)?;
        writer.write_u32::<LittleEndian>(self.number_of_disks)?;
        Ok(())
    }
}

/// Legacy end of central directory record, 22 bytes.
///
/// This writer always emits it with every numeric field at its 0xFFFF or
/// 0xFFFFFFFF sentinel, pointing readers at the ZIP64 record above it.
pub struct CentralDirectoryEnd {
    pub disk_number: u16,
    pub disk_with_central_directory: u16,
    pub number_of_files_on_this_disk: u16,
    pub number_of_files: u16,
    pub central_directory_size: u32,
    pub central_directory_offset: u32,
}

impl CentralDirectoryEnd {
    pub fn write<T: Write>(&self, writer: &mut T) -> ZipResult<()> {
        writer.write_u32::<LittleEndian>(CENTRAL_DIRECTORY_END_SIGNATURE)?;
        writer.write_u16::<LittleEndian>(self.disk_number)?;
        writer.write_u16::<LittleEndian>(self.disk_with_central_directory)?;
        writer.write_u16::<LittleEndian>(self.number_of_files_on_this_disk)?;
        writer.write_u16::<LittleEndian>(self.number_of_files)?;
        writer.write_u32::<LittleEndian>(self.central_directory_size)?;
        writer.write_u32::<LittleEndian>(self.central_directory_offset)?;
        // no archive comment
        writer.write_u16::<LittleEndian>(0)?;
        Ok(())
    }
}
