//! Write a huge file with lots of zeros, that should compress perfectly.

use std::io::Write;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<_> = std::env::args().collect();
    if args.len() < 2 {
        return Err(format!("Usage: {} <filename>", args[0]).into());
    }

    let mut zip = zipstream::ZipWriter::create(&args[1])?;
    zip.start_file("huge-file-of-zeroes")?;

    let content = vec![0u8; 65 * 1024];
    let mut bytes_written = 0u64;
    // past u32::MAX the ZIP64 records are doing real work
    while bytes_written < u32::MAX as u64 + content.len() as u64 {
        zip.write_all(&content)?;
        bytes_written += content.len() as u64;
    }
    zip.finish()?;
    Ok(())
}
