//! Write a small archive with a couple of entries.

use std::io::Write;

fn main() {
    std::process::exit(real_main());
}

fn real_main() -> i32 {
    let args: Vec<_> = std::env::args().collect();
    if args.len() < 2 {
        println!("Usage: {} <filename>", args[0]);
        return 1;
    }

    match doit(&args[1]) {
        Ok(_) => println!("wrote {}", args[1]),
        Err(e) => {
            println!("error: {e:?}");
            return 1;
        }
    }
    0
}

fn doit(filename: &str) -> zipstream::result::ZipResult<()> {
    let mut zip = zipstream::ZipWriter::create(filename)?;

    zip.start_file("hello_world.txt")?;
    zip.write_all(b"Hello, World!\n")?;

    zip.start_file("lorem/ipsum.txt")?;
    for _ in 0..1000 {
        zip.write_all(b"Lorem ipsum dolor sit amet, consectetur adipiscing elit. ")?;
    }

    zip.finish()?;
    Ok(())
}
