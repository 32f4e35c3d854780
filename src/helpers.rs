use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

use log::warn;

use crate::error::Result;

/// Byte-compares two files, logging the first difference
pub fn cmp(file1: impl AsRef<Path>, file2: impl AsRef<Path>) -> Result<bool> {
    let (file1, file2) = (file1.as_ref(), file2.as_ref());
    let f1 = File::open(file1)?;
    let f2 = File::open(file2)?;

    let l1 = f1.metadata()?.len();
    let l2 = f2.metadata()?.len();
    if l1 != l2 {
        warn!("{} is {} bytes and {} is {} bytes", file1.display(), l1, file2.display(), l2);
        return Ok(false);
    }

    let mut lines = 0;
    let bytes1 = BufReader::new(f1).bytes();
    let bytes2 = BufReader::new(f2).bytes();
    for (pos, (b1, b2)) in bytes1.zip(bytes2).enumerate() {
        let (b1, b2) = (b1?, b2?);
        if b1 != b2 {
            warn!("files differ at byte {}, line {}", pos, lines);
            return Ok(false);
        }
        lines += usize::from(b1 == b'\n');
    }

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::cmp;

    #[test]
    fn compares_contents_and_lengths() {
        let dir = tempfile::tempdir().unwrap();
        let path = |name: &str| dir.path().join(name);
        std::fs::write(path("a"), b"line one\nline two\n").unwrap();
        std::fs::write(path("b"), b"line one\nline two\n").unwrap();
        std::fs::write(path("c"), b"line one\nline 2wo\n").unwrap();
        std::fs::write(path("d"), b"line one\n").unwrap();

        assert!(cmp(path("a"), path("b")).unwrap());
        assert!(!cmp(path("a"), path("c")).unwrap());
        assert!(!cmp(path("a"), path("d")).unwrap());
        assert!(cmp(path("a"), path("missing")).is_err());
    }
}
