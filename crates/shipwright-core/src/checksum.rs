//! SHA-256 content digests for release assets.

use std::fs::File;
use std::io::{BufReader, Read};

use camino::Utf8Path;
use sha2::{Digest, Sha256};

/// Size of the read buffer used while hashing.
const CHUNK_SIZE: usize = 8192;

/// Compute the SHA-256 digest of a file as 64 lowercase hex characters.
///
/// The file is streamed, so large wheels and tarballs are never held in
/// memory at once.
pub fn sha256_file(path: &Utf8Path) -> std::io::Result<String> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut hasher = Sha256::new();
    let mut buf = [0u8; CHUNK_SIZE];

    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Compute the SHA-256 digest of an in-memory buffer.
pub fn sha256_bytes(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
