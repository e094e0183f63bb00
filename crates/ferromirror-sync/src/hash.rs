//! Streaming content fingerprints

use ferromirror_types::{Error, Fingerprint, Result};
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use xxhash_rust::xxh3::Xxh3;

/// Read size used while hashing; memory use per file never exceeds this
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Compute the 128-bit XXH3 fingerprint of a file
///
/// The file is streamed in [`CHUNK_SIZE`] pieces. A file that no longer
/// exists yields [`Error::Vanished`]; any other open or read failure yields
/// [`Error::FileAccess`].
pub async fn hash_file<P: AsRef<Path>>(path: P) -> Result<Fingerprint> {
    let path = path.as_ref();
    let mut file = File::open(path)
        .await
        .map_err(|e| Error::file_access(path, &e))?;

    let mut hasher = Xxh3::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];
    loop {
        let read = file
            .read(&mut buffer)
            .await
            .map_err(|e| Error::file_access(path, &e))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(Fingerprint::from_u128(hasher.digest128()))
}
