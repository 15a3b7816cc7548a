use crate::error::Error;
use crate::utils::sha256_hex;
use crate::CredxResult;
use blsful::inner_types::{G1Affine, G1Projective};
use elliptic_curve::group::Curve;
use log::{debug, trace};
use std::convert::TryFrom;
use std::fs;
use std::path::{Path, PathBuf};

const TAILS_VERSION: u16 = 1;
const HEADER_SIZE: usize = 6;
const POINT_SIZE: usize = 48;

/// Writes tails files into a directory, naming each file after its hash
#[derive(Clone, Debug)]
pub struct TailsWriter {
    dir: PathBuf,
}

impl TailsWriter {
    /// Write into `dir`, creating it when missing
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Write the accumulator key powers and return the file location and its hex SHA-256 hash
    pub fn write(&self, powers: &[G1Projective]) -> CredxResult<(String, String)> {
        let count = u32::try_from(powers.len())
            .map_err(|_| Error::InvalidTails("too many tails entries".to_string()))?;
        let mut buffer = Vec::with_capacity(HEADER_SIZE + powers.len() * POINT_SIZE);
        buffer.extend_from_slice(&TAILS_VERSION.to_be_bytes());
        buffer.extend_from_slice(&count.to_be_bytes());
        for p in powers {
            buffer.extend_from_slice(&p.to_affine().to_compressed());
        }
        let hash = sha256_hex(&buffer);

        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(&hash);
        fs::write(&path, &buffer)?;
        let location = path.to_string_lossy().into_owned();
        debug!("wrote {} tails entries to {}", count, location);
        Ok((location, hash))
    }
}

/// A tails file that has been checked against its published hash
#[derive(Clone, Debug)]
pub struct TailsReader {
    location: String,
    hash: String,
    powers: Vec<G1Projective>,
}

impl TailsReader {
    /// Read and check the tails file at `location`
    pub fn open(location: &str, expected_hash: &str) -> CredxResult<Self> {
        trace!("open tails >>> location: {}", location);
        let buffer = fs::read(location)
            .map_err(|e| Error::InvalidTails(format!("cannot read `{}`: {}", location, e)))?;
        if sha256_hex(&buffer) != expected_hash {
            return Err(Error::InvalidTails(format!(
                "`{}` does not match hash {}",
                location, expected_hash
            )));
        }
        if buffer.len() < HEADER_SIZE {
            return Err(Error::InvalidTails("truncated header".to_string()));
        }
        let version = u16::from_be_bytes([buffer[0], buffer[1]]);
        if version != TAILS_VERSION {
            return Err(Error::InvalidTails(format!(
                "unsupported version {}",
                version
            )));
        }
        let count = u32::from_be_bytes([buffer[2], buffer[3], buffer[4], buffer[5]]) as usize;
        let body = &buffer[HEADER_SIZE..];
        if body.len() != count * POINT_SIZE {
            return Err(Error::InvalidTails("entry count does not match size".to_string()));
        }
        let powers = body
            .chunks_exact(POINT_SIZE)
            .map(|chunk| {
                let mut bytes = [0u8; POINT_SIZE];
                bytes.copy_from_slice(chunk);
                Option::<G1Affine>::from(G1Affine::from_compressed(&bytes))
                    .map(G1Projective::from)
                    .ok_or_else(|| Error::InvalidTails("invalid point".to_string()))
            })
            .collect::<CredxResult<Vec<_>>>()?;
        Ok(Self {
            location: location.to_string(),
            hash: expected_hash.to_string(),
            powers,
        })
    }

    /// Where the file was read from
    pub fn location(&self) -> &str {
        &self.location
    }

    /// The hash the file was checked against
    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// The accumulator key powers `g * alpha^k`
    pub fn powers(&self) -> &[G1Projective] {
        &self.powers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knox::accumulator::vb20::SecretKey;
    use rand_core::OsRng;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("credx-tails-test-{}", uuid::Uuid::new_v4()))
    }

    #[test]
    fn write_then_read() {
        let key = SecretKey::new(OsRng);
        let powers = key.powers(5);
        let dir = temp_dir();
        let (location, hash) = TailsWriter::new(&dir).write(&powers).unwrap();
        let reader = TailsReader::open(&location, &hash).unwrap();
        assert_eq!(reader.powers(), powers.as_slice());
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn rejects_tampered_file() {
        let key = SecretKey::new(OsRng);
        let dir = temp_dir();
        let (location, hash) = TailsWriter::new(&dir).write(&key.powers(3)).unwrap();
        let mut bytes = fs::read(&location).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 1;
        fs::write(&location, bytes).unwrap();
        assert!(matches!(
            TailsReader::open(&location, &hash),
            Err(Error::InvalidTails(_))
        ));
        assert!(TailsReader::open("/nonexistent/tails", &hash).is_err());
        let _ = fs::remove_dir_all(dir);
    }
}
