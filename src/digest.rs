//! Digest algorithms for zone digests.

use ring::digest;

use crate::error::ZoneDigestError;

/// A digest algorithm usable in a zone digest record, by registry number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigestAlgorithm {
    /// Digest type 1
    Sha384,
    /// Digest type 2
    Sha512,
}

impl DigestAlgorithm {
    /// Look up a digest algorithm by its registry number.
    ///
    /// # Errors
    ///
    /// Returns `ZoneDigestError::UnsupportedAlgorithm` for numbers this
    /// crate cannot produce.
    pub fn from_code(code: u8) -> Result<Self, ZoneDigestError> {
        match code {
            1 => Ok(DigestAlgorithm::Sha384),
            2 => Ok(DigestAlgorithm::Sha512),
            other => Err(ZoneDigestError::UnsupportedAlgorithm(other)),
        }
    }

    /// The registry number for this algorithm.
    pub fn code(&self) -> u8 {
        match self {
            DigestAlgorithm::Sha384 => 1,
            DigestAlgorithm::Sha512 => 2,
        }
    }

    /// Size of this algorithm's output, in bytes.
    pub fn digest_len(&self) -> usize {
        self.ring_algorithm().output_len()
    }

    fn ring_algorithm(&self) -> &'static digest::Algorithm {
        match self {
            DigestAlgorithm::Sha384 => &digest::SHA384,
            DigestAlgorithm::Sha512 => &digest::SHA512,
        }
    }

    /// Start a fresh hash context for this algorithm.
    pub fn context(&self) -> DigestContext {
        DigestContext(digest::Context::new(self.ring_algorithm()))
    }
}

/// A running hash over record wire data.
pub struct DigestContext(digest::Context);

impl DigestContext {
    pub fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    pub fn finish(self) -> Vec<u8> {
        self.0.finish().as_ref().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_algorithm_codes() {
        assert_eq!(DigestAlgorithm::from_code(1).unwrap(), DigestAlgorithm::Sha384);
        assert_eq!(DigestAlgorithm::from_code(2).unwrap(), DigestAlgorithm::Sha512);
        assert_eq!(DigestAlgorithm::Sha384.code(), 1);
        assert_eq!(DigestAlgorithm::Sha512.code(), 2);
    }

    #[test]
    fn test_unsupported_code() {
        let err = DigestAlgorithm::from_code(240).unwrap_err();
        assert!(matches!(err, ZoneDigestError::UnsupportedAlgorithm(240)));
    }

    #[test]
    fn test_digest_lengths() {
        assert_eq!(DigestAlgorithm::Sha384.digest_len(), 48);
        assert_eq!(DigestAlgorithm::Sha512.digest_len(), 64);
    }

    #[test]
    fn test_context_matches_one_shot() {
        let mut ctx = DigestAlgorithm::Sha384.context();
        ctx.update(b"hello ");
        ctx.update(b"zone");
        let split = ctx.finish();

        let mut ctx = DigestAlgorithm::Sha384.context();
        ctx.update(b"hello zone");
        assert_eq!(split, ctx.finish());
    }
}
