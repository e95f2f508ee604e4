//! 2-bit packed nucleotide sequences and the 128-mer keys cut from them.
//!
//! Bases are packed 16 per `u32`, first base in the lowest two bits:
//! `A = 0`, `C = 1`, `G = 2`, anything else `3`. A [`Kmer128`] is eight such
//! words holding 128 consecutive bases, so it is a plain 32-byte key usable by
//! every sketch in this crate.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::SequenceError;

/// Number of bases in a k-mer key
pub const KMER_LEN: usize = 128;
const BASES_PER_WORD: usize = 16;

/// 128 bases packed 2 bits each
pub type Kmer128 = [u32; KMER_LEN / BASES_PER_WORD];

#[inline]
fn base_code(base: u8) -> u32 {
    match base.to_ascii_uppercase() {
        b'A' => 0,
        b'C' => 1,
        b'G' => 2,
        _ => 3,
    }
}

/// Nucleotide sequence packed 2 bits per base
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackedSequence {
    len: usize,
    /// Packed bases padded with `A`, plus one spare zero word
    words: Box<[u32]>,
}

impl PackedSequence {
    /// Pack raw bases.
    pub fn from_bases(bases: &[u8]) -> Result<Self, SequenceError> {
        if bases.is_empty() {
            return Err(SequenceError::Empty);
        }

        let mut words = vec![0u32; bases.len().div_ceil(BASES_PER_WORD) + 1];
        for (i, &b) in bases.iter().enumerate() {
            words[i / BASES_PER_WORD] |= base_code(b) << ((i % BASES_PER_WORD) * 2);
        }

        let seq = Self {
            len: bases.len(),
            words: words.into_boxed_slice(),
        };
        tracing::debug!(len = seq.len, kmers = seq.num_kmers(), "packed sequence");
        Ok(seq)
    }

    /// Read the first record of a FASTA stream.
    ///
    /// The `>` header is skipped, as are `;` comments and blank lines. Reading
    /// stops at the header of the next record.
    pub fn from_fasta<R: BufRead>(reader: R) -> Result<Self, SequenceError> {
        let mut bases = Vec::new();
        let mut in_record = false;
        for line in reader.split(b'\n') {
            let line = line?;
            let line = line.trim_ascii();
            match line.first() {
                None | Some(b';') => continue,
                Some(b'>') if in_record || !bases.is_empty() => break,
                Some(b'>') => in_record = true,
                Some(_) => bases.extend_from_slice(line),
            }
        }
        Self::from_bases(&bases)
    }

    /// Open and read a FASTA file, see [`PackedSequence::from_fasta`].
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SequenceError> {
        let file = File::open(path)?;
        Self::from_fasta(BufReader::new(file))
    }

    /// Return number of bases
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Return number of 128-mers starting at offsets `0..num_kmers()`
    #[inline]
    pub fn num_kmers(&self) -> usize {
        (self.len + 1).saturating_sub(KMER_LEN)
    }

    /// Return base code at `pos`
    #[inline]
    pub fn base(&self, pos: usize) -> u32 {
        assert!(pos < self.len, "base {pos} out of range for {} bases", self.len);
        (self.words[pos / BASES_PER_WORD] >> ((pos % BASES_PER_WORD) * 2)) & 0b11
    }

    /// Return the 128-mer starting at base `offset`.
    ///
    /// Word `i` of the result holds bases `offset + 16 * i ..offset + 16 * i + 16`.
    ///
    /// # Panics
    ///
    /// Panics if `offset >= num_kmers()`.
    pub fn kmer(&self, offset: usize) -> Kmer128 {
        assert!(
            offset < self.num_kmers(),
            "k-mer offset {offset} out of range for {} bases",
            self.len
        );
        let first = offset / BASES_PER_WORD;
        let shift = (offset % BASES_PER_WORD) * 2;
        let mut kmer = Kmer128::default();
        for (i, word) in kmer.iter_mut().enumerate() {
            let lo = self.words[first + i];
            *word = if shift == 0 {
                lo
            } else {
                (lo >> shift) | (self.words[first + i + 1] << (32 - shift))
            };
        }
        kmer
    }

    /// Iterate over all 128-mers in offset order
    pub fn kmers(&self) -> impl Iterator<Item = Kmer128> + '_ {
        (0..self.num_kmers()).map(move |offset| self.kmer(offset))
    }
}
