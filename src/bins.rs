use super::binary_reader::*;
use super::binary_writer::*;
use super::error::*;
use std::cmp::PartialEq;
use std::fmt;

/// Growable bit string, most significant bit of each word first.
#[derive(Clone, Debug, Default)]
pub struct Bins {
    words: Vec<u64>,
    pub num_bins: usize,
}

impl Bins {
    #[inline(always)]
    pub fn new() -> Bins {
        Bins {
            words: vec![],
            num_bins: 0,
        }
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.num_bins
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.num_bins == 0
    }

    #[inline(always)]
    pub fn push_bin(&mut self, bin: bool) {
        if self.num_bins % 64 == 0 {
            self.words.push(0);
        }
        if bin {
            let last = self.words.len() - 1;
            self.words[last] |= 1 << (63 - self.num_bins % 64);
        }
        self.num_bins += 1;
    }

    #[inline(always)]
    pub fn push_bins_with_size(&mut self, bins: u64, size: usize) {
        debug_assert!(size <= 64);
        for i in (0..size).rev() {
            self.push_bin((bins >> i) & 1 > 0);
        }
    }

    #[inline(always)]
    pub fn get(&self, index: usize) -> Option<bool> {
        if index >= self.num_bins {
            None
        } else {
            Some((self.words[index / 64] >> (63 - index % 64)) & 1 > 0)
        }
    }

    #[inline(always)]
    pub fn last(&self) -> Option<bool> {
        self.num_bins.checked_sub(1).and_then(|i| self.get(i))
    }

    pub fn clear(&mut self) {
        self.words.clear();
        self.num_bins = 0;
    }

    #[inline(always)]
    pub fn byte_align(&mut self) {
        while self.num_bins % 8 > 0 {
            self.push_bin(false);
        }
    }

    /// Bytes of the bit string, the last one zero padded.
    pub fn bytes(&self) -> BinsByteIterator {
        BinsByteIterator {
            bins: self,
            index: 0,
        }
    }

    pub fn iter(&self) -> BinsIterator {
        BinsIterator {
            bins: self,
            index: 0,
        }
    }

    pub fn reader(&self) -> BinsReader {
        BinsReader {
            bins: self,
            index: 0,
        }
    }
}

impl PartialEq for Bins {
    fn eq(&self, other: &Bins) -> bool {
        self.num_bins == other.num_bins && self.iter().zip(other.iter()).all(|(x, y)| x == y)
    }
}

impl fmt::Display for Bins {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for bin in self.iter() {
            write!(f, "{}", bin as u8)?;
        }
        Ok(())
    }
}

impl From<&str> for Bins {
    /// Builds a bit string from '0'/'1' characters; anything else is skipped.
    fn from(s: &str) -> Bins {
        let mut bins = Bins::new();
        for c in s.chars() {
            match c {
                '0' => bins.push_bin(false),
                '1' => bins.push_bin(true),
                _ => {}
            }
        }
        bins
    }
}

impl BitWrite for Bins {
    fn write_bit(&mut self, bit: bool) -> Result<()> {
        self.push_bin(bit);
        Ok(())
    }

    fn byte_aligned(&self) -> bool {
        self.num_bins % 8 == 0
    }
}

pub struct BinsIterator<'a> {
    bins: &'a Bins,
    index: usize,
}

impl<'a> Iterator for BinsIterator<'a> {
    type Item = bool;

    #[inline(always)]
    fn next(&mut self) -> Option<Self::Item> {
        let bin = self.bins.get(self.index);
        if bin.is_some() {
            self.index += 1;
        }
        bin
    }
}

pub struct BinsByteIterator<'a> {
    bins: &'a Bins,
    index: usize,
}

impl<'a> Iterator for BinsByteIterator<'a> {
    type Item = u8;

    #[inline(always)]
    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.bins.num_bins {
            None
        } else {
            let word = self.bins.words[self.index / 64];
            let byte = ((word >> (56 - self.index % 64)) & 0xff) as u8;
            self.index += 8;
            Some(byte)
        }
    }
}

/// Bit cursor over a `Bins`, used to decode what an encoder produced in memory.
pub struct BinsReader<'a> {
    bins: &'a Bins,
    index: usize,
}

impl<'a> BinsReader<'a> {
    pub fn position(&self) -> usize {
        self.index
    }
}

impl<'a> BitRead for BinsReader<'a> {
    fn read_bit(&mut self) -> Result<bool> {
        let bit = self.bins.get(self.index).ok_or(CabacError::StreamExhausted)?;
        self.index += 1;
        Ok(bit)
    }

    fn byte_aligned(&self) -> bool {
        self.index % 8 == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{prelude::StdRng, Rng, SeedableRng};

    #[test]
    fn push_and_get_works() {
        let mut rng: StdRng = SeedableRng::seed_from_u64(1);
        let bits: Vec<bool> = (0..300).map(|_| rng.gen_bool(0.5)).collect();
        let mut bins = Bins::new();
        for &bit in bits.iter() {
            bins.push_bin(bit);
        }
        assert_eq!(bins.len(), 300);
        assert_eq!(bins.iter().collect::<Vec<bool>>(), bits);
        assert_eq!(bins.last(), bits.last().copied());
        assert_eq!(bins.get(300), None);
    }

    #[test]
    fn bytes_works() {
        let mut bins = Bins::new();
        bins.push_bins_with_size(0xdead_beef_0123_4567, 64);
        bins.push_bins_with_size(0b101, 3);
        let bytes = bins.bytes().collect::<Vec<u8>>();
        assert_eq!(
            bytes,
            vec![0xde, 0xad, 0xbe, 0xef, 0x01, 0x23, 0x45, 0x67, 0b1010_0000]
        );
        bins.byte_align();
        assert_eq!(bins.len(), 72);
    }

    #[test]
    fn display_and_from_str_works() {
        let bins = Bins::from("1011 0001");
        assert_eq!(bins.to_string(), "10110001");
        assert_eq!(bins, Bins::from("10110001"));
        assert_ne!(bins, Bins::from("1011000"));
    }

    #[test]
    fn reader_works() {
        let bins = Bins::from("110");
        let mut reader = bins.reader();
        assert_eq!(reader.read_bits(3).unwrap(), 0b110);
        assert_eq!(reader.position(), 3);
        assert!(matches!(reader.read_bit(), Err(CabacError::StreamExhausted)));
    }
}
