use super::error::*;
use std::fs::File;
use std::io::{self, BufRead, ErrorKind, Read};

pub trait BitRead {
    fn read_bit(&mut self) -> Result<bool>;

    /// Reads `n_bits` bits, most significant first.
    fn read_bits(&mut self, n_bits: usize) -> Result<u64> {
        debug_assert!(n_bits <= 64);
        let mut v = 0;
        for _ in 0..n_bits {
            v = (v << 1) | self.read_bit()? as u64;
        }
        Ok(v)
    }

    fn byte_aligned(&self) -> bool;

    fn byte_align(&mut self) -> Result<()> {
        while !self.byte_aligned() {
            self.read_bit()?;
        }
        Ok(())
    }
}

pub struct BinaryReader<'a> {
    input: Box<dyn BufRead + 'a>,
    buffer: u8,
    bit_offset: usize,
    bits_read: usize,
}

impl<'a> BinaryReader<'a> {
    fn with_input(input: Box<dyn BufRead + 'a>) -> BinaryReader<'a> {
        BinaryReader {
            input,
            buffer: 0,
            bit_offset: 0,
            bits_read: 0,
        }
    }

    pub fn standard(stdin: &'a io::Stdin) -> BinaryReader<'a> {
        Self::with_input(Box::new(stdin.lock()))
    }

    pub fn file(path: &str) -> io::Result<BinaryReader<'a>> {
        File::open(path).map(|file| Self::with_input(Box::new(io::BufReader::new(file))))
    }

    pub fn vec(v: &'a [u8]) -> BinaryReader<'a> {
        Self::with_input(Box::new(v))
    }

    /// Number of bits consumed so far.
    pub fn position(&self) -> usize {
        self.bits_read
    }
}

impl<'a> BitRead for BinaryReader<'a> {
    fn read_bit(&mut self) -> Result<bool> {
        if self.bit_offset == 0 {
            let mut tmp = [0u8; 1];
            match self.input.read_exact(&mut tmp) {
                Ok(()) => self.buffer = tmp[0],
                Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                    return Err(CabacError::StreamExhausted)
                }
                Err(e) => return Err(e.into()),
            }
        }
        let bit = (self.buffer >> (7 - self.bit_offset)) & 1 > 0;
        self.bit_offset = (self.bit_offset + 1) % 8;
        self.bits_read += 1;
        Ok(bit)
    }

    fn byte_aligned(&self) -> bool {
        self.bit_offset == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_bits_works() {
        let data = [0b1010_0110, 0xff, 0x01];
        let mut reader = BinaryReader::vec(&data);
        assert!(reader.read_bit().unwrap());
        assert!(!reader.read_bit().unwrap());
        assert_eq!(reader.read_bits(6).unwrap(), 0b10_0110);
        assert!(reader.byte_aligned());
        assert_eq!(reader.read_bits(12).unwrap(), 0xff0);
        assert_eq!(reader.position(), 20);
        reader.byte_align().unwrap();
        assert_eq!(reader.position(), 24);
    }

    #[test]
    fn read_past_end_is_stream_exhausted() {
        let data = [0x80];
        let mut reader = BinaryReader::vec(&data);
        assert_eq!(reader.read_bits(8).unwrap(), 0x80);
        assert!(matches!(reader.read_bit(), Err(CabacError::StreamExhausted)));
    }
}
