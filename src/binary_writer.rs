use super::error::*;
use std::fs::File;
use std::io::{self, Write};

pub trait BitWrite {
    fn write_bit(&mut self, bit: bool) -> Result<()>;

    /// Writes the low `n_bits` bits of `value`, most significant first.
    fn write_bits(&mut self, value: u64, n_bits: usize) -> Result<()> {
        debug_assert!(n_bits <= 64);
        for i in (0..n_bits).rev() {
            self.write_bit((value >> i) & 1 > 0)?;
        }
        Ok(())
    }

    fn byte_aligned(&self) -> bool;

    fn byte_align(&mut self) -> Result<()> {
        while !self.byte_aligned() {
            self.write_bit(false)?;
        }
        Ok(())
    }
}

pub struct BinaryWriter<'a> {
    output: Box<dyn Write + 'a>,
    buf: u8,
    index: usize,
}

impl<'a> BinaryWriter<'a> {
    pub fn standard(stdout: &'a io::Stdout) -> BinaryWriter<'a> {
        BinaryWriter {
            output: Box::new(stdout.lock()),
            buf: 0,
            index: 0,
        }
    }

    pub fn file(path: &str) -> io::Result<BinaryWriter<'a>> {
        File::create(path).map(|file| BinaryWriter {
            output: Box::new(io::BufWriter::new(file)),
            buf: 0,
            index: 0,
        })
    }

    pub fn sink<W: Write + 'a>(output: W) -> BinaryWriter<'a> {
        BinaryWriter {
            output: Box::new(output),
            buf: 0,
            index: 0,
        }
    }

    pub fn flush(&mut self) -> Result<()> {
        self.output.flush()?;
        Ok(())
    }
}

impl<'a> BitWrite for BinaryWriter<'a> {
    fn write_bit(&mut self, bit: bool) -> Result<()> {
        self.buf = (self.buf << 1) | bit as u8;
        self.index += 1;
        if self.index == 8 {
            self.index = 0;
            self.output.write_all(&[self.buf])?;
            self.buf = 0;
        }
        Ok(())
    }

    fn byte_aligned(&self) -> bool {
        self.index == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_bits_works() {
        let mut out = vec![];
        {
            let mut writer = BinaryWriter::sink(&mut out);
            writer.write_bit(true).unwrap();
            writer.write_bits(0b011, 3).unwrap();
            assert!(!writer.byte_aligned());
            writer.byte_align().unwrap();
            writer.write_bits(0xabc, 12).unwrap();
            writer.byte_align().unwrap();
            writer.flush().unwrap();
        }
        assert_eq!(out, vec![0b1011_0000, 0xab, 0xc0]);
    }
}
