use super::binary_writer::*;
use super::context::*;
use super::error::*;
use debug_print::*;

/// Encoding engine registers (9.3.4.1).
#[derive(Clone, Debug)]
pub struct ArithmeticEncoder {
    cod_i_low: u32,
    cod_i_range: u16,
    first_bit_flag: bool,
    bits_outstanding: usize,
    bin_count: usize,
}

impl Default for ArithmeticEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ArithmeticEncoder {
    pub fn new() -> ArithmeticEncoder {
        debug_eprintln!("init encoding engine");
        ArithmeticEncoder {
            cod_i_low: 0,
            cod_i_range: 510,
            first_bit_flag: true,
            bits_outstanding: 0,
            bin_count: 0,
        }
    }

    /// Re-initializes the registers after PCM samples. The bin count is kept.
    pub fn restart(&mut self) {
        debug_eprintln!("restart encoding engine after {} bins", self.bin_count);
        self.cod_i_low = 0;
        self.cod_i_range = 510;
        self.first_bit_flag = true;
        self.bits_outstanding = 0;
    }

    #[inline(always)]
    pub fn range(&self) -> u16 {
        self.cod_i_range
    }

    #[inline(always)]
    pub fn low(&self) -> u32 {
        self.cod_i_low
    }

    /// Number of bins coded so far (BinCountsInNALunits).
    #[inline(always)]
    pub fn bin_count(&self) -> usize {
        self.bin_count
    }

    #[inline(always)]
    fn renorm<W: BitWrite + ?Sized>(&mut self, out: &mut W) -> Result<()> {
        while self.cod_i_range < 256 {
            if self.cod_i_low < 256 {
                self.put_bit(out, false)?;
            } else if self.cod_i_low >= 512 {
                self.cod_i_low -= 512;
                self.put_bit(out, true)?;
            } else {
                self.cod_i_low -= 256;
                self.bits_outstanding += 1;
            }
            self.cod_i_range <<= 1;
            self.cod_i_low <<= 1;
        }
        Ok(())
    }

    #[inline(always)]
    fn put_bit<W: BitWrite + ?Sized>(&mut self, out: &mut W, bit: bool) -> Result<()> {
        if self.first_bit_flag {
            self.first_bit_flag = false;
        } else {
            out.write_bit(bit)?;
        }
        while self.bits_outstanding > 0 {
            out.write_bit(!bit)?;
            self.bits_outstanding -= 1;
        }
        Ok(())
    }

    /// Encodes one context-coded bin and returns the adapted context.
    pub fn encode_decision<W: BitWrite + ?Sized>(
        &mut self,
        out: &mut W,
        ctx: CabacContext,
        bin_val: bool,
    ) -> Result<CabacContext> {
        let cod_i_range_lps = ctx.range_lps(self.cod_i_range);
        self.cod_i_range -= cod_i_range_lps;
        if bin_val != ctx.val_mps {
            self.cod_i_low += self.cod_i_range as u32;
            self.cod_i_range = cod_i_range_lps;
        }
        self.renorm(out)?;
        self.bin_count += 1;
        Ok(ctx.updated(bin_val))
    }

    pub fn encode_bypass<W: BitWrite + ?Sized>(&mut self, out: &mut W, bin_val: bool) -> Result<()> {
        self.cod_i_low <<= 1;
        if bin_val {
            self.cod_i_low += self.cod_i_range as u32;
        }
        if self.cod_i_low >= 1024 {
            self.put_bit(out, true)?;
            self.cod_i_low -= 1024;
        } else if self.cod_i_low < 512 {
            self.put_bit(out, false)?;
        } else {
            self.cod_i_low -= 512;
            self.bits_outstanding += 1;
        }
        self.bin_count += 1;
        Ok(())
    }

    /// Encodes a terminate bin. A `true` bin flushes the engine; its last
    /// written bit is the rbsp stop bit when the slice ends here.
    pub fn encode_terminate<W: BitWrite + ?Sized>(&mut self, out: &mut W, bin_val: bool) -> Result<()> {
        self.cod_i_range -= 2;
        self.bin_count += 1;
        if bin_val {
            self.cod_i_low += self.cod_i_range as u32;
            self.flush(out)
        } else {
            self.renorm(out)
        }
    }

    fn flush<W: BitWrite + ?Sized>(&mut self, out: &mut W) -> Result<()> {
        self.cod_i_range = 2;
        self.renorm(out)?;
        let ex_bit = (self.cod_i_low >> 9) & 1 > 0;
        self.put_bit(out, ex_bit)?;
        out.write_bits((((self.cod_i_low >> 7) & 3) | 1) as u64, 2)?;
        debug_eprintln!("flush encoding engine after {} bins", self.bin_count);
        Ok(())
    }
}
