use super::binary_reader::*;
use super::context::*;
use super::error::*;
use debug_print::*;

/// Decoding engine registers (9.3.1.2).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ArithmeticDecoder {
    cod_i_range: u16,
    cod_i_offset: u16,
}

impl ArithmeticDecoder {
    pub fn new<R: BitRead + ?Sized>(reader: &mut R) -> Result<ArithmeticDecoder> {
        let cod_i_offset = reader.read_bits(9)? as u16;
        debug_eprintln!("init decoding engine: offset={}", cod_i_offset);
        if cod_i_offset == 510 || cod_i_offset == 511 {
            return Err(CabacError::CorruptStream {
                offset: cod_i_offset,
            });
        }
        Ok(ArithmeticDecoder {
            cod_i_range: 510,
            cod_i_offset,
        })
    }

    pub fn with_state(cod_i_range: u16, cod_i_offset: u16) -> ArithmeticDecoder {
        debug_assert!(cod_i_offset < cod_i_range);
        ArithmeticDecoder {
            cod_i_range,
            cod_i_offset,
        }
    }

    #[inline(always)]
    pub fn range(&self) -> u16 {
        self.cod_i_range
    }

    #[inline(always)]
    pub fn offset(&self) -> u16 {
        self.cod_i_offset
    }

    #[inline(always)]
    fn renorm<R: BitRead + ?Sized>(&mut self, reader: &mut R) -> Result<()> {
        while self.cod_i_range < 256 {
            self.cod_i_range <<= 1;
            self.cod_i_offset = (self.cod_i_offset << 1) | reader.read_bit()? as u16;
        }
        debug_assert!(self.cod_i_range <= 510);
        Ok(())
    }

    /// Decodes one context-coded bin and returns it with the adapted context.
    pub fn decode_decision<R: BitRead + ?Sized>(
        &mut self,
        reader: &mut R,
        ctx: CabacContext,
    ) -> Result<(bool, CabacContext)> {
        let cod_i_range_lps = ctx.range_lps(self.cod_i_range);
        self.cod_i_range -= cod_i_range_lps;
        let bin_val = if self.cod_i_offset >= self.cod_i_range {
            self.cod_i_offset -= self.cod_i_range;
            self.cod_i_range = cod_i_range_lps;
            !ctx.val_mps
        } else {
            ctx.val_mps
        };
        self.renorm(reader)?;
        Ok((bin_val, ctx.updated(bin_val)))
    }

    pub fn decode_bypass<R: BitRead + ?Sized>(&mut self, reader: &mut R) -> Result<bool> {
        self.cod_i_offset = (self.cod_i_offset << 1) | reader.read_bit()? as u16;
        if self.cod_i_offset >= self.cod_i_range {
            self.cod_i_offset -= self.cod_i_range;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// A returned `true` ends arithmetic decoding. The reader is then positioned
    /// right after the last bit written by the encoder flush.
    pub fn decode_terminate<R: BitRead + ?Sized>(&mut self, reader: &mut R) -> Result<bool> {
        self.cod_i_range -= 2;
        if self.cod_i_offset >= self.cod_i_range {
            self.cod_i_offset |= 1;
            Ok(true)
        } else {
            self.renorm(reader)?;
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bins::*;

    #[test]
    fn init_rejects_illegal_offset() {
        let bins = Bins::from("111111110 0000000");
        assert!(matches!(
            ArithmeticDecoder::new(&mut bins.reader()),
            Err(CabacError::CorruptStream { offset: 510 })
        ));
        let bins = Bins::from("111111111");
        assert!(matches!(
            ArithmeticDecoder::new(&mut bins.reader()),
            Err(CabacError::CorruptStream { offset: 511 })
        ));
        let bins = Bins::from("111111101");
        let decoder = ArithmeticDecoder::new(&mut bins.reader()).unwrap();
        assert_eq!(decoder.range(), 510);
        assert_eq!(decoder.offset(), 509);
    }

    #[test]
    fn init_on_short_stream_is_exhausted() {
        let bins = Bins::from("0101");
        assert!(matches!(
            ArithmeticDecoder::new(&mut bins.reader()),
            Err(CabacError::StreamExhausted)
        ));
    }

    #[test]
    fn lps_at_state_zero_flips_mps_works() {
        // q = (510 >> 6) & 3 = 3, rangeLPS = 240, range - rangeLPS = 270 <= offset
        let mut decoder = ArithmeticDecoder::with_state(510, 300);
        let ctx = CabacContext {
            p_state_idx: 0,
            val_mps: true,
        };
        let bins = Bins::from("1");
        let mut reader = bins.reader();
        let (bin, ctx) = decoder.decode_decision(&mut reader, ctx).unwrap();
        assert!(!bin);
        assert_eq!(
            ctx,
            CabacContext {
                p_state_idx: 0,
                val_mps: false
            }
        );
        // range 240 renormalized once: offset (300 - 270) * 2 + 1
        assert_eq!(decoder.range(), 480);
        assert_eq!(decoder.offset(), 61);
        assert_eq!(reader.position(), 1);
    }

    #[test]
    fn mps_decision_works() {
        let mut decoder = ArithmeticDecoder::with_state(510, 100);
        let ctx = CabacContext {
            p_state_idx: 10,
            val_mps: false,
        };
        let bins = Bins::new();
        let mut reader = bins.reader();
        // rangeLPS[10][3] = 142, 510 - 142 = 368 > 100, no renormalization needed
        let (bin, ctx) = decoder.decode_decision(&mut reader, ctx).unwrap();
        assert!(!bin);
        assert_eq!(ctx.p_state_idx, 11);
        assert_eq!(decoder.range(), 368);
        assert_eq!(decoder.offset(), 100);
    }

    #[test]
    fn bypass_works() {
        let mut decoder = ArithmeticDecoder::with_state(300, 200);
        let bins = Bins::from("01");
        let mut reader = bins.reader();
        // (200 << 1) | 0 = 400 >= 300
        assert!(decoder.decode_bypass(&mut reader).unwrap());
        assert_eq!(decoder.offset(), 100);
        // (100 << 1) | 1 = 201 < 300
        assert!(!decoder.decode_bypass(&mut reader).unwrap());
        assert_eq!(decoder.offset(), 201);
        assert_eq!(decoder.range(), 300);
        assert!(matches!(
            decoder.decode_bypass(&mut reader),
            Err(CabacError::StreamExhausted)
        ));
    }

    #[test]
    fn terminate_works() {
        let bins = Bins::new();
        let mut decoder = ArithmeticDecoder::with_state(510, 508);
        assert!(decoder.decode_terminate(&mut bins.reader()).unwrap());
        assert_eq!(decoder.offset(), 509);

        let bins = Bins::from("1");
        let mut reader = bins.reader();
        let mut decoder = ArithmeticDecoder::with_state(256, 10);
        assert!(!decoder.decode_terminate(&mut reader).unwrap());
        assert_eq!(decoder.range(), 508);
        assert_eq!(decoder.offset(), 21);
    }
}
