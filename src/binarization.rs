use super::bins::*;
use super::cabac_contexts::*;
use super::error::*;

/// Progress through one binarization part of an element instance.
#[derive(Clone, Debug, Default)]
pub struct BinCursor {
    pub bin_idx: usize,
    /// Bins produced so far, bin 0 first.
    pub bins: Bins,
}

impl BinCursor {
    pub fn new() -> BinCursor {
        BinCursor::default()
    }

    #[inline(always)]
    fn advance(&mut self, bin: bool) {
        self.bins.push_bin(bin);
        self.bin_idx += 1;
    }
}

/// Source of bins for the debinarizer.
pub trait BinDecoder {
    fn decode_bin(&mut self, sel: CtxSel) -> Result<bool>;
}

/// Sink of bins for the binarizer.
pub trait BinEncoder {
    fn encode_bin(&mut self, sel: CtxSel, bin: bool) -> Result<()>;
}

/// Value of a binarization part. `Escape` is the mb_type prefix that hands
/// over to the suffix.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PartValue {
    Value(i32),
    Escape,
}

pub type DeriveFn<'a> = dyn FnMut(&BinCursor) -> Result<usize> + 'a;

/// For parts whose rules never ask for a derived increment.
pub fn no_derivation(cursor: &BinCursor) -> Result<usize> {
    Err(protocol_violation!(
        "bin {} needs a derived ctxIdxInc",
        cursor.bin_idx
    ))
}

fn select(part: &BinarizationPart, cursor: &BinCursor, derive: &mut DeriveFn) -> Result<CtxSel> {
    let inc = match part.rule(cursor.bin_idx) {
        CtxIncRule::Derived => CtxInc::Number(derive(cursor)?),
        CtxIncRule::Number(inc) => CtxInc::Number(inc),
        CtxIncRule::PriorBin { bin, set, unset } => {
            if cursor.bins.get(bin).unwrap_or(false) {
                CtxInc::Number(set)
            } else {
                CtxInc::Number(unset)
            }
        }
        CtxIncRule::Bypass => CtxInc::Bypass,
        CtxIncRule::Terminate => CtxInc::Terminate,
    };
    part.resolve(inc)
}

fn next_bin<D: BinDecoder + ?Sized>(
    dec: &mut D,
    part: &BinarizationPart,
    cursor: &mut BinCursor,
    derive: &mut DeriveFn,
) -> Result<bool> {
    let sel = select(part, cursor, derive)?;
    let bin = dec.decode_bin(sel)?;
    cursor.advance(bin);
    Ok(bin)
}

fn next_bypass<D: BinDecoder + ?Sized>(dec: &mut D, cursor: &mut BinCursor) -> Result<bool> {
    let bin = dec.decode_bin(CtxSel::Bypass)?;
    cursor.advance(bin);
    Ok(bin)
}

fn put_bin<E: BinEncoder + ?Sized>(
    enc: &mut E,
    part: &BinarizationPart,
    cursor: &mut BinCursor,
    derive: &mut DeriveFn,
    bin: bool,
) -> Result<()> {
    let sel = select(part, cursor, derive)?;
    enc.encode_bin(sel, bin)?;
    cursor.advance(bin);
    Ok(())
}

fn put_bypass<E: BinEncoder + ?Sized>(enc: &mut E, cursor: &mut BinCursor, bin: bool) -> Result<()> {
    enc.encode_bin(CtxSel::Bypass, bin)?;
    cursor.advance(bin);
    Ok(())
}

/// Number of FL bins for cMax (fixedLength = Ceil(Log2(cMax + 1))).
#[inline(always)]
pub fn fixed_length(c_max: u32) -> u32 {
    32 - c_max.leading_zeros()
}

/// `value` must not be `i32::MIN`.
#[inline(always)]
fn map_signed_unary(value: i32) -> u32 {
    if value > 0 {
        (2 * value as i64 - 1) as u32
    } else {
        (-2 * value as i64) as u32
    }
}

#[inline(always)]
fn unmap_signed_unary(k: u32) -> i32 {
    if k % 2 == 1 {
        ((k as i64 + 1) / 2) as i32
    } else {
        -((k / 2) as i32)
    }
}

fn decode_unary<D: BinDecoder + ?Sized>(
    dec: &mut D,
    part: &BinarizationPart,
    cursor: &mut BinCursor,
    derive: &mut DeriveFn,
    c_max: Option<u32>,
) -> Result<u32> {
    let mut value = 0u32;
    while c_max.map_or(true, |c_max| value < c_max) {
        if !next_bin(dec, part, cursor, derive)? {
            break;
        }
        value = value
            .checked_add(1)
            .ok_or_else(|| corrupt_data!("unary run does not end"))?;
    }
    Ok(value)
}

fn encode_unary<E: BinEncoder + ?Sized>(
    enc: &mut E,
    part: &BinarizationPart,
    cursor: &mut BinCursor,
    derive: &mut DeriveFn,
    value: u32,
    c_max: Option<u32>,
) -> Result<()> {
    for _ in 0..value {
        put_bin(enc, part, cursor, derive, true)?;
    }
    if c_max.map_or(true, |c_max| value < c_max) {
        put_bin(enc, part, cursor, derive, false)?;
    }
    Ok(())
}

fn decode_fixed_length<D: BinDecoder + ?Sized>(
    dec: &mut D,
    part: &BinarizationPart,
    cursor: &mut BinCursor,
    derive: &mut DeriveFn,
    c_max: u32,
) -> Result<u32> {
    let mut value = 0;
    for i in 0..fixed_length(c_max) {
        value |= (next_bin(dec, part, cursor, derive)? as u32) << i;
    }
    Ok(value)
}

fn encode_fixed_length<E: BinEncoder + ?Sized>(
    enc: &mut E,
    part: &BinarizationPart,
    cursor: &mut BinCursor,
    derive: &mut DeriveFn,
    value: u32,
    c_max: u32,
) -> Result<()> {
    for i in 0..fixed_length(c_max) {
        put_bin(enc, part, cursor, derive, (value >> i) & 1 > 0)?;
    }
    Ok(())
}

fn decode_ueg<D: BinDecoder + ?Sized>(
    dec: &mut D,
    part: &BinarizationPart,
    cursor: &mut BinCursor,
    derive: &mut DeriveFn,
    k: u32,
    signed: bool,
    u_coff: u32,
) -> Result<i32> {
    let prefix = decode_unary(dec, part, cursor, derive, Some(u_coff))?;
    let mut abs = prefix as i64;
    if prefix == u_coff {
        let mut k = k;
        while next_bypass(dec, cursor)? {
            abs += 1 << k;
            k += 1;
            if k >= 31 {
                return Err(corrupt_data!("UEG{} suffix does not end", k));
            }
        }
        while k > 0 {
            k -= 1;
            abs += (next_bypass(dec, cursor)? as i64) << k;
        }
    }
    if abs > i32::MAX as i64 {
        return Err(corrupt_data!("UEG value {} out of range", abs));
    }
    if signed && abs != 0 && next_bypass(dec, cursor)? {
        Ok(-(abs as i32))
    } else {
        Ok(abs as i32)
    }
}

#[allow(clippy::too_many_arguments)]
fn encode_ueg<E: BinEncoder + ?Sized>(
    enc: &mut E,
    part: &BinarizationPart,
    cursor: &mut BinCursor,
    derive: &mut DeriveFn,
    value: i32,
    k: u32,
    signed: bool,
    u_coff: u32,
) -> Result<()> {
    let abs = value.unsigned_abs();
    encode_unary(enc, part, cursor, derive, abs.min(u_coff), Some(u_coff))?;
    if abs >= u_coff {
        let mut suffix = (abs - u_coff) as u64;
        let mut k = k;
        while suffix >= 1 << k {
            put_bypass(enc, cursor, true)?;
            suffix -= 1 << k;
            k += 1;
        }
        put_bypass(enc, cursor, false)?;
        while k > 0 {
            k -= 1;
            put_bypass(enc, cursor, (suffix >> k) & 1 > 0)?;
        }
    }
    if signed && value != 0 {
        put_bypass(enc, cursor, value < 0)?;
    }
    Ok(())
}

fn decode_table<D: BinDecoder + ?Sized>(
    dec: &mut D,
    part: &BinarizationPart,
    cursor: &mut BinCursor,
    derive: &mut DeriveFn,
    table: &CodeTable,
) -> Result<PartValue> {
    let mut code = String::with_capacity(table.max_len());
    while code.len() < table.max_len() {
        code.push(if next_bin(dec, part, cursor, derive)? { '1' } else { '0' });
        if let Some(value) = table.codes.iter().position(|c| *c == code) {
            return Ok(PartValue::Value(value as i32));
        }
        if table.escape == Some(code.as_str()) {
            return Ok(PartValue::Escape);
        }
    }
    Err(corrupt_data!("bins {} match no {} code", code, table.name))
}

fn table_code(table: &CodeTable, value: PartValue) -> Result<&'static str> {
    match value {
        PartValue::Escape => table.escape,
        PartValue::Value(v) => usize::try_from(v)
            .ok()
            .and_then(|v| table.codes.get(v))
            .copied()
            .filter(|c| !c.is_empty()),
    }
    .ok_or_else(|| protocol_violation!("{:?} has no {} code", value, table.name))
}

fn encode_table<E: BinEncoder + ?Sized>(
    enc: &mut E,
    part: &BinarizationPart,
    cursor: &mut BinCursor,
    derive: &mut DeriveFn,
    table: &CodeTable,
    value: PartValue,
) -> Result<()> {
    let code = table_code(table, value)?;
    for c in code.chars() {
        put_bin(enc, part, cursor, derive, c == '1')?;
    }
    Ok(())
}

/// Debinarizes one part, pulling bins from `dec`.
pub fn decode_part<D: BinDecoder + ?Sized>(
    dec: &mut D,
    part: &BinarizationPart,
    derive: &mut DeriveFn,
) -> Result<PartValue> {
    let mut cursor = BinCursor::new();
    let cursor = &mut cursor;
    let value = match part.process {
        BinProcess::U { mapped: false } => decode_unary(dec, part, cursor, derive, None)? as i32,
        BinProcess::U { mapped: true } => {
            unmap_signed_unary(decode_unary(dec, part, cursor, derive, None)?)
        }
        BinProcess::TU(c_max) => decode_unary(dec, part, cursor, derive, Some(c_max))? as i32,
        BinProcess::FL(c_max) => decode_fixed_length(dec, part, cursor, derive, c_max)? as i32,
        BinProcess::UEG { k, signed, u_coff } => {
            decode_ueg(dec, part, cursor, derive, k, signed, u_coff)?
        }
        BinProcess::Table(table) => return decode_table(dec, part, cursor, derive, table),
    };
    Ok(PartValue::Value(value))
}

/// Checks that `value` has a binarization in `part` without coding a bin.
pub fn check_value(part: &BinarizationPart, value: PartValue) -> Result<()> {
    let v = match (part.process, value) {
        (BinProcess::Table(table), _) => return table_code(table, value).map(|_| ()),
        (_, PartValue::Value(v)) => v,
        (process, PartValue::Escape) => {
            return Err(protocol_violation!("{:?} has no escape", process))
        }
    };
    let in_range = match part.process {
        BinProcess::U { mapped: false } => v >= 0,
        BinProcess::U { mapped: true } => v != i32::MIN,
        BinProcess::TU(c_max) | BinProcess::FL(c_max) => {
            u32::try_from(v).map_or(false, |v| v <= c_max)
        }
        BinProcess::UEG { signed, .. } => signed || v >= 0,
        BinProcess::Table(_) => true,
    };
    if in_range {
        Ok(())
    } else {
        Err(protocol_violation!("value {} out of range for {:?}", v, part.process))
    }
}

/// Binarizes one part, pushing bins into `enc`. Nothing is coded for a value
/// `check_value` rejects.
pub fn encode_part<E: BinEncoder + ?Sized>(
    enc: &mut E,
    part: &BinarizationPart,
    derive: &mut DeriveFn,
    value: PartValue,
) -> Result<()> {
    check_value(part, value)?;
    let mut cursor = BinCursor::new();
    let cursor = &mut cursor;
    match (part.process, value) {
        (BinProcess::Table(table), _) => encode_table(enc, part, cursor, derive, table, value),
        (process, PartValue::Escape) => Err(protocol_violation!("{:?} has no escape", process)),
        (BinProcess::U { mapped: false }, PartValue::Value(v)) => {
            encode_unary(enc, part, cursor, derive, v as u32, None)
        }
        (BinProcess::U { mapped: true }, PartValue::Value(v)) => {
            encode_unary(enc, part, cursor, derive, map_signed_unary(v), None)
        }
        (BinProcess::TU(c_max), PartValue::Value(v)) => {
            encode_unary(enc, part, cursor, derive, v as u32, Some(c_max))
        }
        (BinProcess::FL(c_max), PartValue::Value(v)) => {
            encode_fixed_length(enc, part, cursor, derive, v as u32, c_max)
        }
        (BinProcess::UEG { k, signed, u_coff }, PartValue::Value(v)) => {
            encode_ueg(enc, part, cursor, derive, v, k, signed, u_coff)
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::slice_header::*;
    use rand::{prelude::StdRng, Rng, SeedableRng};

    /// Records coded bins with their context selection.
    #[derive(Default)]
    pub struct BinRecorder {
        pub bins: Vec<(CtxSel, bool)>,
    }

    impl BinEncoder for BinRecorder {
        fn encode_bin(&mut self, sel: CtxSel, bin: bool) -> Result<()> {
            self.bins.push((sel, bin));
            Ok(())
        }
    }

    /// Replays recorded bins and checks the decoder selects the same contexts.
    pub struct BinReplayer {
        pub bins: Vec<(CtxSel, bool)>,
        pub index: usize,
    }

    impl BinDecoder for BinReplayer {
        fn decode_bin(&mut self, sel: CtxSel) -> Result<bool> {
            let (expected, bin) = *self.bins.get(self.index).ok_or(CabacError::StreamExhausted)?;
            assert_eq!(sel, expected, "bin {}", self.index);
            self.index += 1;
            Ok(bin)
        }
    }

    fn bin_string(bins: &[(CtxSel, bool)]) -> String {
        bins.iter().map(|(_, b)| if *b { '1' } else { '0' }).collect()
    }

    fn round_trip(part: &BinarizationPart, value: PartValue, derive: &mut DeriveFn) -> Vec<(CtxSel, bool)> {
        let mut rec = BinRecorder::default();
        encode_part(&mut rec, part, derive, value).unwrap();
        let mut rep = BinReplayer {
            bins: rec.bins.clone(),
            index: 0,
        };
        assert_eq!(decode_part(&mut rep, part, derive).unwrap(), value);
        assert_eq!(rep.index, rec.bins.len());
        rec.bins
    }

    fn ueg_part(k: u32, signed: bool, u_coff: u32) -> BinarizationPart {
        BinarizationPart {
            process: BinProcess::UEG { k, signed, u_coff },
            ctx_offset: CtxOffset::Context(40),
            rules: &[CtxIncRule::Number(0), CtxIncRule::Number(3)],
        }
    }

    #[test]
    fn ueg0_saturated_prefix_works() {
        let part = ueg_part(0, false, 14);
        let bins = round_trip(&part, PartValue::Value(14), &mut no_derivation);
        assert_eq!(bin_string(&bins), "111111111111110");
        assert_eq!(bins[13].0, CtxSel::Context(43));
        assert_eq!(bins[14].0, CtxSel::Bypass);
    }

    #[test]
    fn ueg3_signed_without_suffix_works() {
        let part = ueg_part(3, true, 9);
        let bins = round_trip(&part, PartValue::Value(-5), &mut no_derivation);
        assert_eq!(bin_string(&bins), "1111101");
        assert_eq!(bins[5].0, CtxSel::Context(43));
        assert_eq!(bins[6].0, CtxSel::Bypass);
        let bins = round_trip(&part, PartValue::Value(0), &mut no_derivation);
        assert_eq!(bin_string(&bins), "0");
        // 9 ones, suffix 3 as "0011", sign
        let bins = round_trip(&part, PartValue::Value(12), &mut no_derivation);
        assert_eq!(bin_string(&bins), "11111111100110");
        let bins = round_trip(&part, PartValue::Value(-17), &mut no_derivation);
        assert_eq!(bin_string(&bins), "1111111111000001");
        assert_eq!(bins.len(), 9 + 1 + 1 + 4 + 1);
    }

    #[test]
    fn ueg_random_values_works() {
        let mut rng: StdRng = SeedableRng::seed_from_u64(3);
        let mvd = ueg_part(3, true, 9);
        let level = ueg_part(0, false, 14);
        for _ in 0..2000 {
            let magnitude = match rng.gen_range(0..3) {
                0 => rng.gen_range(0..20),
                1 => rng.gen_range(0..1000),
                _ => rng.gen_range(0..(1 << 24)),
            };
            round_trip(&level, PartValue::Value(magnitude), &mut no_derivation);
            let signed = if rng.gen_bool(0.5) { -magnitude } else { magnitude };
            round_trip(&mvd, PartValue::Value(signed), &mut no_derivation);
        }
        let mut rec = BinRecorder::default();
        assert!(encode_part(&mut rec, &level, &mut no_derivation, PartValue::Value(-1)).is_err());
    }

    #[test]
    fn truncated_unary_works() {
        let part = BinarizationPart {
            process: BinProcess::TU(3),
            ctx_offset: CtxOffset::Context(64),
            rules: &[CtxIncRule::Derived, CtxIncRule::Number(3)],
        };
        let mut derive = |cursor: &BinCursor| -> Result<usize> {
            assert_eq!(cursor.bin_idx, 0);
            Ok(2)
        };
        assert_eq!(bin_string(&round_trip(&part, PartValue::Value(0), &mut derive)), "0");
        assert_eq!(bin_string(&round_trip(&part, PartValue::Value(2), &mut derive)), "110");
        let bins = round_trip(&part, PartValue::Value(3), &mut derive);
        assert_eq!(bin_string(&bins), "111");
        assert_eq!(
            bins.iter().map(|(sel, _)| *sel).collect::<Vec<CtxSel>>(),
            vec![CtxSel::Context(66), CtxSel::Context(67), CtxSel::Context(67)]
        );
        let mut rec = BinRecorder::default();
        assert!(encode_part(&mut rec, &part, &mut derive, PartValue::Value(4)).is_err());
    }

    #[test]
    fn fixed_length_is_lsb_first_works() {
        let sh = SliceHeader::new(SliceType::I, 30);
        let rem = descriptor(SyntaxElement::RemIntraPredMode, &sh, None).unwrap().prefix;
        let bins = round_trip(&rem, PartValue::Value(6), &mut no_derivation);
        assert_eq!(bin_string(&bins), "011");
        assert!(bins.iter().all(|(sel, _)| *sel == CtxSel::Context(69)));
        assert_eq!(fixed_length(1), 1);
        assert_eq!(fixed_length(7), 3);
        assert_eq!(fixed_length(15), 4);
    }

    #[test]
    fn mapped_unary_works() {
        let sh = SliceHeader::new(SliceType::P, 30);
        let qp = descriptor(SyntaxElement::MbQpDelta, &sh, None).unwrap().prefix;
        let mut derive = |_: &BinCursor| -> Result<usize> { Ok(1) };
        assert_eq!(bin_string(&round_trip(&qp, PartValue::Value(0), &mut derive)), "0");
        assert_eq!(bin_string(&round_trip(&qp, PartValue::Value(1), &mut derive)), "10");
        assert_eq!(bin_string(&round_trip(&qp, PartValue::Value(-1), &mut derive)), "110");
        let bins = round_trip(&qp, PartValue::Value(2), &mut derive);
        assert_eq!(bin_string(&bins), "1110");
        assert_eq!(bins[0].0, CtxSel::Context(61));
        assert_eq!(bins[1].0, CtxSel::Context(62));
        assert_eq!(bins[3].0, CtxSel::Context(63));
        for v in -26..=25 {
            round_trip(&qp, PartValue::Value(v), &mut derive);
        }
    }

    #[test]
    fn i_slice_mb_type_works() {
        let sh = SliceHeader::new(SliceType::I, 30);
        let part = descriptor(SyntaxElement::MbType, &sh, None).unwrap().prefix;
        let mut derive = |_: &BinCursor| -> Result<usize> { Ok(0) };
        for v in 0..26 {
            round_trip(&part, PartValue::Value(v), &mut derive);
        }
        let bins = round_trip(&part, PartValue::Value(25), &mut derive);
        assert_eq!(bins, vec![(CtxSel::Context(3), true), (CtxSel::Terminate, true)]);
        // 1 0 0 1 0 1 1: bin 4 follows b3 = 1, bins 5 and 6 use 6 and 7
        let bins = round_trip(&part, PartValue::Value(7), &mut derive);
        assert_eq!(bin_string(&bins), "1001010");
        assert_eq!(
            bins.iter().map(|(sel, _)| *sel).collect::<Vec<CtxSel>>(),
            vec![
                CtxSel::Context(3),
                CtxSel::Terminate,
                CtxSel::Context(6),
                CtxSel::Context(7),
                CtxSel::Context(8),
                CtxSel::Context(9),
                CtxSel::Context(10),
            ]
        );
    }

    #[test]
    fn prefix_escape_works() {
        let sh = SliceHeader::new(SliceType::B, 30);
        let desc = descriptor(SyntaxElement::MbType, &sh, None).unwrap();
        let mut derive = |_: &BinCursor| -> Result<usize> { Ok(1) };
        let bins = round_trip(&desc.prefix, PartValue::Escape, &mut derive);
        assert_eq!(bin_string(&bins), "111101");
        for v in 0..23 {
            round_trip(&desc.prefix, PartValue::Value(v), &mut derive);
        }
        let sh = SliceHeader::new(SliceType::P, 30);
        let desc = descriptor(SyntaxElement::MbType, &sh, None).unwrap();
        let mut rec = BinRecorder::default();
        assert!(matches!(
            encode_part(&mut rec, &desc.prefix, &mut no_derivation, PartValue::Value(4)),
            Err(CabacError::ProtocolViolation(_))
        ));
        let bins = round_trip(&desc.prefix, PartValue::Value(2), &mut no_derivation);
        assert_eq!(
            bins,
            vec![
                (CtxSel::Context(14), false),
                (CtxSel::Context(15), true),
                (CtxSel::Context(17), false),
            ]
        );
    }

    #[test]
    fn sub_mb_type_works() {
        let sh = SliceHeader::new(SliceType::B, 30);
        let part = descriptor(SyntaxElement::SubMbType, &sh, None).unwrap().prefix;
        for v in 0..13 {
            round_trip(&part, PartValue::Value(v), &mut no_derivation);
        }
        let bins = round_trip(&part, PartValue::Value(4), &mut no_derivation);
        assert_eq!(bin_string(&bins), "11001");
        assert_eq!(
            bins.iter().map(|(sel, _)| *sel).collect::<Vec<CtxSel>>(),
            vec![
                CtxSel::Context(36),
                CtxSel::Context(37),
                CtxSel::Context(38),
                CtxSel::Context(39),
                CtxSel::Context(39),
            ]
        );
    }

    #[test]
    fn rejected_values_code_nothing_works() {
        let sh = SliceHeader::new(SliceType::P, 30);
        let qp = descriptor(SyntaxElement::MbQpDelta, &sh, None).unwrap().prefix;
        let mut derive = |_: &BinCursor| -> Result<usize> { Ok(0) };
        let mut rec = BinRecorder::default();
        assert!(matches!(
            encode_part(&mut rec, &qp, &mut derive, PartValue::Value(i32::MIN)),
            Err(CabacError::ProtocolViolation(_))
        ));
        assert!(check_value(&qp, PartValue::Value(i32::MIN + 1)).is_ok());
        assert!(check_value(&qp, PartValue::Escape).is_err());

        let desc = descriptor(SyntaxElement::MbType, &sh, None).unwrap();
        let suffix = desc.suffix.unwrap();
        assert!(check_value(&suffix, PartValue::Value(25)).is_ok());
        assert!(encode_part(&mut rec, &suffix, &mut derive, PartValue::Value(26)).is_err());
        assert!(check_value(&desc.prefix, PartValue::Escape).is_ok());

        let level = ueg_part(0, false, 14);
        assert!(encode_part(&mut rec, &level, &mut no_derivation, PartValue::Value(-3)).is_err());
        assert!(rec.bins.is_empty());
    }

    #[test]
    fn endless_ueg_suffix_is_corrupt_data_works() {
        let part = ueg_part(0, false, 14);
        let mut bins = vec![(CtxSel::Context(40), true)];
        bins.extend(std::iter::repeat((CtxSel::Context(43), true)).take(13));
        bins.extend(std::iter::repeat((CtxSel::Bypass, true)).take(40));
        let mut rep = BinReplayer { bins, index: 0 };
        assert!(matches!(
            decode_part(&mut rep, &part, &mut no_derivation),
            Err(CabacError::CorruptData(_))
        ));
        assert_eq!(rep.index, 14 + 31);
    }
}
