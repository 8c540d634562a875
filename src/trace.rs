use super::binary_reader::*;
use super::binary_writer::*;
use super::cabac_contexts::*;
use super::cabac_reader::*;
use super::cabac_writer::*;
use super::error::*;
use super::neighbour::*;
use std::collections::HashMap;
use std::fmt;

/// Pseudo element carrying a whole residual_block_cabac().
pub const RESIDUAL_BLOCK: &str = "residual_block";

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TraceElement {
    Syntax(SyntaxElement),
    ResidualBlock,
}

impl fmt::Display for TraceElement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TraceElement::Syntax(element) => write!(f, "{}", element),
            TraceElement::ResidualBlock => write!(f, "{}", RESIDUAL_BLOCK),
        }
    }
}

/// One line of a trace: `<element> <value> [key=value ...]`.
///
/// A residual_block value lists the levels of the block separated by commas.
/// Keys: `list`, `cat`, `field`, `idx`, `gt1`, `eq1`, `start`, `end`.
#[derive(Clone, Debug, PartialEq)]
pub struct TraceEntry {
    pub line: usize,
    pub element: TraceElement,
    pub values: Vec<i32>,
    pub params: HashMap<String, String>,
}

fn trace_error(line: usize, message: String) -> CabacError {
    CabacError::Trace { line, message }
}

impl TraceEntry {
    pub fn end_of_slice(line: usize) -> TraceEntry {
        TraceEntry {
            line,
            element: TraceElement::Syntax(SyntaxElement::EndOfSliceFlag),
            values: vec![1],
            params: HashMap::new(),
        }
    }

    pub fn is_end_of_slice(&self) -> bool {
        self.element == TraceElement::Syntax(SyntaxElement::EndOfSliceFlag)
            && self.values == [1]
    }

    fn param(&self, key: &str, default: usize) -> Result<usize> {
        match self.params.get(key) {
            Some(v) => v
                .parse::<usize>()
                .map_err(|_| trace_error(self.line, format!("invalid {}={}", key, v))),
            None => Ok(default),
        }
    }

    fn value(&self) -> i32 {
        self.values.first().copied().unwrap_or(0)
    }

    fn unsigned_value(&self) -> Result<u32> {
        u32::try_from(self.value())
            .map_err(|_| trace_error(self.line, format!("negative {} value", self.element)))
    }

    fn flag(&self) -> bool {
        self.value() != 0
    }

    fn block(&self) -> Result<ResidualBlock> {
        let cat = match self.params.get("cat") {
            Some(_) => CtxBlockCat::from_index(self.param("cat", 0)?)?,
            None => {
                return Err(trace_error(
                    self.line,
                    format!("{} needs cat=<ctxBlockCat>", self.element),
                ))
            }
        };
        Ok(ResidualBlock {
            cat,
            field_coded: self.param("field", 0)? != 0,
        })
    }

    fn scan_range(&self, block: &ResidualBlock, num_c8x8: usize) -> Result<(usize, usize)> {
        let max_num_coeff = block.cat.max_num_coeff(num_c8x8);
        let start_idx = self.param("start", 0)?;
        let end_idx = self.param("end", max_num_coeff.saturating_sub(1))?;
        Ok((start_idx, end_idx))
    }

    /// Traced values, a residual block padded with zero levels up to
    /// maxNumCoeff.
    pub fn padded_values(&self, num_c8x8: usize) -> Result<Vec<i32>> {
        if self.element != TraceElement::ResidualBlock {
            return Ok(self.values.clone());
        }
        let max_num_coeff = self.block()?.cat.max_num_coeff(num_c8x8);
        if self.values.len() > max_num_coeff {
            return Err(trace_error(
                self.line,
                format!("{} levels for a block of {}", self.values.len(), max_num_coeff),
            ));
        }
        let mut levels = self.values.clone();
        levels.resize(max_num_coeff, 0);
        Ok(levels)
    }

    /// The entry with `values` in place of the traced ones.
    pub fn with_values(&self, values: Vec<i32>) -> TraceEntry {
        TraceEntry {
            values,
            ..self.clone()
        }
    }
}

impl fmt::Display for TraceEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let values = self
            .values
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<String>>()
            .join(",");
        write!(f, "{} {}", self.element, values)?;
        let mut keys = self.params.keys().collect::<Vec<&String>>();
        keys.sort();
        for key in keys {
            write!(f, " {}={}", key, self.params[key])?;
        }
        Ok(())
    }
}

fn parse_line(line: usize, text: &str) -> Result<Option<TraceEntry>> {
    let text = match text.find('#') {
        Some(pos) => &text[..pos],
        None => text,
    };
    let mut tokens = text.split_whitespace();
    let name = match tokens.next() {
        Some(name) => name,
        None => return Ok(None),
    };
    let element = if name == RESIDUAL_BLOCK {
        TraceElement::ResidualBlock
    } else {
        TraceElement::Syntax(
            SyntaxElement::from_name(name)
                .ok_or_else(|| trace_error(line, format!("unknown element {}", name)))?,
        )
    };
    let value = tokens
        .next()
        .ok_or_else(|| trace_error(line, format!("{} without value", name)))?;
    let values = value
        .split(',')
        .map(|v| v.parse::<i32>())
        .collect::<std::result::Result<Vec<i32>, _>>()
        .map_err(|_| trace_error(line, format!("invalid value {}", value)))?;
    if element != TraceElement::ResidualBlock && values.len() != 1 {
        return Err(trace_error(line, format!("{} takes one value", name)));
    }
    let mut params = HashMap::new();
    for param in tokens {
        let param = param.split('=').collect::<Vec<&str>>();
        if let [key, val] = &param[..] {
            params.insert(key.to_string(), val.to_string());
        } else {
            return Err(trace_error(line, format!("invalid parameter {}", param.join("="))));
        }
    }
    Ok(Some(TraceEntry {
        line,
        element,
        values,
        params,
    }))
}

/// Parses a whole trace. Lines are numbered from 1; `#` starts a comment.
pub fn parse_trace(text: &str) -> Result<Vec<TraceEntry>> {
    let mut entries = vec![];
    for (i, line) in text.lines().enumerate() {
        if let Some(entry) = parse_line(i + 1, line)? {
            entries.push(entry);
        }
    }
    Ok(entries)
}

/// Codes one entry. Neighbour dependent contexts see `nb`.
pub fn encode_entry<W: BitWrite, N: NeighbourSource + ?Sized>(
    writer: &mut CabacWriter<W>,
    nb: &N,
    entry: &TraceEntry,
) -> Result<()> {
    let element = match entry.element {
        TraceElement::Syntax(element) => element,
        TraceElement::ResidualBlock => {
            let block = entry.block()?;
            let num_c8x8 = writer.slice_header().num_c8x8();
            let (start_idx, end_idx) = entry.scan_range(&block, num_c8x8)?;
            let levels = entry.padded_values(num_c8x8)?;
            return writer.write_residual_block(nb, block, start_idx, end_idx, &levels);
        }
    };
    match element {
        SyntaxElement::MbType => writer.write_mb_type(nb, entry.unsigned_value()?),
        SyntaxElement::MbSkipFlag => writer.write_mb_skip_flag(nb, entry.flag()),
        SyntaxElement::SubMbType => writer.write_sub_mb_type(entry.unsigned_value()?),
        SyntaxElement::MvdX => writer.write_mvd(nb, entry.param("list", 0)?, 0, entry.value()),
        SyntaxElement::MvdY => writer.write_mvd(nb, entry.param("list", 0)?, 1, entry.value()),
        SyntaxElement::RefIdx => {
            writer.write_ref_idx(nb, entry.param("list", 0)?, entry.unsigned_value()?)
        }
        SyntaxElement::MbQpDelta => writer.write_mb_qp_delta(nb, entry.value()),
        SyntaxElement::IntraChromaPredMode => {
            writer.write_intra_chroma_pred_mode(nb, entry.unsigned_value()?)
        }
        SyntaxElement::PrevIntraPredModeFlag => {
            writer.write_prev_intra4x4_pred_mode_flag(entry.flag())
        }
        SyntaxElement::RemIntraPredMode => {
            writer.write_rem_intra4x4_pred_mode(entry.unsigned_value()?)
        }
        SyntaxElement::MbFieldDecodingFlag => writer.write_mb_field_decoding_flag(nb, entry.flag()),
        SyntaxElement::CodedBlockPattern => {
            writer.write_coded_block_pattern(nb, entry.unsigned_value()?)
        }
        SyntaxElement::CodedBlockFlag => {
            writer.write_coded_block_flag(nb, entry.block()?, entry.flag())
        }
        SyntaxElement::SignificantCoeffFlag => {
            writer.write_significant_coeff_flag(entry.block()?, entry.param("idx", 0)?, entry.flag())
        }
        SyntaxElement::LastSignificantCoeffFlag => writer.write_last_significant_coeff_flag(
            entry.block()?,
            entry.param("idx", 0)?,
            entry.flag(),
        ),
        SyntaxElement::CoeffAbsLevelMinus1 => writer.write_coeff_abs_level_minus1(
            entry.block()?,
            entry.param("gt1", 0)?,
            entry.param("eq1", 0)?,
            entry.unsigned_value()?,
        ),
        SyntaxElement::CoeffSignFlag => writer.write_coeff_sign_flag(entry.flag()),
        SyntaxElement::TransformSize8x8Flag => {
            writer.write_transform_size_8x8_flag(nb, entry.flag())
        }
        SyntaxElement::EndOfSliceFlag => writer.write_end_of_slice_flag(entry.flag()),
    }
}

/// Decodes the element named by `entry` and returns the decoded values.
pub fn decode_entry<R: BitRead, N: NeighbourSource + ?Sized>(
    reader: &mut CabacReader<R>,
    nb: &N,
    entry: &TraceEntry,
) -> Result<Vec<i32>> {
    let element = match entry.element {
        TraceElement::Syntax(element) => element,
        TraceElement::ResidualBlock => {
            let block = entry.block()?;
            let (start_idx, end_idx) =
                entry.scan_range(&block, reader.slice_header().num_c8x8())?;
            return reader.read_residual_block(nb, block, start_idx, end_idx);
        }
    };
    let value = match element {
        SyntaxElement::MbType => reader.read_mb_type(nb)? as i32,
        SyntaxElement::MbSkipFlag => reader.read_mb_skip_flag(nb)? as i32,
        SyntaxElement::SubMbType => reader.read_sub_mb_type()? as i32,
        SyntaxElement::MvdX => reader.read_mvd(nb, entry.param("list", 0)?, 0)?,
        SyntaxElement::MvdY => reader.read_mvd(nb, entry.param("list", 0)?, 1)?,
        SyntaxElement::RefIdx => reader.read_ref_idx(nb, entry.param("list", 0)?)? as i32,
        SyntaxElement::MbQpDelta => reader.read_mb_qp_delta(nb)?,
        SyntaxElement::IntraChromaPredMode => reader.read_intra_chroma_pred_mode(nb)? as i32,
        SyntaxElement::PrevIntraPredModeFlag => {
            reader.read_prev_intra4x4_pred_mode_flag()? as i32
        }
        SyntaxElement::RemIntraPredMode => reader.read_rem_intra4x4_pred_mode()? as i32,
        SyntaxElement::MbFieldDecodingFlag => reader.read_mb_field_decoding_flag(nb)? as i32,
        SyntaxElement::CodedBlockPattern => reader.read_coded_block_pattern(nb)? as i32,
        SyntaxElement::CodedBlockFlag => reader.read_coded_block_flag(nb, entry.block()?)? as i32,
        SyntaxElement::SignificantCoeffFlag => {
            reader.read_significant_coeff_flag(entry.block()?, entry.param("idx", 0)?)? as i32
        }
        SyntaxElement::LastSignificantCoeffFlag => {
            reader.read_last_significant_coeff_flag(entry.block()?, entry.param("idx", 0)?)? as i32
        }
        SyntaxElement::CoeffAbsLevelMinus1 => reader.read_coeff_abs_level_minus1(
            entry.block()?,
            entry.param("gt1", 0)?,
            entry.param("eq1", 0)?,
        )? as i32,
        SyntaxElement::CoeffSignFlag => reader.read_coeff_sign_flag()? as i32,
        SyntaxElement::TransformSize8x8Flag => reader.read_transform_size_8x8_flag(nb)? as i32,
        SyntaxElement::EndOfSliceFlag => reader.read_end_of_slice_flag()? as i32,
    };
    Ok(vec![value])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bins::*;
    use crate::slice_header::*;

    const TRACE: &str = "\
# one I macroblock
mb_type 3
mb_qp_delta -2   # delta
intra_chroma_pred_mode 1
coded_block_pattern 31
residual_block 5,0,-1,0,2 cat=0
residual_block 0,0,0,1 cat=3 field=1
coded_block_flag 1 cat=2
significant_coeff_flag 1 cat=2 idx=3
coeff_abs_level_minus1 20 cat=2 gt1=1 eq1=2
coeff_sign_flag 1
end_of_slice_flag 0
";

    #[test]
    fn parse_trace_works() {
        let entries = parse_trace(TRACE).unwrap();
        assert_eq!(entries.len(), 11);
        assert_eq!(entries[0].line, 2);
        assert_eq!(
            entries[1].element,
            TraceElement::Syntax(SyntaxElement::MbQpDelta)
        );
        assert_eq!(entries[1].values, vec![-2]);
        assert_eq!(entries[4].element, TraceElement::ResidualBlock);
        assert_eq!(entries[4].to_string(), "residual_block 5,0,-1,0,2 cat=0");
        assert!(!entries[10].is_end_of_slice());
        assert!(TraceEntry::end_of_slice(12).is_end_of_slice());
    }

    #[test]
    fn parse_errors_works() {
        for (text, line) in [
            ("mb_type 1\nmb_kind 3", 2),
            ("\n\nmb_type", 3),
            ("mb_type x", 1),
            ("mb_type 1,2", 1),
            ("mvd_x 1 list", 1),
        ] {
            match parse_trace(text) {
                Err(CabacError::Trace { line: l, .. }) => assert_eq!(l, line, "{}", text),
                other => panic!("{}: {:?}", text, other),
            }
        }
    }

    #[test]
    fn trace_round_trip_works() {
        let mut entries = parse_trace(TRACE).unwrap();
        entries.push(TraceEntry::end_of_slice(0));
        let sh = SliceHeader::new(SliceType::I, 27);
        let nb = NeighbourSnapshot::unavailable();

        let mut writer = CabacWriter::new(Bins::new(), sh.clone()).unwrap();
        for entry in entries.iter() {
            encode_entry(&mut writer, &nb, entry).unwrap();
        }
        let bins = writer.finish().unwrap();

        let mut reader = CabacReader::new(bins.reader(), sh).unwrap();
        for entry in entries.iter() {
            let values = decode_entry(&mut reader, &nb, entry).unwrap();
            assert_eq!(values, entry.padded_values(1).unwrap(), "line {}", entry.line);
        }
    }

    #[test]
    fn missing_block_category_works() {
        let entries = parse_trace("coded_block_flag 1").unwrap();
        let sh = SliceHeader::new(SliceType::I, 27);
        let mut writer = CabacWriter::new(Bins::new(), sh).unwrap();
        assert!(matches!(
            encode_entry(&mut writer, &NeighbourSnapshot::unavailable(), &entries[0]),
            Err(CabacError::Trace { line: 1, .. })
        ));
    }
}
