use super::arithmetic_decoder::*;
use super::binarization::*;
use super::binary_reader::*;
use super::cabac_contexts::*;
use super::context::*;
use super::ctx_derivation::*;
use super::error::*;
use super::neighbour::*;
use super::slice_header::*;
use debug_print::*;

/// CABAC parsing of the slice_data() of one slice.
pub struct CabacReader<R: BitRead> {
    reader: R,
    engine: ArithmeticDecoder,
    contexts: ContextStore,
    slice_header: SliceHeader,
    state: SliceDataState,
}

impl<R: BitRead> CabacReader<R> {
    /// Skips cabac_alignment_one_bit and initializes the decoding engine.
    pub fn new(mut reader: R, slice_header: SliceHeader) -> Result<CabacReader<R>> {
        slice_header.validate()?;
        reader.byte_align()?;
        let engine = ArithmeticDecoder::new(&mut reader)?;
        let contexts = ContextStore::new(slice_header.init_type(), slice_header.slice_qp_y);
        Ok(CabacReader {
            reader,
            engine,
            contexts,
            slice_header,
            state: SliceDataState::Coding,
        })
    }

    pub fn slice_header(&self) -> &SliceHeader {
        &self.slice_header
    }

    pub fn contexts(&self) -> &ContextStore {
        &self.contexts
    }

    pub fn state(&self) -> SliceDataState {
        self.state
    }

    pub fn get_ref(&self) -> &R {
        &self.reader
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Runs one element call. Any error leaves the reader `Failed`.
    fn guarded<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.state == SliceDataState::Failed {
            return Err(protocol_violation!("slice data abandoned after an error"));
        }
        let result = f(self);
        if result.is_err() {
            self.state = SliceDataState::Failed;
        }
        result
    }

    fn element(
        &mut self,
        element: SyntaxElement,
        block: Option<ResidualBlock>,
        derive: &mut DeriveFn,
    ) -> Result<i32> {
        let desc = descriptor(element, &self.slice_header, block)?;
        let value = match decode_part(self, &desc.prefix, derive)? {
            PartValue::Value(v) => v,
            PartValue::Escape => {
                return Err(protocol_violation!("unexpected escape in {}", element))
            }
        };
        debug_eprintln!("{} = {}", element, value);
        Ok(value)
    }

    pub fn read_mb_skip_flag<N: NeighbourSource + ?Sized>(&mut self, nb: &N) -> Result<bool> {
        self.guarded(|r| {
            let v = r.element(SyntaxElement::MbSkipFlag, None, &mut |_| mb_skip_flag_inc(nb))?;
            Ok(v != 0)
        })
    }

    pub fn read_mb_field_decoding_flag<N: NeighbourSource + ?Sized>(
        &mut self,
        nb: &N,
    ) -> Result<bool> {
        self.guarded(|r| {
            let v = r.element(SyntaxElement::MbFieldDecodingFlag, None, &mut |_| {
                mb_field_decoding_flag_inc(nb)
            })?;
            Ok(v != 0)
        })
    }

    /// mb_type as numbered in the tables of the slice type (an SI slice
    /// yields 0 for SI and 1..=26 for the I types).
    pub fn read_mb_type<N: NeighbourSource + ?Sized>(&mut self, nb: &N) -> Result<u32> {
        self.guarded(|r| r.mb_type(nb))
    }

    fn mb_type<N: NeighbourSource + ?Sized>(&mut self, nb: &N) -> Result<u32> {
        let slice_type = self.slice_header.slice_type;
        let desc = descriptor(SyntaxElement::MbType, &self.slice_header, None)?;
        let prefix_offset = desc.prefix.ctx_idx_offset().unwrap_or(0);
        let prefix = decode_part(self, &desc.prefix, &mut |_| mb_type_inc(nb, prefix_offset))?;
        let mb_type = match (prefix, desc.suffix) {
            (PartValue::Value(v), _) => v as u32,
            (PartValue::Escape, Some(suffix)) => {
                let suffix_offset = suffix.ctx_idx_offset().unwrap_or(0);
                match decode_part(self, &suffix, &mut |_| mb_type_inc(nb, suffix_offset))? {
                    PartValue::Value(v) => mb_type_suffix_base(slice_type) + v as u32,
                    PartValue::Escape => {
                        return Err(protocol_violation!("escape in mb_type suffix"))
                    }
                }
            }
            (PartValue::Escape, None) => {
                return Err(protocol_violation!("mb_type escape without suffix"))
            }
        };
        debug_eprintln!("mb_type = {} ({} slice)", mb_type, slice_type);
        if is_i_pcm(slice_type, mb_type) {
            debug_eprintln!("I_PCM escape");
        }
        Ok(mb_type)
    }

    pub fn read_sub_mb_type(&mut self) -> Result<u32> {
        self.guarded(|r| Ok(r.element(SyntaxElement::SubMbType, None, &mut no_derivation)? as u32))
    }

    pub fn read_ref_idx<N: NeighbourSource + ?Sized>(&mut self, nb: &N, list: usize) -> Result<u32> {
        self.guarded(|r| {
            check_ref_list(list)?;
            let mbaff_frame_flag = r.slice_header.mbaff_frame_flag;
            let ref_idx = r.element(SyntaxElement::RefIdx, None, &mut |_| {
                ref_idx_inc(nb, mbaff_frame_flag, list)
            })? as u32;
            if ref_idx > MAX_REF_IDX {
                return Err(corrupt_data!("ref_idx {} out of range", ref_idx));
            }
            Ok(ref_idx)
        })
    }

    /// mvd_lX component `comp` (0 horizontal, 1 vertical).
    pub fn read_mvd<N: NeighbourSource + ?Sized>(
        &mut self,
        nb: &N,
        list: usize,
        comp: usize,
    ) -> Result<i32> {
        self.guarded(|r| {
            check_ref_list(list)?;
            let element = SyntaxElement::mvd(comp)?;
            let mbaff_frame_flag = r.slice_header.mbaff_frame_flag;
            r.element(element, None, &mut |_| {
                mvd_inc(nb, mbaff_frame_flag, list, comp)
            })
        })
    }

    pub fn read_mb_qp_delta<N: NeighbourSource + ?Sized>(&mut self, nb: &N) -> Result<i32> {
        self.guarded(|r| {
            let mb_qp_delta =
                r.element(SyntaxElement::MbQpDelta, None, &mut |_| mb_qp_delta_inc(nb))?;
            let range = r.slice_header.mb_qp_delta_range();
            if !range.contains(&mb_qp_delta) {
                return Err(corrupt_data!("mb_qp_delta {} outside {:?}", mb_qp_delta, range));
            }
            Ok(mb_qp_delta)
        })
    }

    pub fn read_intra_chroma_pred_mode<N: NeighbourSource + ?Sized>(
        &mut self,
        nb: &N,
    ) -> Result<u32> {
        self.guarded(|r| {
            let v = r.element(SyntaxElement::IntraChromaPredMode, None, &mut |_| {
                intra_chroma_pred_mode_inc(nb)
            })?;
            Ok(v as u32)
        })
    }

    pub fn read_prev_intra4x4_pred_mode_flag(&mut self) -> Result<bool> {
        self.guarded(|r| {
            Ok(r.element(SyntaxElement::PrevIntraPredModeFlag, None, &mut no_derivation)? != 0)
        })
    }

    pub fn read_prev_intra8x8_pred_mode_flag(&mut self) -> Result<bool> {
        self.read_prev_intra4x4_pred_mode_flag()
    }

    pub fn read_rem_intra4x4_pred_mode(&mut self) -> Result<u32> {
        self.guarded(|r| {
            Ok(r.element(SyntaxElement::RemIntraPredMode, None, &mut no_derivation)? as u32)
        })
    }

    pub fn read_rem_intra8x8_pred_mode(&mut self) -> Result<u32> {
        self.read_rem_intra4x4_pred_mode()
    }

    /// CodedBlockPatternLuma + 16 * CodedBlockPatternChroma.
    pub fn read_coded_block_pattern<N: NeighbourSource + ?Sized>(&mut self, nb: &N) -> Result<u32> {
        self.guarded(|r| r.coded_block_pattern(nb))
    }

    fn coded_block_pattern<N: NeighbourSource + ?Sized>(&mut self, nb: &N) -> Result<u32> {
        let desc = descriptor(SyntaxElement::CodedBlockPattern, &self.slice_header, None)?;
        let luma = match decode_part(self, &desc.prefix, &mut |cursor| {
            coded_block_pattern_luma_inc(nb, cursor.bin_idx, &cursor.bins)
        })? {
            PartValue::Value(v) => v as u32,
            PartValue::Escape => return Err(protocol_violation!("escape in coded_block_pattern")),
        };
        let chroma = match desc.suffix {
            Some(suffix) => match decode_part(self, &suffix, &mut |cursor| {
                coded_block_pattern_chroma_inc(nb, cursor.bin_idx)
            })? {
                PartValue::Value(v) => v as u32,
                PartValue::Escape => {
                    return Err(protocol_violation!("escape in coded_block_pattern"))
                }
            },
            None => 0,
        };
        debug_eprintln!("coded_block_pattern = {} + 16 * {}", luma, chroma);
        Ok(luma + 16 * chroma)
    }

    pub fn read_transform_size_8x8_flag<N: NeighbourSource + ?Sized>(
        &mut self,
        nb: &N,
    ) -> Result<bool> {
        self.guarded(|r| {
            let v = r.element(SyntaxElement::TransformSize8x8Flag, None, &mut |_| {
                transform_size_8x8_flag_inc(nb)
            })?;
            Ok(v != 0)
        })
    }

    pub fn read_coded_block_flag<N: NeighbourSource + ?Sized>(
        &mut self,
        nb: &N,
        block: ResidualBlock,
    ) -> Result<bool> {
        self.guarded(|r| {
            let constrained = r.slice_header.constrained_intra_partitioned();
            let v = r.element(SyntaxElement::CodedBlockFlag, Some(block), &mut |_| {
                coded_block_flag_inc(nb, block.cat, constrained)
            })?;
            Ok(v != 0)
        })
    }

    pub fn read_significant_coeff_flag(
        &mut self,
        block: ResidualBlock,
        level_list_idx: usize,
    ) -> Result<bool> {
        self.guarded(|r| {
            block.check_level_list_idx(&r.slice_header, level_list_idx)?;
            let num_c8x8 = r.slice_header.num_c8x8();
            let v = r.element(SyntaxElement::SignificantCoeffFlag, Some(block), &mut |_| {
                Ok(significant_coeff_flag_inc(
                    block.cat,
                    level_list_idx,
                    block.field_coded,
                    num_c8x8,
                ))
            })?;
            Ok(v != 0)
        })
    }

    pub fn read_last_significant_coeff_flag(
        &mut self,
        block: ResidualBlock,
        level_list_idx: usize,
    ) -> Result<bool> {
        self.guarded(|r| {
            block.check_level_list_idx(&r.slice_header, level_list_idx)?;
            let num_c8x8 = r.slice_header.num_c8x8();
            let v = r.element(SyntaxElement::LastSignificantCoeffFlag, Some(block), &mut |_| {
                Ok(last_significant_coeff_flag_inc(
                    block.cat,
                    level_list_idx,
                    num_c8x8,
                ))
            })?;
            Ok(v != 0)
        })
    }

    /// `num_gt1` and `num_eq1` count the levels already decoded in the block.
    pub fn read_coeff_abs_level_minus1(
        &mut self,
        block: ResidualBlock,
        num_gt1: usize,
        num_eq1: usize,
    ) -> Result<u32> {
        self.guarded(|r| {
            let v = r.element(SyntaxElement::CoeffAbsLevelMinus1, Some(block), &mut |cursor| {
                Ok(coeff_abs_level_minus1_inc(
                    block.cat,
                    cursor.bin_idx,
                    num_gt1,
                    num_eq1,
                ))
            })?;
            if v == i32::MAX {
                return Err(corrupt_data!("coeff_abs_level_minus1 {} out of range", v));
            }
            Ok(v as u32)
        })
    }

    pub fn read_coeff_sign_flag(&mut self) -> Result<bool> {
        self.guarded(|r| Ok(r.element(SyntaxElement::CoeffSignFlag, None, &mut no_derivation)? != 0))
    }

    pub fn read_end_of_slice_flag(&mut self) -> Result<bool> {
        self.guarded(|r| {
            let end = r.element(SyntaxElement::EndOfSliceFlag, None, &mut no_derivation)? != 0;
            if end {
                r.state = SliceDataState::Finished;
            }
            Ok(end)
        })
    }

    /// residual_block_cabac() over `start_idx..=end_idx`. Returns the
    /// maxNumCoeff levels of the block in scanning order.
    pub fn read_residual_block<N: NeighbourSource + ?Sized>(
        &mut self,
        nb: &N,
        block: ResidualBlock,
        start_idx: usize,
        end_idx: usize,
    ) -> Result<Vec<i32>> {
        self.guarded(|r| r.residual_block(nb, block, start_idx, end_idx))
    }

    fn residual_block<N: NeighbourSource + ?Sized>(
        &mut self,
        nb: &N,
        block: ResidualBlock,
        start_idx: usize,
        end_idx: usize,
    ) -> Result<Vec<i32>> {
        let max_num_coeff = block.check_range(&self.slice_header, start_idx, end_idx)?;
        let mut coeff_level = vec![0; max_num_coeff];
        let coded = if block.coded_block_flag_present(&self.slice_header) {
            self.read_coded_block_flag(nb, block)?
        } else {
            true
        };
        if !coded {
            return Ok(coeff_level);
        }

        let mut significant = vec![false; max_num_coeff];
        let mut num_coeff = end_idx + 1;
        let mut i = start_idx;
        while i + 1 < num_coeff {
            significant[i] = self.read_significant_coeff_flag(block, i)?;
            if significant[i] && self.read_last_significant_coeff_flag(block, i)? {
                num_coeff = i + 1;
            }
            i += 1;
        }
        significant[num_coeff - 1] = true;

        let (mut num_gt1, mut num_eq1) = (0, 0);
        for i in (start_idx..num_coeff).rev() {
            if !significant[i] {
                continue;
            }
            let abs_minus1 = self.read_coeff_abs_level_minus1(block, num_gt1, num_eq1)?;
            if abs_minus1 == 0 {
                num_eq1 += 1;
            } else {
                num_gt1 += 1;
            }
            let level = abs_minus1 as i32 + 1;
            coeff_level[i] = if self.read_coeff_sign_flag()? {
                -level
            } else {
                level
            };
        }
        Ok(coeff_level)
    }

    /// pcm_alignment_zero_bit and pcm_sample_luma/chroma after I_PCM, then
    /// re-initializes the decoding engine. Contexts are kept.
    pub fn read_pcm_samples(&mut self, format: &PcmFormat) -> Result<Vec<u32>> {
        self.guarded(|r| r.pcm_samples(format))
    }

    fn pcm_samples(&mut self, format: &PcmFormat) -> Result<Vec<u32>> {
        if self.state != SliceDataState::PcmPending {
            return Err(protocol_violation!("PCM samples without I_PCM"));
        }
        format.validate()?;
        self.reader.byte_align()?;
        let samples = (0..format.num_samples())
            .map(|i| Ok(self.reader.read_bits(format.bit_depth(i))? as u32))
            .collect::<Result<Vec<u32>>>()?;
        debug_eprintln!("read {} PCM samples", samples.len());
        self.engine = ArithmeticDecoder::new(&mut self.reader)?;
        self.state = SliceDataState::Coding;
        Ok(samples)
    }
}

impl<R: BitRead> BinDecoder for CabacReader<R> {
    fn decode_bin(&mut self, sel: CtxSel) -> Result<bool> {
        if self.state != SliceDataState::Coding {
            return Err(protocol_violation!("bin decoded in state {:?}", self.state));
        }
        match sel {
            CtxSel::Context(ctx_idx) => {
                let ctx = self.contexts.context(ctx_idx)?;
                let (bin, ctx) = self.engine.decode_decision(&mut self.reader, ctx)?;
                self.contexts.store(ctx_idx, ctx);
                Ok(bin)
            }
            CtxSel::Bypass => self.engine.decode_bypass(&mut self.reader),
            CtxSel::Terminate => {
                let bin = self.engine.decode_terminate(&mut self.reader)?;
                if bin {
                    self.state = SliceDataState::PcmPending;
                }
                Ok(bin)
            }
        }
    }
}
