use super::arithmetic_encoder::*;
use super::binarization::*;
use super::binary_writer::*;
use super::cabac_contexts::*;
use super::context::*;
use super::ctx_derivation::*;
use super::error::*;
use super::neighbour::*;
use super::slice_header::*;
use debug_print::*;

/// CABAC coding of the slice_data() of one slice.
pub struct CabacWriter<W: BitWrite> {
    writer: W,
    engine: ArithmeticEncoder,
    contexts: ContextStore,
    slice_header: SliceHeader,
    state: SliceDataState,
}

impl<W: BitWrite> CabacWriter<W> {
    /// Writes cabac_alignment_one_bit and initializes the encoding engine.
    pub fn new(mut writer: W, slice_header: SliceHeader) -> Result<CabacWriter<W>> {
        slice_header.validate()?;
        while !writer.byte_aligned() {
            writer.write_bit(true)?;
        }
        let contexts = ContextStore::new(slice_header.init_type(), slice_header.slice_qp_y);
        Ok(CabacWriter {
            writer,
            engine: ArithmeticEncoder::new(),
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

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    /// Bins coded in this slice so far (BinCountsInNALunits).
    pub fn bin_count(&self) -> usize {
        self.engine.bin_count()
    }

    /// Pads with rbsp_alignment_zero_bit after end_of_slice_flag and returns
    /// the sink.
    pub fn finish(mut self) -> Result<W> {
        match self.state {
            SliceDataState::Finished => (),
            SliceDataState::Failed => {
                return Err(protocol_violation!("slice data abandoned after an error"))
            }
            _ => return Err(protocol_violation!("slice data ends without end_of_slice_flag")),
        }
        self.writer.byte_align()?;
        debug_eprintln!("slice data finished after {} bins", self.engine.bin_count());
        Ok(self.writer)
    }

    /// Runs one element call. Any error leaves the writer `Failed`.
    fn guarded<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.state == SliceDataState::Failed {
            return Err(protocol_violation!("slice data abandoned after an error"));
        }
        let result = f(self);
        if result.is_err() {
            debug_eprintln!("slice data failed after {} bins", self.engine.bin_count());
            self.state = SliceDataState::Failed;
        }
        result
    }

    fn element(
        &mut self,
        element: SyntaxElement,
        block: Option<ResidualBlock>,
        derive: &mut DeriveFn,
        value: i32,
    ) -> Result<()> {
        let desc = descriptor(element, &self.slice_header, block)?;
        debug_eprintln!("{} = {}", element, value);
        encode_part(self, &desc.prefix, derive, PartValue::Value(value))
    }

    pub fn write_mb_skip_flag<N: NeighbourSource + ?Sized>(
        &mut self,
        nb: &N,
        mb_skip_flag: bool,
    ) -> Result<()> {
        self.guarded(|w| {
            w.element(
                SyntaxElement::MbSkipFlag,
                None,
                &mut |_| mb_skip_flag_inc(nb),
                mb_skip_flag as i32,
            )
        })
    }

    pub fn write_mb_field_decoding_flag<N: NeighbourSource + ?Sized>(
        &mut self,
        nb: &N,
        mb_field_decoding_flag: bool,
    ) -> Result<()> {
        self.guarded(|w| {
            w.element(
                SyntaxElement::MbFieldDecodingFlag,
                None,
                &mut |_| mb_field_decoding_flag_inc(nb),
                mb_field_decoding_flag as i32,
            )
        })
    }

    /// `mb_type` is numbered as in the tables of the slice type.
    pub fn write_mb_type<N: NeighbourSource + ?Sized>(&mut self, nb: &N, mb_type: u32) -> Result<()> {
        self.guarded(|w| w.mb_type(nb, mb_type))
    }

    fn mb_type<N: NeighbourSource + ?Sized>(&mut self, nb: &N, mb_type: u32) -> Result<()> {
        let slice_type = self.slice_header.slice_type;
        let desc = descriptor(SyntaxElement::MbType, &self.slice_header, None)?;
        debug_eprintln!("mb_type = {} ({} slice)", mb_type, slice_type);
        let prefix_offset = desc.prefix.ctx_idx_offset().unwrap_or(0);
        let base = mb_type_suffix_base(slice_type);
        let out_of_range = || protocol_violation!("mb_type {} out of range", mb_type);
        match desc.suffix {
            Some(suffix) if mb_type >= base => {
                let v = i32::try_from(mb_type - base).map_err(|_| out_of_range())?;
                check_value(&suffix, PartValue::Value(v))?;
                encode_part(
                    self,
                    &desc.prefix,
                    &mut |_| mb_type_inc(nb, prefix_offset),
                    PartValue::Escape,
                )?;
                let suffix_offset = suffix.ctx_idx_offset().unwrap_or(0);
                encode_part(
                    self,
                    &suffix,
                    &mut |_| mb_type_inc(nb, suffix_offset),
                    PartValue::Value(v),
                )?;
            }
            _ => {
                let v = i32::try_from(mb_type).map_err(|_| out_of_range())?;
                encode_part(
                    self,
                    &desc.prefix,
                    &mut |_| mb_type_inc(nb, prefix_offset),
                    PartValue::Value(v),
                )?;
            }
        }
        if is_i_pcm(slice_type, mb_type) {
            debug_eprintln!("I_PCM escape");
        }
        Ok(())
    }

    pub fn write_sub_mb_type(&mut self, sub_mb_type: u32) -> Result<()> {
        self.guarded(|w| {
            let v = i32::try_from(sub_mb_type)
                .map_err(|_| protocol_violation!("sub_mb_type {} out of range", sub_mb_type))?;
            w.element(SyntaxElement::SubMbType, None, &mut no_derivation, v)
        })
    }

    /// `ref_idx` is at most 31.
    pub fn write_ref_idx<N: NeighbourSource + ?Sized>(
        &mut self,
        nb: &N,
        list: usize,
        ref_idx: u32,
    ) -> Result<()> {
        self.guarded(|w| {
            check_ref_list(list)?;
            if ref_idx > MAX_REF_IDX {
                return Err(protocol_violation!("ref_idx {} out of range", ref_idx));
            }
            let mbaff_frame_flag = w.slice_header.mbaff_frame_flag;
            w.element(
                SyntaxElement::RefIdx,
                None,
                &mut |_| ref_idx_inc(nb, mbaff_frame_flag, list),
                ref_idx as i32,
            )
        })
    }

    pub fn write_mvd<N: NeighbourSource + ?Sized>(
        &mut self,
        nb: &N,
        list: usize,
        comp: usize,
        mvd: i32,
    ) -> Result<()> {
        self.guarded(|w| {
            check_ref_list(list)?;
            let element = SyntaxElement::mvd(comp)?;
            let mbaff_frame_flag = w.slice_header.mbaff_frame_flag;
            w.element(
                element,
                None,
                &mut |_| mvd_inc(nb, mbaff_frame_flag, list, comp),
                mvd,
            )
        })
    }

    pub fn write_mb_qp_delta<N: NeighbourSource + ?Sized>(
        &mut self,
        nb: &N,
        mb_qp_delta: i32,
    ) -> Result<()> {
        self.guarded(|w| {
            let range = w.slice_header.mb_qp_delta_range();
            if !range.contains(&mb_qp_delta) {
                return Err(protocol_violation!(
                    "mb_qp_delta {} outside {:?}",
                    mb_qp_delta,
                    range
                ));
            }
            w.element(
                SyntaxElement::MbQpDelta,
                None,
                &mut |_| mb_qp_delta_inc(nb),
                mb_qp_delta,
            )
        })
    }

    pub fn write_intra_chroma_pred_mode<N: NeighbourSource + ?Sized>(
        &mut self,
        nb: &N,
        intra_chroma_pred_mode: u32,
    ) -> Result<()> {
        self.guarded(|w| {
            w.element(
                SyntaxElement::IntraChromaPredMode,
                None,
                &mut |_| intra_chroma_pred_mode_inc(nb),
                intra_chroma_pred_mode.min(i32::MAX as u32) as i32,
            )
        })
    }

    pub fn write_prev_intra4x4_pred_mode_flag(&mut self, flag: bool) -> Result<()> {
        self.guarded(|w| {
            w.element(
                SyntaxElement::PrevIntraPredModeFlag,
                None,
                &mut no_derivation,
                flag as i32,
            )
        })
    }

    pub fn write_prev_intra8x8_pred_mode_flag(&mut self, flag: bool) -> Result<()> {
        self.write_prev_intra4x4_pred_mode_flag(flag)
    }

    pub fn write_rem_intra4x4_pred_mode(&mut self, mode: u32) -> Result<()> {
        self.guarded(|w| {
            w.element(
                SyntaxElement::RemIntraPredMode,
                None,
                &mut no_derivation,
                mode.min(i32::MAX as u32) as i32,
            )
        })
    }

    pub fn write_rem_intra8x8_pred_mode(&mut self, mode: u32) -> Result<()> {
        self.write_rem_intra4x4_pred_mode(mode)
    }

    /// `coded_block_pattern` is CodedBlockPatternLuma + 16 * CodedBlockPatternChroma.
    pub fn write_coded_block_pattern<N: NeighbourSource + ?Sized>(
        &mut self,
        nb: &N,
        coded_block_pattern: u32,
    ) -> Result<()> {
        self.guarded(|w| w.coded_block_pattern(nb, coded_block_pattern))
    }

    fn coded_block_pattern<N: NeighbourSource + ?Sized>(
        &mut self,
        nb: &N,
        coded_block_pattern: u32,
    ) -> Result<()> {
        let desc = descriptor(SyntaxElement::CodedBlockPattern, &self.slice_header, None)?;
        let luma = (coded_block_pattern % 16) as i32;
        let chroma = coded_block_pattern / 16;
        debug_eprintln!("coded_block_pattern = {} + 16 * {}", luma, chroma);
        let chroma = match desc.suffix {
            Some(_) if chroma <= 2 => Some(chroma as i32),
            None if chroma == 0 => None,
            _ => {
                return Err(protocol_violation!(
                    "CodedBlockPatternChroma {} with ChromaArrayType {}",
                    chroma,
                    self.slice_header.chroma_array_type
                ))
            }
        };
        encode_part(
            self,
            &desc.prefix,
            &mut |cursor| coded_block_pattern_luma_inc(nb, cursor.bin_idx, &cursor.bins),
            PartValue::Value(luma),
        )?;
        match (desc.suffix, chroma) {
            (Some(suffix), Some(chroma)) => encode_part(
                self,
                &suffix,
                &mut |cursor| coded_block_pattern_chroma_inc(nb, cursor.bin_idx),
                PartValue::Value(chroma),
            ),
            _ => Ok(()),
        }
    }

    pub fn write_transform_size_8x8_flag<N: NeighbourSource + ?Sized>(
        &mut self,
        nb: &N,
        flag: bool,
    ) -> Result<()> {
        self.guarded(|w| {
            w.element(
                SyntaxElement::TransformSize8x8Flag,
                None,
                &mut |_| transform_size_8x8_flag_inc(nb),
                flag as i32,
            )
        })
    }

    pub fn write_coded_block_flag<N: NeighbourSource + ?Sized>(
        &mut self,
        nb: &N,
        block: ResidualBlock,
        flag: bool,
    ) -> Result<()> {
        self.guarded(|w| {
            let constrained = w.slice_header.constrained_intra_partitioned();
            w.element(
                SyntaxElement::CodedBlockFlag,
                Some(block),
                &mut |_| coded_block_flag_inc(nb, block.cat, constrained),
                flag as i32,
            )
        })
    }

    pub fn write_significant_coeff_flag(
        &mut self,
        block: ResidualBlock,
        level_list_idx: usize,
        flag: bool,
    ) -> Result<()> {
        self.guarded(|w| {
            block.check_level_list_idx(&w.slice_header, level_list_idx)?;
            let num_c8x8 = w.slice_header.num_c8x8();
            w.element(
                SyntaxElement::SignificantCoeffFlag,
                Some(block),
                &mut |_| {
                    Ok(significant_coeff_flag_inc(
                        block.cat,
                        level_list_idx,
                        block.field_coded,
                        num_c8x8,
                    ))
                },
                flag as i32,
            )
        })
    }

    pub fn write_last_significant_coeff_flag(
        &mut self,
        block: ResidualBlock,
        level_list_idx: usize,
        flag: bool,
    ) -> Result<()> {
        self.guarded(|w| {
            block.check_level_list_idx(&w.slice_header, level_list_idx)?;
            let num_c8x8 = w.slice_header.num_c8x8();
            w.element(
                SyntaxElement::LastSignificantCoeffFlag,
                Some(block),
                &mut |_| Ok(last_significant_coeff_flag_inc(block.cat, level_list_idx, num_c8x8)),
                flag as i32,
            )
        })
    }

    /// `coeff_abs_level_minus1` is below `i32::MAX`, so that the level fits an
    /// `i32`.
    pub fn write_coeff_abs_level_minus1(
        &mut self,
        block: ResidualBlock,
        num_gt1: usize,
        num_eq1: usize,
        coeff_abs_level_minus1: u32,
    ) -> Result<()> {
        self.guarded(|w| {
            let v = i32::try_from(coeff_abs_level_minus1)
                .ok()
                .filter(|v| *v < i32::MAX)
                .ok_or_else(|| {
                    protocol_violation!(
                        "coeff_abs_level_minus1 {} out of range",
                        coeff_abs_level_minus1
                    )
                })?;
            w.element(
                SyntaxElement::CoeffAbsLevelMinus1,
                Some(block),
                &mut |cursor| {
                    Ok(coeff_abs_level_minus1_inc(
                        block.cat,
                        cursor.bin_idx,
                        num_gt1,
                        num_eq1,
                    ))
                },
                v,
            )
        })
    }

    pub fn write_coeff_sign_flag(&mut self, flag: bool) -> Result<()> {
        self.guarded(|w| {
            w.element(SyntaxElement::CoeffSignFlag, None, &mut no_derivation, flag as i32)
        })
    }

    pub fn write_end_of_slice_flag(&mut self, flag: bool) -> Result<()> {
        self.guarded(|w| {
            w.element(SyntaxElement::EndOfSliceFlag, None, &mut no_derivation, flag as i32)?;
            if flag {
                w.state = SliceDataState::Finished;
            }
            Ok(())
        })
    }

    /// residual_block_cabac() for the maxNumCoeff levels of `coeff_level`,
    /// coded over `start_idx..=end_idx`.
    pub fn write_residual_block<N: NeighbourSource + ?Sized>(
        &mut self,
        nb: &N,
        block: ResidualBlock,
        start_idx: usize,
        end_idx: usize,
        coeff_level: &[i32],
    ) -> Result<()> {
        self.guarded(|w| w.residual_block(nb, block, start_idx, end_idx, coeff_level))
    }

    fn residual_block<N: NeighbourSource + ?Sized>(
        &mut self,
        nb: &N,
        block: ResidualBlock,
        start_idx: usize,
        end_idx: usize,
        coeff_level: &[i32],
    ) -> Result<()> {
        let max_num_coeff = block.check_range(&self.slice_header, start_idx, end_idx)?;
        if coeff_level.len() != max_num_coeff {
            return Err(protocol_violation!(
                "{} levels for a block of {}",
                coeff_level.len(),
                max_num_coeff
            ));
        }
        if coeff_level
            .iter()
            .enumerate()
            .any(|(i, level)| *level != 0 && (i < start_idx || i > end_idx))
        {
            return Err(protocol_violation!(
                "non-zero level outside {}..={}",
                start_idx,
                end_idx
            ));
        }
        if coeff_level.contains(&i32::MIN) {
            return Err(protocol_violation!("level {} out of range", i32::MIN));
        }
        let last = coeff_level[..=end_idx].iter().rposition(|level| *level != 0);
        let coded_block_flag_present = block.coded_block_flag_present(&self.slice_header);
        if last.is_none() && !coded_block_flag_present {
            return Err(protocol_violation!("empty {:?} block", block.cat));
        }
        if coded_block_flag_present {
            self.write_coded_block_flag(nb, block, last.is_some())?;
        }
        let last = match last {
            Some(last) => last,
            None => return Ok(()),
        };

        for i in start_idx..end_idx {
            let significant = coeff_level[i] != 0;
            self.write_significant_coeff_flag(block, i, significant)?;
            if significant {
                self.write_last_significant_coeff_flag(block, i, i == last)?;
                if i == last {
                    break;
                }
            }
        }

        let (mut num_gt1, mut num_eq1) = (0, 0);
        for i in (start_idx..=last).rev() {
            let level = coeff_level[i];
            if level == 0 {
                continue;
            }
            let abs_minus1 = level.unsigned_abs() - 1;
            self.write_coeff_abs_level_minus1(block, num_gt1, num_eq1, abs_minus1)?;
            if abs_minus1 == 0 {
                num_eq1 += 1;
            } else {
                num_gt1 += 1;
            }
            self.write_coeff_sign_flag(level < 0)?;
        }
        Ok(())
    }

    /// pcm_alignment_zero_bit and the PCM samples after I_PCM, then
    /// re-initializes the encoding engine. Contexts are kept.
    pub fn write_pcm_samples(&mut self, format: &PcmFormat, samples: &[u32]) -> Result<()> {
        self.guarded(|w| w.pcm_samples(format, samples))
    }

    fn pcm_samples(&mut self, format: &PcmFormat, samples: &[u32]) -> Result<()> {
        if self.state != SliceDataState::PcmPending {
            return Err(protocol_violation!("PCM samples without I_PCM"));
        }
        format.validate()?;
        if samples.len() != format.num_samples() {
            return Err(protocol_violation!(
                "{} PCM samples, expected {}",
                samples.len(),
                format.num_samples()
            ));
        }
        if let Some((i, sample)) = samples
            .iter()
            .enumerate()
            .find(|(i, sample)| **sample >> format.bit_depth(*i) != 0)
        {
            return Err(protocol_violation!(
                "PCM sample {} exceeds {} bits",
                sample,
                format.bit_depth(i)
            ));
        }
        self.writer.byte_align()?;
        for (i, &sample) in samples.iter().enumerate() {
            self.writer.write_bits(sample as u64, format.bit_depth(i))?;
        }
        debug_eprintln!("wrote {} PCM samples", samples.len());
        self.engine.restart();
        self.state = SliceDataState::Coding;
        Ok(())
    }
}

impl<W: BitWrite> BinEncoder for CabacWriter<W> {
    fn encode_bin(&mut self, sel: CtxSel, bin: bool) -> Result<()> {
        if self.state != SliceDataState::Coding {
            return Err(protocol_violation!("bin coded in state {:?}", self.state));
        }
        match sel {
            CtxSel::Context(ctx_idx) => {
                let ctx = self.contexts.context(ctx_idx)?;
                let ctx = self.engine.encode_decision(&mut self.writer, ctx, bin)?;
                self.contexts.store(ctx_idx, ctx);
                Ok(())
            }
            CtxSel::Bypass => self.engine.encode_bypass(&mut self.writer, bin),
            CtxSel::Terminate => {
                self.engine.encode_terminate(&mut self.writer, bin)?;
                if bin {
                    self.state = SliceDataState::PcmPending;
                }
                Ok(())
            }
        }
    }
}
