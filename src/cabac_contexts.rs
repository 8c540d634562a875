use super::cabac_tables::CTX_IDX_TERMINATE;
use super::error::*;
use super::slice_header::*;
use std::fmt;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, FromPrimitive)]
pub enum SyntaxElement {
    MbType = 0,
    MbSkipFlag = 1,
    SubMbType = 2,
    MvdX = 3,
    MvdY = 4,
    RefIdx = 5,
    MbQpDelta = 6,
    IntraChromaPredMode = 7,
    PrevIntraPredModeFlag = 8,
    RemIntraPredMode = 9,
    MbFieldDecodingFlag = 10,
    CodedBlockPattern = 11,
    CodedBlockFlag = 12,
    SignificantCoeffFlag = 13,
    LastSignificantCoeffFlag = 14,
    CoeffAbsLevelMinus1 = 15,
    CoeffSignFlag = 16,
    TransformSize8x8Flag = 17,
    EndOfSliceFlag = 18,
}

const SYNTAX_ELEMENT_NAMES: [&str; 19] = [
    "mb_type",
    "mb_skip_flag",
    "sub_mb_type",
    "mvd_x",
    "mvd_y",
    "ref_idx",
    "mb_qp_delta",
    "intra_chroma_pred_mode",
    "prev_intra_pred_mode_flag",
    "rem_intra_pred_mode",
    "mb_field_decoding_flag",
    "coded_block_pattern",
    "coded_block_flag",
    "significant_coeff_flag",
    "last_significant_coeff_flag",
    "coeff_abs_level_minus1",
    "coeff_sign_flag",
    "transform_size_8x8_flag",
    "end_of_slice_flag",
];

impl SyntaxElement {
    pub fn name(&self) -> &'static str {
        SYNTAX_ELEMENT_NAMES[*self as usize]
    }

    pub fn from_name(name: &str) -> Option<SyntaxElement> {
        SYNTAX_ELEMENT_NAMES
            .iter()
            .position(|n| *n == name)
            .and_then(num::FromPrimitive::from_usize)
    }

    /// mvd_lX component `comp` (0 horizontal, 1 vertical).
    pub fn mvd(comp: usize) -> Result<SyntaxElement> {
        match comp {
            0 => Ok(SyntaxElement::MvdX),
            1 => Ok(SyntaxElement::MvdY),
            _ => Err(protocol_violation!("mvd component {}", comp)),
        }
    }

    pub fn is_residual(&self) -> bool {
        matches!(
            self,
            SyntaxElement::CodedBlockFlag
                | SyntaxElement::SignificantCoeffFlag
                | SyntaxElement::LastSignificantCoeffFlag
                | SyntaxElement::CoeffAbsLevelMinus1
        )
    }
}

impl fmt::Display for SyntaxElement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// ctxBlockCat (Table 9-42).
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, FromPrimitive)]
pub enum CtxBlockCat {
    Intra16x16DcLevel = 0,
    Intra16x16AcLevel = 1,
    LumaLevel4x4 = 2,
    ChromaDcLevel = 3,
    ChromaAcLevel = 4,
    LumaLevel8x8 = 5,
    CbIntra16x16DcLevel = 6,
    CbIntra16x16AcLevel = 7,
    CbLevel4x4 = 8,
    CbLevel8x8 = 9,
    CrIntra16x16DcLevel = 10,
    CrIntra16x16AcLevel = 11,
    CrLevel4x4 = 12,
    CrLevel8x8 = 13,
}

impl CtxBlockCat {
    pub fn from_index(cat: usize) -> Result<CtxBlockCat> {
        num::FromPrimitive::from_usize(cat)
            .ok_or_else(|| protocol_violation!("ctxBlockCat {} out of range", cat))
    }

    #[inline(always)]
    pub fn is_8x8(&self) -> bool {
        matches!(
            self,
            CtxBlockCat::LumaLevel8x8 | CtxBlockCat::CbLevel8x8 | CtxBlockCat::CrLevel8x8
        )
    }

    pub fn max_num_coeff(&self, num_c8x8: usize) -> usize {
        match self {
            CtxBlockCat::ChromaDcLevel => 4 * num_c8x8,
            CtxBlockCat::Intra16x16AcLevel
            | CtxBlockCat::ChromaAcLevel
            | CtxBlockCat::CbIntra16x16AcLevel
            | CtxBlockCat::CrIntra16x16AcLevel => 15,
            cat if cat.is_8x8() => 64,
            _ => 16,
        }
    }

    // position of the category in the ctxIdxOffset columns of Table 9-34
    fn column(&self) -> usize {
        match *self as usize {
            0..=4 => 0,
            5 => 1,
            6..=8 => 2,
            9 => 3,
            10..=12 => 4,
            _ => 5,
        }
    }

    fn check(&self, sh: &SliceHeader) -> Result<()> {
        let allowed = match *self as usize {
            3 | 4 => sh.chroma_array_type == 1 || sh.chroma_array_type == 2,
            6..=13 => sh.chroma_array_type == 3,
            _ => true,
        };
        if allowed {
            Ok(())
        } else {
            Err(protocol_violation!(
                "ctxBlockCat {:?} with ChromaArrayType {}",
                self,
                sh.chroma_array_type
            ))
        }
    }
}

/// Residual block a residual syntax element belongs to.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ResidualBlock {
    pub cat: CtxBlockCat,
    /// Field picture or field macroblock.
    pub field_coded: bool,
}

impl ResidualBlock {
    pub fn max_num_coeff(&self, sh: &SliceHeader) -> usize {
        self.cat.max_num_coeff(sh.num_c8x8())
    }

    /// coded_block_flag is inferred to be 1 for 8x8 blocks outside 4:4:4.
    pub fn coded_block_flag_present(&self, sh: &SliceHeader) -> bool {
        self.max_num_coeff(sh) != 64 || sh.chroma_array_type == 3
    }

    /// Checks the scanning range and returns maxNumCoeff.
    pub fn check_range(&self, sh: &SliceHeader, start_idx: usize, end_idx: usize) -> Result<usize> {
        self.cat.check(sh)?;
        let max_num_coeff = self.max_num_coeff(sh);
        if start_idx > end_idx || end_idx >= max_num_coeff {
            return Err(protocol_violation!(
                "scan range {}..={} for {:?} with {} coefficients",
                start_idx,
                end_idx,
                self.cat,
                max_num_coeff
            ));
        }
        Ok(max_num_coeff)
    }

    /// significant_coeff_flag and last_significant_coeff_flag are coded for
    /// levelListIdx 0..maxNumCoeff - 1 only.
    pub fn check_level_list_idx(&self, sh: &SliceHeader, level_list_idx: usize) -> Result<()> {
        self.cat.check(sh)?;
        let max_num_coeff = self.max_num_coeff(sh);
        if level_list_idx + 1 >= max_num_coeff {
            return Err(protocol_violation!(
                "levelListIdx {} for {:?} with {} coefficients",
                level_list_idx,
                self.cat,
                max_num_coeff
            ));
        }
        Ok(())
    }
}

/// Largest ref_idx_lX (num_ref_idx_active_minus1 of a field).
pub const MAX_REF_IDX: u32 = 31;

/// Reference picture list index of ref_idx_lX and mvd_lX.
pub fn check_ref_list(list: usize) -> Result<()> {
    if list > 1 {
        return Err(protocol_violation!("reference picture list {}", list));
    }
    Ok(())
}

// [0..=4, 5, 6..=8, 9, 10..=12, 13]
const CODED_BLOCK_FLAG_OFFSETS: [usize; 6] = [85, 1012, 460, 1012, 472, 1012];
const SIGNIFICANT_COEFF_FLAG_FRAME_OFFSETS: [usize; 6] = [105, 402, 484, 660, 528, 718];
const SIGNIFICANT_COEFF_FLAG_FIELD_OFFSETS: [usize; 6] = [277, 436, 776, 675, 820, 733];
const LAST_SIGNIFICANT_COEFF_FLAG_FRAME_OFFSETS: [usize; 6] = [166, 417, 572, 690, 616, 748];
const LAST_SIGNIFICANT_COEFF_FLAG_FIELD_OFFSETS: [usize; 6] = [338, 451, 864, 699, 908, 757];
const COEFF_ABS_LEVEL_MINUS1_OFFSETS: [usize; 6] = [227, 426, 952, 708, 982, 766];

// ctxBlockCatOffset (Table 9-40)
const CODED_BLOCK_FLAG_CAT_OFFSETS: [usize; 14] = [0, 4, 8, 12, 16, 0, 0, 4, 8, 4, 0, 4, 8, 8];
const SIGNIFICANT_CAT_OFFSETS: [usize; 14] = [0, 15, 29, 44, 47, 0, 0, 15, 29, 0, 0, 15, 29, 0];
const COEFF_ABS_LEVEL_CAT_OFFSETS: [usize; 14] = [0, 10, 20, 30, 39, 0, 0, 10, 20, 0, 0, 10, 20, 0];

/// Literal prefix-free code per value, "" when the value has no code here.
#[derive(PartialEq, Eq, Debug)]
pub struct CodeTable {
    pub name: &'static str,
    pub codes: &'static [&'static str],
    /// Prefix that hands the rest of the value over to a suffix table.
    pub escape: Option<&'static str>,
}

impl CodeTable {
    pub fn max_len(&self) -> usize {
        self.codes
            .iter()
            .chain(self.escape.iter())
            .map(|c| c.len())
            .max()
            .unwrap_or(0)
    }
}

// Table 9-36, I slices and the suffix of P, SP, B and SI mb_type
pub static MB_TYPE_I_CODES: CodeTable = CodeTable {
    name: "mb_type (I)",
    codes: &[
        "0", "100000", "100001", "100010", "100011", "1001000", "1001001", "1001010", "1001011",
        "1001100", "1001101", "1001110", "1001111", "101000", "101001", "101010", "101011",
        "1011000", "1011001", "1011010", "1011011", "1011100", "1011101", "1011110", "1011111",
        "11",
    ],
    escape: None,
};

pub static MB_TYPE_SI_PREFIX_CODES: CodeTable = CodeTable {
    name: "mb_type prefix (SI)",
    codes: &["0"],
    escape: Some("1"),
};

// P_8x8ref0 (4) is not coded with CABAC
pub static MB_TYPE_P_PREFIX_CODES: CodeTable = CodeTable {
    name: "mb_type prefix (P, SP)",
    codes: &["000", "011", "010", "001", ""],
    escape: Some("1"),
};

pub static MB_TYPE_B_PREFIX_CODES: CodeTable = CodeTable {
    name: "mb_type prefix (B)",
    codes: &[
        "0", "100", "101", "110000", "110001", "110010", "110011", "110100", "110101", "110110",
        "110111", "111110", "1110000", "1110001", "1110010", "1110011", "1110100", "1110101",
        "1110110", "1110111", "1111000", "1111001", "111111",
    ],
    escape: Some("111101"),
};

// Table 9-38
pub static SUB_MB_TYPE_P_CODES: CodeTable = CodeTable {
    name: "sub_mb_type (P, SP)",
    codes: &["1", "00", "011", "010"],
    escape: None,
};

pub static SUB_MB_TYPE_B_CODES: CodeTable = CodeTable {
    name: "sub_mb_type (B)",
    codes: &[
        "0", "100", "101", "11000", "11001", "11010", "11011", "111000", "111001", "111010",
        "111011", "11110", "11111",
    ],
    escape: None,
};

/// Value added to an mb_type suffix, i.e. the first mb_type coded as intra.
pub fn mb_type_suffix_base(slice_type: SliceType) -> u32 {
    match slice_type {
        SliceType::I => 0,
        SliceType::SI => 1,
        SliceType::P | SliceType::SP => 5,
        SliceType::B => 23,
    }
}

#[inline(always)]
pub fn is_i_pcm(slice_type: SliceType, mb_type: u32) -> bool {
    mb_type == mb_type_suffix_base(slice_type) + 25
}

#[allow(clippy::upper_case_acronyms)]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BinProcess {
    /// Unary. `mapped` codes a signed value as 2|v| - (v > 0).
    U { mapped: bool },
    TU(u32),  // c_max
    FL(u32),  // c_max
    UEG {
        k: u32,
        signed: bool,
        u_coff: u32,
    },
    Table(&'static CodeTable),
}

/// Where the contexts of a binarization part start.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CtxOffset {
    Context(usize),
    Bypass,
    Terminate,
}

/// ctxIdxInc assignment of one bin (Table 9-39).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CtxIncRule {
    /// Derived from neighbours or block state by the caller.
    Derived,
    Number(usize),
    /// (b[bin] != 0) ? set : unset
    PriorBin { bin: usize, set: usize, unset: usize },
    Bypass,
    Terminate,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CtxInc {
    Bypass,
    Terminate,
    Number(usize),
}

/// Coding path of one bin.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CtxSel {
    Context(usize),
    Bypass,
    Terminate,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct BinarizationPart {
    pub process: BinProcess,
    pub ctx_offset: CtxOffset,
    /// Rules for binIdx 0..=maxBinIdxCtx; later bins use the last one.
    pub rules: &'static [CtxIncRule],
}

impl BinarizationPart {
    #[inline(always)]
    pub fn max_bin_idx_ctx(&self) -> usize {
        self.rules.len() - 1
    }

    #[inline(always)]
    pub fn rule(&self, bin_idx: usize) -> CtxIncRule {
        self.rules[bin_idx.min(self.max_bin_idx_ctx())]
    }

    pub fn ctx_idx_offset(&self) -> Option<usize> {
        match self.ctx_offset {
            CtxOffset::Context(offset) => Some(offset),
            _ => None,
        }
    }

    pub fn resolve(&self, inc: CtxInc) -> Result<CtxSel> {
        match (inc, self.ctx_offset) {
            (CtxInc::Bypass, _) | (_, CtxOffset::Bypass) => Ok(CtxSel::Bypass),
            (CtxInc::Terminate, _) | (_, CtxOffset::Terminate) => Ok(CtxSel::Terminate),
            (CtxInc::Number(inc), CtxOffset::Context(offset)) => {
                let ctx_idx = offset + inc;
                if ctx_idx == CTX_IDX_TERMINATE {
                    Err(protocol_violation!("ctxIdx 276 used as a context"))
                } else {
                    Ok(CtxSel::Context(ctx_idx))
                }
            }
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ElementDescriptor {
    pub element: SyntaxElement,
    pub prefix: BinarizationPart,
    pub suffix: Option<BinarizationPart>,
}

use CtxIncRule::*;

const DERIVED: [CtxIncRule; 1] = [Derived];
const ZERO: [CtxIncRule; 1] = [Number(0)];
const BYPASS: [CtxIncRule; 1] = [Bypass];
const TERMINATE: [CtxIncRule; 1] = [Terminate];
const MB_TYPE_I_RULES: [CtxIncRule; 7] = [
    Derived,
    Terminate,
    Number(3),
    Number(4),
    PriorBin {
        bin: 3,
        set: 5,
        unset: 6,
    },
    PriorBin {
        bin: 3,
        set: 6,
        unset: 7,
    },
    Number(7),
];
const MB_TYPE_SUFFIX_RULES: [CtxIncRule; 6] = [
    Number(0),
    Terminate,
    Number(1),
    Number(2),
    PriorBin {
        bin: 3,
        set: 2,
        unset: 3,
    },
    Number(3),
];
const MB_TYPE_P_PREFIX_RULES: [CtxIncRule; 3] = [
    Number(0),
    Number(1),
    PriorBin {
        bin: 1,
        set: 3,
        unset: 2,
    },
];
const MB_TYPE_B_PREFIX_RULES: [CtxIncRule; 4] = [
    Derived,
    Number(3),
    PriorBin {
        bin: 1,
        set: 5,
        unset: 4,
    },
    Number(5),
];
const SUB_MB_TYPE_P_RULES: [CtxIncRule; 3] = [Number(0), Number(1), Number(2)];
const SUB_MB_TYPE_B_RULES: [CtxIncRule; 4] = [
    Number(0),
    Number(1),
    PriorBin {
        bin: 1,
        set: 2,
        unset: 3,
    },
    Number(3),
];
const MVD_RULES: [CtxIncRule; 5] = [Derived, Number(3), Number(4), Number(5), Number(6)];
const REF_IDX_RULES: [CtxIncRule; 3] = [Derived, Number(4), Number(5)];
const MB_QP_DELTA_RULES: [CtxIncRule; 3] = [Derived, Number(2), Number(3)];
const INTRA_CHROMA_PRED_MODE_RULES: [CtxIncRule; 2] = [Derived, Number(3)];

fn part(process: BinProcess, offset: usize, rules: &'static [CtxIncRule]) -> BinarizationPart {
    BinarizationPart {
        process,
        ctx_offset: CtxOffset::Context(offset),
        rules,
    }
}

fn single(element: SyntaxElement, prefix: BinarizationPart) -> ElementDescriptor {
    ElementDescriptor {
        element,
        prefix,
        suffix: None,
    }
}

/// Binarization and context assignment of a syntax element (Table 9-34).
pub fn descriptor(
    element: SyntaxElement,
    sh: &SliceHeader,
    block: Option<ResidualBlock>,
) -> Result<ElementDescriptor> {
    let slice_type = sh.slice_type;
    let not_in_slice = || protocol_violation!("{} is not coded in {} slices", element, slice_type);
    let desc = match element {
        SyntaxElement::MbType => {
            let i_table = BinProcess::Table(&MB_TYPE_I_CODES);
            match slice_type {
                SliceType::I => single(element, part(i_table, 3, &MB_TYPE_I_RULES)),
                SliceType::SI => ElementDescriptor {
                    element,
                    prefix: part(BinProcess::Table(&MB_TYPE_SI_PREFIX_CODES), 0, &DERIVED),
                    suffix: Some(part(i_table, 3, &MB_TYPE_I_RULES)),
                },
                SliceType::P | SliceType::SP => ElementDescriptor {
                    element,
                    prefix: part(
                        BinProcess::Table(&MB_TYPE_P_PREFIX_CODES),
                        14,
                        &MB_TYPE_P_PREFIX_RULES,
                    ),
                    suffix: Some(part(i_table, 17, &MB_TYPE_SUFFIX_RULES)),
                },
                SliceType::B => ElementDescriptor {
                    element,
                    prefix: part(
                        BinProcess::Table(&MB_TYPE_B_PREFIX_CODES),
                        27,
                        &MB_TYPE_B_PREFIX_RULES,
                    ),
                    suffix: Some(part(i_table, 32, &MB_TYPE_SUFFIX_RULES)),
                },
            }
        }
        SyntaxElement::MbSkipFlag => match slice_type {
            SliceType::P | SliceType::SP => single(element, part(BinProcess::FL(1), 11, &DERIVED)),
            SliceType::B => single(element, part(BinProcess::FL(1), 24, &DERIVED)),
            _ => return Err(not_in_slice()),
        },
        SyntaxElement::SubMbType => match slice_type {
            SliceType::P | SliceType::SP => single(
                element,
                part(
                    BinProcess::Table(&SUB_MB_TYPE_P_CODES),
                    21,
                    &SUB_MB_TYPE_P_RULES,
                ),
            ),
            SliceType::B => single(
                element,
                part(
                    BinProcess::Table(&SUB_MB_TYPE_B_CODES),
                    36,
                    &SUB_MB_TYPE_B_RULES,
                ),
            ),
            _ => return Err(not_in_slice()),
        },
        SyntaxElement::MvdX | SyntaxElement::MvdY | SyntaxElement::RefIdx
            if slice_type.is_intra() =>
        {
            return Err(not_in_slice())
        }
        SyntaxElement::MvdX | SyntaxElement::MvdY => {
            let offset = if element == SyntaxElement::MvdX { 40 } else { 47 };
            // suffix and sign are bypass coded inside UEG3
            let ueg3 = BinProcess::UEG {
                k: 3,
                signed: true,
                u_coff: 9,
            };
            single(element, part(ueg3, offset, &MVD_RULES))
        }
        SyntaxElement::RefIdx => single(
            element,
            part(BinProcess::U { mapped: false }, 54, &REF_IDX_RULES),
        ),
        SyntaxElement::MbQpDelta => single(
            element,
            part(BinProcess::U { mapped: true }, 60, &MB_QP_DELTA_RULES),
        ),
        SyntaxElement::IntraChromaPredMode => single(
            element,
            part(BinProcess::TU(3), 64, &INTRA_CHROMA_PRED_MODE_RULES),
        ),
        SyntaxElement::PrevIntraPredModeFlag => {
            single(element, part(BinProcess::FL(1), 68, &ZERO))
        }
        SyntaxElement::RemIntraPredMode => single(element, part(BinProcess::FL(7), 69, &ZERO)),
        SyntaxElement::MbFieldDecodingFlag => {
            single(element, part(BinProcess::FL(1), 70, &DERIVED))
        }
        SyntaxElement::CodedBlockPattern => ElementDescriptor {
            element,
            prefix: part(BinProcess::FL(15), 73, &DERIVED),
            suffix: if sh.chroma_array_type == 1 || sh.chroma_array_type == 2 {
                Some(part(BinProcess::TU(2), 77, &DERIVED))
            } else {
                None
            },
        },
        SyntaxElement::TransformSize8x8Flag => {
            single(element, part(BinProcess::FL(1), 399, &DERIVED))
        }
        SyntaxElement::CoeffSignFlag => single(
            element,
            BinarizationPart {
                process: BinProcess::FL(1),
                ctx_offset: CtxOffset::Bypass,
                rules: &BYPASS,
            },
        ),
        SyntaxElement::EndOfSliceFlag => single(
            element,
            BinarizationPart {
                process: BinProcess::FL(1),
                ctx_offset: CtxOffset::Terminate,
                rules: &TERMINATE,
            },
        ),
        SyntaxElement::CodedBlockFlag
        | SyntaxElement::SignificantCoeffFlag
        | SyntaxElement::LastSignificantCoeffFlag
        | SyntaxElement::CoeffAbsLevelMinus1 => {
            let block =
                block.ok_or_else(|| protocol_violation!("{} needs a block category", element))?;
            block.cat.check(sh)?;
            let column = block.cat.column();
            let cat = block.cat as usize;
            match element {
                SyntaxElement::CodedBlockFlag => single(
                    element,
                    part(
                        BinProcess::FL(1),
                        CODED_BLOCK_FLAG_OFFSETS[column] + CODED_BLOCK_FLAG_CAT_OFFSETS[cat],
                        &DERIVED,
                    ),
                ),
                SyntaxElement::SignificantCoeffFlag => {
                    let offsets = if block.field_coded {
                        SIGNIFICANT_COEFF_FLAG_FIELD_OFFSETS
                    } else {
                        SIGNIFICANT_COEFF_FLAG_FRAME_OFFSETS
                    };
                    single(
                        element,
                        part(
                            BinProcess::FL(1),
                            offsets[column] + SIGNIFICANT_CAT_OFFSETS[cat],
                            &DERIVED,
                        ),
                    )
                }
                SyntaxElement::LastSignificantCoeffFlag => {
                    let offsets = if block.field_coded {
                        LAST_SIGNIFICANT_COEFF_FLAG_FIELD_OFFSETS
                    } else {
                        LAST_SIGNIFICANT_COEFF_FLAG_FRAME_OFFSETS
                    };
                    single(
                        element,
                        part(
                            BinProcess::FL(1),
                            offsets[column] + SIGNIFICANT_CAT_OFFSETS[cat],
                            &DERIVED,
                        ),
                    )
                }
                _ => single(
                    element,
                    part(
                        BinProcess::UEG {
                            k: 0,
                            signed: false,
                            u_coff: 14,
                        },
                        COEFF_ABS_LEVEL_MINUS1_OFFSETS[column] + COEFF_ABS_LEVEL_CAT_OFFSETS[cat],
                        &DERIVED,
                    ),
                ),
            }
        }
    };
    Ok(desc)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base(part: &BinarizationPart) -> usize {
        part.ctx_idx_offset().unwrap()
    }

    #[test]
    fn syntax_element_names_works() {
        for i in 0..19 {
            let element: SyntaxElement = num::FromPrimitive::from_usize(i).unwrap();
            assert_eq!(SyntaxElement::from_name(element.name()), Some(element));
        }
        assert_eq!(SyntaxElement::from_name("mb_skip"), None);
        assert_eq!(SyntaxElement::EndOfSliceFlag.to_string(), "end_of_slice_flag");
    }

    #[test]
    fn mb_type_descriptor_works() {
        let sh = SliceHeader::new(SliceType::B, 26);
        let desc = descriptor(SyntaxElement::MbType, &sh, None).unwrap();
        assert_eq!(base(&desc.prefix), 27);
        assert_eq!(desc.prefix.max_bin_idx_ctx(), 3);
        let suffix = desc.suffix.unwrap();
        assert_eq!(base(&suffix), 32);
        assert_eq!(suffix.rule(1), CtxIncRule::Terminate);
        assert_eq!(suffix.rule(9), CtxIncRule::Number(3));

        let sh = SliceHeader::new(SliceType::SI, 26);
        let desc = descriptor(SyntaxElement::MbType, &sh, None).unwrap();
        assert_eq!(base(&desc.prefix), 0);
        assert_eq!(base(&desc.suffix.unwrap()), 3);
    }

    #[test]
    fn invalid_combinations_are_rejected() {
        let sh = SliceHeader::new(SliceType::I, 26);
        for element in [
            SyntaxElement::MbSkipFlag,
            SyntaxElement::SubMbType,
            SyntaxElement::MvdX,
            SyntaxElement::RefIdx,
        ] {
            assert!(matches!(
                descriptor(element, &sh, None),
                Err(CabacError::ProtocolViolation(_))
            ));
        }
        assert!(descriptor(SyntaxElement::CodedBlockFlag, &sh, None).is_err());
        let cb = ResidualBlock {
            cat: CtxBlockCat::CbLevel4x4,
            field_coded: false,
        };
        assert!(descriptor(SyntaxElement::CodedBlockFlag, &sh, Some(cb)).is_err());
        let mut sh = sh;
        sh.chroma_array_type = 0;
        let dc = ResidualBlock {
            cat: CtxBlockCat::ChromaDcLevel,
            field_coded: false,
        };
        assert!(descriptor(SyntaxElement::SignificantCoeffFlag, &sh, Some(dc)).is_err());
        assert!(descriptor(SyntaxElement::CodedBlockPattern, &sh, None)
            .unwrap()
            .suffix
            .is_none());
        assert!(CtxBlockCat::from_index(14).is_err());
    }

    #[test]
    fn residual_offsets_works() {
        let mut sh = SliceHeader::new(SliceType::P, 26);
        let block = |cat: usize, field_coded: bool| {
            Some(ResidualBlock {
                cat: CtxBlockCat::from_index(cat).unwrap(),
                field_coded,
            })
        };
        let offset = |sh: &SliceHeader, element, block| {
            base(&descriptor(element, sh, block).unwrap().prefix)
        };
        assert_eq!(offset(&sh, SyntaxElement::CodedBlockFlag, block(4, false)), 101);
        assert_eq!(offset(&sh, SyntaxElement::SignificantCoeffFlag, block(2, false)), 134);
        assert_eq!(offset(&sh, SyntaxElement::SignificantCoeffFlag, block(2, true)), 306);
        assert_eq!(offset(&sh, SyntaxElement::LastSignificantCoeffFlag, block(3, false)), 210);
        assert_eq!(offset(&sh, SyntaxElement::CoeffAbsLevelMinus1, block(4, false)), 266);
        assert_eq!(offset(&sh, SyntaxElement::SignificantCoeffFlag, block(5, true)), 436);
        assert_eq!(offset(&sh, SyntaxElement::LastSignificantCoeffFlag, block(5, false)), 417);
        assert_eq!(offset(&sh, SyntaxElement::CoeffAbsLevelMinus1, block(5, false)), 426);
        sh.chroma_array_type = 3;
        assert_eq!(offset(&sh, SyntaxElement::CodedBlockFlag, block(5, false)), 1012);
        assert_eq!(offset(&sh, SyntaxElement::CodedBlockFlag, block(9, false)), 1016);
        assert_eq!(offset(&sh, SyntaxElement::CodedBlockFlag, block(13, false)), 1020);
        assert_eq!(offset(&sh, SyntaxElement::CodedBlockFlag, block(12, false)), 480);
        assert_eq!(offset(&sh, SyntaxElement::SignificantCoeffFlag, block(8, false)), 513);
        assert_eq!(offset(&sh, SyntaxElement::SignificantCoeffFlag, block(13, true)), 733);
        assert_eq!(offset(&sh, SyntaxElement::LastSignificantCoeffFlag, block(11, true)), 923);
        assert_eq!(offset(&sh, SyntaxElement::CoeffAbsLevelMinus1, block(10, false)), 982);
    }

    #[test]
    fn code_tables_are_prefix_free() {
        for table in [
            &MB_TYPE_I_CODES,
            &MB_TYPE_SI_PREFIX_CODES,
            &MB_TYPE_P_PREFIX_CODES,
            &MB_TYPE_B_PREFIX_CODES,
            &SUB_MB_TYPE_P_CODES,
            &SUB_MB_TYPE_B_CODES,
        ] {
            let codes: Vec<&str> = table
                .codes
                .iter()
                .chain(table.escape.iter())
                .copied()
                .filter(|c| !c.is_empty())
                .collect();
            for (i, a) in codes.iter().enumerate() {
                for (j, b) in codes.iter().enumerate() {
                    if i != j {
                        assert!(!b.starts_with(a), "{}: {} prefixes {}", table.name, a, b);
                    }
                }
            }
        }
        assert_eq!(MB_TYPE_B_PREFIX_CODES.max_len(), 7);
        assert_eq!(MB_TYPE_I_CODES.codes.len(), 26);
    }

    #[test]
    fn resolve_works() {
        let sh = SliceHeader::new(SliceType::I, 26);
        let desc = descriptor(SyntaxElement::MbType, &sh, None).unwrap();
        assert_eq!(desc.prefix.resolve(CtxInc::Number(2)).unwrap(), CtxSel::Context(5));
        assert_eq!(desc.prefix.resolve(CtxInc::Terminate).unwrap(), CtxSel::Terminate);
        let eos = descriptor(SyntaxElement::EndOfSliceFlag, &sh, None).unwrap();
        assert_eq!(eos.prefix.resolve(CtxInc::Number(0)).unwrap(), CtxSel::Terminate);
        let sign = descriptor(SyntaxElement::CoeffSignFlag, &sh, None).unwrap();
        assert_eq!(sign.prefix.resolve(CtxInc::Bypass).unwrap(), CtxSel::Bypass);
    }

    #[test]
    fn element_arguments_works() {
        let mut sh = SliceHeader::new(SliceType::B, 26);
        assert_eq!(SyntaxElement::mvd(1).unwrap(), SyntaxElement::MvdY);
        assert!(matches!(SyntaxElement::mvd(2), Err(CabacError::ProtocolViolation(_))));
        assert!(check_ref_list(1).is_ok());
        assert!(check_ref_list(2).is_err());

        let luma = ResidualBlock {
            cat: CtxBlockCat::LumaLevel4x4,
            field_coded: false,
        };
        assert!(luma.check_level_list_idx(&sh, 14).is_ok());
        assert!(luma.check_level_list_idx(&sh, 15).is_err());
        assert!(luma.check_level_list_idx(&sh, 40).is_err());
        let dc = ResidualBlock {
            cat: CtxBlockCat::ChromaDcLevel,
            field_coded: true,
        };
        assert!(dc.check_level_list_idx(&sh, 3).is_err());
        sh.chroma_array_type = 2;
        assert!(dc.check_level_list_idx(&sh, 6).is_ok());
        let cb = ResidualBlock {
            cat: CtxBlockCat::CbLevel4x4,
            field_coded: false,
        };
        assert!(cb.check_level_list_idx(&sh, 0).is_err());
    }
}
