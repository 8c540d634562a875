use super::bins::*;
use super::cabac_contexts::*;
use super::error::*;
use super::neighbour::*;

// Table 9-43, levelListIdx 0..=62 of 8x8 blocks
const SIGNIFICANT_COEFF_FLAG_FRAME_8X8: [u8; 63] = [
    0, 1, 2, 3, 4, 5, 5, 4, 4, 3, 3, 4, 4, 4, 5, 5, 4, 4, 4, 4, 3, 3, 6, 7, 7, 7, 8, 9, 10, 9, 8,
    7, 7, 6, 11, 12, 13, 11, 6, 7, 8, 9, 14, 10, 9, 8, 6, 11, 12, 13, 11, 6, 9, 14, 10, 9, 11, 12,
    13, 11, 14, 10, 12,
];
const SIGNIFICANT_COEFF_FLAG_FIELD_8X8: [u8; 63] = [
    0, 1, 1, 2, 2, 3, 3, 4, 5, 6, 7, 7, 7, 8, 4, 5, 6, 9, 10, 10, 8, 11, 12, 11, 9, 9, 10, 10, 8,
    11, 12, 11, 9, 9, 10, 10, 8, 11, 12, 11, 9, 9, 10, 10, 8, 13, 13, 9, 9, 10, 10, 8, 13, 13, 9,
    9, 10, 10, 14, 14, 14, 14, 14,
];
const LAST_SIGNIFICANT_COEFF_FLAG_8X8: [u8; 63] = [
    0, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2,
    2, 3, 3, 3, 3, 3, 3, 3, 3, 4, 4, 4, 4, 4, 4, 4, 4, 5, 5, 5, 5, 6, 6, 6, 6, 7, 7, 7, 7, 8, 8,
    8,
];

#[inline(always)]
fn flag(cond: bool) -> usize {
    cond as usize
}

/// mb_skip_flag (9.3.3.1.1.1).
pub fn mb_skip_flag_inc<N: NeighbourSource + ?Sized>(nb: &N) -> Result<usize> {
    let cond = |mb: Option<MacroblockInfo>| flag(mb.map_or(false, |mb| !mb.kind.is_skip()));
    Ok(cond(nb.macroblock(Neighbour::A)?) + cond(nb.macroblock(Neighbour::B)?))
}

/// mb_field_decoding_flag, from the neighbouring macroblock pairs.
pub fn mb_field_decoding_flag_inc<N: NeighbourSource + ?Sized>(nb: &N) -> Result<usize> {
    let cond = |mb: Option<MacroblockInfo>| flag(mb.map_or(false, |mb| mb.field));
    Ok(cond(nb.macroblock_pair(Neighbour::A)?) + cond(nb.macroblock_pair(Neighbour::B)?))
}

/// Bin 0 of mb_type (9.3.3.1.1.3). `ctx_offset` is 0 for the SI prefix,
/// 3 for I types and 27 for the B prefix.
pub fn mb_type_inc<N: NeighbourSource + ?Sized>(nb: &N, ctx_offset: usize) -> Result<usize> {
    let cond = |mb: Option<MacroblockInfo>| match mb {
        None => 0,
        Some(mb) => match (ctx_offset, mb.kind) {
            (0, MbKind::Si) | (3, MbKind::INxN) => 0,
            (27, MbKind::BSkip) | (27, MbKind::BDirect16x16) => 0,
            _ => 1,
        },
    };
    Ok(cond(nb.macroblock(Neighbour::A)?) + cond(nb.macroblock(Neighbour::B)?))
}

/// Luma prefix bin `b8x8` of coded_block_pattern. `prior` holds the bins
/// already coded for the current macroblock.
pub fn coded_block_pattern_luma_inc<N: NeighbourSource + ?Sized>(
    nb: &N,
    b8x8: usize,
    prior: &Bins,
) -> Result<usize> {
    let cond = |n: Neighbour| -> Result<usize> {
        Ok(match nb.luma8x8_block(n, b8x8)? {
            Luma8x8Neighbour::Unavailable => 0,
            Luma8x8Neighbour::Current(b8n) => flag(!prior.get(b8n).unwrap_or(false)),
            Luma8x8Neighbour::Macroblock(mb, b8n) => {
                if mb.kind == MbKind::IPcm {
                    0
                } else {
                    flag(mb.kind.is_skip() || (mb.cbp_luma >> b8n) & 1 == 0)
                }
            }
        })
    };
    Ok(cond(Neighbour::A)? + 2 * cond(Neighbour::B)?)
}

/// Chroma suffix bins of coded_block_pattern.
pub fn coded_block_pattern_chroma_inc<N: NeighbourSource + ?Sized>(
    nb: &N,
    bin_idx: usize,
) -> Result<usize> {
    let cond = |mb: Option<MacroblockInfo>| match mb {
        None => 0,
        Some(mb) if mb.kind == MbKind::IPcm => 1,
        Some(mb) if mb.kind.is_skip() => 0,
        Some(mb) => {
            if bin_idx == 0 {
                flag(mb.cbp_chroma != 0)
            } else {
                flag(mb.cbp_chroma == 2)
            }
        }
    };
    let a = cond(nb.macroblock(Neighbour::A)?);
    let b = cond(nb.macroblock(Neighbour::B)?);
    Ok(a + 2 * b + if bin_idx == 1 { 4 } else { 0 })
}

/// Bin 0 of mb_qp_delta, from the previous macroblock in decoding order.
pub fn mb_qp_delta_inc<N: NeighbourSource + ?Sized>(nb: &N) -> Result<usize> {
    Ok(match nb.previous_macroblock()? {
        None => 0,
        Some(prev) => flag(
            !prev.kind.is_skip()
                && prev.kind != MbKind::IPcm
                && (prev.kind == MbKind::I16x16 || prev.cbp_luma != 0 || prev.cbp_chroma != 0)
                && prev.mb_qp_delta != 0,
        ),
    })
}

pub fn intra_chroma_pred_mode_inc<N: NeighbourSource + ?Sized>(nb: &N) -> Result<usize> {
    let cond = |mb: Option<MacroblockInfo>| {
        flag(mb.map_or(false, |mb| {
            mb.kind.is_intra() && mb.kind != MbKind::IPcm && mb.intra_chroma_pred_mode != 0
        }))
    };
    Ok(cond(nb.macroblock(Neighbour::A)?) + cond(nb.macroblock(Neighbour::B)?))
}

pub fn transform_size_8x8_flag_inc<N: NeighbourSource + ?Sized>(nb: &N) -> Result<usize> {
    let cond = |mb: Option<MacroblockInfo>| flag(mb.map_or(false, |mb| mb.transform_size_8x8_flag));
    Ok(cond(nb.macroblock(Neighbour::A)?) + cond(nb.macroblock(Neighbour::B)?))
}

fn inter_partition(part: Option<PartitionInfo>) -> Option<PartitionInfo> {
    part.filter(|p| !p.kind.is_skip() && !p.kind.is_intra() && p.pred_flag)
}

/// Bin 0 of ref_idx_lX (9.3.3.1.1.6).
pub fn ref_idx_inc<N: NeighbourSource + ?Sized>(
    nb: &N,
    mbaff_frame_flag: bool,
    list: usize,
) -> Result<usize> {
    let current = nb.current()?;
    let cond = |n: Neighbour| -> Result<usize> {
        Ok(match inter_partition(nb.partition(n, list)?) {
            Some(p) if !p.direct => {
                let ref_idx_zero = if mbaff_frame_flag && !current.field && p.field {
                    p.ref_idx <= 1
                } else {
                    p.ref_idx <= 0
                };
                flag(!ref_idx_zero)
            }
            _ => 0,
        })
    };
    Ok(cond(Neighbour::A)? + 2 * cond(Neighbour::B)?)
}

/// Bin 0 of mvd_lX[][][comp] (9.3.3.1.1.7).
pub fn mvd_inc<N: NeighbourSource + ?Sized>(
    nb: &N,
    mbaff_frame_flag: bool,
    list: usize,
    comp: usize,
) -> Result<usize> {
    SyntaxElement::mvd(comp)?;
    let current = nb.current()?;
    let abs_mvd_comp = |n: Neighbour| -> Result<i64> {
        Ok(match inter_partition(nb.partition(n, list)?) {
            Some(p) => {
                let abs = (p.mvd[comp] as i64).abs();
                if comp == 1 && mbaff_frame_flag && !current.field && p.field {
                    abs * 2
                } else if comp == 1 && mbaff_frame_flag && current.field && !p.field {
                    abs / 2
                } else {
                    abs
                }
            }
            None => 0,
        })
    };
    let sum = abs_mvd_comp(Neighbour::A)? + abs_mvd_comp(Neighbour::B)?;
    Ok(if sum < 3 {
        0
    } else if sum <= 32 {
        1
    } else {
        2
    })
}

/// coded_block_flag (9.3.3.1.1.9). The collaborator resolves transBlockN.
/// `constrained_intra_partitioned` is
/// `SliceHeader::constrained_intra_partitioned`.
pub fn coded_block_flag_inc<N: NeighbourSource + ?Sized>(
    nb: &N,
    cat: CtxBlockCat,
    constrained_intra_partitioned: bool,
) -> Result<usize> {
    let current = nb.current()?;
    let cond = |n: Neighbour| -> Result<usize> {
        Ok(match nb.coded_block(n, cat)? {
            CodedBlockNeighbour::Unavailable => flag(current.kind.is_intra()),
            CodedBlockNeighbour::Available { kind, .. } if kind == MbKind::IPcm => 1,
            CodedBlockNeighbour::Available { kind, .. }
                if current.kind.is_intra() && constrained_intra_partitioned && kind.is_inter() =>
            {
                0
            }
            CodedBlockNeighbour::Available {
                coded_block_flag, ..
            } => flag(coded_block_flag.unwrap_or(false)),
        })
    };
    Ok(cond(Neighbour::A)? + 2 * cond(Neighbour::B)?)
}

/// significant_coeff_flag at scanning position `level_list_idx`.
pub fn significant_coeff_flag_inc(
    cat: CtxBlockCat,
    level_list_idx: usize,
    field_coded: bool,
    num_c8x8: usize,
) -> usize {
    if cat == CtxBlockCat::ChromaDcLevel {
        (level_list_idx / num_c8x8.max(1)).min(2)
    } else if cat.is_8x8() {
        let map = if field_coded {
            &SIGNIFICANT_COEFF_FLAG_FIELD_8X8
        } else {
            &SIGNIFICANT_COEFF_FLAG_FRAME_8X8
        };
        map[level_list_idx.min(62)] as usize
    } else {
        level_list_idx
    }
}

pub fn last_significant_coeff_flag_inc(
    cat: CtxBlockCat,
    level_list_idx: usize,
    num_c8x8: usize,
) -> usize {
    if cat == CtxBlockCat::ChromaDcLevel {
        (level_list_idx / num_c8x8.max(1)).min(2)
    } else if cat.is_8x8() {
        LAST_SIGNIFICANT_COEFF_FLAG_8X8[level_list_idx.min(62)] as usize
    } else {
        level_list_idx
    }
}

/// coeff_abs_level_minus1 from the levels already coded in the block.
pub fn coeff_abs_level_minus1_inc(
    cat: CtxBlockCat,
    bin_idx: usize,
    num_decod_abs_level_gt1: usize,
    num_decod_abs_level_eq1: usize,
) -> usize {
    if bin_idx == 0 {
        if num_decod_abs_level_gt1 != 0 {
            0
        } else {
            (1 + num_decod_abs_level_eq1).min(4)
        }
    } else {
        let cap = if cat == CtxBlockCat::ChromaDcLevel { 3 } else { 4 };
        5 + num_decod_abs_level_gt1.min(cap)
    }
}
