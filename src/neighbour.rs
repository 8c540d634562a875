use super::cabac_contexts::CtxBlockCat;
use super::error::*;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Neighbour {
    A,
    B,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum MbKind {
    PSkip,
    BSkip,
    BDirect16x16,
    #[default]
    Inter,
    INxN,
    I16x16,
    IPcm,
    Si,
}

impl MbKind {
    #[inline(always)]
    pub fn is_skip(&self) -> bool {
        matches!(self, MbKind::PSkip | MbKind::BSkip)
    }

    #[inline(always)]
    pub fn is_intra(&self) -> bool {
        matches!(self, MbKind::INxN | MbKind::I16x16 | MbKind::IPcm | MbKind::Si)
    }

    #[inline(always)]
    pub fn is_inter(&self) -> bool {
        !self.is_intra()
    }
}

/// Already decoded state of a neighbouring (or previous) macroblock.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct MacroblockInfo {
    pub kind: MbKind,
    /// Field macroblock (pair) of an MBAFF frame, or any macroblock of a field.
    pub field: bool,
    pub cbp_luma: u8,
    pub cbp_chroma: u8,
    pub intra_chroma_pred_mode: u8,
    pub transform_size_8x8_flag: bool,
    pub mb_qp_delta: i32,
}

impl MacroblockInfo {
    pub fn new(kind: MbKind) -> MacroblockInfo {
        MacroblockInfo {
            kind,
            ..Default::default()
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct CurrentMacroblock {
    pub kind: MbKind,
    pub field: bool,
}

/// Neighbouring partition of the partition being parsed, for one reference list.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct PartitionInfo {
    pub kind: MbKind,
    pub field: bool,
    /// predFlagLX of the partition.
    pub pred_flag: bool,
    /// Predicted in direct mode (B_Skip, B_Direct_16x16 or B_Direct_8x8).
    pub direct: bool,
    pub ref_idx: i32,
    pub mvd: [i32; 2],
}

/// Neighbouring block of the transform block whose coded_block_flag is parsed.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum CodedBlockNeighbour {
    /// mbAddrN is not available.
    #[default]
    Unavailable,
    /// mbAddrN is available. `coded_block_flag` is `None` when transBlockN
    /// is not available.
    Available {
        kind: MbKind,
        coded_block_flag: Option<bool>,
    },
}

/// Owner of the 8x8 luma block left of / above a given 8x8 block.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Luma8x8Neighbour {
    Unavailable,
    Current(usize),
    Macroblock(MacroblockInfo, usize),
}

/// Queries the surrounding macroblock layer answers for context selection.
/// `None` means the neighbour is not available.
pub trait NeighbourSource {
    fn current(&self) -> Result<CurrentMacroblock>;

    fn macroblock(&self, n: Neighbour) -> Result<Option<MacroblockInfo>>;

    /// Top macroblock of the neighbouring pair (6.4.10), for MBAFF frames.
    fn macroblock_pair(&self, n: Neighbour) -> Result<Option<MacroblockInfo>>;

    /// Previous macroblock in decoding order within the slice.
    fn previous_macroblock(&self) -> Result<Option<MacroblockInfo>>;

    fn partition(&self, n: Neighbour, list: usize) -> Result<Option<PartitionInfo>>;

    fn coded_block(&self, n: Neighbour, cat: CtxBlockCat) -> Result<CodedBlockNeighbour>;

    /// 8x8 luma block neighbour (6.4.11.2) for non-MBAFF geometry.
    fn luma8x8_block(&self, n: Neighbour, b8x8: usize) -> Result<Luma8x8Neighbour> {
        debug_assert!(b8x8 < 4);
        let (inside, neighbour_idx) = match n {
            Neighbour::A => (b8x8 % 2 == 1, b8x8 ^ 1),
            Neighbour::B => (b8x8 >= 2, b8x8 ^ 2),
        };
        if inside {
            Ok(Luma8x8Neighbour::Current(neighbour_idx))
        } else {
            Ok(match self.macroblock(n)? {
                Some(mb) => Luma8x8Neighbour::Macroblock(mb, neighbour_idx),
                None => Luma8x8Neighbour::Unavailable,
            })
        }
    }
}

/// Plain-data answers to every neighbour query. The default has every
/// neighbour unavailable.
#[derive(Clone, Debug, Default)]
pub struct NeighbourSnapshot {
    pub current: CurrentMacroblock,
    pub mb_a: Option<MacroblockInfo>,
    pub mb_b: Option<MacroblockInfo>,
    pub pair_a: Option<MacroblockInfo>,
    pub pair_b: Option<MacroblockInfo>,
    pub previous: Option<MacroblockInfo>,
    pub partition_a: [Option<PartitionInfo>; 2],
    pub partition_b: [Option<PartitionInfo>; 2],
    pub coded_block_a: CodedBlockNeighbour,
    pub coded_block_b: CodedBlockNeighbour,
}

impl NeighbourSnapshot {
    pub fn unavailable() -> NeighbourSnapshot {
        NeighbourSnapshot::default()
    }
}

impl NeighbourSource for NeighbourSnapshot {
    fn current(&self) -> Result<CurrentMacroblock> {
        Ok(self.current)
    }

    fn macroblock(&self, n: Neighbour) -> Result<Option<MacroblockInfo>> {
        Ok(match n {
            Neighbour::A => self.mb_a,
            Neighbour::B => self.mb_b,
        })
    }

    fn macroblock_pair(&self, n: Neighbour) -> Result<Option<MacroblockInfo>> {
        Ok(match n {
            Neighbour::A => self.pair_a,
            Neighbour::B => self.pair_b,
        })
    }

    fn previous_macroblock(&self) -> Result<Option<MacroblockInfo>> {
        Ok(self.previous)
    }

    fn partition(&self, n: Neighbour, list: usize) -> Result<Option<PartitionInfo>> {
        if list > 1 {
            return Err(CabacError::CollaboratorFailure(format!(
                "no reference list {}",
                list
            )));
        }
        Ok(match n {
            Neighbour::A => self.partition_a[list],
            Neighbour::B => self.partition_b[list],
        })
    }

    fn coded_block(&self, n: Neighbour, _cat: CtxBlockCat) -> Result<CodedBlockNeighbour> {
        Ok(match n {
            Neighbour::A => self.coded_block_a,
            Neighbour::B => self.coded_block_b,
        })
    }
}
