use super::error::*;
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

#[derive(Clone, Copy, PartialEq, Eq, Debug, FromPrimitive)]
pub enum SliceType {
    P = 0,
    B = 1,
    I = 2,
    SP = 3,
    SI = 4,
}

impl SliceType {
    #[inline(always)]
    pub fn is_intra(&self) -> bool {
        matches!(self, SliceType::I | SliceType::SI)
    }

    #[inline(always)]
    pub fn is_p(&self) -> bool {
        matches!(self, SliceType::P | SliceType::SP)
    }
}

impl FromStr for SliceType {
    type Err = CabacError;

    fn from_str(s: &str) -> Result<SliceType> {
        match s.to_ascii_uppercase().as_str() {
            "P" => Ok(SliceType::P),
            "B" => Ok(SliceType::B),
            "I" => Ok(SliceType::I),
            "SP" => Ok(SliceType::SP),
            "SI" => Ok(SliceType::SI),
            _ => Err(protocol_violation!("unknown slice type: {}", s)),
        }
    }
}

impl fmt::Display for SliceType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            SliceType::P => "P",
            SliceType::B => "B",
            SliceType::I => "I",
            SliceType::SP => "SP",
            SliceType::SI => "SI",
        };
        write!(f, "{}", name)
    }
}

/// Slice-level parameters the entropy coder depends on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SliceHeader {
    pub slice_type: SliceType,
    pub slice_qp_y: i32,
    pub cabac_init_idc: usize,
    pub mbaff_frame_flag: bool,
    pub field_pic_flag: bool,
    pub chroma_array_type: usize,
    pub constrained_intra_pred_flag: bool,
    pub nal_unit_type: usize,
    /// QpBdOffsetY = 6 * bit_depth_luma_minus8.
    pub qp_bd_offset_y: i32,
}

impl SliceHeader {
    pub fn new(slice_type: SliceType, slice_qp_y: i32) -> SliceHeader {
        SliceHeader {
            slice_type,
            slice_qp_y,
            cabac_init_idc: 0,
            mbaff_frame_flag: false,
            field_pic_flag: false,
            chroma_array_type: 1,
            constrained_intra_pred_flag: false,
            nal_unit_type: 1,
            qp_bd_offset_y: 0,
        }
    }

    /// 0 selects the I/SI initialization table, 1..=3 the table of
    /// cabac_init_idc 0..=2.
    #[inline(always)]
    pub fn init_type(&self) -> usize {
        if self.slice_type.is_intra() {
            0
        } else {
            1 + self.cabac_init_idc
        }
    }

    /// NumC8x8 for chroma DC blocks.
    #[inline(always)]
    pub fn num_c8x8(&self) -> usize {
        match self.chroma_array_type {
            2 => 2,
            _ => 1,
        }
    }

    #[inline(always)]
    pub fn data_partitioned(&self) -> bool {
        (2..=4).contains(&self.nal_unit_type)
    }

    /// Inter neighbours do not count for coded_block_flag of intra
    /// macroblocks.
    #[inline(always)]
    pub fn constrained_intra_partitioned(&self) -> bool {
        self.constrained_intra_pred_flag && self.data_partitioned()
    }

    /// Legal mb_qp_delta values (7.4.5).
    pub fn mb_qp_delta_range(&self) -> RangeInclusive<i32> {
        -(26 + self.qp_bd_offset_y / 2)..=25 + self.qp_bd_offset_y / 2
    }

    pub fn validate(&self) -> Result<()> {
        if !(-48..=51).contains(&self.slice_qp_y) {
            return Err(protocol_violation!(
                "SliceQPY {} out of range",
                self.slice_qp_y
            ));
        }
        if self.cabac_init_idc > 2 {
            return Err(protocol_violation!(
                "cabac_init_idc {} out of range",
                self.cabac_init_idc
            ));
        }
        if self.chroma_array_type > 3 {
            return Err(protocol_violation!(
                "ChromaArrayType {} out of range",
                self.chroma_array_type
            ));
        }
        if self.nal_unit_type > 31 {
            return Err(protocol_violation!(
                "nal_unit_type {} out of range",
                self.nal_unit_type
            ));
        }
        if !(0..=36).contains(&self.qp_bd_offset_y) || self.qp_bd_offset_y % 6 != 0 {
            return Err(protocol_violation!(
                "QpBdOffsetY {} out of range",
                self.qp_bd_offset_y
            ));
        }
        if self.mbaff_frame_flag && self.field_pic_flag {
            return Err(protocol_violation!(
                "MbaffFrameFlag requires a frame picture"
            ));
        }
        Ok(())
    }
}

/// Progress of the CABAC parsing of one slice_data().
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SliceDataState {
    Coding,
    /// A terminate bin equal to 1 was coded for I_PCM; raw samples follow.
    PcmPending,
    /// end_of_slice_flag equal to 1 was coded.
    Finished,
    /// An element failed. The slice data must be discarded.
    Failed,
}

/// Sample layout of an I_PCM macroblock.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PcmFormat {
    pub bit_depth_luma: usize,
    pub bit_depth_chroma: usize,
    pub num_chroma_samples: usize,
}

impl PcmFormat {
    pub const NUM_LUMA_SAMPLES: usize = 256;

    pub fn new(chroma_array_type: usize, bit_depth_luma: usize, bit_depth_chroma: usize) -> PcmFormat {
        // 2 * MbWidthC * MbHeightC
        let num_chroma_samples = match chroma_array_type {
            1 => 2 * 8 * 8,
            2 => 2 * 8 * 16,
            3 => 2 * 16 * 16,
            _ => 0,
        };
        PcmFormat {
            bit_depth_luma,
            bit_depth_chroma,
            num_chroma_samples,
        }
    }

    /// PCM sample bit depths are 8..=14.
    pub fn validate(&self) -> Result<()> {
        let chroma = (self.num_chroma_samples > 0).then(|| self.bit_depth_chroma);
        for bit_depth in std::iter::once(self.bit_depth_luma).chain(chroma) {
            if !(8..=14).contains(&bit_depth) {
                return Err(protocol_violation!("PCM bit depth {} out of range", bit_depth));
            }
        }
        Ok(())
    }

    pub fn num_samples(&self) -> usize {
        Self::NUM_LUMA_SAMPLES + self.num_chroma_samples
    }

    pub fn bit_depth(&self, sample_idx: usize) -> usize {
        if sample_idx < Self::NUM_LUMA_SAMPLES {
            self.bit_depth_luma
        } else {
            self.bit_depth_chroma
        }
    }
}
