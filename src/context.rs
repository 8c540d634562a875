use super::cabac_tables::*;
use super::error::*;
use debug_print::*;

/// Adaptive probability model of one ctxIdx.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct CabacContext {
    pub p_state_idx: u8,
    pub val_mps: bool,
}

impl CabacContext {
    pub fn new(m: i32, n: i32, slice_qp_y: i32) -> CabacContext {
        let pre_ctx_state = num::clamp(((m * num::clamp(slice_qp_y, 0, 51)) >> 4) + n, 1, 126);
        if pre_ctx_state <= 63 {
            CabacContext {
                p_state_idx: (63 - pre_ctx_state) as u8,
                val_mps: false,
            }
        } else {
            CabacContext {
                p_state_idx: (pre_ctx_state - 64) as u8,
                val_mps: true,
            }
        }
    }

    #[inline(always)]
    pub fn range_lps(&self, cod_i_range: u16) -> u16 {
        RANGE_TAB_LPS[self.p_state_idx as usize][((cod_i_range >> 6) & 3) as usize]
    }

    /// State after coding `bin` through this context.
    #[inline(always)]
    pub fn updated(self, bin: bool) -> CabacContext {
        let state = self.p_state_idx as usize;
        if bin == self.val_mps {
            CabacContext {
                p_state_idx: TRANS_IDX_MPS[state],
                val_mps: self.val_mps,
            }
        } else {
            CabacContext {
                p_state_idx: TRANS_IDX_LPS[state],
                val_mps: if state == 0 {
                    !self.val_mps
                } else {
                    self.val_mps
                },
            }
        }
    }
}

/// Contexts of one coding sub-stream, initialized on first use.
#[derive(Clone, Debug)]
pub struct ContextStore {
    slots: Vec<Option<CabacContext>>,
    init_type: usize,
    slice_qp_y: i32,
}

impl ContextStore {
    pub fn new(init_type: usize, slice_qp_y: i32) -> ContextStore {
        ContextStore {
            slots: vec![None; NUM_CTX_IDX],
            init_type,
            slice_qp_y,
        }
    }

    pub fn init_type(&self) -> usize {
        self.init_type
    }

    pub fn slice_qp_y(&self) -> i32 {
        self.slice_qp_y
    }

    /// Forgets every adapted state, for the start of the next slice.
    pub fn reset(&mut self, init_type: usize, slice_qp_y: i32) {
        debug_eprintln!(
            "reset contexts: init_type={}, slice_qp_y={}",
            init_type,
            slice_qp_y
        );
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.init_type = init_type;
        self.slice_qp_y = slice_qp_y;
    }

    pub fn context(&mut self, ctx_idx: usize) -> Result<CabacContext> {
        if let Some(Some(ctx)) = self.slots.get(ctx_idx) {
            return Ok(*ctx);
        }
        let (m, n) = init_mn(self.init_type, ctx_idx).ok_or_else(|| {
            protocol_violation!(
                "ctxIdx {} has no context model (init_type {})",
                ctx_idx,
                self.init_type
            )
        })?;
        let ctx = CabacContext::new(m, n, self.slice_qp_y);
        self.slots[ctx_idx] = Some(ctx);
        Ok(ctx)
    }

    pub fn store(&mut self, ctx_idx: usize, ctx: CabacContext) {
        debug_assert!(ctx.p_state_idx <= 63);
        self.slots[ctx_idx] = Some(ctx);
    }

    /// Current state without triggering initialization.
    pub fn peek(&self, ctx_idx: usize) -> Option<CabacContext> {
        self.slots.get(ctx_idx).copied().flatten()
    }

    pub fn num_initialized(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{prelude::StdRng, Rng, SeedableRng};

    #[test]
    fn context_init_works() {
        // ctxIdx 0 in I slices: (m, n) = (20, -15)
        let ctx = CabacContext::new(20, -15, 26);
        // ((20 * 26) >> 4) - 15 = 17 -> 63 - 17
        assert_eq!(
            ctx,
            CabacContext {
                p_state_idx: 46,
                val_mps: false
            }
        );
        let ctx = CabacContext::new(0, 126, 40);
        assert_eq!(
            ctx,
            CabacContext {
                p_state_idx: 62,
                val_mps: true
            }
        );
        let ctx = CabacContext::new(-28, 127, 51);
        // ((-28 * 51) >> 4) + 127 = -90 + 127 = 37
        assert_eq!(
            ctx,
            CabacContext {
                p_state_idx: 26,
                val_mps: false
            }
        );
        // qp is clipped to 0..=51 and preCtxState to 1..=126
        assert_eq!(CabacContext::new(20, -15, 80), CabacContext::new(20, -15, 51));
        assert_eq!(
            CabacContext::new(-40, 0, 51),
            CabacContext {
                p_state_idx: 62,
                val_mps: false
            }
        );
    }

    #[test]
    fn lps_at_state_zero_flips_mps_works() {
        let ctx = CabacContext {
            p_state_idx: 0,
            val_mps: true,
        };
        assert_eq!(
            ctx.updated(false),
            CabacContext {
                p_state_idx: 0,
                val_mps: false
            }
        );
        let ctx = CabacContext {
            p_state_idx: 5,
            val_mps: true,
        };
        assert_eq!(
            ctx.updated(false),
            CabacContext {
                p_state_idx: 4,
                val_mps: true
            }
        );
        assert_eq!(
            ctx.updated(true),
            CabacContext {
                p_state_idx: 6,
                val_mps: true
            }
        );
    }

    #[test]
    fn adaptation_is_deterministic_works() {
        let mut rng: StdRng = SeedableRng::seed_from_u64(7);
        let events: Vec<(usize, bool)> = (0..4000)
            .map(|_| (rng.gen_range(0..460), rng.gen_bool(0.7)))
            .filter(|&(ctx_idx, _)| ctx_idx != CTX_IDX_TERMINATE)
            .collect();
        let mut store0 = ContextStore::new(2, 30);
        let mut store1 = ContextStore::new(2, 30);
        for &(ctx_idx, bin) in events.iter() {
            let c0 = store0.context(ctx_idx).unwrap().updated(bin);
            store0.store(ctx_idx, c0);
            let c1 = store1.context(ctx_idx).unwrap().updated(bin);
            store1.store(ctx_idx, c1);
            assert_eq!(c0, c1);
            assert!(c0.p_state_idx <= 63);
        }
    }

    #[test]
    fn lazy_init_and_reset_works() {
        let mut store = ContextStore::new(0, 26);
        assert_eq!(store.peek(60), None);
        let ctx = store.context(60).unwrap();
        assert_eq!(store.peek(60), Some(ctx));
        store.store(60, ctx.updated(!ctx.val_mps));
        assert_eq!(store.num_initialized(), 1);
        store.reset(1, 30);
        assert_eq!(store.num_initialized(), 0);
        assert_eq!(store.init_type(), 1);
        assert_eq!(store.slice_qp_y(), 30);
    }

    #[test]
    fn terminate_context_is_rejected() {
        let mut store = ContextStore::new(0, 26);
        assert!(matches!(
            store.context(CTX_IDX_TERMINATE),
            Err(CabacError::ProtocolViolation(_))
        ));
        assert!(matches!(
            store.context(NUM_CTX_IDX),
            Err(CabacError::ProtocolViolation(_))
        ));
    }
}
