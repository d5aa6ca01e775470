use crate::opcodes::Opcode;

/// Hardforks this engine distinguishes. Ordering is chronological, so
/// schedule checks read as `self.fork >= Fork::Berlin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Fork {
    Frontier,
    Homestead,
    Tangerine,
    SpuriousDragon,
    Byzantium,
    Constantinople,
    Istanbul,
    Berlin,
    London,
    Paris,
    Shanghai,
    #[default]
    Cancun,
}

/// Hardfork flags and the gas-schedule constants the handlers consult.
///
/// Constant (fork-independent) opcode costs live in the opcode properties
/// table; everything that moved across forks is answered here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainRules {
    pub fork: Fork,
}

impl Default for ChainRules {
    fn default() -> Self {
        Self::new(Fork::Cancun)
    }
}

impl ChainRules {
    pub fn new(fork: Fork) -> Self {
        Self { fork }
    }

    pub fn supports(&self, opcode: Opcode) -> bool {
        self.fork >= opcode.introduced_in()
    }

    /// EXP charges this per byte of the exponent (EIP-160).
    pub fn exp_byte_cost(&self) -> u64 {
        if self.fork >= Fork::SpuriousDragon {
            50
        } else {
            10
        }
    }

    pub fn balance_cost(&self, cold: bool) -> u64 {
        match self.fork {
            f if f >= Fork::Berlin => access_cost(cold),
            f if f >= Fork::Istanbul => 700,
            f if f >= Fork::Tangerine => 400,
            _ => 20,
        }
    }

    /// EXTCODESIZE / EXTCODECOPY address-access portion.
    pub fn extcode_access_cost(&self, cold: bool) -> u64 {
        match self.fork {
            f if f >= Fork::Berlin => access_cost(cold),
            f if f >= Fork::Tangerine => 700,
            _ => 20,
        }
    }

    pub fn extcodehash_cost(&self, cold: bool) -> u64 {
        match self.fork {
            f if f >= Fork::Berlin => access_cost(cold),
            f if f >= Fork::Istanbul => 700,
            _ => 400,
        }
    }

    pub fn sload_cost(&self, cold: bool) -> u64 {
        match self.fork {
            f if f >= Fork::Berlin => {
                if cold {
                    2100
                } else {
                    100
                }
            }
            f if f >= Fork::Istanbul => 800,
            f if f >= Fork::Tangerine => 200,
            _ => 50,
        }
    }

    /// CALL-family address-access portion.
    pub fn call_access_cost(&self, cold: bool) -> u64 {
        match self.fork {
            f if f >= Fork::Berlin => access_cost(cold),
            f if f >= Fork::Tangerine => 700,
            _ => 40,
        }
    }

    pub fn selfdestruct_cost(&self, cold: bool, funds_lost_to_new_account: bool) -> u64 {
        let base: u64 = if self.fork >= Fork::Tangerine { 5000 } else { 0 };
        let new_account: u64 = if funds_lost_to_new_account { 25000 } else { 0 };
        let access: u64 = if self.fork >= Fork::Berlin && cold {
            2600
        } else {
            0
        };
        base.saturating_add(new_account).saturating_add(access)
    }

    pub fn selfdestruct_refund(&self) -> i64 {
        if self.fork >= Fork::London {
            0
        } else {
            24000
        }
    }

    /// Full SSTORE schedule: the charge plus the refund-counter delta.
    ///
    /// `original` is the value at the start of the transaction, `current`
    /// the value before this store. Three regimes: legacy (< Istanbul),
    /// EIP-2200 (Istanbul), EIP-2929/3529 (Berlin and later; the clear
    /// refund drops from 15000 to 4800 at London).
    pub fn sstore_cost(
        &self,
        original: ethereum_types::U256,
        current: ethereum_types::U256,
        new: ethereum_types::U256,
        cold: bool,
    ) -> SstoreCost {
        let clear_refund: i64 = if self.fork >= Fork::London { 4800 } else { 15000 };

        if self.fork < Fork::Istanbul {
            let cost = if current.is_zero() && !new.is_zero() {
                20000
            } else {
                5000
            };
            let refund = if !current.is_zero() && new.is_zero() {
                15000
            } else {
                0
            };
            return SstoreCost { cost, refund };
        }

        // EIP-2200 net metering; EIP-2929 splits out the cold surcharge and
        // re-bases the warm costs.
        let (sload_like, reset_cost, cold_surcharge): (u64, u64, u64) =
            if self.fork >= Fork::Berlin {
                (100, 2900, if cold { 2100 } else { 0 })
            } else {
                (800, 5000, 0)
            };

        let mut refund: i64 = 0;
        let cost = if new == current {
            sload_like
        } else if current == original {
            if original.is_zero() {
                20000
            } else {
                if new.is_zero() {
                    refund = refund.saturating_add(clear_refund);
                }
                reset_cost
            }
        } else {
            // Dirty slot: charge like a read, adjust the refund counter.
            if !original.is_zero() {
                if current.is_zero() {
                    refund = refund.saturating_sub(clear_refund);
                }
                if new.is_zero() {
                    refund = refund.saturating_add(clear_refund);
                }
            }
            if new == original {
                let restore = if original.is_zero() {
                    20000u64.saturating_sub(sload_like)
                } else {
                    reset_cost.saturating_sub(sload_like)
                };
                refund = refund.saturating_add(i64::try_from(restore).unwrap_or(i64::MAX));
            }
            sload_like
        };

        SstoreCost {
            cost: cost.saturating_add(cold_surcharge),
            refund,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SstoreCost {
    pub cost: u64,
    pub refund: i64,
}

fn access_cost(cold: bool) -> u64 {
    if cold {
        2600
    } else {
        100
    }
}
