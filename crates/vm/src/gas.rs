use crate::errors::VMError;

/// Remaining-gas counter for one frame.
///
/// Gas is kept as a signed 64-bit value so running out shows up as a single
/// sign test after the subtract. The refund counter is accumulated here but
/// settled by the embedder after the outer call returns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GasMeter {
    remaining: i64,
    refunded: i64,
}

impl GasMeter {
    pub fn new(limit: u64) -> Self {
        Self {
            remaining: i64::try_from(limit).unwrap_or(i64::MAX),
            refunded: 0,
        }
    }

    pub fn charge(&mut self, cost: u64) -> Result<(), VMError> {
        let cost = i64::try_from(cost).unwrap_or(i64::MAX);
        self.remaining = self.remaining.saturating_sub(cost);
        if self.remaining < 0 {
            return Err(VMError::OutOfGas);
        }
        Ok(())
    }

    /// Gas handed back by a finished child call.
    pub fn reclaim(&mut self, gas: u64) {
        let gas = i64::try_from(gas).unwrap_or(i64::MAX);
        self.remaining = self.remaining.saturating_add(gas);
    }

    pub fn consume_all(&mut self) {
        self.remaining = 0;
    }

    pub fn remaining(&self) -> u64 {
        u64::try_from(self.remaining).unwrap_or(0)
    }

    /// Adjust the refund counter; SSTORE deltas may be negative.
    pub fn add_refund(&mut self, delta: i64) {
        self.refunded = self.refunded.saturating_add(delta);
    }

    pub fn refunded(&self) -> u64 {
        u64::try_from(self.refunded).unwrap_or(0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;

    #[test]
    fn charge_within_budget() {
        let mut gas = GasMeter::new(100);
        gas.charge(40).unwrap();
        gas.charge(60).unwrap();
        assert_eq!(gas.remaining(), 0);
    }

    #[test]
    fn charge_past_budget_is_out_of_gas() {
        let mut gas = GasMeter::new(10);
        assert_eq!(gas.charge(11), Err(VMError::OutOfGas));
        assert_eq!(gas.remaining(), 0);
    }

    #[test]
    fn reclaim_returns_child_gas() {
        let mut gas = GasMeter::new(100);
        gas.charge(80).unwrap();
        gas.reclaim(30);
        assert_eq!(gas.remaining(), 50);
    }

    #[test]
    fn negative_refund_deltas_floor_at_zero_when_read() {
        let mut gas = GasMeter::new(0);
        gas.add_refund(4800);
        gas.add_refund(-6000);
        assert_eq!(gas.refunded(), 0);
    }
}
