use crate::{
    constants::STACK_LIMIT,
    errors::{InternalError, VMError},
};
use ethereum_types::U256;

/// The evaluation stack: up to 1024 words.
///
/// Two tiers of primitives. The safe tier reports `StackUnderflow` /
/// `StackOverflow` as ordinary execution failures. The `*_unchecked` tier is
/// reserved for handlers running under a proven bound (a block prelude, or
/// the per-instruction arity check in the safe dispatch mode): hitting a
/// bound there is an interpreter bug and surfaces as `InternalError`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stack {
    values: Vec<U256>,
}

impl Stack {
    pub fn new() -> Self {
        Self {
            values: Vec::with_capacity(STACK_LIMIT),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn push(&mut self, value: U256) -> Result<(), VMError> {
        if self.values.len() >= STACK_LIMIT {
            return Err(VMError::StackOverflow);
        }
        self.values.push(value);
        Ok(())
    }

    pub fn pop(&mut self) -> Result<U256, VMError> {
        self.values.pop().ok_or(VMError::StackUnderflow)
    }

    /// Read the n-th word from the top without removing it (0 is the top).
    pub fn peek(&self, depth: usize) -> Result<U256, VMError> {
        let index = self
            .values
            .len()
            .checked_sub(depth.checked_add(1).ok_or(VMError::StackUnderflow)?)
            .ok_or(VMError::StackUnderflow)?;
        self.values
            .get(index)
            .copied()
            .ok_or(VMError::StackUnderflow)
    }

    pub fn set_top(&mut self, value: U256) -> Result<(), VMError> {
        let top = self.values.last_mut().ok_or(VMError::StackUnderflow)?;
        *top = value;
        Ok(())
    }

    /// DUPn, 1-based.
    pub fn dup(&mut self, depth: usize) -> Result<(), VMError> {
        let value = self.peek(depth.checked_sub(1).ok_or(VMError::StackUnderflow)?)?;
        self.push(value)
    }

    /// SWAPn, 1-based: exchange the top with the word n below it.
    pub fn swap(&mut self, depth: usize) -> Result<(), VMError> {
        let len = self.values.len();
        let lower = len
            .checked_sub(depth.checked_add(1).ok_or(VMError::StackUnderflow)?)
            .ok_or(VMError::StackUnderflow)?;
        let top = len.checked_sub(1).ok_or(VMError::StackUnderflow)?;
        self.values.swap(lower, top);
        Ok(())
    }

    pub fn push_unchecked(&mut self, value: U256) -> Result<(), VMError> {
        if self.values.len() >= STACK_LIMIT {
            return Err(InternalError::StackBoundProven.into());
        }
        self.values.push(value);
        Ok(())
    }

    pub fn pop_unchecked(&mut self) -> Result<U256, VMError> {
        self.values
            .pop()
            .ok_or(InternalError::StackBoundProven.into())
    }

    pub fn peek_unchecked(&self, depth: usize) -> Result<U256, VMError> {
        self.peek(depth)
            .map_err(|_| InternalError::StackBoundProven.into())
    }

    pub fn dup_unchecked(&mut self, depth: usize) -> Result<(), VMError> {
        let value = self.peek_unchecked(depth.saturating_sub(1))?;
        self.push_unchecked(value)
    }

    pub fn swap_unchecked(&mut self, depth: usize) -> Result<(), VMError> {
        self.swap(depth)
            .map_err(|_| InternalError::StackBoundProven.into())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;

    #[test]
    fn push_pop_is_lifo() {
        let mut stack = Stack::new();
        stack.push(U256::from(1)).unwrap();
        stack.push(U256::from(2)).unwrap();
        assert_eq!(stack.pop().unwrap(), U256::from(2));
        assert_eq!(stack.pop().unwrap(), U256::from(1));
    }

    #[test]
    fn pop_on_empty_underflows() {
        let mut stack = Stack::new();
        assert_eq!(stack.pop(), Err(VMError::StackUnderflow));
    }

    #[test]
    fn push_past_limit_overflows() {
        let mut stack = Stack::new();
        for i in 0..STACK_LIMIT {
            stack.push(U256::from(i)).unwrap();
        }
        assert_eq!(stack.push(U256::zero()), Err(VMError::StackOverflow));
        assert_eq!(stack.len(), STACK_LIMIT);
    }

    #[test]
    fn peek_counts_from_the_top() {
        let mut stack = Stack::new();
        stack.push(U256::from(10)).unwrap();
        stack.push(U256::from(20)).unwrap();
        assert_eq!(stack.peek(0).unwrap(), U256::from(20));
        assert_eq!(stack.peek(1).unwrap(), U256::from(10));
        assert_eq!(stack.peek(2), Err(VMError::StackUnderflow));
    }

    #[test]
    fn dup_and_swap() {
        let mut stack = Stack::new();
        stack.push(U256::from(1)).unwrap();
        stack.push(U256::from(2)).unwrap();
        stack.push(U256::from(3)).unwrap();

        stack.dup(3).unwrap();
        assert_eq!(stack.peek(0).unwrap(), U256::from(1));

        stack.swap(3).unwrap();
        assert_eq!(stack.peek(0).unwrap(), U256::from(1));
        assert_eq!(stack.peek(3).unwrap(), U256::from(1));
    }

    #[test]
    fn unchecked_violation_is_internal() {
        let mut stack = Stack::new();
        assert_eq!(
            stack.pop_unchecked(),
            Err(VMError::Internal(InternalError::StackBoundProven))
        );
    }
}
