use crate::common::ContextId;
use crate::transaction::Transaction;
use dashmap::DashMap;

/// Per-context LIFO stacks of suspended transactions.
///
/// Empty stacks are removed so idle contexts hold no memory.
#[derive(Default)]
pub(crate) struct SuspensionStacks {
    stacks: DashMap<ContextId, Vec<Transaction>>,
}

impl SuspensionStacks {
    pub(crate) fn push(&self, ctx: ContextId, transaction: Transaction) {
        self.stacks.entry(ctx).or_default().push(transaction);
    }

    pub(crate) fn pop(&self, ctx: ContextId) -> Option<Transaction> {
        let popped = match self.stacks.get_mut(&ctx) {
            Some(mut stack) => stack.pop(),
            None => None,
        };
        self.stacks.remove_if(&ctx, |_, stack| stack.is_empty());
        popped
    }

    pub(crate) fn is_empty(&self, ctx: ContextId) -> bool {
        self.depth(ctx) == 0
    }

    pub(crate) fn depth(&self, ctx: ContextId) -> usize {
        self.stacks.get(&ctx).map(|stack| stack.len()).unwrap_or(0)
    }

    /// Removes and returns the stack of `ctx`, oldest suspension first.
    pub(crate) fn release(&self, ctx: ContextId) -> Vec<Transaction> {
        self.stacks.remove(&ctx).map(|(_, stack)| stack).unwrap_or_default()
    }

    pub(crate) fn contexts(&self) -> usize {
        self.stacks.len()
    }
}
