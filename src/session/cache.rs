use crate::core::types::{Account, Market, Order, Position};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

/// Cached session state with per-kind slots and an identity epoch guard.
///
/// The epoch advances on every wallet connect/disconnect. Account-scoped
/// writes (positions, orders, account) carry the epoch their fetch started
/// under and are discarded on mismatch, so a response that resolves after a
/// disconnect can never resurrect stale state. Market data is wallet-agnostic
/// and bypasses the guard. Each slot is last-write-wins.
#[derive(Debug, Default)]
pub struct SessionCache {
    epoch: AtomicU64,
    markets: RwLock<Option<Vec<Market>>>,
    positions: RwLock<Option<Vec<Position>>>,
    orders: RwLock<Option<Vec<Order>>>,
    account: RwLock<Option<Account>>,
}

impl SessionCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Advance the identity epoch and drop all account-scoped state.
    pub fn advance_epoch(&self) -> u64 {
        let next = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        self.clear_account_scoped();
        next
    }

    pub fn clear_account_scoped(&self) {
        *self.positions.write().expect("cache lock poisoned") = None;
        *self.orders.write().expect("cache lock poisoned") = None;
        *self.account.write().expect("cache lock poisoned") = None;
    }

    pub fn invalidate_positions(&self) {
        *self.positions.write().expect("cache lock poisoned") = None;
    }

    pub fn invalidate_orders(&self) {
        *self.orders.write().expect("cache lock poisoned") = None;
    }

    pub fn invalidate_account(&self) {
        *self.account.write().expect("cache lock poisoned") = None;
    }

    pub fn store_markets(&self, markets: Vec<Market>) {
        *self.markets.write().expect("cache lock poisoned") = Some(markets);
    }

    /// Store positions fetched under `epoch`; returns false when discarded.
    pub fn store_positions(&self, epoch: u64, positions: Vec<Position>) -> bool {
        let guard = self.positions.write().expect("cache lock poisoned");
        self.store_guarded(epoch, guard, positions)
    }

    /// Store orders fetched under `epoch`; returns false when discarded.
    pub fn store_orders(&self, epoch: u64, orders: Vec<Order>) -> bool {
        let guard = self.orders.write().expect("cache lock poisoned");
        self.store_guarded(epoch, guard, orders)
    }

    /// Store the account fetched under `epoch`; returns false when discarded.
    pub fn store_account(&self, epoch: u64, account: Account) -> bool {
        let guard = self.account.write().expect("cache lock poisoned");
        self.store_guarded(epoch, guard, account)
    }

    fn store_guarded<T>(
        &self,
        epoch: u64,
        mut slot: std::sync::RwLockWriteGuard<'_, Option<T>>,
        value: T,
    ) -> bool {
        // Checked under the slot lock so an epoch advance cannot interleave
        // between the check and the write.
        if self.epoch() == epoch {
            *slot = Some(value);
            true
        } else {
            false
        }
    }

    #[must_use]
    pub fn markets(&self) -> Option<Vec<Market>> {
        self.markets.read().expect("cache lock poisoned").clone()
    }

    #[must_use]
    pub fn positions(&self) -> Option<Vec<Position>> {
        self.positions.read().expect("cache lock poisoned").clone()
    }

    #[must_use]
    pub fn orders(&self) -> Option<Vec<Order>> {
        self.orders.read().expect("cache lock poisoned").clone()
    }

    #[must_use]
    pub fn account(&self) -> Option<Account> {
        self.account.read().expect("cache lock poisoned").clone()
    }
}
