//! Leader/follower in-flight de-duplication (§4.5): concurrent requests for
//! the same `(qname, qtype)` collapse onto a single in-flight resolution.
//! Grounded on the teacher's `InflightLeaderGuard`/`DashMap`+`watch` pattern,
//! adapted to a single `Rc<RefCell<FxHashMap>>` since there is only ever one
//! task polling at a time under this crate's single-threaded event loop
//! (§5) — no `DashMap` sharding needed, and `Rc` stands in for `Arc`.

use std::cell::RefCell;
use std::rc::Rc;

use hickory_proto::op::Message;
use rustc_hash::FxHashMap;
use tern_dns_domain::{Name, RecordType};
use tokio::sync::watch;

pub type InflightKey = (Name, RecordType);
type InflightSender = Rc<watch::Sender<Option<Rc<Message>>>>;

#[derive(Default)]
pub struct InflightTable {
    table: RefCell<FxHashMap<InflightKey, InflightSender>>,
}

impl InflightTable {
    pub fn new() -> Self {
        Self { table: RefCell::new(FxHashMap::default()) }
    }

    /// Returns `(is_leader, receiver)`. The first caller for a key becomes
    /// the leader; every subsequent caller for the same key while it's
    /// still outstanding joins as a follower on the same channel.
    pub fn register_or_join(&self, key: InflightKey) -> (bool, watch::Receiver<Option<Rc<Message>>>) {
        let mut table = self.table.borrow_mut();
        if let Some(sender) = table.get(&key) {
            (false, sender.subscribe())
        } else {
            let (tx, rx) = watch::channel(None);
            table.insert(key, Rc::new(tx));
            (true, rx)
        }
    }

    /// The leader's resolution finished, successfully or not: remove the
    /// entry and broadcast the result to every follower that joined.
    pub fn complete(&self, key: &InflightKey, result: Option<Rc<Message>>) {
        if let Some(sender) = self.table.borrow_mut().remove(key) {
            let _ = sender.send(result);
        }
    }
}

/// Ensures a leader that returns early still clears its table entry and
/// wakes any followers with `None` rather than leaving them to await
/// forever, the same safety net the teacher's `Drop for InflightLeaderGuard`
/// provides. A leader that calls `complete` itself makes this a no-op on
/// drop, since the entry is already gone.
pub struct LeaderGuard<'a> {
    table: &'a InflightTable,
    key: InflightKey,
}

impl<'a> LeaderGuard<'a> {
    pub fn new(table: &'a InflightTable, key: InflightKey) -> Self {
        Self { table, key }
    }
}

impl Drop for LeaderGuard<'_> {
    fn drop(&mut self) {
        self.table.complete(&self.key, None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tern_dns_domain::RecordType;

    fn key() -> InflightKey {
        (Name::parse("example.com").unwrap(), RecordType::A)
    }

    #[test]
    fn first_caller_leads_second_follows() {
        let table = InflightTable::new();
        let (leader, _rx1) = table.register_or_join(key());
        assert!(leader);
        let (follower, _rx2) = table.register_or_join(key());
        assert!(!follower);
    }

    #[tokio::test]
    async fn follower_observes_leader_completion() {
        let table = InflightTable::new();
        let (_leader, mut rx) = table.register_or_join(key());
        let (follower, mut rx2) = table.register_or_join(key());
        assert!(!follower);

        table.complete(&key(), Some(Rc::new(Message::new())));

        rx.changed().await.unwrap();
        rx2.changed().await.unwrap();
        assert!(rx2.borrow().is_some());
    }

    #[test]
    fn guard_drop_clears_entry_and_wakes_followers_with_none() {
        let table = InflightTable::new();
        {
            let (_leader, _rx) = table.register_or_join(key());
            let _guard = LeaderGuard::new(&table, key());
        }
        let (leader_again, _rx) = table.register_or_join(key());
        assert!(leader_again, "entry must be cleared once the guard drops");
    }
}
