//! Subscription registries
//!
//! [`SubscriptionRegistry`] maps an event class to its subscribers.
//! [`DecisionRegistry`] maps an (event class, decision configuration) pair to
//! its subscribers and resolves on top of a class registry.
//!
//! Each (key, subscriber) pair is stored as a single entry carrying two
//! flags: `persistent` (plain subscription) and `once` (fire-once
//! subscription). Resolution walks the entries once, collecting each
//! subscriber at most once and dropping entries whose only reason to exist
//! was a consumed fire-once flag. Entries keep registration order, which is
//! the notification order of sequential dispatch.

use crate::subscriber::{same_subscriber, SubscriberRef};
use crate::types::{DecisionConfigId, EventClass};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

struct Subscription {
    subscriber: SubscriberRef,
    persistent: bool,
    once: bool,
}

/// Keyed subscription storage shared by both registries
struct SubscriptionTable<K> {
    entries: HashMap<K, Vec<Subscription>>,
}

impl<K> Default for SubscriptionTable<K> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash> SubscriptionTable<K> {
    /// Returns false if the subscriber already held that flag for `key`
    fn insert(&mut self, key: K, subscriber: SubscriberRef, once: bool) -> bool {
        let list = self.entries.entry(key).or_default();
        if let Some(existing) = list
            .iter_mut()
            .find(|entry| same_subscriber(&entry.subscriber, &subscriber))
        {
            let flag = if once {
                &mut existing.once
            } else {
                &mut existing.persistent
            };
            let added = !*flag;
            *flag = true;
            return added;
        }

        list.push(Subscription {
            subscriber,
            persistent: !once,
            once,
        });
        true
    }

    fn remove(&mut self, key: &K, subscriber: &SubscriberRef) -> bool {
        let Some(list) = self.entries.get_mut(key) else {
            return false;
        };
        let before = list.len();
        list.retain(|entry| !same_subscriber(&entry.subscriber, subscriber));
        let removed = list.len() != before;
        if list.is_empty() {
            self.entries.remove(key);
        }
        removed
    }

    fn remove_key(&mut self, key: &K) -> usize {
        self.entries.remove(key).map_or(0, |list| list.len())
    }

    fn remove_keys(&mut self, matches: impl Fn(&K) -> bool) -> usize {
        let mut removed = 0;
        self.entries.retain(|key, list| {
            if matches(key) {
                removed += list.len();
                false
            } else {
                true
            }
        });
        removed
    }

    /// Full scan: drop `subscriber` from every key accepted by `matches`
    fn remove_subscriber(&mut self, subscriber: &SubscriberRef, matches: impl Fn(&K) -> bool) -> usize {
        let mut removed = 0;
        self.entries.retain(|key, list| {
            if matches(key) {
                let before = list.len();
                list.retain(|entry| !same_subscriber(&entry.subscriber, subscriber));
                removed += before - list.len();
            }
            !list.is_empty()
        });
        removed
    }

    /// Append the subscribers of `key` to `out` (skipping ones already there)
    /// and consume fire-once flags in the same pass
    fn drain_into(&mut self, key: &K, out: &mut Vec<SubscriberRef>) {
        let Some(list) = self.entries.get_mut(key) else {
            return;
        };
        list.retain_mut(|entry| {
            if !out.iter().any(|s| same_subscriber(s, &entry.subscriber)) {
                out.push(Arc::clone(&entry.subscriber));
            }
            entry.once = false;
            entry.persistent
        });
        if list.is_empty() {
            self.entries.remove(key);
        }
    }

    fn count(&self, key: &K) -> usize {
        self.entries.get(key).map_or(0, Vec::len)
    }

    fn clear(&mut self) {
        self.entries.clear();
    }

    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Class-scoped subscription registry
#[derive(Default)]
pub struct SubscriptionRegistry {
    table: SubscriptionTable<EventClass>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe permanently; returns false if already subscribed
    pub fn subscribe(&mut self, subscriber: SubscriberRef, class: EventClass) -> bool {
        self.table.insert(class, subscriber, false)
    }

    /// Subscribe for the next publish of `class` only
    ///
    /// A subscriber that is also permanently subscribed is still notified
    /// once per publish.
    pub fn subscribe_once(&mut self, subscriber: SubscriberRef, class: EventClass) -> bool {
        self.table.insert(class, subscriber, true)
    }

    /// Remove both the permanent and the fire-once subscription
    pub fn unsubscribe(&mut self, subscriber: &SubscriberRef, class: &EventClass) -> bool {
        self.table.remove(class, subscriber)
    }

    /// Drop every subscriber of `class`, returning how many were removed
    pub fn unsubscribe_class(&mut self, class: &EventClass) -> usize {
        self.table.remove_key(class)
    }

    /// Drop `subscriber` from every class
    ///
    /// Scans the whole registry.
    pub fn unsubscribe_all(&mut self, subscriber: &SubscriberRef) -> usize {
        self.table.remove_subscriber(subscriber, |_| true)
    }

    /// Subscribers to notify for one publish of `class`
    ///
    /// Fire-once subscriptions are consumed by this call.
    pub fn resolve(&mut self, class: &EventClass) -> Vec<SubscriberRef> {
        let mut out = Vec::new();
        self.resolve_into(class, &mut out);
        out
    }

    pub(crate) fn resolve_into(&mut self, class: &EventClass, out: &mut Vec<SubscriberRef>) {
        self.table.drain_into(class, out);
    }

    pub fn subscriber_count(&self, class: &EventClass) -> usize {
        self.table.count(class)
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn clear(&mut self) {
        self.table.clear();
    }
}

/// Decision-scoped subscription registry
///
/// Layered over a [`SubscriptionRegistry`]: resolving a scoped key also pulls
/// in the class-scoped subscribers of the same class.
#[derive(Default)]
pub struct DecisionRegistry {
    table: SubscriptionTable<(EventClass, DecisionConfigId)>,
}

impl DecisionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(
        &mut self,
        subscriber: SubscriberRef,
        class: EventClass,
        decision: DecisionConfigId,
    ) -> bool {
        self.table.insert((class, decision), subscriber, false)
    }

    pub fn subscribe_once(
        &mut self,
        subscriber: SubscriberRef,
        class: EventClass,
        decision: DecisionConfigId,
    ) -> bool {
        self.table.insert((class, decision), subscriber, true)
    }

    pub fn unsubscribe(
        &mut self,
        subscriber: &SubscriberRef,
        class: &EventClass,
        decision: &DecisionConfigId,
    ) -> bool {
        self.table
            .remove(&(class.clone(), decision.clone()), subscriber)
    }

    pub fn unsubscribe_class(&mut self, class: &EventClass, decision: &DecisionConfigId) -> usize {
        self.table.remove_key(&(class.clone(), decision.clone()))
    }

    /// Drop every scoped subscriber of `class`, whatever its decision configuration
    pub fn unsubscribe_class_all(&mut self, class: &EventClass) -> usize {
        self.table.remove_keys(|(scoped_class, _)| scoped_class == class)
    }

    /// Drop `subscriber` from every class scoped to `decision`
    pub fn unsubscribe_decision(
        &mut self,
        subscriber: &SubscriberRef,
        decision: &DecisionConfigId,
    ) -> usize {
        self.table
            .remove_subscriber(subscriber, |(_, scope)| scope == decision)
    }

    /// Drop `subscriber` from every scoped key
    pub fn unsubscribe_all(&mut self, subscriber: &SubscriberRef) -> usize {
        self.table.remove_subscriber(subscriber, |_| true)
    }

    /// Scoped subscribers followed by class-scoped subscribers, deduplicated
    ///
    /// Fire-once subscriptions matched in either layer are consumed.
    pub fn resolve(
        &mut self,
        class: &EventClass,
        decision: &DecisionConfigId,
        classes: &mut SubscriptionRegistry,
    ) -> Vec<SubscriberRef> {
        let mut out = Vec::new();
        self.table
            .drain_into(&(class.clone(), decision.clone()), &mut out);
        classes.resolve_into(class, &mut out);
        out
    }

    pub fn subscriber_count(&self, class: &EventClass, decision: &DecisionConfigId) -> usize {
        self.table.count(&(class.clone(), decision.clone()))
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn clear(&mut self) {
        self.table.clear();
    }
}
