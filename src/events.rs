//! Event notifier
//!
//! A priority-ordered list of handlers per named channel. The registry owns
//! one for its `watch` support; applications construct their own and pass it
//! where it is needed.

use std::collections::HashMap;

/// Identifies a registered handler for later removal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u64);

struct Handler<E> {
    id: HandlerId,
    priority: i32,
    once: bool,
    callback: Box<dyn FnMut(&E)>,
}

/// Named channels of callbacks receiving `&E`
pub struct EventNotifier<E> {
    channels: HashMap<String, Vec<Handler<E>>>,
    next_id: u64,
}

impl<E> Default for EventNotifier<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> std::fmt::Debug for EventNotifier<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut counts: Vec<_> = self.channels.iter().map(|(k, v)| (k, v.len())).collect();
        counts.sort();
        f.debug_struct("EventNotifier").field("channels", &counts).finish()
    }
}

impl<E> EventNotifier<E> {
    pub fn new() -> Self {
        Self {
            channels: HashMap::new(),
            next_id: 1,
        }
    }

    /// Subscribe to `name`. Higher priorities run first; equal priorities
    /// run in registration order.
    pub fn on<F>(&mut self, name: &str, priority: i32, callback: F) -> HandlerId
    where
        F: FnMut(&E) + 'static,
    {
        self.insert(name, priority, false, Box::new(callback))
    }

    /// Subscribe for a single emission
    pub fn once<F>(&mut self, name: &str, priority: i32, callback: F) -> HandlerId
    where
        F: FnMut(&E) + 'static,
    {
        self.insert(name, priority, true, Box::new(callback))
    }

    fn insert(
        &mut self,
        name: &str,
        priority: i32,
        once: bool,
        callback: Box<dyn FnMut(&E)>,
    ) -> HandlerId {
        let id = HandlerId(self.next_id);
        self.next_id += 1;

        let handlers = self.channels.entry(name.to_string()).or_default();
        // Stable insert after every handler of equal or higher priority
        let at = handlers
            .iter()
            .position(|h| h.priority < priority)
            .unwrap_or(handlers.len());
        handlers.insert(
            at,
            Handler {
                id,
                priority,
                once,
                callback,
            },
        );
        id
    }

    /// Remove one handler. Returns whether it was registered.
    pub fn off(&mut self, id: HandlerId) -> bool {
        let mut found = false;
        self.channels.retain(|_, handlers| {
            let before = handlers.len();
            handlers.retain(|h| h.id != id);
            found |= handlers.len() != before;
            !handlers.is_empty()
        });
        found
    }

    /// Tear down a whole channel. Returns the number of handlers dropped.
    pub fn remove(&mut self, name: &str) -> usize {
        self.channels.remove(name).map(|h| h.len()).unwrap_or(0)
    }

    /// Invoke every handler of `name` in priority order. Returns how many ran.
    pub fn emit(&mut self, name: &str, event: &E) -> usize {
        let Some(handlers) = self.channels.get_mut(name) else {
            return 0;
        };
        for handler in handlers.iter_mut() {
            (handler.callback)(event);
        }
        let count = handlers.len();
        handlers.retain(|h| !h.once);
        if handlers.is_empty() {
            self.channels.remove(name);
        }
        count
    }

    pub fn has(&self, name: &str) -> bool {
        self.channels.contains_key(name)
    }

    pub fn listener_count(&self, name: &str) -> usize {
        self.channels.get(name).map(Vec::len).unwrap_or(0)
    }

    pub fn clear(&mut self) {
        self.channels.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_priority_order() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut notifier = EventNotifier::<i32>::new();

        for (label, priority) in [("low", 0), ("high", 10), ("low2", 0), ("mid", 5)] {
            let seen = seen.clone();
            notifier.on("tick", priority, move |n| seen.borrow_mut().push((label, *n)));
        }

        assert_eq!(notifier.emit("tick", &7), 4);
        let labels: Vec<_> = seen.borrow().iter().map(|(l, _)| *l).collect();
        assert_eq!(labels, vec!["high", "mid", "low", "low2"]);
    }

    #[test]
    fn test_once_and_off() {
        let count = Rc::new(RefCell::new(0));
        let mut notifier = EventNotifier::<()>::new();

        let c = count.clone();
        notifier.once("ping", 0, move |_| *c.borrow_mut() += 1);
        let c = count.clone();
        let id = notifier.on("ping", 0, move |_| *c.borrow_mut() += 10);

        notifier.emit("ping", &());
        notifier.emit("ping", &());
        assert_eq!(*count.borrow(), 21);

        assert!(notifier.off(id));
        assert!(!notifier.off(id));
        assert!(!notifier.has("ping"));
        assert_eq!(notifier.emit("ping", &()), 0);
    }

    #[test]
    fn test_remove_channel() {
        let mut notifier = EventNotifier::<()>::new();
        notifier.on("a", 0, |_| {});
        notifier.on("a", 1, |_| {});
        notifier.on("b", 0, |_| {});
        assert_eq!(notifier.listener_count("a"), 2);
        assert_eq!(notifier.remove("a"), 2);
        assert!(notifier.has("b"));
    }
}
