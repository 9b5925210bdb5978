//! Подписки на события соединения.
//!
//! Каждая подписка получает [`ListenerId`]; снять её можно ровно один раз,
//! либо через [`Listeners::unsubscribe`], либо обработчик снимает себя сам,
//! вернув [`Flow::Done`] из [`Listeners::subscribe_until`].

use crate::utils::lock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Что делать с подпиской после вызова обработчика
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Done,
}

type Handler<T> = Box<dyn Fn(&T) -> Flow + Send + Sync>;

struct Entry<T> {
    id: ListenerId,
    retired: AtomicBool,
    handler: Handler<T>,
}

pub struct Listeners<T> {
    next_id: AtomicU64,
    entries: Mutex<Vec<Arc<Entry<T>>>>,
}

impl<T> Default for Listeners<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Listeners<T> {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn subscribe<F>(&self, handler: F) -> ListenerId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.subscribe_until(move |value| {
            handler(value);
            Flow::Continue
        })
    }

    /// Обработчик снимается сам, как только вернёт `Flow::Done`
    pub fn subscribe_until<F>(&self, handler: F) -> ListenerId
    where
        F: Fn(&T) -> Flow + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.entries).push(Arc::new(Entry {
            id,
            retired: AtomicBool::new(false),
            handler: Box::new(handler),
        }));
        id
    }

    /// `true`, если подписка была активна и снята этим вызовом
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut entries = lock(&self.entries);
        match entries.iter().position(|e| e.id == id) {
            Some(pos) => {
                let entry = entries.remove(pos);
                !entry.retired.swap(true, Ordering::AcqRel)
            }
            None => false,
        }
    }

    /// Вызывает активные обработчики вне блокировки, возвращает их число
    pub fn emit(&self, value: &T) -> usize {
        let snapshot: Vec<Arc<Entry<T>>> = lock(&self.entries).clone();
        let mut fired = 0;
        for entry in snapshot {
            if entry.retired.load(Ordering::Acquire) {
                continue;
            }
            fired += 1;
            if (entry.handler)(value) == Flow::Done && !entry.retired.swap(true, Ordering::AcqRel)
            {
                lock(&self.entries).retain(|e| e.id != entry.id);
            }
        }
        fired
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Сколько подписок было создано за всё время
    pub fn total_subscribed(&self) -> u64 {
        self.next_id.load(Ordering::Relaxed) - 1
    }
}
