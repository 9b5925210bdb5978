use crate::peer::events::{ListenerId, Listeners};
use crate::utils::lock;
use std::sync::Mutex;

/// Строки статуса для оператора, только на добавление
#[derive(Default)]
pub struct StatusLog {
    lines: Mutex<Vec<String>>,
    listeners: Listeners<String>,
}

impl StatusLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, line: impl Into<String>) {
        let line = line.into();
        log::info!("STATUS {}", line);
        lock(&self.lines).push(line.clone());
        self.listeners.emit(&line);
    }

    pub fn lines(&self) -> Vec<String> {
        lock(&self.lines).clone()
    }

    pub fn last(&self) -> Option<String> {
        lock(&self.lines).last().cloned()
    }

    /// Обработчик получает каждую новую строку
    pub fn subscribe<F>(&self, handler: F) -> ListenerId
    where
        F: Fn(&String) + Send + Sync + 'static,
    {
        self.listeners.subscribe(handler)
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }
}
