//! Object lifecycle tracking.
//!
//! A [`TrackedObject`] is held by an application object for its lifetime.
//! Creating one logs the constructor call together with the number of live
//! instances of that type; dropping it logs the disposal. Counts belong to
//! the writer that handed out the tracker, not to the process.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::message_type::LogMessageType;
use crate::writer::worker::Ingress;

#[derive(Clone, Copy, Debug, Default)]
struct ObjectCounter {
    live: usize,
    created: usize,
}

/// Live and total instance counts per type name.
#[derive(Debug, Default)]
pub struct ObjectRegistry {
    counts: Mutex<HashMap<String, ObjectCounter>>,
}

impl ObjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the new instance id and the live count including it.
    fn register(&self, type_name: &str) -> (usize, usize) {
        let mut counts = self.counts.lock();
        let counter = counts.entry(type_name.to_owned()).or_default();
        counter.live += 1;
        counter.created += 1;
        (counter.created, counter.live)
    }

    fn release(&self, type_name: &str) -> usize {
        let mut counts = self.counts.lock();
        let counter = counts.entry(type_name.to_owned()).or_default();
        counter.live = counter.live.saturating_sub(1);
        counter.live
    }

    pub fn live_count(&self, type_name: &str) -> usize {
        self.counts.lock().get(type_name).map_or(0, |c| c.live)
    }

    pub fn created_count(&self, type_name: &str) -> usize {
        self.counts.lock().get(type_name).map_or(0, |c| c.created)
    }
}

/// Last path segment of `T`'s type name, without generic arguments.
pub(crate) fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

pub struct TrackedObject {
    type_name: String,
    id: usize,
    process_id: u32,
    registry: Arc<ObjectRegistry>,
    ingress: Ingress,
}

impl TrackedObject {
    pub(crate) fn register(
        registry: Arc<ObjectRegistry>,
        ingress: Ingress,
        type_name: &str,
        expects_multiple: bool,
    ) -> Self {
        let (id, live) = registry.register(type_name);
        let tracked = Self {
            type_name: type_name.to_owned(),
            id,
            process_id: std::process::id(),
            registry,
            ingress,
        };
        let unexpected = !expects_multiple && live > 1;
        let (extra, message_type) = if unexpected {
            (
                " This object does not expect to have more than one instance.",
                LogMessageType::Warning,
            )
        } else {
            ("", LogMessageType::Information)
        };
        tracked.log(
            &format!("Constructor called. | {type_name} count: {live}.{extra}"),
            message_type,
        );
        tracked
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Log `message` tagged with this object's type, id and process id.
    pub fn log(&self, message: &str, message_type: LogMessageType) {
        self.ingress.submit(
            format!(
                "{}{}: {message} | ProcessId: {}.",
                self.type_name, self.id, self.process_id
            ),
            message_type,
            true,
        );
    }
}

impl Drop for TrackedObject {
    fn drop(&mut self) {
        let live = self.registry.release(&self.type_name);
        self.log(
            &format!(
                "Disposing of tracked object. New {} count: {live}.",
                self.type_name
            ),
            LogMessageType::Information,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Window;
    #[allow(dead_code)]
    struct Pair<T>(T);

    #[test]
    fn registry_counts_live_and_created() {
        let registry = ObjectRegistry::new();
        assert_eq!(registry.register("Window"), (1, 1));
        assert_eq!(registry.register("Window"), (2, 2));
        assert_eq!(registry.release("Window"), 1);
        assert_eq!(registry.register("Window"), (3, 2));
        assert_eq!(registry.live_count("Window"), 2);
        assert_eq!(registry.created_count("Window"), 3);
        assert_eq!(registry.live_count("Dialog"), 0);
    }

    #[test]
    fn release_never_underflows() {
        let registry = ObjectRegistry::new();
        assert_eq!(registry.release("Ghost"), 0);
    }

    #[test]
    fn short_names_drop_paths_and_generics() {
        assert_eq!(short_type_name::<Window>(), "Window");
        assert_eq!(short_type_name::<Pair<Window>>(), "Pair");
        assert_eq!(short_type_name::<u32>(), "u32");
    }
}
