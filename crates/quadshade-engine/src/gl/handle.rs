use std::fmt;
use std::marker::PhantomData;

/// Generational slot address.
///
/// A handle stays valid until its slot is freed. Freed slots are reused with a
/// bumped generation, so stale handles never alias a newer object.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct RawHandle {
    index: u32,
    generation: u32,
}

impl RawHandle {
    #[inline]
    pub const fn index(self) -> u32 {
        self.index
    }

    #[inline]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for RawHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

macro_rules! typed_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
        pub struct $name(RawHandle);

        impl $name {
            #[inline]
            pub const fn raw(self) -> RawHandle {
                self.0
            }
        }

        impl From<RawHandle> for $name {
            #[inline]
            fn from(raw: RawHandle) -> Self {
                Self(raw)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

typed_handle!(
    /// Shader stage object.
    StageHandle
);
typed_handle!(
    /// Program object.
    ProgramHandle
);
typed_handle!(
    /// Vertex buffer object.
    BufferHandle
);

struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Slab of backend objects addressed by typed generational handles.
///
/// `H` is the handle type handed out to callers; the table never exposes
/// references that outlive a `remove`.
pub struct HandleTable<H, T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    live: usize,
    _handle: PhantomData<fn() -> H>,
}

impl<H, T> Default for HandleTable<H, T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
            _handle: PhantomData,
        }
    }
}

impl<H, T> HandleTable<H, T>
where
    H: From<RawHandle> + Copy,
    H: Into<RawHandle>,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live objects.
    #[inline]
    pub fn len(&self) -> usize {
        self.live
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn insert(&mut self, value: T) -> H {
        self.live += 1;

        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            return H::from(RawHandle {
                index,
                generation: slot.generation,
            });
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            value: Some(value),
        });
        H::from(RawHandle { index, generation: 0 })
    }

    pub fn get(&self, handle: H) -> Option<&T> {
        let raw: RawHandle = handle.into();
        self.slots
            .get(raw.index as usize)
            .filter(|s| s.generation == raw.generation)
            .and_then(|s| s.value.as_ref())
    }

    pub fn get_mut(&mut self, handle: H) -> Option<&mut T> {
        let raw: RawHandle = handle.into();
        self.slots
            .get_mut(raw.index as usize)
            .filter(|s| s.generation == raw.generation)
            .and_then(|s| s.value.as_mut())
    }

    #[inline]
    pub fn contains(&self, handle: H) -> bool {
        self.get(handle).is_some()
    }

    /// Frees the slot. Returns the stored value, or `None` for stale handles.
    pub fn remove(&mut self, handle: H) -> Option<T> {
        let raw: RawHandle = handle.into();
        let slot = self.slots.get_mut(raw.index as usize)?;
        if slot.generation != raw.generation {
            return None;
        }

        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(raw.index);
        self.live -= 1;
        Some(value)
    }

    /// Iterates live `(handle, value)` pairs in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (H, &T)> + '_ {
        self.slots.iter().enumerate().filter_map(|(i, s)| {
            s.value.as_ref().map(|v| {
                (
                    H::from(RawHandle {
                        index: i as u32,
                        generation: s.generation,
                    }),
                    v,
                )
            })
        })
    }
}

macro_rules! into_raw {
    ($($name:ident),*) => {
        $(impl From<$name> for RawHandle {
            #[inline]
            fn from(h: $name) -> Self {
                h.0
            }
        })*
    };
}

into_raw!(StageHandle, ProgramHandle, BufferHandle);

#[cfg(test)]
mod tests {
    use super::*;

    type Table = HandleTable<StageHandle, &'static str>;

    #[test]
    fn insert_then_get() {
        let mut t = Table::new();
        let a = t.insert("a");
        let b = t.insert("b");
        assert_eq!(t.get(a), Some(&"a"));
        assert_eq!(t.get(b), Some(&"b"));
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn removed_handle_no_longer_resolves() {
        let mut t = Table::new();
        let a = t.insert("a");
        assert_eq!(t.remove(a), Some("a"));
        assert!(t.get(a).is_none());
        assert!(t.remove(a).is_none());
        assert!(t.is_empty());
    }

    #[test]
    fn reused_slot_does_not_alias_stale_handle() {
        let mut t = Table::new();
        let a = t.insert("a");
        t.remove(a);
        let b = t.insert("b");

        assert_eq!(a.raw().index(), b.raw().index());
        assert_ne!(a, b);
        assert!(t.get(a).is_none());
        assert_eq!(t.get(b), Some(&"b"));
    }

    #[test]
    fn iter_skips_free_slots() {
        let mut t = Table::new();
        let a = t.insert("a");
        let _b = t.insert("b");
        t.remove(a);
        let names: Vec<_> = t.iter().map(|(_, v)| *v).collect();
        assert_eq!(names, vec!["b"]);
    }
}
