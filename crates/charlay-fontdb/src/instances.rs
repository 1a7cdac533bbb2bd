//! Font instances the layout engine asks for
//!
//! Each instance names a (font, pixel size, bold, italic) tuple. Instances
//! live in a slab; a handle packs the slot's generation into the high 32 bits
//! and `slot + 1` into the low 32 bits. Freeing a slot bumps its generation,
//! so a stale handle never resolves to whatever moved in afterwards.

use charlay_core::types::{FontHandle, FontId};

/// What one handle stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FontInstance {
    pub font_id: FontId,
    pub px: u32,
    pub bold: bool,
    pub italic: bool,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    instance: Option<FontInstance>,
}

/// Generational slab of [`FontInstance`]s
#[derive(Debug, Default)]
pub struct InstanceTable {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

fn pack(index: u32, generation: u32) -> FontHandle {
    FontHandle::from_raw(((generation as u64) << 32) | (index as u64 + 1))
}

fn unpack(handle: FontHandle) -> Option<(usize, u32)> {
    let raw = handle.raw();
    let low = (raw & 0xFFFF_FFFF) as u32;
    let index = low.checked_sub(1)?;
    Some((index as usize, (raw >> 32) as u32))
}

impl InstanceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, instance: FontInstance) -> FontHandle {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.instance = Some(instance);
            return pack(index, slot.generation);
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            instance: Some(instance),
        });
        pack(index, 0)
    }

    pub fn get(&self, handle: FontHandle) -> Option<&FontInstance> {
        let (index, generation) = unpack(handle)?;
        let slot = self.slots.get(index)?;
        if slot.generation != generation {
            return None;
        }
        slot.instance.as_ref()
    }

    /// Free a handle; false when it was already stale
    pub fn remove(&mut self, handle: FontHandle) -> bool {
        let Some((index, generation)) = unpack(handle) else {
            return false;
        };
        match self.slots.get(index) {
            Some(slot) if slot.generation == generation && slot.instance.is_some() => {
                self.release(index);
                true
            },
            _ => false,
        }
    }

    /// Free every instance of `font`; returns how many went
    pub fn remove_font(&mut self, font: FontId) -> usize {
        let doomed: Vec<usize> = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.instance.is_some_and(|inst| inst.font_id == font))
            .map(|(index, _)| index)
            .collect();
        for &index in &doomed {
            self.release(index);
        }
        doomed.len()
    }

    pub fn clear(&mut self) {
        for index in 0..self.slots.len() {
            if self.slots[index].instance.is_some() {
                self.release(index);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    fn release(&mut self, index: usize) {
        let slot = &mut self.slots[index];
        slot.instance = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(index as u32);
        self.live -= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inst(font_id: FontId) -> FontInstance {
        FontInstance {
            font_id,
            px: 16,
            bold: false,
            italic: false,
        }
    }

    #[test]
    fn handles_are_never_zero() {
        let mut table = InstanceTable::new();
        let handle = table.insert(inst(1));
        assert!(handle.is_valid());
        assert!(table.get(FontHandle::INVALID).is_none());
    }

    #[test]
    fn stale_handle_does_not_alias_reused_slot() {
        let mut table = InstanceTable::new();
        let old = table.insert(inst(1));
        assert!(table.remove(old));
        let new = table.insert(inst(2));

        assert_ne!(old, new);
        assert!(table.get(old).is_none());
        assert_eq!(table.get(new).map(|i| i.font_id), Some(2));
        assert!(!table.remove(old));
    }

    #[test]
    fn removing_a_font_drops_only_its_instances() {
        let mut table = InstanceTable::new();
        let a = table.insert(inst(1));
        let b = table.insert(inst(2));
        let c = table.insert(inst(1));

        assert_eq!(table.remove_font(1), 2);
        assert_eq!(table.len(), 1);
        assert!(table.get(a).is_none());
        assert!(table.get(c).is_none());
        assert!(table.get(b).is_some());
    }

    #[test]
    fn clear_empties_everything() {
        let mut table = InstanceTable::new();
        table.insert(inst(1));
        table.insert(inst(3));
        table.clear();
        assert!(table.is_empty());
    }
}
