use crate::{constants::memory::HEADER_OFFSET, memory::GuestHeap, Result};

/// A guest heap backed by a plain vector with a bump allocator.
///
/// Allocation mimics the guest runtime closely enough for the bridge: every object gets room for
/// its header, payloads are 16-byte aligned, and the region grows when it runs out.
#[derive(Debug, Clone)]
pub struct VecHeap {
    memory: Vec<u8>,
    next: u32,
    last_class_id: Option<u32>,
}

impl Default for VecHeap {
    fn default() -> Self {
        Self::with_size(64 * 1024)
    }
}

impl VecHeap {
    /// Creates a zeroed heap of `size` bytes.
    pub fn with_size(size: usize) -> Self {
        Self { memory: vec![0; size], next: 16, last_class_id: None }
    }

    /// The class id of the most recent allocation.
    pub const fn last_class_id(&self) -> Option<u32> {
        self.last_class_id
    }

    /// Overwrites raw bytes at `offset`, e.g. to forge a broken header.
    pub fn poke(&mut self, offset: usize, bytes: &[u8]) {
        self.memory[offset..offset + bytes.len()].copy_from_slice(bytes);
    }
}

impl GuestHeap for VecHeap {
    fn memory(&self) -> &[u8] {
        &self.memory
    }

    fn memory_mut(&mut self) -> &mut [u8] {
        &mut self.memory
    }

    fn allocate(&mut self, size: u32, class_id: u32) -> Result<u32> {
        let ptr = (self.next + HEADER_OFFSET + 15) & !15;
        self.next = ptr + size;
        if self.next as usize > self.memory.len() {
            self.memory.resize((self.next as usize).next_power_of_two(), 0);
        }
        self.last_class_id = Some(class_id);
        Ok(ptr)
    }
}
