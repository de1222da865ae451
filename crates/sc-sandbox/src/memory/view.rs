use crate::{
    constants::memory::{HEADER_OFFSET, HEADER_SIZE},
    Result, SandboxError,
};

/// Bounds-checked, read-only view over guest linear memory.
///
/// Every header and payload read performed by the bridge goes through this type, so a malformed
/// pointer is always reported as [`SandboxError::CorruptMemory`] instead of panicking or reading
/// past the region.
#[derive(Debug, Clone, Copy)]
pub struct MemoryView<'a> {
    data: &'a [u8],
}

impl<'a> MemoryView<'a> {
    /// Wraps a memory region.
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Size of the region in bytes.
    pub const fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the region is empty.
    pub const fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Reads the byte length stored at `ptr - 4`.
    pub fn header(&self, ptr: u32) -> Result<u32> {
        let start = ptr
            .checked_sub(HEADER_OFFSET)
            .ok_or_else(|| SandboxError::corrupt(ptr, "pointer below header offset"))?;
        let bytes = self.range(ptr, start as usize, HEADER_SIZE, "header out of bounds")?;
        let mut header = [0u8; HEADER_SIZE];
        header.copy_from_slice(bytes);
        Ok(u32::from_le_bytes(header))
    }

    /// The payload of the object at `ptr`, sized by its header.
    pub fn object(&self, ptr: u32) -> Result<&'a [u8]> {
        let len = self.header(ptr)?;
        self.range(ptr, ptr as usize, len as usize, "payload out of bounds")
    }

    fn range(&self, ptr: u32, start: usize, len: usize, reason: &str) -> Result<&'a [u8]> {
        start
            .checked_add(len)
            .and_then(|end| self.data.get(start..end))
            .ok_or_else(|| SandboxError::corrupt(ptr, format!("{reason} ({} bytes)", self.len())))
    }
}

/// Writes a header and payload for the object at `ptr` into `data`, bounds-checked.
pub fn write_object(data: &mut [u8], ptr: u32, payload: &[u8]) -> Result<()> {
    let len = u32::try_from(payload.len())
        .map_err(|_| SandboxError::corrupt(ptr, "payload larger than 4 GiB"))?;
    let start = ptr
        .checked_sub(HEADER_OFFSET)
        .ok_or_else(|| SandboxError::corrupt(ptr, "pointer below header offset"))?
        as usize;
    let end = (ptr as usize)
        .checked_add(payload.len())
        .filter(|end| *end <= data.len())
        .ok_or_else(|| SandboxError::corrupt(ptr, "allocation out of bounds"))?;
    data[start..start + HEADER_SIZE].copy_from_slice(&len.to_le_bytes());
    data[ptr as usize..end].copy_from_slice(payload);
    Ok(())
}
