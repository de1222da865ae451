use auto_impl::auto_impl;

use super::view::{write_object, MemoryView};
use crate::{
    constants::memory::{BUFFER_CLASS_ID, STRING_CLASS_ID},
    Result, SandboxError,
};

/// Guest linear memory together with the guest's own allocator.
///
/// The host never carves objects out of guest memory itself: new objects are always obtained
/// from the guest allocator, then filled in.
#[auto_impl(&mut, Box)]
pub trait GuestHeap {
    /// The current linear memory.
    fn memory(&self) -> &[u8];

    /// The current linear memory, writable.
    fn memory_mut(&mut self) -> &mut [u8];

    /// Allocates an object of `size` bytes with the given class id and returns its data pointer.
    fn allocate(&mut self, size: u32, class_id: u32) -> Result<u32>;
}

/// Reads the UTF-16LE string at `ptr`.
pub fn ptr_to_string<H: GuestHeap + ?Sized>(heap: &H, ptr: u32) -> Result<String> {
    let payload = MemoryView::new(heap.memory()).object(ptr)?;
    if payload.len() % 2 != 0 {
        return Err(SandboxError::corrupt(ptr, "odd byte length for UTF-16 string"));
    }
    let units: Vec<u16> =
        payload.chunks_exact(2).map(|pair| u16::from_le_bytes([pair[0], pair[1]])).collect();
    Ok(String::from_utf16_lossy(&units))
}

/// Reads the string at `ptr`, treating a null pointer as absent.
pub fn ptr_to_opt_string<H: GuestHeap + ?Sized>(heap: &H, ptr: u32) -> Result<Option<String>> {
    if ptr == 0 {
        return Ok(None);
    }
    ptr_to_string(heap, ptr).map(Some)
}

/// Copies the binary buffer at `ptr`.
pub fn ptr_to_bytes<H: GuestHeap + ?Sized>(heap: &H, ptr: u32) -> Result<Vec<u8>> {
    Ok(MemoryView::new(heap.memory()).object(ptr)?.to_vec())
}

/// Allocates a guest string holding `value` and returns its pointer.
pub fn new_string<H: GuestHeap + ?Sized>(heap: &mut H, value: &str) -> Result<u32> {
    let payload: Vec<u8> = value.encode_utf16().flat_map(u16::to_le_bytes).collect();
    new_object(heap, &payload, STRING_CLASS_ID)
}

/// Allocates a guest buffer holding `value` and returns its pointer.
pub fn new_bytes<H: GuestHeap + ?Sized>(heap: &mut H, value: &[u8]) -> Result<u32> {
    new_object(heap, value, BUFFER_CLASS_ID)
}

fn new_object<H: GuestHeap + ?Sized>(heap: &mut H, payload: &[u8], class_id: u32) -> Result<u32> {
    let size = u32::try_from(payload.len())
        .map_err(|_| SandboxError::corrupt(0, "object larger than 4 GiB"))?;
    let ptr = heap.allocate(size, class_id)?;
    // The allocator may have grown memory, so the region is fetched only after allocating.
    write_object(heap.memory_mut(), ptr, payload)?;
    Ok(ptr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::VecHeap;
    use rstest::rstest;

    #[rstest]
    #[case("")]
    #[case("hello")]
    #[case("AU12UBnqTHDQALpocVBnkPNy7y5CndUJQTLutaVDDFgMJcq5kQiKq")]
    #[case("héllo wörld")]
    #[case("emoji 🦀 pair")]
    fn test_string_round_trip(#[case] value: &str) {
        let mut heap = VecHeap::default();
        let ptr = new_string(&mut heap, value).unwrap();
        assert_eq!(ptr_to_string(&heap, ptr).unwrap(), value);
    }

    #[test]
    fn test_string_header_counts_bytes() {
        let mut heap = VecHeap::default();
        let ptr = new_string(&mut heap, "ab").unwrap();
        let header = &heap.memory()[ptr as usize - 4..ptr as usize];
        assert_eq!(header, &4u32.to_le_bytes());
        assert_eq!(&heap.memory()[ptr as usize..ptr as usize + 4], &[b'a', 0, b'b', 0]);
        assert_eq!(heap.last_class_id(), Some(STRING_CLASS_ID));
    }

    #[test]
    fn test_bytes_round_trip() {
        let mut heap = VecHeap::default();
        let ptr = new_bytes(&mut heap, &[0, 1, 2, 255]).unwrap();
        assert_eq!(ptr_to_bytes(&heap, ptr).unwrap(), vec![0, 1, 2, 255]);
        assert_eq!(heap.last_class_id(), Some(BUFFER_CLASS_ID));

        let empty = new_bytes(&mut heap, &[]).unwrap();
        assert!(ptr_to_bytes(&heap, empty).unwrap().is_empty());
    }

    #[test]
    fn test_odd_string_length_is_corrupt() {
        let mut heap = VecHeap::default();
        let ptr = new_bytes(&mut heap, &[b'a', 0, b'b']).unwrap();
        assert!(matches!(ptr_to_string(&heap, ptr), Err(SandboxError::CorruptMemory { .. })));
    }

    #[test]
    fn test_null_optional_string() {
        let heap = VecHeap::default();
        assert_eq!(ptr_to_opt_string(&heap, 0).unwrap(), None);
        assert!(matches!(ptr_to_string(&heap, 0), Err(SandboxError::CorruptMemory { .. })));
    }
}
