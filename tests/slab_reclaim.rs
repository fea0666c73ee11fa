// Quarantine delays the frees these counters depend on.
#![cfg(not(feature = "quarantine"))]

use std::thread;
use xalloc::{SizeClass, allocate, free, stats};

const SIZE: usize = 128;
// Enough to overrun the transfer cache and the local list high-water mark.
const FILLERS: usize = 200;

#[test]
fn fully_free_slab_is_unmapped() {
  let class = SizeClass::for_size(SIZE).unwrap();

  // A fresh thread gets a fresh arena, so the first slab it carves is all ours.
  thread::spawn(move || {
    let per_slab = class.blocks_per_slab();
    let first: Vec<_> = (0..per_slab).map(|_| allocate(SIZE).unwrap()).collect();
    let fillers: Vec<_> = (0..FILLERS).map(|_| allocate(SIZE).unwrap()).collect();
    for (i, ptr) in fillers.iter().enumerate() {
      unsafe { std::ptr::write_bytes(ptr.as_ptr(), i as u8, SIZE) };
    }

    let before = stats();
    for ptr in first {
      unsafe { free(ptr.as_ptr()) };
    }
    for ptr in &fillers[..FILLERS / 2] {
      unsafe { free(ptr.as_ptr()) };
    }
    let after = stats();

    let reclaimed = after.classes[class.index()].slabs_reclaimed
      - before.classes[class.index()].slabs_reclaimed;
    assert!(reclaimed >= 1, "no slab reclaimed");
    assert!(after.munmap_calls >= before.munmap_calls + reclaimed);

    // Surviving blocks are untouched and the class keeps working.
    for (i, ptr) in fillers.iter().enumerate().skip(FILLERS / 2) {
      let bytes = unsafe { std::slice::from_raw_parts(ptr.as_ptr(), SIZE) };
      assert!(bytes.iter().all(|&b| b == i as u8));
    }
    let fresh: Vec<_> = (0..per_slab * 2).map(|_| allocate(SIZE).unwrap()).collect();
    for ptr in fresh.into_iter().chain(fillers.into_iter().skip(FILLERS / 2)) {
      unsafe { free(ptr.as_ptr()) };
    }
  })
  .join()
  .unwrap();

  assert_eq!(stats().classes[class.index()].current_usage, 0);
}
