// Quarantine delays the frees these counters depend on.
#![cfg(not(feature = "quarantine"))]

use xalloc::{allocate, free, stats, usable_size};

#[test]
fn released_regions_are_reused_first_fit() {
  let first = allocate(256 * 1024).unwrap();
  unsafe { std::ptr::write_bytes(first.as_ptr(), 0xAB, 256 * 1024) };
  unsafe { free(first.as_ptr()) };

  let before = stats();
  let reused = allocate(128 * 1024).unwrap();
  let after = stats();

  assert_eq!(reused, first);
  assert_eq!(after.large_reuses, before.large_reuses + 1);
  assert_eq!(after.mmap_calls, before.mmap_calls);
  // Whole region stays usable even though far less was asked for.
  assert!(unsafe { usable_size(reused.as_ptr()) } >= 256 * 1024);
  unsafe { std::ptr::write_bytes(reused.as_ptr(), 0x11, 128 * 1024) };

  // A request the parked region cannot hold maps a new one.
  let bigger = allocate(3 * 1024 * 1024).unwrap();
  assert!(stats().mmap_calls > after.mmap_calls);
  unsafe { free(bigger.as_ptr()) };

  let before = stats();
  let again = allocate(2 * 1024 * 1024 + 512 * 1024).unwrap();
  assert_eq!(again, bigger);
  assert_eq!(stats().large_reuses, before.large_reuses + 1);

  unsafe {
    free(again.as_ptr());
    free(reused.as_ptr());
  }
  assert_eq!(stats().current_usage, 0);
}
