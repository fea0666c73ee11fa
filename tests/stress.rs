// Quarantine delays the frees these counters depend on.
#![cfg(not(feature = "quarantine"))]

use rand::{Rng, SeedableRng, rngs::StdRng};
use std::thread;
use xalloc::{allocate, free, stats, usable_size};

const THREADS: usize = 8;
const OPS: usize = 20_000;
const MAX_LIVE: usize = 512;

#[derive(Clone, Copy)]
struct Block {
  addr: usize,
  len: usize,
  tag: u8,
}

impl Block {
  fn bytes(&self) -> &[u8] {
    unsafe { std::slice::from_raw_parts(self.addr as *const u8, self.len) }
  }

  fn intact(&self) -> bool {
    self.bytes().iter().all(|&b| b == self.tag)
  }
}

fn churn(seed: u64) -> Vec<Block> {
  let mut rng = StdRng::seed_from_u64(seed);
  let mut live: Vec<Block> = Vec::with_capacity(MAX_LIVE);

  for op in 0..OPS {
    let release = !live.is_empty() && (live.len() >= MAX_LIVE || rng.random_bool(0.45));
    if release {
      let block = live.swap_remove(rng.random_range(0..live.len()));
      assert!(block.intact(), "block {:#x} clobbered", block.addr);
      unsafe { free(block.addr as *mut u8) };
    } else {
      let len = if rng.random_bool(0.9) {
        rng.random_range(1..=1024)
      } else {
        rng.random_range(1025..=64 * 1024)
      };
      let ptr = allocate(len).unwrap();
      let tag = (op % 251) as u8 + 1;
      unsafe { std::ptr::write_bytes(ptr.as_ptr(), tag, len) };
      live.push(Block {
        addr: ptr.as_ptr() as usize,
        len,
        tag,
      });
    }
  }
  live
}

#[test]
fn concurrent_churn_keeps_blocks_disjoint_and_counters_exact() {
  let before = stats();

  let handles: Vec<_> = (0..THREADS)
    .map(|t| thread::spawn(move || churn(0x5EED + t as u64)))
    .collect();
  let mut survivors: Vec<Block> = handles
    .into_iter()
    .flat_map(|handle| handle.join().unwrap())
    .collect();

  let mut extents: Vec<(usize, usize)> = survivors
    .iter()
    .map(|block| (block.addr, unsafe { usable_size(block.addr as *mut u8) }))
    .collect();
  extents.sort_unstable();
  for pair in extents.windows(2) {
    assert!(pair[0].0 + pair[0].1 <= pair[1].0, "overlapping blocks");
  }

  let live_bytes: usize = extents.iter().map(|&(_, len)| len).sum();
  let mid = stats();
  assert_eq!(
    (mid.total_allocated - before.total_allocated) - (mid.total_freed - before.total_freed),
    live_bytes
  );
  assert_eq!(mid.current_usage - before.current_usage, live_bytes);

  // Every survivor is released by a thread that did not allocate it.
  for block in survivors.drain(..) {
    assert!(block.intact());
    unsafe { free(block.addr as *mut u8) };
  }

  let after = stats();
  assert_eq!(after.current_usage, before.current_usage);
  assert_eq!(
    after.total_allocated - before.total_allocated,
    after.total_freed - before.total_freed
  );
}
