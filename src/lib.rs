#![allow(clippy::missing_safety_doc)]
//! Thread-caching, size-class segregated allocator.
//!
//! Requests up to [`MAX_SMALL_SIZE`] bytes are rounded to one of seven power-of-two size classes
//! and served from the calling thread's arena: a per-class intrusive free list refilled from a
//! lock-free transfer cache or by carving a new slab. Larger requests go to a global first-fit
//! list of retained regions before falling back to fresh (optionally huge-page) mappings.
//!
//! Every payload is preceded by a 16 byte header carrying a magic value; a mismatch on
//! [`free`], [`reallocate`] or [`shrink_reallocate`] aborts the process.

use core::{
  alloc::{GlobalAlloc, Layout},
  cell::{Cell, UnsafeCell},
  fmt, hint,
  mem::size_of,
  ptr::{self, NonNull, null_mut},
  sync::atomic::{AtomicBool, AtomicI32, AtomicPtr, AtomicUsize, Ordering},
};
use std::{
  io::Write,
  sync::{Once, OnceLock},
};

// =============================================================================
// Constants
// =============================================================================

/// Alignment of every payload returned by [`allocate`].
pub const ALIGNMENT: usize = 16;
const CACHE_LINE: usize = 64;

/// Largest request served from slabs. Anything above goes to the large-object path.
pub const MAX_SMALL_SIZE: usize = 1024;
/// Number of small size classes (16, 32, ..., 1024 bytes).
pub const CLASS_COUNT: usize = 7;

/// Blocks a new slab is sized for, and the batch size of transfer cache refills and migrations.
const BLOCK_REFILL_COUNT: usize = 16;
/// Local free list length that triggers migration into the transfer cache.
const MAX_LOCAL_CACHE_SIZE: usize = 64;

const MAX_ARENAS: usize = 64;
/// Slot shared by every thread that arrives after the pool is exhausted.
const SHARED_ARENA: usize = 0;

/// Ring size of a transfer cache. One slot stays empty to tell full from empty.
const TRANSFER_CACHE_SLOTS: usize = 32;

const HUGE_PAGE_THRESHOLD: usize = 2 * 1024 * 1024;
const HUGE_PAGE_SIZE: usize = 2 * 1024 * 1024;

#[cfg(feature = "quarantine")]
const QUARANTINE_SIZE: usize = 128;

const BLOCK_MAGIC: u32 = 0xDEAD_BEEF;
const KIND_SLAB: u16 = 0;
const KIND_LARGE: u16 = 1;

const HEADER_SIZE: usize = size_of::<BlockHeader>();
const SLAB_HEADER_SIZE: usize = size_of::<Slab>();
const LARGE_HEADER_SIZE: usize = size_of::<LargeBlock>();

// =============================================================================
// Compile-Time Assertions
// =============================================================================

const _: () = assert!(HEADER_SIZE == ALIGNMENT);
const _: () = assert!(SLAB_HEADER_SIZE % ALIGNMENT == 0);
const _: () = assert!(LARGE_HEADER_SIZE % ALIGNMENT == 0);
const _: () = assert!(size_of::<FreeNode>() <= class_size(0));
const _: () = assert!(class_size(CLASS_COUNT - 1) == MAX_SMALL_SIZE);
const _: () = assert!(TRANSFER_CACHE_SLOTS.is_power_of_two());
const _: () = assert!(HUGE_PAGE_SIZE.is_power_of_two());
const _: () = assert!(size_of::<TransferCache>() % CACHE_LINE == 0);
const _: () = assert!(MAX_LOCAL_CACHE_SIZE > BLOCK_REFILL_COUNT);

// =============================================================================
// Types
// =============================================================================

/// Prefix of every payload, small or large.
#[repr(C, align(16))]
struct BlockHeader {
  /// Class index for slab blocks, region length for large blocks.
  size: usize,
  /// Distance from this header back to its slab or region start, in `ALIGNMENT` units.
  offset: u16,
  kind: u16,
  magic: u32,
}

/// Occupies the first word of a free payload.
#[repr(C)]
struct FreeNode {
  next: *mut FreeNode,
}

/// Slab metadata. Sits at offset 0 of the mapping, blocks follow.
#[repr(C, align(16))]
struct Slab {
  /// Next slab of the same class in the owning arena.
  next: *mut Slab,
  /// Blocks not currently handed out, wherever they are parked.
  free_count: AtomicUsize,
  total_count: usize,
  /// Mapping length, header included.
  len: usize,
  arena: *const Arena,
  /// Blocks parked in the owning arena's local list or transfer cache. Only the owning
  /// arena's context touches it.
  resident: usize,
  /// Node the mapping was bound to, -1 when unknown.
  numa_node: i32,
  class: u8,
}

/// Descriptor at the start of every large region. Stays mapped while the region sits on the
/// large free list.
#[repr(C, align(16))]
struct LargeBlock {
  /// Reserved length of the whole region.
  size: usize,
  next: *mut LargeBlock,
  /// Node the pages were last bound to, -1 when unknown.
  numa_node: i32,
  huge: bool,
}

/// Failure of an allocation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AllocError {
  #[error("zero-sized allocation request")]
  ZeroSize,
  #[error("requested size overflows the address space")]
  Overflow,
  #[error("the operating system refused to back the request")]
  OutOfMemory,
}

// =============================================================================
// Platform
// =============================================================================

/// OS page size, queried once.
fn page_size() -> usize {
  static PAGE_SIZE: OnceLock<usize> = OnceLock::new();
  *PAGE_SIZE.get_or_init(|| {
    let raw = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if raw > 0 { raw as usize } else { 4096 }
  })
}

/// A mapping obtained from the OS.
#[derive(Clone, Copy)]
struct Reservation {
  ptr: NonNull<u8>,
  len: usize,
  huge: bool,
}

fn os_mmap(len: usize, extra_flags: libc::c_int) -> Option<NonNull<u8>> {
  let ptr = unsafe {
    libc::mmap(
      null_mut(),
      len,
      libc::PROT_READ | libc::PROT_WRITE,
      libc::MAP_PRIVATE | libc::MAP_ANONYMOUS | extra_flags,
      -1,
      0,
    )
  };

  if ptr == libc::MAP_FAILED {
    None
  } else {
    NonNull::new(ptr.cast())
  }
}

/// Reserves at least `bytes`, rounded to the page size. With `want_huge` and a request past the
/// huge-page threshold a hugetlb mapping is tried first; its failure is never surfaced.
fn os_reserve(bytes: usize, numa_node: Option<i32>, want_huge: bool) -> Option<Reservation> {
  if want_huge
    && bytes >= HUGE_PAGE_THRESHOLD
    && let Some(region) = os_reserve_huge(bytes)
  {
    return Some(region);
  }

  let len = align_up_checked(bytes, page_size())?;
  let ptr = os_mmap(len, 0)?;
  STATS.mmap_calls.fetch_add(1, Ordering::Relaxed);

  if let Some(node) = numa_node {
    numa_bind(ptr, len, node);
  }

  #[cfg(all(target_os = "linux", feature = "huge-pages"))]
  if want_huge && len >= HUGE_PAGE_THRESHOLD {
    // Transparent huge pages are the next best thing once hugetlb failed.
    unsafe { libc::madvise(ptr.as_ptr().cast(), len, libc::MADV_HUGEPAGE) };
  }

  Some(Reservation {
    ptr,
    len,
    huge: false,
  })
}

#[cfg(all(target_os = "linux", feature = "huge-pages"))]
fn os_reserve_huge(bytes: usize) -> Option<Reservation> {
  let len = align_up_checked(bytes, HUGE_PAGE_SIZE)?;
  let ptr = os_mmap(len, libc::MAP_HUGETLB)?;
  STATS.mmap_calls.fetch_add(1, Ordering::Relaxed);
  STATS.huge_pages_used.fetch_add(1, Ordering::Relaxed);
  Some(Reservation {
    ptr,
    len,
    huge: true,
  })
}

#[cfg(not(all(target_os = "linux", feature = "huge-pages")))]
fn os_reserve_huge(_bytes: usize) -> Option<Reservation> {
  None
}

unsafe fn os_release(ptr: *mut u8, len: usize) {
  unsafe { libc::munmap(ptr.cast(), len) };
  STATS.munmap_calls.fetch_add(1, Ordering::Relaxed);
}

/// Lets the OS drop the backing pages while keeping the address range reserved.
unsafe fn os_advise_not_needed(ptr: *mut u8, len: usize) {
  if len > 0 {
    unsafe { libc::madvise(ptr.cast(), len, libc::MADV_DONTNEED) };
  }
}

unsafe fn os_advise_will_need(ptr: *mut u8, len: usize) {
  if len > 0 {
    unsafe { libc::madvise(ptr.cast(), len, libc::MADV_WILLNEED) };
  }
}

// NUMA placement goes through raw syscalls so no libnuma is needed at link time.
#[cfg(all(target_os = "linux", feature = "numa"))]
fn numa_available() -> bool {
  static AVAILABLE: OnceLock<bool> = OnceLock::new();
  *AVAILABLE.get_or_init(|| {
    // get_mempolicy(NULL, NULL, 0, NULL, 0) fails with ENOSYS on kernels without NUMA.
    let rc = unsafe {
      libc::syscall(
        libc::SYS_get_mempolicy,
        null_mut::<libc::c_int>(),
        null_mut::<libc::c_ulong>(),
        0 as libc::c_ulong,
        null_mut::<libc::c_void>(),
        0 as libc::c_ulong,
      )
    };
    rc == 0
  })
}

#[cfg(all(target_os = "linux", feature = "numa"))]
fn current_numa_node() -> Option<i32> {
  if !numa_available() {
    return None;
  }
  let mut cpu: libc::c_uint = 0;
  let mut node: libc::c_uint = 0;
  let rc = unsafe {
    libc::syscall(
      libc::SYS_getcpu,
      &mut cpu as *mut libc::c_uint,
      &mut node as *mut libc::c_uint,
      null_mut::<libc::c_void>(),
    )
  };
  (rc == 0).then_some(node as i32)
}

#[cfg(all(target_os = "linux", feature = "numa"))]
fn numa_bind(ptr: NonNull<u8>, len: usize, node: i32) {
  const MPOL_PREFERRED: libc::c_int = 1;

  if !numa_available() || !(0..libc::c_ulong::BITS as i32).contains(&node) {
    return;
  }
  let mask: libc::c_ulong = 1 << node;
  // Placement is a hint: a failed mbind leaves the default policy in place.
  unsafe {
    libc::syscall(
      libc::SYS_mbind,
      ptr.as_ptr().cast::<libc::c_void>(),
      len as libc::c_ulong,
      MPOL_PREFERRED,
      &mask as *const libc::c_ulong,
      (libc::c_ulong::BITS + 1) as libc::c_ulong,
      0 as libc::c_uint,
    )
  };
}

#[cfg(not(all(target_os = "linux", feature = "numa")))]
fn current_numa_node() -> Option<i32> {
  None
}

#[cfg(not(all(target_os = "linux", feature = "numa")))]
fn numa_bind(_ptr: NonNull<u8>, _len: usize, _node: i32) {}

// =============================================================================
// Statistics
// =============================================================================

#[repr(C, align(64))]
struct ClassStats {
  allocs: AtomicUsize,
  frees: AtomicUsize,
  current_usage: AtomicUsize,
  slabs_created: AtomicUsize,
  slabs_reclaimed: AtomicUsize,
}

impl ClassStats {
  const fn new() -> Self {
    Self {
      allocs: AtomicUsize::new(0),
      frees: AtomicUsize::new(0),
      current_usage: AtomicUsize::new(0),
      slabs_created: AtomicUsize::new(0),
      slabs_reclaimed: AtomicUsize::new(0),
    }
  }
}

/// Process-wide counters. Relaxed everywhere: they describe the heap, they never steer it.
struct AllocStats {
  total_allocated: AtomicUsize,
  total_freed: AtomicUsize,
  current_usage: AtomicUsize,
  mmap_calls: AtomicUsize,
  munmap_calls: AtomicUsize,
  large_reuses: AtomicUsize,
  huge_pages_used: AtomicUsize,
  per_class: [ClassStats; CLASS_COUNT],
}

static STATS: AllocStats = AllocStats::new();

impl AllocStats {
  const fn new() -> Self {
    Self {
      total_allocated: AtomicUsize::new(0),
      total_freed: AtomicUsize::new(0),
      current_usage: AtomicUsize::new(0),
      mmap_calls: AtomicUsize::new(0),
      munmap_calls: AtomicUsize::new(0),
      large_reuses: AtomicUsize::new(0),
      huge_pages_used: AtomicUsize::new(0),
      per_class: [const { ClassStats::new() }; CLASS_COUNT],
    }
  }

  #[inline]
  fn record_alloc(&self, class: Option<usize>, bytes: usize) {
    self.total_allocated.fetch_add(bytes, Ordering::Relaxed);
    self.current_usage.fetch_add(bytes, Ordering::Relaxed);
    if let Some(class) = class {
      let stats = &self.per_class[class];
      stats.allocs.fetch_add(bytes, Ordering::Relaxed);
      stats.current_usage.fetch_add(bytes, Ordering::Relaxed);
    }
  }

  #[inline]
  fn record_free(&self, class: Option<usize>, bytes: usize) {
    self.total_freed.fetch_add(bytes, Ordering::Relaxed);
    self.current_usage.fetch_sub(bytes, Ordering::Relaxed);
    if let Some(class) = class {
      let stats = &self.per_class[class];
      stats.frees.fetch_add(bytes, Ordering::Relaxed);
      stats.current_usage.fetch_sub(bytes, Ordering::Relaxed);
    }
  }

  fn snapshot(&self) -> StatsSnapshot {
    let load = |counter: &AtomicUsize| counter.load(Ordering::Relaxed);
    let mut classes = [ClassStatsSnapshot::default(); CLASS_COUNT];
    for (snapshot, stats) in classes.iter_mut().zip(&self.per_class) {
      *snapshot = ClassStatsSnapshot {
        allocs: load(&stats.allocs),
        frees: load(&stats.frees),
        current_usage: load(&stats.current_usage),
        slabs_created: load(&stats.slabs_created),
        slabs_reclaimed: load(&stats.slabs_reclaimed),
      };
    }
    StatsSnapshot {
      total_allocated: load(&self.total_allocated),
      total_freed: load(&self.total_freed),
      current_usage: load(&self.current_usage),
      mmap_calls: load(&self.mmap_calls),
      munmap_calls: load(&self.munmap_calls),
      large_reuses: load(&self.large_reuses),
      huge_pages_used: load(&self.huge_pages_used),
      classes,
    }
  }
}

/// Per-class counters at one point in time. Byte counts are in class-size units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ClassStatsSnapshot {
  pub allocs: usize,
  pub frees: usize,
  pub current_usage: usize,
  pub slabs_created: usize,
  pub slabs_reclaimed: usize,
}

/// Copy of the process-wide counters. Counters are read one by one, so a snapshot taken while
/// other threads allocate may be slightly inconsistent across fields.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
  /// Usable bytes handed out, cumulative.
  pub total_allocated: usize,
  /// Usable bytes given back, cumulative.
  pub total_freed: usize,
  /// Usable bytes currently live.
  pub current_usage: usize,
  pub mmap_calls: usize,
  pub munmap_calls: usize,
  pub large_reuses: usize,
  pub huge_pages_used: usize,
  pub classes: [ClassStatsSnapshot; CLASS_COUNT],
}

impl fmt::Display for StatsSnapshot {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "=== xalloc stats ===")?;
    writeln!(f, "  Allocated   : {} bytes", self.total_allocated)?;
    writeln!(f, "  Freed       : {} bytes", self.total_freed)?;
    writeln!(f, "  In use      : {} bytes", self.current_usage)?;
    writeln!(f, "  mmap calls  : {}", self.mmap_calls)?;
    writeln!(f, "  munmap calls: {}", self.munmap_calls)?;
    writeln!(f, "  Large reuses: {}", self.large_reuses)?;
    writeln!(f, "  Huge pages  : {}", self.huge_pages_used)?;
    for (class, stats) in SizeClass::ALL.iter().zip(&self.classes) {
      writeln!(
        f,
        "  [class {} {:>4} B] allocs={} frees={} in_use={} slabs_created={} slabs_reclaimed={}",
        class.index(),
        class.size(),
        stats.allocs,
        stats.frees,
        stats.current_usage,
        stats.slabs_created,
        stats.slabs_reclaimed,
      )?;
    }
    Ok(())
  }
}

// =============================================================================
// Size Classes
// =============================================================================

/// One of the seven slab size classes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SizeClass(u8);

impl SizeClass {
  pub const ALL: [SizeClass; CLASS_COUNT] = [
    SizeClass(0),
    SizeClass(1),
    SizeClass(2),
    SizeClass(3),
    SizeClass(4),
    SizeClass(5),
    SizeClass(6),
  ];

  /// Smallest class whose payload holds `size` bytes, or `None` for the large path.
  #[inline]
  pub const fn for_size(size: usize) -> Option<Self> {
    match class_index(size) {
      Some(index) => Some(SizeClass(index as u8)),
      None => None,
    }
  }

  pub const fn from_index(index: usize) -> Option<Self> {
    if index < CLASS_COUNT {
      Some(SizeClass(index as u8))
    } else {
      None
    }
  }

  #[inline]
  pub const fn index(self) -> usize {
    self.0 as usize
  }

  /// Payload bytes of every block in this class.
  #[inline]
  pub const fn size(self) -> usize {
    class_size(self.0 as usize)
  }

  /// Blocks carved out of one slab of this class.
  pub fn blocks_per_slab(self) -> usize {
    let class = self.index();
    (slab_len(class) - SLAB_HEADER_SIZE) / block_stride(class)
  }
}

#[inline(always)]
const fn class_index(size: usize) -> Option<usize> {
  if size <= 16 {
    Some(0)
  } else if size <= 32 {
    Some(1)
  } else if size <= 64 {
    Some(2)
  } else if size <= 128 {
    Some(3)
  } else if size <= 256 {
    Some(4)
  } else if size <= 512 {
    Some(5)
  } else if size <= MAX_SMALL_SIZE {
    Some(6)
  } else {
    None
  }
}

#[inline(always)]
const fn class_size(class: usize) -> usize {
  16 << class
}

/// Header plus payload of one block.
#[inline(always)]
const fn block_stride(class: usize) -> usize {
  class_size(class) + HEADER_SIZE
}

/// Mapping length of a slab: room for `BLOCK_REFILL_COUNT` blocks, rounded to a page.
fn slab_len(class: usize) -> usize {
  align_up(SLAB_HEADER_SIZE + block_stride(class) * BLOCK_REFILL_COUNT, page_size())
}

// =============================================================================
// Block Headers
// =============================================================================

#[inline(always)]
unsafe fn header_of(payload: *mut u8) -> *mut BlockHeader {
  unsafe { payload.sub(HEADER_SIZE).cast() }
}

/// Start of the slab or large region a header belongs to.
#[inline(always)]
unsafe fn header_owner(header: *mut BlockHeader) -> *mut u8 {
  unsafe { header.cast::<u8>().sub((*header).offset as usize * ALIGNMENT) }
}

#[inline(always)]
unsafe fn slab_of(node: NonNull<FreeNode>) -> *mut Slab {
  unsafe { header_owner(header_of(node.as_ptr().cast())).cast() }
}

unsafe fn usable_size_of(header: *const BlockHeader) -> usize {
  let header = unsafe { &*header };
  match header.kind {
    KIND_SLAB => class_size(header.size),
    _ => header.size - (header.offset as usize * ALIGNMENT + HEADER_SIZE),
  }
}

/// Header of `payload`, aborting the process unless it carries a valid magic and kind.
#[inline]
unsafe fn checked_header(payload: *mut u8) -> *mut BlockHeader {
  let header = unsafe { header_of(payload) };
  let (magic, kind, size) = unsafe { ((*header).magic, (*header).kind, (*header).size) };
  let valid = magic == BLOCK_MAGIC
    && match kind {
      KIND_SLAB => size < CLASS_COUNT,
      KIND_LARGE => true,
      _ => false,
    };
  if !valid {
    heap_corruption();
  }
  header
}

/// There is no way to tell how far a broken header reaches, so nothing is cleaned up.
#[cold]
#[inline(never)]
fn heap_corruption() -> ! {
  const MSG: &[u8] = b"xalloc: heap corruption detected, aborting\n";
  unsafe { libc::write(libc::STDERR_FILENO, MSG.as_ptr().cast(), MSG.len()) };
  std::process::abort()
}

// =============================================================================
// Spin Lock
// =============================================================================

struct SpinLock {
  locked: AtomicBool,
}

impl SpinLock {
  const fn new() -> Self {
    Self {
      locked: AtomicBool::new(false),
    }
  }

  #[inline]
  fn lock(&self) -> SpinGuard<'_> {
    while self
      .locked
      .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
      .is_err()
    {
      while self.locked.load(Ordering::Relaxed) {
        hint::spin_loop();
      }
    }
    SpinGuard { lock: self }
  }
}

struct SpinGuard<'a> {
  lock: &'a SpinLock,
}

impl Drop for SpinGuard<'_> {
  #[inline]
  fn drop(&mut self) {
    self.lock.locked.store(false, Ordering::Release);
  }
}

// =============================================================================
// Transfer Cache (bounded SPSC ring)
// =============================================================================

#[repr(C, align(64))]
struct CacheAligned<T>(T);

/// Bounded ring of free blocks. Push fails when full and pop fails when empty; neither blocks.
#[repr(C)]
struct TransferCache {
  slots: CacheAligned<[AtomicPtr<FreeNode>; TRANSFER_CACHE_SLOTS]>,
  head: CacheAligned<AtomicUsize>,
  tail: CacheAligned<AtomicUsize>,
}

impl TransferCache {
  #[cfg(test)]
  const CAPACITY: usize = TRANSFER_CACHE_SLOTS - 1;

  const fn new() -> Self {
    Self {
      slots: CacheAligned([const { AtomicPtr::new(null_mut()) }; TRANSFER_CACHE_SLOTS]),
      head: CacheAligned(AtomicUsize::new(0)),
      tail: CacheAligned(AtomicUsize::new(0)),
    }
  }

  /// Producer side.
  #[inline]
  fn push(&self, node: NonNull<FreeNode>) -> bool {
    let tail = self.tail.0.load(Ordering::Relaxed);
    let next = (tail + 1) % TRANSFER_CACHE_SLOTS;
    if next == self.head.0.load(Ordering::Acquire) {
      return false;
    }
    self.slots.0[tail].store(node.as_ptr(), Ordering::Relaxed);
    self.tail.0.store(next, Ordering::Release);
    true
  }

  /// Consumer side.
  #[inline]
  fn pop(&self) -> Option<NonNull<FreeNode>> {
    let head = self.head.0.load(Ordering::Relaxed);
    if head == self.tail.0.load(Ordering::Acquire) {
      return None;
    }
    let node = self.slots.0[head].load(Ordering::Relaxed);
    self
      .head
      .0
      .store((head + 1) % TRANSFER_CACHE_SLOTS, Ordering::Release);
    NonNull::new(node)
  }

  fn len(&self) -> usize {
    let head = self.head.0.load(Ordering::Acquire);
    let tail = self.tail.0.load(Ordering::Acquire);
    (tail + TRANSFER_CACHE_SLOTS - head) % TRANSFER_CACHE_SLOTS
  }

  /// Drops every node `keep` rejects, preserving order. Caller must be both the only producer
  /// and the only consumer.
  fn retain(&self, mut keep: impl FnMut(NonNull<FreeNode>) -> bool) -> usize {
    let mut dropped = 0;
    for _ in 0..self.len() {
      let Some(node) = self.pop() else { break };
      if keep(node) {
        // The pop above freed a slot, so this cannot fail.
        self.push(node);
      } else {
        dropped += 1;
      }
    }
    dropped
  }
}

// =============================================================================
// Arena
// =============================================================================

/// Per-class state only the bound thread touches (or the lock holder, for the shared arena).
#[derive(Clone, Copy)]
struct ClassList {
  free: *mut FreeNode,
  len: usize,
  slabs: *mut Slab,
  /// Owned slabs whose blocks are all parked in this arena.
  ready: usize,
  #[cfg(test)]
  reclaim_scans: usize,
}

impl ClassList {
  const EMPTY: Self = Self {
    free: null_mut(),
    len: 0,
    slabs: null_mut(),
    ready: 0,
    #[cfg(test)]
    reclaim_scans: 0,
  };

  #[inline]
  unsafe fn push(&mut self, node: NonNull<FreeNode>) {
    unsafe { (*node.as_ptr()).next = self.free };
    self.free = node.as_ptr();
    self.len += 1;
  }

  #[inline]
  unsafe fn pop(&mut self) -> Option<NonNull<FreeNode>> {
    let node = NonNull::new(self.free)?;
    self.free = unsafe { (*node.as_ptr()).next };
    self.len -= 1;
    Some(node)
  }

  /// Unlinks every node `keep` rejects.
  unsafe fn retain(&mut self, mut keep: impl FnMut(NonNull<FreeNode>) -> bool) {
    let mut link: *mut *mut FreeNode = &mut self.free;
    unsafe {
      while let Some(node) = NonNull::new(*link) {
        if keep(node) {
          link = &mut (*node.as_ptr()).next;
        } else {
          *link = (*node.as_ptr()).next;
          self.len -= 1;
        }
      }
    }
  }
}

#[repr(C, align(64))]
struct Arena {
  lists: UnsafeCell<[ClassList; CLASS_COUNT]>,
  transfer: [TransferCache; CLASS_COUNT],
  /// Guards migration and reclamation; for the shared arena, every list operation.
  lock: SpinLock,
  init: Once,
  /// Node of the claiming thread, -1 when unknown.
  numa_node: AtomicI32,
}

unsafe impl Sync for Arena {}

static ARENAS: [Arena; MAX_ARENAS] = [const { Arena::new() }; MAX_ARENAS];
static NEXT_ARENA: AtomicUsize = AtomicUsize::new(SHARED_ARENA + 1);
static OVERFLOW_REPORTED: AtomicBool = AtomicBool::new(false);

thread_local! {
  static LOCAL_ARENA: Cell<*const Arena> = const { Cell::new(ptr::null()) };
}

impl Arena {
  const fn new() -> Self {
    Self {
      lists: UnsafeCell::new([ClassList::EMPTY; CLASS_COUNT]),
      transfer: [const { TransferCache::new() }; CLASS_COUNT],
      lock: SpinLock::new(),
      init: Once::new(),
      numa_node: AtomicI32::new(-1),
    }
  }

  fn index(&self) -> usize {
    (self as *const Arena as usize - ARENAS.as_ptr() as usize) / size_of::<Arena>()
  }

  #[inline]
  fn is_shared(&self) -> bool {
    ptr::eq(self, &ARENAS[SHARED_ARENA])
  }

  fn numa_node(&self) -> Option<i32> {
    let node = self.numa_node.load(Ordering::Relaxed);
    (node >= 0).then_some(node)
  }

  /// Moves up to `BLOCK_REFILL_COUNT` blocks from the transfer cache, carving a slab if it
  /// had none.
  unsafe fn refill(&self, list: &mut ClassList, class: usize) {
    let cache = &self.transfer[class];
    let mut pulled = 0;
    while pulled < BLOCK_REFILL_COUNT {
      let Some(node) = cache.pop() else { break };
      unsafe { list.push(node) };
      pulled += 1;
    }

    if pulled == 0 {
      unsafe { self.new_slab(list, class) };
    }
  }

  /// Maps a slab for `class` and pushes every block onto the local free list.
  /// Leaves the list untouched when the OS refuses the mapping.
  unsafe fn new_slab(&self, list: &mut ClassList, class: usize) -> bool {
    let numa_node = self.numa_node();
    let Some(region) = os_reserve(slab_len(class), numa_node, false) else {
      return false;
    };

    let base = region.ptr.as_ptr();
    let slab = base.cast::<Slab>();
    let stride = block_stride(class);
    let total = (region.len - SLAB_HEADER_SIZE) / stride;
    debug_assert!(region.len / ALIGNMENT <= u16::MAX as usize);

    unsafe {
      slab.write(Slab {
        next: list.slabs,
        free_count: AtomicUsize::new(total),
        total_count: total,
        len: region.len,
        arena: self,
        resident: total,
        numa_node: numa_node.unwrap_or(-1),
        class: class as u8,
      });
      list.slabs = slab;
      list.ready += 1;

      let mut cursor = base.add(SLAB_HEADER_SIZE);
      for _ in 0..total {
        cursor.cast::<BlockHeader>().write(BlockHeader {
          size: class,
          offset: ((cursor as usize - base as usize) / ALIGNMENT) as u16,
          kind: KIND_SLAB,
          magic: BLOCK_MAGIC,
        });
        list.push(NonNull::new_unchecked(cursor.add(HEADER_SIZE).cast()));
        cursor = cursor.add(stride);
      }
    }

    STATS.per_class[class]
      .slabs_created
      .fetch_add(1, Ordering::Relaxed);
    true
  }

  /// Parks a freed block: transfer cache first, then the local list. An overflowing list
  /// migrates a batch into the cache and tries to reclaim slabs. Returns the slabs reclaimed.
  unsafe fn release_block(&self, list: &mut ClassList, class: usize, node: NonNull<FreeNode>) -> usize {
    // Wherever it lands below, the block is parked in this arena.
    unsafe { self.park(list, node) };
    let cache = &self.transfer[class];
    if cache.push(node) {
      return 0;
    }

    unsafe { list.push(node) };
    if list.len <= MAX_LOCAL_CACHE_SIZE {
      return 0;
    }

    // The shared arena is already locked by `with_arena`.
    let _guard = (!self.is_shared()).then(|| self.lock.lock());
    let mut moved = 0;
    while moved < BLOCK_REFILL_COUNT {
      let Some(node) = (unsafe { list.pop() }) else {
        break;
      };
      if !cache.push(node) {
        unsafe { list.push(node) };
        break;
      }
      moved += 1;
    }

    unsafe { self.try_reclaim_slabs(list, class) }
  }

  /// Unmaps every slab of `class` whose blocks are all parked in this arena, unlinking those
  /// blocks from the local list and the transfer cache first. Caller holds `self.lock`.
  ///
  /// Costs O(1) unless some slab is ready, so slabs stranded by frees on other threads never
  /// trigger a walk of the lists.
  unsafe fn try_reclaim_slabs(&self, list: &mut ClassList, class: usize) -> usize {
    if list.ready == 0 {
      return 0;
    }
    #[cfg(test)]
    {
      list.reclaim_scans += 1;
    }

    let cache = &self.transfer[class];
    unsafe { list.retain(|node| !self.is_doomed(slab_of(node))) };
    cache.retain(|node| unsafe { !self.is_doomed(slab_of(node)) });

    let mut reclaimed = 0;
    let mut link: *mut *mut Slab = &mut list.slabs;
    unsafe {
      while let Some(slab) = NonNull::new(*link) {
        let slab = slab.as_ptr();
        if self.is_doomed(slab) {
          debug_assert_eq!((*slab).class as usize, class);
          debug_assert_eq!((*slab).numa_node, self.numa_node.load(Ordering::Relaxed));
          debug_assert_eq!(
            (*slab).free_count.load(Ordering::Acquire),
            (*slab).total_count
          );
          *link = (*slab).next;
          os_release(slab.cast(), (*slab).len);
          reclaimed += 1;
        } else {
          link = &mut (*slab).next;
        }
      }
    }
    list.ready -= reclaimed;

    STATS.per_class[class]
      .slabs_reclaimed
      .fetch_add(reclaimed, Ordering::Relaxed);
    reclaimed
  }

  /// Records that `node` is now parked here. Blocks of foreign slabs are not counted.
  #[inline]
  unsafe fn park(&self, list: &mut ClassList, node: NonNull<FreeNode>) {
    let slab = unsafe { slab_of(node) };
    unsafe {
      if ptr::eq((*slab).arena, self) {
        (*slab).resident += 1;
        if (*slab).resident == (*slab).total_count {
          list.ready += 1;
        }
      }
    }
  }

  /// Records that `node` left this arena to be handed out.
  #[inline]
  unsafe fn unpark(&self, list: &mut ClassList, node: NonNull<FreeNode>) {
    let slab = unsafe { slab_of(node) };
    unsafe {
      if ptr::eq((*slab).arena, self) {
        if (*slab).resident == (*slab).total_count {
          list.ready -= 1;
        }
        (*slab).resident -= 1;
      }
    }
  }

  #[inline]
  unsafe fn is_doomed(&self, slab: *mut Slab) -> bool {
    unsafe { ptr::eq((*slab).arena, self) && (*slab).resident == (*slab).total_count }
  }
}

/// Binds the calling thread to the next unclaimed arena, or to the shared one once the pool
/// is exhausted.
fn claim_arena() -> &'static Arena {
  let mut id = NEXT_ARENA.fetch_add(1, Ordering::Relaxed);
  if id >= MAX_ARENAS {
    NEXT_ARENA.fetch_sub(1, Ordering::Relaxed);
    id = SHARED_ARENA;
  }

  let arena = &ARENAS[id];
  arena.init.call_once(|| {
    arena
      .numa_node
      .store(current_numa_node().unwrap_or(-1), Ordering::Relaxed);
  });
  arena
}

#[inline]
fn current_arena() -> &'static Arena {
  let cached = LOCAL_ARENA.with(Cell::get);
  if !cached.is_null() {
    return unsafe { &*cached };
  }

  let arena = claim_arena();
  LOCAL_ARENA.with(|slot| slot.set(arena));
  if arena.is_shared() && !OVERFLOW_REPORTED.swap(true, Ordering::Relaxed) {
    tracing::warn!(
      max_arenas = MAX_ARENAS,
      "arena pool exhausted, further threads share arena {}",
      arena.index()
    );
  }
  arena
}

/// Runs `f` on the calling thread's arena lists.
#[inline]
fn with_arena<R>(f: impl FnOnce(&Arena, &mut [ClassList; CLASS_COUNT]) -> R) -> R {
  let arena = current_arena();
  let _guard = arena.is_shared().then(|| arena.lock.lock());
  // An exclusive arena is only reached through its bound thread, the shared one only under
  // its lock.
  let lists = unsafe { &mut *arena.lists.get() };
  f(arena, lists)
}

// =============================================================================
// Small allocation / free
// =============================================================================

fn alloc_small(class: usize) -> Option<NonNull<u8>> {
  let node = with_arena(|arena, lists| {
    let list = &mut lists[class];
    if list.free.is_null() {
      unsafe { arena.refill(list, class) };
    }
    let node = unsafe { list.pop() }?;
    unsafe { arena.unpark(list, node) };
    Some(node)
  })?;

  unsafe { (*slab_of(node)).free_count.fetch_sub(1, Ordering::Relaxed) };
  STATS.record_alloc(Some(class), class_size(class));
  Some(node.cast())
}

unsafe fn free_small(payload: NonNull<u8>, class: usize) {
  let node = payload.cast::<FreeNode>();
  STATS.record_free(Some(class), class_size(class));
  unsafe { (*slab_of(node)).free_count.fetch_add(1, Ordering::Release) };

  let reclaimed =
    with_arena(|arena, lists| unsafe { arena.release_block(&mut lists[class], class, node) });
  if reclaimed > 0 {
    tracing::debug!(class, size = class_size(class), reclaimed, "reclaimed idle slabs");
  }
}

// =============================================================================
// Large allocation / free
// =============================================================================

/// Released large regions, newest first. The lock is never held across a system call.
struct LargeFreeList {
  lock: SpinLock,
  head: UnsafeCell<*mut LargeBlock>,
}

unsafe impl Sync for LargeFreeList {}

static LARGE_FREE: LargeFreeList = LargeFreeList::new();

impl LargeFreeList {
  const fn new() -> Self {
    Self {
      lock: SpinLock::new(),
      head: UnsafeCell::new(null_mut()),
    }
  }

  /// Unlinks the first region of at least `needed` bytes. First fit, so the region may be
  /// far larger than asked for.
  fn take(&self, needed: usize) -> Option<NonNull<LargeBlock>> {
    let _guard = self.lock.lock();
    unsafe {
      let mut link: *mut *mut LargeBlock = self.head.get();
      while let Some(block) = NonNull::new(*link) {
        if (*block.as_ptr()).size >= needed {
          *link = (*block.as_ptr()).next;
          return Some(block);
        }
        link = &mut (*block.as_ptr()).next;
      }
    }
    None
  }

  fn put(&self, block: NonNull<LargeBlock>) {
    let _guard = self.lock.lock();
    unsafe {
      (*block.as_ptr()).next = *self.head.get();
      *self.head.get() = block.as_ptr();
    }
  }
}

/// Payload offset from the region start for a given alignment.
#[inline]
const fn large_payload_offset(align: usize) -> usize {
  align_up(LARGE_HEADER_SIZE + HEADER_SIZE, align)
}

/// Serves `size` bytes aligned to `align` (at most a page) from a retained or fresh region.
fn alloc_large(size: usize, align: usize) -> Result<NonNull<u8>, AllocError> {
  let offset = large_payload_offset(align);
  let use_huge = cfg!(feature = "huge-pages") && size >= HUGE_PAGE_THRESHOLD;
  let granule = if use_huge { HUGE_PAGE_SIZE } else { page_size() };
  let needed = size
    .checked_add(offset)
    .and_then(|raw| align_up_checked(raw, granule))
    .ok_or(AllocError::Overflow)?;

  let numa_node = current_numa_node();
  if let Some(block) = LARGE_FREE.take(needed) {
    let block = block.as_ptr();
    unsafe {
      // Pages dropped on free fault back in under the new policy.
      if let Some(node) = numa_node
        && (*block).numa_node != node
      {
        numa_bind(NonNull::new_unchecked(block.cast()), (*block).size, node);
        (*block).numa_node = node;
      }
      os_advise_will_need(block.cast(), (*block).size);
    }
    STATS.large_reuses.fetch_add(1, Ordering::Relaxed);
    return Ok(unsafe { place_large_header(block, offset) });
  }

  let region = os_reserve(needed, numa_node, use_huge).ok_or(AllocError::OutOfMemory)?;
  if use_huge && !region.huge {
    tracing::debug!(len = region.len, "huge pages unavailable, using normal pages");
  }

  let block = region.ptr.as_ptr().cast::<LargeBlock>();
  unsafe {
    block.write(LargeBlock {
      size: region.len,
      next: null_mut(),
      numa_node: numa_node.unwrap_or(-1),
      huge: region.huge,
    });
    Ok(place_large_header(block, offset))
  }
}

unsafe fn place_large_header(block: *mut LargeBlock, offset: usize) -> NonNull<u8> {
  unsafe {
    let payload = block.cast::<u8>().add(offset);
    let header = header_of(payload);
    header.write(BlockHeader {
      size: (*block).size,
      offset: ((offset - HEADER_SIZE) / ALIGNMENT) as u16,
      kind: KIND_LARGE,
      magic: BLOCK_MAGIC,
    });
    STATS.record_alloc(None, usable_size_of(header));
    NonNull::new_unchecked(payload)
  }
}

/// Drops the region's pages past the descriptor and parks it for reuse. Never unmaps.
unsafe fn free_large(header: *mut BlockHeader) {
  unsafe {
    STATS.record_free(None, usable_size_of(header));

    let block = header_owner(header).cast::<LargeBlock>();
    let keep = if (*block).huge { HUGE_PAGE_SIZE } else { page_size() };
    if (*block).size > keep {
      os_advise_not_needed(block.cast::<u8>().add(keep), (*block).size - keep);
    }
    LARGE_FREE.put(NonNull::new_unchecked(block));
  }
}

// =============================================================================
// Quarantine (debug)
// =============================================================================

#[cfg(feature = "quarantine")]
struct Quarantine {
  lock: SpinLock,
  ring: UnsafeCell<QuarantineRing>,
}

#[cfg(feature = "quarantine")]
struct QuarantineRing {
  ptrs: [*mut u8; QUARANTINE_SIZE],
  head: usize,
  count: usize,
}

#[cfg(feature = "quarantine")]
unsafe impl Sync for Quarantine {}

#[cfg(feature = "quarantine")]
static QUARANTINE: Quarantine = Quarantine::new();

#[cfg(feature = "quarantine")]
impl Quarantine {
  const fn new() -> Self {
    Self {
      lock: SpinLock::new(),
      ring: UnsafeCell::new(QuarantineRing {
        ptrs: [null_mut(); QUARANTINE_SIZE],
        head: 0,
        count: 0,
      }),
    }
  }

  /// Parks `ptr`; once the ring is full the oldest entry comes back out for the real free.
  fn admit(&self, ptr: NonNull<u8>) -> Option<NonNull<u8>> {
    let _guard = self.lock.lock();
    let ring = unsafe { &mut *self.ring.get() };
    if ring.count == QUARANTINE_SIZE {
      let evicted = ring.ptrs[ring.head];
      ring.ptrs[ring.head] = ptr.as_ptr();
      ring.head = (ring.head + 1) % QUARANTINE_SIZE;
      NonNull::new(evicted)
    } else {
      ring.ptrs[(ring.head + ring.count) % QUARANTINE_SIZE] = ptr.as_ptr();
      ring.count += 1;
      None
    }
  }
}

// =============================================================================
// Public API
// =============================================================================

/// Allocates `size` bytes aligned to [`ALIGNMENT`].
pub fn allocate(size: usize) -> Result<NonNull<u8>, AllocError> {
  if size == 0 {
    return Err(AllocError::ZeroSize);
  }

  let result = match SizeClass::for_size(size) {
    Some(class) => alloc_small(class.index()).ok_or(AllocError::OutOfMemory),
    None => alloc_large(size, ALIGNMENT),
  };
  if let Err(err) = result {
    tracing::debug!(size, %err, "allocation failed");
  }
  result
}

/// Allocates `count * size` zeroed bytes. Fails on a zero operand or when the product overflows.
pub fn allocate_zeroed(count: usize, size: usize) -> Result<NonNull<u8>, AllocError> {
  if count == 0 || size == 0 {
    return Err(AllocError::ZeroSize);
  }
  let total = count.checked_mul(size).ok_or(AllocError::Overflow)?;
  let ptr = allocate(total)?;
  unsafe { ptr::write_bytes(ptr.as_ptr(), 0, total) };
  Ok(ptr)
}

/// Grows `ptr` to hold `size` bytes.
///
/// A null `ptr` allocates; a zero `size` frees and returns `Ok(None)`. Requests that fit the
/// current usable size return `ptr` unchanged, others move the contents to a new block. On
/// failure the old block is left intact.
///
/// # Safety
/// `ptr` must be null or a live pointer returned by this allocator.
pub unsafe fn reallocate(ptr: *mut u8, size: usize) -> Result<Option<NonNull<u8>>, AllocError> {
  let Some(old) = NonNull::new(ptr) else {
    return allocate(size).map(Some);
  };
  if size == 0 {
    unsafe { free(ptr) };
    return Ok(None);
  }

  let current = unsafe { usable_size_of(checked_header(ptr)) };
  if size <= current {
    return Ok(Some(old));
  }
  unsafe { relocate(old, current, size) }.map(Some)
}

/// Like [`reallocate`], but also moves to a smaller block once `size` drops to half of the
/// current usable size or below. Sizes in `(usable / 2, usable]` stay in place.
///
/// # Safety
/// `ptr` must be null or a live pointer returned by this allocator.
pub unsafe fn shrink_reallocate(
  ptr: *mut u8,
  size: usize,
) -> Result<Option<NonNull<u8>>, AllocError> {
  let Some(old) = NonNull::new(ptr) else {
    return allocate(size).map(Some);
  };
  if size == 0 {
    unsafe { free(ptr) };
    return Ok(None);
  }

  let current = unsafe { usable_size_of(checked_header(ptr)) };
  if size <= current && size > current / 2 {
    return Ok(Some(old));
  }
  unsafe { relocate(old, current, size) }.map(Some)
}

unsafe fn relocate(old: NonNull<u8>, current: usize, size: usize) -> Result<NonNull<u8>, AllocError> {
  let new = allocate(size)?;
  unsafe {
    ptr::copy_nonoverlapping(old.as_ptr(), new.as_ptr(), current.min(size));
    free(old.as_ptr());
  }
  Ok(new)
}

/// Releases `ptr`. Null is ignored; a corrupted header aborts the process.
///
/// # Safety
/// `ptr` must be null or a live pointer returned by this allocator.
pub unsafe fn free(ptr: *mut u8) {
  let Some(payload) = NonNull::new(ptr) else {
    return;
  };
  unsafe { checked_header(payload.as_ptr()) };

  // Entries were validated on the way in.
  #[cfg(feature = "quarantine")]
  let Some(payload) = QUARANTINE.admit(payload) else {
    return;
  };

  unsafe {
    let header = header_of(payload.as_ptr());
    match (*header).kind {
      KIND_SLAB => free_small(payload, (*header).size),
      _ => free_large(header),
    }
  }
}

/// Bytes usable behind `ptr`: the class size for small blocks, the region tail for large ones.
///
/// # Safety
/// `ptr` must be null or a live pointer returned by this allocator.
pub unsafe fn usable_size(ptr: *mut u8) -> usize {
  if ptr.is_null() {
    return 0;
  }
  unsafe { usable_size_of(checked_header(ptr)) }
}

#[inline]
pub fn is_null<T>(ptr: *const T) -> bool {
  ptr.is_null()
}

pub fn stats() -> StatsSnapshot {
  STATS.snapshot()
}

/// Writes the current counters to stderr.
pub fn stats_report() {
  let snapshot = stats();
  tracing::info!(
    allocated = snapshot.total_allocated,
    freed = snapshot.total_freed,
    in_use = snapshot.current_usage,
    mmap_calls = snapshot.mmap_calls,
    munmap_calls = snapshot.munmap_calls,
    "allocator stats"
  );
  let _ = write!(std::io::stderr().lock(), "{snapshot}");
}

// =============================================================================
// GlobalAlloc
// =============================================================================

/// Adapter for `#[global_allocator]`. Alignments above [`ALIGNMENT`] and up to the page size
/// are served from large regions; anything stricter fails.
pub struct Allocator;

unsafe impl GlobalAlloc for Allocator {
  unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
    let size = layout.size().max(1);
    let result = if layout.align() <= ALIGNMENT {
      allocate(size)
    } else if layout.align() <= page_size() {
      alloc_large(size, layout.align())
    } else {
      return null_mut();
    };
    result.map_or(null_mut(), NonNull::as_ptr)
  }

  unsafe fn dealloc(&self, ptr: *mut u8, _layout: Layout) {
    unsafe { free(ptr) };
  }

  unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
    let ptr = unsafe { self.alloc(layout) };
    if !ptr.is_null() {
      unsafe { ptr::write_bytes(ptr, 0, layout.size()) };
    }
    ptr
  }

  unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
    if layout.align() <= ALIGNMENT {
      return match unsafe { reallocate(ptr, new_size) } {
        Ok(Some(new)) => new.as_ptr(),
        _ => null_mut(),
      };
    }

    // Over-aligned blocks must not lose their alignment by moving through `allocate`.
    if new_size <= unsafe { usable_size(ptr) } {
      return ptr;
    }
    let new = unsafe { self.alloc(Layout::from_size_align_unchecked(new_size, layout.align())) };
    if !new.is_null() {
      unsafe {
        ptr::copy_nonoverlapping(ptr, new, layout.size().min(new_size));
        free(ptr);
      }
    }
    new
  }
}

// =============================================================================
// C API (enabled with --features c_api)
// =============================================================================

#[cfg(feature = "c_api")]
#[unsafe(no_mangle)]
pub extern "C" fn x_malloc(size: usize) -> *mut u8 {
  allocate(size).map_or(null_mut(), NonNull::as_ptr)
}

#[cfg(feature = "c_api")]
#[unsafe(no_mangle)]
pub extern "C" fn x_calloc(nmemb: usize, size: usize) -> *mut u8 {
  allocate_zeroed(nmemb, size).map_or(null_mut(), NonNull::as_ptr)
}

#[cfg(feature = "c_api")]
#[unsafe(no_mangle)]
pub unsafe extern "C" fn x_realloc(ptr: *mut u8, size: usize) -> *mut u8 {
  match unsafe { reallocate(ptr, size) } {
    Ok(Some(new)) => new.as_ptr(),
    _ => null_mut(),
  }
}

#[cfg(feature = "c_api")]
#[unsafe(no_mangle)]
pub unsafe extern "C" fn x_shrink_realloc(ptr: *mut u8, size: usize) -> *mut u8 {
  match unsafe { shrink_reallocate(ptr, size) } {
    Ok(Some(new)) => new.as_ptr(),
    _ => null_mut(),
  }
}

#[cfg(feature = "c_api")]
#[unsafe(no_mangle)]
pub unsafe extern "C" fn x_free(ptr: *mut u8) {
  unsafe { free(ptr) }
}

#[cfg(feature = "c_api")]
#[unsafe(no_mangle)]
pub extern "C" fn x_null(ptr: *const libc::c_void) -> bool {
  is_null(ptr)
}

#[cfg(feature = "c_api")]
#[unsafe(no_mangle)]
pub extern "C" fn x_allocator_stats() {
  stats_report()
}

// =============================================================================
// Utils
// =============================================================================

/// Rounds `x` up to the next multiple of alignment `align`. Alignment must be a power of 2.
#[inline(always)]
const fn align_up(x: usize, align: usize) -> usize {
  let mask = align - 1;
  (x + mask) & !mask
}

#[inline(always)]
fn align_up_checked(x: usize, align: usize) -> Option<usize> {
  let mask = align - 1;
  x.checked_add(mask).map(|v| v & !mask)
}

// =============================================================================
// Tests
// =============================================================================
