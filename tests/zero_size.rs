use xalloc::{AllocError, allocate, allocate_zeroed, stats};

#[test]
fn zero_sized_requests_leave_no_trace() {
  let before = stats();

  assert_eq!(allocate(0), Err(AllocError::ZeroSize));
  assert_eq!(allocate_zeroed(0, 64), Err(AllocError::ZeroSize));
  assert_eq!(allocate_zeroed(64, 0), Err(AllocError::ZeroSize));
  assert_eq!(
    unsafe { xalloc::reallocate(std::ptr::null_mut(), 0) },
    Err(AllocError::ZeroSize)
  );
  unsafe { xalloc::free(std::ptr::null_mut()) };

  assert_eq!(stats(), before);
}
