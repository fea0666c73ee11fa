use std::{env, process::Command};

const SCENARIO_ENV: &str = "XALLOC_CORRUPTION_SCENARIO";

/// Smashes the magic in the header of a `size` byte block, then hands it to `op`.
fn smash_and(size: usize, op: fn(*mut u8)) {
  let ptr = xalloc::allocate(size).unwrap().as_ptr();
  unsafe { ptr.sub(4).cast::<u32>().write_unaligned(0x4141_4141) };
  op(ptr);
}

fn run_child(scenario: &str, test_name: &str) {
  if env::var(SCENARIO_ENV).as_deref() == Ok(scenario) {
    match scenario {
      "free-small" => smash_and(64, |ptr| unsafe { xalloc::free(ptr) }),
      "free-large" => smash_and(64 * 1024, |ptr| unsafe { xalloc::free(ptr) }),
      "realloc" => smash_and(64, |ptr| {
        let _ = unsafe { xalloc::reallocate(ptr, 4096) };
      }),
      "shrink" => smash_and(512, |ptr| {
        let _ = unsafe { xalloc::shrink_reallocate(ptr, 16) };
      }),
      _ => unreachable!(),
    }
    panic!("corrupted header was accepted");
  }

  let output = Command::new(env::current_exe().unwrap())
    .args([test_name, "--exact", "--nocapture", "--test-threads=1"])
    .env(SCENARIO_ENV, scenario)
    .output()
    .unwrap();

  assert!(!output.status.success());
  #[cfg(unix)]
  {
    use std::os::unix::process::ExitStatusExt;
    assert_eq!(output.status.signal(), Some(libc::SIGABRT));
  }
  assert!(String::from_utf8_lossy(&output.stderr).contains("heap corruption"));
}

#[test]
fn free_aborts_on_smashed_small_header() {
  run_child("free-small", "free_aborts_on_smashed_small_header");
}

#[test]
fn free_aborts_on_smashed_large_header() {
  run_child("free-large", "free_aborts_on_smashed_large_header");
}

#[test]
fn reallocate_aborts_on_smashed_header() {
  run_child("realloc", "reallocate_aborts_on_smashed_header");
}

#[test]
fn shrink_reallocate_aborts_on_smashed_header() {
  run_child("shrink", "shrink_reallocate_aborts_on_smashed_header");
}
