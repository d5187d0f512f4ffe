//! Allocator-level properties that must hold independent of any program
//! compiled on top of the arena: first-fit placement, exact capacity
//! round-trips, and zero-on-free.

use arenalang::Allocator;

#[test]
fn exhausting_and_freeing_restores_full_capacity() {
    let mut a = Allocator::new(128);
    let blocks: Vec<usize> = (0..8).map(|_| a.alloc(16).unwrap()).collect();
    assert_eq!(a.free_space(), 0);
    for (i, offset) in blocks.into_iter().enumerate().rev() {
        a.free(offset, 16);
        assert_eq!(a.free_space(), (8 - i) * 16);
    }
    assert_eq!(a.free_space(), a.capacity());
}

#[test]
fn first_fit_never_picks_a_later_hole_when_an_earlier_one_fits() {
    let mut a = Allocator::new(64);
    let o1 = a.alloc(8).unwrap();
    let o2 = a.alloc(8).unwrap();
    let _o3 = a.alloc(8).unwrap();
    a.free(o2, 8); // hole at offset 8
    a.free(o1, 8); // coalesces into a 16-byte hole at offset 0
    let o4 = a.alloc(4).unwrap();
    assert_eq!(o4, 0);
}

#[test]
fn freed_bytes_read_back_as_zero() {
    let mut a = Allocator::new(32);
    let o = a.alloc(8).unwrap();
    a.write(o, &[1, 2, 3, 4, 5, 6, 7, 8]);
    a.free(o, 8);
    let o2 = a.alloc(8).unwrap();
    assert_eq!(a.slice(o2, 8), &[0u8; 8]);
}

#[test]
fn out_of_memory_when_no_hole_is_large_enough() {
    let mut a = Allocator::new(4);
    let err = a.alloc(8).unwrap_err();
    assert_eq!(err.to_string(), "out of memory: requested 8 bytes, 4 free");
}

#[test]
fn zero_tail_only_clears_past_the_written_prefix() {
    let mut a = Allocator::new(16);
    let o = a.alloc(8).unwrap();
    a.write(o, &[0xffu8; 8]);
    a.zero_tail(o, 4, 8);
    assert_eq!(a.slice(o, 8), &[0xff, 0xff, 0xff, 0xff, 0, 0, 0, 0]);
}
