use crate::{Backend, DevicePtr, Error, SimBackend};

#[test]
fn test_sim_alloc_free() {
    let backend = SimBackend::new();
    let a = backend.alloc(64).unwrap();
    let b = backend.alloc(64).unwrap();

    assert_ne!(a, b);
    assert_eq!(backend.live(), 2);
    assert_eq!(backend.stats().allocations(), 2);

    backend.free(a).unwrap();
    backend.free(b).unwrap();
    assert_eq!(backend.live(), 0);
}

#[test]
fn test_sim_zero_byte_allocations_are_distinct() {
    let backend = SimBackend::new();
    let a = backend.alloc(0).unwrap();
    let b = backend.alloc(0).unwrap();
    assert_ne!(a, b);
}

#[test]
fn test_sim_double_free() {
    let backend = SimBackend::new();
    let ptr = backend.alloc(8).unwrap();
    backend.free(ptr).unwrap();

    let err = backend.free(ptr).unwrap_err();
    assert!(matches!(err, Error::UnknownAllocation { .. }), "{err}");
}

#[test]
fn test_sim_round_trip() {
    let backend = SimBackend::new();
    let ptr = backend.alloc(16).unwrap();

    let input: Vec<u8> = (0..16).collect();
    let mut output = vec![0u8; 16];
    unsafe {
        backend.copy_htod(ptr, input.as_ptr(), 16).unwrap();
        backend.copy_dtoh(output.as_mut_ptr(), ptr, 16).unwrap();
    }

    assert_eq!(input, output);
    assert_eq!(backend.stats().htod_bytes(), 16);
    assert_eq!(backend.stats().dtoh_bytes(), 16);
}

#[test]
fn test_sim_partial_copy_at_offset() {
    let backend = SimBackend::new();
    let ptr = backend.alloc(8).unwrap();

    let input = [7u8; 3];
    unsafe { backend.copy_htod(ptr.add(5), input.as_ptr(), 3).unwrap() };

    let mut output = [0u8; 8];
    unsafe { backend.copy_dtoh(output.as_mut_ptr(), ptr, 8).unwrap() };
    assert_eq!(output, [0, 0, 0, 0, 0, 7, 7, 7]);
}

#[test]
fn test_sim_rejects_overflowing_transfer() {
    let backend = SimBackend::new();
    let ptr = backend.alloc(8).unwrap();

    let input = [1u8; 4];
    let err = unsafe { backend.copy_htod(ptr.add(6), input.as_ptr(), 4) }.unwrap_err();
    assert!(matches!(err, Error::OutOfRange { bytes: 4, .. }), "{err}");
    assert_eq!(backend.stats().htod_bytes(), 0);
}

#[test]
fn test_sim_rejects_foreign_pointer() {
    let backend = SimBackend::new();
    let mut output = [0u8; 4];
    let err = unsafe { backend.copy_dtoh(output.as_mut_ptr(), DevicePtr::new(0x10), 4) }.unwrap_err();
    assert!(matches!(err, Error::OutOfRange { .. }));
}

#[test]
fn test_sim_device_to_device() {
    let backend = SimBackend::new();
    let src = backend.alloc(4).unwrap();
    let dst = backend.alloc(4).unwrap();

    let input = [1u8, 2, 3, 4];
    unsafe { backend.copy_htod(src, input.as_ptr(), 4).unwrap() };
    backend.copy_dtod(dst, src, 4, true).unwrap();
    backend.synchronize().unwrap();

    let mut output = [0u8; 4];
    unsafe { backend.copy_dtoh(output.as_mut_ptr(), dst, 4).unwrap() };
    assert_eq!(output, input);
    assert_eq!(backend.stats().dtod_bytes(), 4);
}

#[test]
fn test_sim_name() {
    let backend = SimBackend::new();
    assert_eq!(backend.name(), "SIM");
}
