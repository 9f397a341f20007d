use crate::test::{addr_of, device_fill, device_slice, sim_manager};
use crate::{Addr, Backend, DevicePtr, Error, Mode, Residency};

#[test]
fn test_host_access_leaves_device_alone() {
    let (mut manager, sim) = sim_manager();
    let mut data = vec![1u8; 64];
    let host = addr_of(&mut data);
    unsafe { manager.insert(host, 64).unwrap() };

    assert_eq!(manager.resolve(host, Mode::HostOnly).unwrap(), host);
    assert_eq!(sim.stats().allocations(), 0);
    assert_eq!(manager.registry().buffer(host).unwrap().device(), None);
}

#[test]
fn test_accelerated_pushes_once() {
    let (mut manager, sim) = sim_manager();
    let mut data: Vec<u8> = (0..64).collect();
    let host = addr_of(&mut data);
    unsafe { manager.insert(host, 64).unwrap() };

    let device = manager.resolve(host, Mode::Accelerated).unwrap();
    assert_ne!(device, host);
    assert_eq!(device_slice::<u8>(device, 64), data);
    assert_eq!(sim.stats().allocations(), 1);
    assert_eq!(sim.stats().htod_bytes(), 64);

    let record = manager.registry().buffer(host).unwrap();
    assert_eq!(record.residency(), Residency::Device);
    assert_eq!(record.device().map(Addr::from), Some(device));

    // Already authoritative on the device: no further transfer.
    assert_eq!(manager.resolve(host, Mode::Accelerated).unwrap(), device);
    assert_eq!(sim.stats().allocations(), 1);
    assert_eq!(sim.stats().htod_bytes(), 64);
}

#[test]
fn test_device_result_comes_back_to_host() {
    let (mut manager, sim) = sim_manager();
    let mut data = vec![3.0f64; 1024];
    let host = addr_of(&mut data);
    let bytes = data.len() * size_of::<f64>();
    unsafe { manager.insert(host, bytes).unwrap() };

    let device = manager.resolve(host, Mode::Accelerated).unwrap();
    assert!(device_slice::<f64>(device, 1024).iter().all(|&x| x == 3.0));
    device_fill(device, 1024, 5.0f64);

    assert_eq!(manager.resolve(host, Mode::HostOnly).unwrap(), host);
    assert!(data.iter().all(|&x| x == 5.0));
    assert_eq!(sim.stats().dtoh_bytes(), bytes as u64);
    assert_eq!(manager.registry().buffer(host).unwrap().residency(), Residency::Host);

    // Host is authoritative again; a second host access moves nothing.
    manager.resolve(host, Mode::HostOnly).unwrap();
    assert_eq!(sim.stats().dtoh_bytes(), bytes as u64);
}

#[test]
fn test_host_writes_reach_device_on_next_accelerated_access() {
    let (mut manager, _sim) = sim_manager();
    let mut data = vec![0u32; 16];
    let host = addr_of(&mut data);
    unsafe { manager.insert(host, 64).unwrap() };

    manager.resolve(host, Mode::Accelerated).unwrap();
    manager.resolve(host, Mode::HostOnly).unwrap();
    data.fill(7);

    let device = manager.resolve(host, Mode::Accelerated).unwrap();
    assert_eq!(device_slice::<u32>(device, 16), vec![7; 16]);
}

#[test]
fn test_alias_resolves_through_base() {
    let (mut manager, sim) = sim_manager();
    let mut data = vec![1.0f64; 32];
    let host = addr_of(&mut data);
    unsafe { manager.insert(host, 32 * 8).unwrap() };

    let alias = host.add(10 * 8);
    let device_alias = manager.resolve(alias, Mode::Accelerated).unwrap();
    let device_base = Addr::from(manager.registry().buffer(host).unwrap().device().unwrap());
    assert_eq!(device_alias, device_base.add(80));
    // The whole base buffer moved, not only the tail behind the alias.
    assert_eq!(sim.stats().htod_bytes(), 256);
    assert_eq!(manager.registry().alias_count(), 1);

    device_fill(device_base, 32, 2.0f64);
    assert_eq!(manager.resolve(alias, Mode::HostOnly).unwrap(), alias);
    assert!(data.iter().all(|&x| x == 2.0));
}

#[test]
fn test_alias_and_base_share_residency() {
    let (mut manager, sim) = sim_manager();
    let mut data = vec![0u8; 128];
    let host = addr_of(&mut data);
    unsafe { manager.insert(host, 128).unwrap() };

    let device = manager.resolve(host, Mode::Accelerated).unwrap();
    assert_eq!(manager.resolve(host.add(64), Mode::Accelerated).unwrap(), device.add(64));
    assert_eq!(sim.stats().htod_bytes(), 128);
}

#[test]
fn test_unknown_address() {
    let (mut manager, _sim) = sim_manager();
    let plain = Addr::new(0xdead_0000);

    assert_eq!(manager.resolve(plain, Mode::HostOnly).unwrap(), plain);
    let err = manager.resolve(plain, Mode::Accelerated).unwrap_err();
    assert!(matches!(err, Error::UnknownAddress { addr } if addr == plain), "{err}");
}

#[test]
fn test_erased_aliases_stop_resolving() {
    let (mut manager, sim) = sim_manager();
    let mut data = vec![0u8; 64];
    let host = addr_of(&mut data);
    unsafe { manager.insert(host, 64).unwrap() };

    manager.resolve(host.add(8), Mode::Accelerated).unwrap();
    assert_eq!(sim.live(), 1);

    assert_eq!(manager.erase(host).unwrap(), host);
    assert_eq!(sim.live(), 0);
    assert_eq!(manager.registry().alias_count(), 0);
    assert!(matches!(manager.resolve(host.add(8), Mode::Accelerated), Err(Error::UnknownAddress { .. })));
    assert!(matches!(manager.resolve(host, Mode::Accelerated), Err(Error::UnknownAddress { .. })));
    assert!(matches!(manager.erase(host), Err(Error::UnknownAddress { .. })));
}

#[test]
fn test_failed_free_keeps_buffer_registered() {
    let (mut manager, sim) = sim_manager();
    let mut data = vec![0u8; 32];
    let host = addr_of(&mut data);
    unsafe { manager.insert(host, 32).unwrap() };
    let device = manager.resolve(host.add(4), Mode::Accelerated).unwrap();

    // Release the copy behind the manager's back so its own free fails.
    sim.free(DevicePtr::new(device.get() - 4)).unwrap();
    let err = manager.erase(host).unwrap_err();
    assert!(matches!(err, Error::Device { .. }), "{err}");

    assert!(manager.is_known(host));
    assert_eq!(manager.registry().alias_count(), 1);
    let record = manager.registry().buffer(host).unwrap();
    assert_eq!(record.device(), Some(DevicePtr::new(device.get() - 4)));
}

#[test]
fn test_typed_pointers() {
    let (mut manager, _sim) = sim_manager();
    let mut data = vec![4i32; 8];
    let ptr = data.as_mut_ptr();
    unsafe { manager.insert(Addr::from_mut_ptr(ptr), 32).unwrap() };

    let device = manager.resolve_ptr(ptr, Mode::Accelerated).unwrap();
    assert_ne!(device, ptr);
    unsafe { *device.add(3) = 9 };

    let inner = unsafe { ptr.add(3) } as *const i32;
    let host = manager.resolve_const(inner, Mode::HostOnly).unwrap();
    assert_eq!(host, inner);
    assert_eq!(data[3], 9);
}

#[test]
fn test_drop_releases_device_copies() {
    let (mut manager, sim) = sim_manager();
    let mut first = vec![0u8; 16];
    let mut second = vec![0u8; 16];
    unsafe {
        manager.insert(addr_of(&mut first), 16).unwrap();
        manager.insert(addr_of(&mut second), 16).unwrap();
    }
    manager.resolve(addr_of(&mut first), Mode::Accelerated).unwrap();
    manager.resolve(addr_of(&mut second), Mode::Accelerated).unwrap();
    assert_eq!(sim.live(), 2);

    drop(manager);
    assert_eq!(sim.live(), 0);
}
