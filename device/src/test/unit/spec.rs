use test_case::test_case;

use crate::{DeviceSpec, Error};

#[test_case("SIM", DeviceSpec::Sim; "sim")]
#[test_case("sim", DeviceSpec::Sim; "sim_lowercase")]
#[test_case("host", DeviceSpec::Sim; "host_alias")]
#[test_case("CUDA", DeviceSpec::Cuda { device_id: 0 }; "cuda_default")]
#[test_case("cuda:1", DeviceSpec::Cuda { device_id: 1 }; "cuda_id")]
#[test_case("GPU:2", DeviceSpec::Cuda { device_id: 2 }; "gpu_alias")]
fn test_device_spec_parse(input: &str, expected: DeviceSpec) {
    assert_eq!(DeviceSpec::parse(input).unwrap(), expected);
}

#[test_case("TPU"; "unknown_device")]
#[test_case("CUDA:x"; "bad_id")]
#[test_case("SIM:0"; "sim_with_id")]
fn test_device_spec_parse_invalid(input: &str) {
    assert!(matches!(DeviceSpec::parse(input), Err(Error::InvalidDevice { .. })));
}

#[test]
fn test_device_spec_canonicalize() {
    assert_eq!(DeviceSpec::Sim.canonicalize(), "SIM");
    assert_eq!(DeviceSpec::Cuda { device_id: 3 }.canonicalize(), "CUDA:3");
    assert_eq!("cuda:3".parse::<DeviceSpec>().unwrap().to_string(), "CUDA:3");
}

#[test]
fn test_open_sim() {
    let backend = DeviceSpec::Sim.open().unwrap();
    assert_eq!(backend.name(), "SIM");
}

#[cfg(not(feature = "cuda"))]
#[test]
fn test_open_cuda_without_feature() {
    let err = DeviceSpec::Cuda { device_id: 0 }.open().unwrap_err();
    assert!(matches!(err, Error::Unsupported { .. }), "{err}");
}
