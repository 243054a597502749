//! Integration tests for CPU runtime
//!
//! These tests verify the public API of the CPU runtime implementation.

mod common;

use common::*;
use tsvd::dtype::DType;
use tsvd::matrix::DeviceMatrix;
use tsvd::ops::{MatrixOps, SymmetricEigen, Transpose};
use tsvd::runtime::cpu::{CpuDevice, CpuRuntime};
use tsvd::runtime::{Device, Runtime, RuntimeClient};

#[test]
fn test_allocate_deallocate() {
    let device = CpuDevice::new();
    let ptr = CpuRuntime::allocate(1024, &device).unwrap();
    assert_ne!(ptr, 0);
    CpuRuntime::deallocate(ptr, 1024, &device);
}

#[test]
fn test_copy_roundtrip() {
    let device = CpuDevice::new();
    let data: Vec<u8> = vec![1, 2, 3, 4, 5, 6, 7, 8];

    let ptr = CpuRuntime::allocate(data.len(), &device).unwrap();
    CpuRuntime::copy_to_device(&data, ptr, &device).unwrap();

    let mut result = vec![0u8; data.len()];
    CpuRuntime::copy_from_device(ptr, &mut result, &device).unwrap();

    assert_eq!(data, result);

    CpuRuntime::deallocate(ptr, data.len(), &device);
}

#[test]
fn test_copy_within_device_and_zero_fill() {
    let device = CpuDevice::new();
    let data: Vec<u8> = vec![1, 2, 3, 4, 5, 6, 7, 8];

    let src = CpuRuntime::allocate(data.len(), &device).unwrap();
    let dst = CpuRuntime::allocate(data.len(), &device).unwrap();

    CpuRuntime::copy_to_device(&data, src, &device).unwrap();
    CpuRuntime::copy_within_device(src, dst, data.len(), &device).unwrap();
    CpuRuntime::zero_fill(dst + 6, 2, &device).unwrap();

    let mut result = vec![0u8; data.len()];
    CpuRuntime::copy_from_device(dst, &mut result, &device).unwrap();

    assert_eq!(result, vec![1, 2, 3, 4, 5, 6, 0, 0]);

    CpuRuntime::deallocate(src, data.len(), &device);
    CpuRuntime::deallocate(dst, data.len(), &device);
}

#[test]
fn test_zero_allocation() {
    let device = CpuDevice::new();
    let ptr = CpuRuntime::allocate(0, &device).unwrap();
    assert_eq!(ptr, 0);
    CpuRuntime::deallocate(ptr, 0, &device); // Should not panic
}

#[test]
fn test_client_and_device() {
    let (client, device) = create_cpu_client();
    assert_eq!(client.device().id(), device.id());
    assert!(client.device().is_same(&device));
    assert_eq!(CpuDevice::new(), device);
    assert_eq!(device.name(), "cpu");
    assert_eq!(CpuRuntime::name(), "cpu");
    client.synchronize().unwrap();
}

#[test]
fn test_matrix_row_helpers() {
    let device = CpuDevice::new();
    let m = cpu_matrix(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 3, 2);

    assert_eq!(m.row(1).unwrap().to_vec::<f64>().unwrap(), vec![3.0, 4.0]);
    assert_eq!(m.leading_rows(2).unwrap().shape(), [2, 2]);

    let mut copy = m.try_clone().unwrap();
    copy.zero_rows_from(1).unwrap();
    assert_eq!(copy.to_vec::<f64>().unwrap(), vec![1.0, 2.0, 0.0, 0.0, 0.0, 0.0]);
    // The original is untouched
    assert_eq!(m.to_vec::<f64>().unwrap()[2], 3.0);

    let v = DeviceMatrix::<CpuRuntime>::from_slice(&[9.0f64, 8.0], 2, 1, &device).unwrap();
    copy.copy_row_from(2, &v).unwrap();
    assert_eq!(copy.to_vec::<f64>().unwrap()[4..], [9.0, 8.0]);
    assert!(copy.copy_row_from(3, &v).is_err());
}

#[test]
fn test_dtype_mismatch_is_reported() {
    let (client, device) = create_cpu_client();
    let a = DeviceMatrix::<CpuRuntime>::zeros(2, 2, DType::F64, &device).unwrap();
    let b = DeviceMatrix::<CpuRuntime>::zeros(2, 2, DType::F32, &device).unwrap();
    assert!(client.matmul(&a, Transpose::No, &b, Transpose::No).is_err());

    let c = client.cast(&b, DType::F64).unwrap();
    assert_eq!(c.dtype(), DType::F64);
    assert!(client.matmul(&a, Transpose::No, &c, Transpose::No).is_ok());
}

#[test]
fn test_eigh_matches_known_spectrum() {
    let (client, _device) = create_cpu_client();
    let a = cpu_matrix(&[2.0, 1.0, 1.0, 2.0], 2, 2);
    let eig = client.eigh(&a).unwrap();
    assert_allclose_f64(&eig.values, &[3.0, 1.0], 1e-12, 1e-12, "eigenvalues");

    let v0 = eig.vectors.row(0).unwrap().to_vec::<f64>().unwrap();
    assert!(abs_cosine(&v0, &[1.0, 1.0]) > 1.0 - 1e-12);
}
