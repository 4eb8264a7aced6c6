//! End-to-end checks of `matrix_product` against a naive reference.

use approx::assert_relative_eq;
use mp_tensor::{matrix_product, Device, DevicePolicy, Placement, Tensor, TensorError};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn reference(a: &[f32], b: &[f32], n: usize) -> Vec<f32> {
    let mut c = vec![0.0f32; n * n];
    for i in 0..n {
        for j in 0..n {
            c[i * n + j] = (0..n).map(|k| a[i * n + k] * b[k * n + j]).sum();
        }
    }
    c
}

#[test]
fn random_products_match_reference() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let device = Device::host();
    for _ in 0..100 {
        let a = Tensor::randn((3, 3), &mut rng);
        let b = Tensor::randn((3, 3), &mut rng);
        let c = matrix_product(&a, &b, &device).unwrap();
        assert_eq!(c.shape().dims(), &[3, 3]);

        let want = reference(&a.to_vec().unwrap(), &b.to_vec().unwrap(), 3);
        for (got, want) in c.to_vec().unwrap().into_iter().zip(want) {
            assert_relative_eq!(got, want, epsilon = 1e-6, max_relative = 1e-5);
        }
    }
}

#[test]
fn identity_leaves_operand_unchanged() {
    let b = Tensor::from_vec(
        vec![2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0],
        (3, 3),
    )
    .unwrap();
    let c = matrix_product(&Tensor::eye(3), &b, &Device::host()).unwrap();
    assert_eq!(c.to_vec().unwrap(), b.to_vec().unwrap());
}

#[test]
fn fallback_policy_always_yields_a_device() {
    let device = Device::select(DevicePolicy::PreferAccelerator).unwrap();
    let c = matrix_product(&Tensor::eye(3), &Tensor::eye(3), &device).unwrap();
    assert_eq!(c.device(), &device);
    assert_eq!(c.to_vec().unwrap(), Tensor::eye(3).to_vec().unwrap());
}

#[cfg(not(any(feature = "cuda", feature = "metal")))]
#[test]
fn missing_accelerator_fails_without_touching_host() {
    let err = Device::select(DevicePolicy::RequireAccelerator).unwrap_err();
    assert!(matches!(err, TensorError::DeviceUnavailable(_)));
    assert!(err.to_string().starts_with("no accelerator device available"));
}

#[cfg(any(feature = "cuda", feature = "metal"))]
#[test]
fn accelerator_round_trip_when_present() {
    let Ok(device) = Device::accelerator() else {
        return;
    };
    let a = Tensor::randn((3, 3), &mut StdRng::seed_from_u64(1));
    let b = Tensor::randn((3, 3), &mut StdRng::seed_from_u64(2));
    let c = matrix_product(&a, &b, &device).unwrap();
    assert_eq!(c.placement(), Placement::Accelerator);
    let tag = format!("device='{}')", device.name());
    assert!(c.render().unwrap().ends_with(&tag));

    let want = reference(&a.to_vec().unwrap(), &b.to_vec().unwrap(), 3);
    for (got, want) in c.to_vec().unwrap().into_iter().zip(want) {
        assert_relative_eq!(got, want, epsilon = 1e-6, max_relative = 1e-5);
    }

    // Mixed placements are rejected rather than silently moved.
    assert!(matches!(
        c.matmul(&Tensor::eye(3)),
        Err(TensorError::DeviceMismatch { .. })
    ));
}

#[test]
fn host_results_are_host_placed() {
    let c = matrix_product(&Tensor::eye(2), &Tensor::eye(2), &Device::host()).unwrap();
    assert_eq!(c.placement(), Placement::Host);
}
