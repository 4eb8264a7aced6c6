/// Naive row-major matmul kernel: `c[i*n + j] = sum_p a[i*k + p] * b[p*n + j]`.
///
/// Callers validate slice lengths.
pub fn matmul_f32(a: &[f32], b: &[f32], m: usize, k: usize, n: usize) -> Vec<f32> {
    let mut c = vec![0.0f32; m * n];
    for i in 0..m {
        let row = &a[i * k..(i + 1) * k];
        for j in 0..n {
            let mut sum = 0.0f32;
            for (p, &av) in row.iter().enumerate() {
                sum += av * b[p * n + j];
            }
            c[i * n + j] = sum;
        }
    }
    c
}
