/// Entry point name inside `MATMUL_PTX`.
pub const MATMUL_KERNEL: &str = "matmul_f32";

/// Naive matmul, one thread per output element:
/// `c[row*n + col] = sum_p a[row*k + p] * b[p*n + col]`.
///
/// Parameters: `a`, `b`, `c` (global f32 pointers), then `m`, `k`, `n` (u32).
/// Grid x covers columns, grid y covers rows. JIT-compiled by the driver, so
/// it runs on any device of compute capability 5.0 or newer.
pub const MATMUL_PTX: &str = r#"
.version 6.0
.target sm_50
.address_size 64

.visible .entry matmul_f32(
    .param .u64 matmul_f32_param_0,
    .param .u64 matmul_f32_param_1,
    .param .u64 matmul_f32_param_2,
    .param .u32 matmul_f32_param_3,
    .param .u32 matmul_f32_param_4,
    .param .u32 matmul_f32_param_5
)
{
    .reg .pred %p<4>;
    .reg .b32 %r<16>;
    .reg .f32 %f<4>;
    .reg .b64 %rd<12>;

    ld.param.u64 %rd1, [matmul_f32_param_0];
    ld.param.u64 %rd2, [matmul_f32_param_1];
    ld.param.u64 %rd3, [matmul_f32_param_2];
    ld.param.u32 %r1, [matmul_f32_param_3];
    ld.param.u32 %r2, [matmul_f32_param_4];
    ld.param.u32 %r3, [matmul_f32_param_5];

    mov.u32 %r4, %ctaid.x;
    mov.u32 %r5, %ntid.x;
    mov.u32 %r6, %tid.x;
    mad.lo.s32 %r7, %r4, %r5, %r6;
    mov.u32 %r4, %ctaid.y;
    mov.u32 %r5, %ntid.y;
    mov.u32 %r6, %tid.y;
    mad.lo.s32 %r8, %r4, %r5, %r6;

    setp.ge.u32 %p1, %r8, %r1;
    setp.ge.u32 %p2, %r7, %r3;
    or.pred %p3, %p1, %p2;
    @%p3 bra DONE;

    cvta.to.global.u64 %rd4, %rd1;
    cvta.to.global.u64 %rd5, %rd2;
    cvta.to.global.u64 %rd6, %rd3;

    mov.f32 %f1, 0f00000000;
    mul.lo.s32 %r9, %r8, %r2;
    mov.u32 %r10, %r7;
    mov.u32 %r11, 0;
LOOP:
    setp.ge.u32 %p1, %r11, %r2;
    @%p1 bra STORE;
    mul.wide.u32 %rd7, %r9, 4;
    add.s64 %rd8, %rd4, %rd7;
    ld.global.f32 %f2, [%rd8];
    mul.wide.u32 %rd9, %r10, 4;
    add.s64 %rd10, %rd5, %rd9;
    ld.global.f32 %f3, [%rd10];
    fma.rn.f32 %f1, %f2, %f3, %f1;
    add.s32 %r9, %r9, 1;
    add.s32 %r10, %r10, %r3;
    add.s32 %r11, %r11, 1;
    bra LOOP;
STORE:
    mad.lo.s32 %r12, %r8, %r3, %r7;
    mul.wide.u32 %rd11, %r12, 4;
    add.s64 %rd11, %rd6, %rd11;
    st.global.f32 [%rd11], %f1;
DONE:
    ret;
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ptx_declares_kernel() {
        assert!(MATMUL_PTX.contains(&format!(".visible .entry {}(", MATMUL_KERNEL)));
        assert_eq!(MATMUL_PTX.matches(".param .u64").count(), 3);
        assert_eq!(MATMUL_PTX.matches(".param .u32").count(), 3);
    }
}
