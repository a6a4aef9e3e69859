use trebuchet_core::Tensor;

// Shared by several test crates; each one uses a different subset.
#[allow(dead_code)]
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[allow(dead_code)]
pub fn tensor(data: Vec<f32>, shape: Vec<usize>) -> Tensor {
    Tensor::new(data, shape).expect("Test tensor creation failed")
}

#[allow(dead_code)]
pub fn tensor_with_grad(data: Vec<f32>, shape: Vec<usize>) -> Tensor {
    tensor(data, shape).with_requires_grad(true)
}
