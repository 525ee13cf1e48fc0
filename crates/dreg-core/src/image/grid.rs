use burn::tensor::backend::Backend;
use burn::tensor::{Shape, Tensor, TensorData};

/// Generate the voxel indices of a grid as a `[N, D]` tensor.
///
/// `shape` is in NumPy order (slowest axis first) and rows follow the same
/// C order, so row `n` addresses the `n`-th element of a flattened buffer of
/// that shape. Each row holds the ITK-order index (fastest axis first) plus
/// `offset`, which is also in ITK order.
pub fn generate_grid<B, const D: usize>(
    shape: [usize; D],
    offset: [i64; D],
    device: &B::Device,
) -> Tensor<B, 2>
where
    B: Backend,
{
    let total: usize = shape.iter().product();
    let mut grid = Vec::with_capacity(total * D);
    let mut counter = [0usize; D];
    for _ in 0..total {
        // counter is in NumPy order; emit reversed
        for k in 0..D {
            grid.push((counter[D - 1 - k] as i64 + offset[k]) as f32);
        }
        for axis in (0..D).rev() {
            counter[axis] += 1;
            if counter[axis] < shape[axis] {
                break;
            }
            counter[axis] = 0;
        }
    }

    Tensor::<B, 1>::from_data(TensorData::new(grid, Shape::new([total * D])), device)
        .reshape([total, D])
}
