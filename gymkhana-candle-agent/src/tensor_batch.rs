use candle_core::{Device, IndexOp, Tensor};
use gymkhana_core::generic_replay_buffer::BatchBase;

/// A replay-buffer storage column backed by a [`Tensor`].
///
/// The first tensor dimension indexes the stored transitions; the
/// remaining dimensions are taken from the first pushed batch.
///
/// [`Tensor`]: https://docs.rs/candle-core/0.8.4/candle_core/struct.Tensor.html
#[derive(Clone, Debug)]
pub struct TensorBatch {
    buf: Option<Tensor>,
    capacity: usize,
}

impl TensorBatch {
    /// Wraps a tensor whose first dimension is the batch dimension.
    pub fn from_tensor(t: Tensor) -> Self {
        let capacity = t.dims()[0];
        Self {
            buf: Some(t),
            capacity,
        }
    }
}

impl BatchBase for TensorBatch {
    fn new(capacity: usize) -> Self {
        Self {
            buf: None,
            capacity,
        }
    }

    /// Pushes the given data at `index`, wrapping around at the capacity.
    ///
    /// If the internal buffer is empty, it is initialized with the shape
    /// `[capacity, data.dims()[1..]]`.
    fn push(&mut self, index: usize, data: Self) {
        if data.buf.is_none() {
            return;
        }

        let batch_size = data.buf.as_ref().unwrap().dims()[0];
        if batch_size == 0 {
            return;
        }

        if self.buf.is_none() {
            let mut shape = data.buf.as_ref().unwrap().dims().to_vec();
            shape[0] = self.capacity;
            let dtype = data.buf.as_ref().unwrap().dtype();
            self.buf = Some(Tensor::zeros(shape, dtype, &Device::Cpu).unwrap());
        }

        if index + batch_size > self.capacity {
            let batch_size = self.capacity - index;
            let data = &data.buf.unwrap();
            let data1 = data.i((..batch_size,)).unwrap();
            let data2 = data.i((batch_size..,)).unwrap();
            self.buf
                .as_mut()
                .unwrap()
                .slice_set(&data1, 0, index)
                .unwrap();
            self.buf.as_mut().unwrap().slice_set(&data2, 0, 0).unwrap();
        } else {
            self.buf
                .as_mut()
                .unwrap()
                .slice_set(&data.buf.unwrap(), 0, index)
                .unwrap();
        }
    }

    fn sample(&self, ixs: &[usize]) -> Self {
        let capacity = ixs.len();
        let ixs = {
            let device = self.buf.as_ref().unwrap().device();
            let ixs = ixs.iter().map(|x| *x as u32).collect();
            Tensor::from_vec(ixs, capacity, device).unwrap()
        };
        let buf = Some(self.buf.as_ref().unwrap().index_select(&ixs, 0).unwrap());
        Self { buf, capacity }
    }
}

impl From<TensorBatch> for Tensor {
    fn from(b: TensorBatch) -> Self {
        b.buf.unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_wraps_around_at_capacity() {
        let mut batch = TensorBatch::new(4);
        for i in 0..6i64 {
            let t = Tensor::from_vec(vec![i], (1, 1), &Device::Cpu).unwrap();
            batch.push(i as usize % 4, TensorBatch::from_tensor(t));
        }
        let sampled: Tensor = batch.sample(&[0, 1, 2, 3]).into();
        let values = sampled.squeeze(1).unwrap().to_vec1::<i64>().unwrap();
        assert_eq!(values, vec![4, 5, 2, 3]);
    }

    #[test]
    fn sample_picks_the_given_rows() {
        let mut batch = TensorBatch::new(3);
        let t = Tensor::from_vec(vec![10i64, 20, 30], (3, 1), &Device::Cpu).unwrap();
        batch.push(0, TensorBatch::from_tensor(t));
        let sampled: Tensor = batch.sample(&[2, 0]).into();
        let values = sampled.squeeze(1).unwrap().to_vec1::<i64>().unwrap();
        assert_eq!(values, vec![30, 10]);
    }
}
