use crate::runtime::error::{RuntimeError, RuntimeResult};

const TAYLOR_TERMS: u32 = 10;

// e^x via a short Taylor series; only accurate for small |x|, which the
// 0.1-scale weight initialization keeps us in.
fn taylor_exp(x: f64) -> f64 {
    let mut result = 0.0;
    let mut term = 1.0;
    for k in 0..TAYLOR_TERMS {
        if k > 0 {
            term *= x / k as f64;
        }
        result += term;
    }
    result
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + taylor_exp(-x))
}

fn sigmoid_deriv(x: f64) -> f64 {
    let s = sigmoid(x);
    s * (1.0 - s)
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn mat_vec(m: &[Vec<f64>], v: &[f64]) -> Vec<f64> {
    m.iter().map(|row| dot(row, v)).collect()
}

/// Feed-forward network with one hidden layer and sigmoid activations.
/// Weights are initialized deterministically with alternating signs, so
/// identical construction and training always reproduce the same model.
#[derive(Clone, Debug)]
pub struct Mlp {
    input_dim: usize,
    hidden_dim: usize,
    output_dim: usize,
    w1: Vec<Vec<f64>>,
    b1: Vec<f64>,
    w2: Vec<Vec<f64>>,
    b2: Vec<f64>,
    last_x: Vec<f64>,
    last_z1: Vec<f64>,
    last_h1: Vec<f64>,
    last_z2: Vec<f64>,
}

impl Mlp {
    pub fn new(input_dim: usize, hidden_dim: usize, output_dim: usize) -> Self {
        let mut w1 = Vec::with_capacity(hidden_dim);
        for h in 0..hidden_dim {
            let mut row = Vec::with_capacity(input_dim);
            for i in 0..input_dim {
                let base = 0.1 * (h + 1 + i + 2) as f64;
                // Alternate signs to break symmetry without randomness.
                row.push(if (h + i) % 2 == 0 { -base } else { base });
            }
            w1.push(row);
        }

        let mut w2 = Vec::with_capacity(output_dim);
        for o in 0..output_dim {
            let mut row = Vec::with_capacity(hidden_dim);
            for h in 0..hidden_dim {
                let base = 0.1 * (o + 3 + h + 1) as f64;
                row.push(if (o + h) % 2 == 1 { -base } else { base });
            }
            w2.push(row);
        }

        Self {
            input_dim,
            hidden_dim,
            output_dim,
            w1,
            b1: vec![0.0; hidden_dim],
            w2,
            b2: vec![0.0; output_dim],
            last_x: Vec::new(),
            last_z1: Vec::new(),
            last_h1: Vec::new(),
            last_z2: Vec::new(),
        }
    }

    pub fn forward(&mut self, x: &[f64]) -> RuntimeResult<Vec<f64>> {
        if x.len() != self.input_dim {
            return Err(RuntimeError::DimensionMismatch {
                message: format!(
                    "expected input of length {}, got {}",
                    self.input_dim,
                    x.len()
                ),
            });
        }

        let mut z1 = mat_vec(&self.w1, x);
        for (z, b) in z1.iter_mut().zip(&self.b1) {
            *z += b;
        }
        let h1: Vec<f64> = z1.iter().map(|z| sigmoid(*z)).collect();

        let mut z2 = mat_vec(&self.w2, &h1);
        for (z, b) in z2.iter_mut().zip(&self.b2) {
            *z += b;
        }
        let out: Vec<f64> = z2.iter().map(|z| sigmoid(*z)).collect();

        self.last_x = x.to_vec();
        self.last_z1 = z1;
        self.last_h1 = h1;
        self.last_z2 = z2;

        Ok(out)
    }

    /// Plain stochastic gradient descent over every (x, y) pair, `epochs`
    /// passes through the dataset. Only a single output unit is supported.
    pub fn train(
        &mut self,
        inputs: &[Vec<f64>],
        labels: &[f64],
        lr: f64,
        epochs: usize,
    ) -> RuntimeResult<()> {
        if self.output_dim != 1 {
            return Err(RuntimeError::DomainError {
                message: "training is only implemented for output_dim = 1".into(),
            });
        }
        if inputs.len() != labels.len() {
            return Err(RuntimeError::DimensionMismatch {
                message: "inputs and labels must have the same length".into(),
            });
        }

        for _ in 0..epochs {
            for (x, y) in inputs.iter().zip(labels) {
                let out = self.forward(x)?;

                let d_z2: Vec<f64> = (0..self.output_dim)
                    .map(|j| (out[j] - y) * sigmoid_deriv(self.last_z2[j]))
                    .collect();

                for j in 0..self.output_dim {
                    for k in 0..self.hidden_dim {
                        self.w2[j][k] -= lr * d_z2[j] * self.last_h1[k];
                    }
                    self.b2[j] -= lr * d_z2[j];
                }

                let d_h1: Vec<f64> = (0..self.hidden_dim)
                    .map(|k| (0..self.output_dim).map(|j| d_z2[j] * self.w2[j][k]).sum())
                    .collect();
                let d_z1: Vec<f64> = (0..self.hidden_dim)
                    .map(|k| d_h1[k] * sigmoid_deriv(self.last_z1[k]))
                    .collect();

                for k in 0..self.hidden_dim {
                    for i in 0..self.input_dim {
                        self.w1[k][i] -= lr * d_z1[k] * self.last_x[i];
                    }
                    self.b1[k] -= lr * d_z1[k];
                }
            }
        }
        Ok(())
    }

    pub fn predict_one(&mut self, x: &[f64]) -> RuntimeResult<f64> {
        let out = self.forward(x)?;
        match out.first() {
            Some(v) => Ok(if *v >= 0.5 { 1.0 } else { 0.0 }),
            None => Err(RuntimeError::DomainError {
                message: "the network has no output units".into(),
            }),
        }
    }

    pub fn predict(&mut self, inputs: &[Vec<f64>]) -> RuntimeResult<Vec<f64>> {
        inputs.iter().map(|x| self.predict_one(x)).collect()
    }

    /// Raw network outputs without thresholding, one row per input.
    pub fn predict_real(&mut self, inputs: &[Vec<f64>]) -> RuntimeResult<Vec<Vec<f64>>> {
        inputs.iter().map(|x| self.forward(x)).collect()
    }
}
