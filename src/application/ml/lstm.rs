//! Single-layer LSTM with a linear read-out, trained by full backpropagation
//! through time and Adam.
//!
//! Gate blocks are stacked in `w_x`, `w_h` and `b` in the order
//! input, forget, cell candidate, output.

use ndarray::{Array, Array1, Array2, ArrayView1, ArrayView2, Axis, Dimension, Zip, s};
use rand::Rng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LstmNetwork {
    input_size: usize,
    hidden_size: usize,
    output_size: usize,
    w_x: Array2<f64>,
    w_h: Array2<f64>,
    b: Array1<f64>,
    w_out: Array2<f64>,
    b_out: Array1<f64>,
}

/// One training example: the window starting at `start` and its label.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSample {
    pub start: usize,
    pub target: Vec<f64>,
}

/// Optimisation settings for [`LstmNetwork::fit_windows`].
#[derive(Debug, Clone, Copy)]
pub struct TrainingSchedule {
    pub window: usize,
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub clip_norm: f64,
}

struct StepCache {
    h_prev: Array1<f64>,
    c_prev: Array1<f64>,
    i: Array1<f64>,
    f: Array1<f64>,
    g: Array1<f64>,
    o: Array1<f64>,
    c: Array1<f64>,
}

struct Gradients {
    w_x: Array2<f64>,
    w_h: Array2<f64>,
    b: Array1<f64>,
    w_out: Array2<f64>,
    b_out: Array1<f64>,
}

impl Gradients {
    fn zeros_like(net: &LstmNetwork) -> Self {
        Self {
            w_x: Array2::zeros(net.w_x.raw_dim()),
            w_h: Array2::zeros(net.w_h.raw_dim()),
            b: Array1::zeros(net.b.raw_dim()),
            w_out: Array2::zeros(net.w_out.raw_dim()),
            b_out: Array1::zeros(net.b_out.raw_dim()),
        }
    }

    fn squared_norm(&self) -> f64 {
        let sq = |a: f64, v: &f64| a + v * v;
        self.w_x.fold(0.0, sq)
            + self.w_h.fold(0.0, sq)
            + self.b.fold(0.0, sq)
            + self.w_out.fold(0.0, sq)
            + self.b_out.fold(0.0, sq)
    }

    fn scale(&mut self, factor: f64) {
        self.w_x *= factor;
        self.w_h *= factor;
        self.b *= factor;
        self.w_out *= factor;
        self.b_out *= factor;
    }
}

struct Adam {
    m: Gradients,
    v: Gradients,
    step: i32,
    learning_rate: f64,
}

const BETA1: f64 = 0.9;
const BETA2: f64 = 0.999;
const EPSILON: f64 = 1e-8;

impl Adam {
    fn new(net: &LstmNetwork, learning_rate: f64) -> Self {
        Self {
            m: Gradients::zeros_like(net),
            v: Gradients::zeros_like(net),
            step: 0,
            learning_rate,
        }
    }

    fn apply(&mut self, net: &mut LstmNetwork, grads: &Gradients) {
        self.step += 1;
        let lr_t = self.learning_rate * (1.0 - BETA2.powi(self.step)).sqrt()
            / (1.0 - BETA1.powi(self.step));

        adam_update(&mut net.w_x, &grads.w_x, &mut self.m.w_x, &mut self.v.w_x, lr_t);
        adam_update(&mut net.w_h, &grads.w_h, &mut self.m.w_h, &mut self.v.w_h, lr_t);
        adam_update(&mut net.b, &grads.b, &mut self.m.b, &mut self.v.b, lr_t);
        adam_update(&mut net.w_out, &grads.w_out, &mut self.m.w_out, &mut self.v.w_out, lr_t);
        adam_update(&mut net.b_out, &grads.b_out, &mut self.m.b_out, &mut self.v.b_out, lr_t);
    }
}

fn adam_update<D: Dimension>(
    param: &mut Array<f64, D>,
    grad: &Array<f64, D>,
    m: &mut Array<f64, D>,
    v: &mut Array<f64, D>,
    lr_t: f64,
) {
    Zip::from(param)
        .and(grad)
        .and(m)
        .and(v)
        .for_each(|p, &g, m, v| {
            *m = BETA1 * *m + (1.0 - BETA1) * g;
            *v = BETA2 * *v + (1.0 - BETA2) * g * g;
            *p -= lr_t * *m / (v.sqrt() + EPSILON);
        });
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn outer(a: &Array1<f64>, b: ArrayView1<f64>) -> Array2<f64> {
    a.view()
        .insert_axis(Axis(1))
        .dot(&b.insert_axis(Axis(0)))
}

impl LstmNetwork {
    /// Uniform(±1/√hidden) weights, zero biases except the forget gate at 1.
    pub fn new(input_size: usize, hidden_size: usize, output_size: usize, rng: &mut StdRng) -> Self {
        let limit = 1.0 / (hidden_size.max(1) as f64).sqrt();
        let mut uniform = |rows: usize, cols: usize| {
            Array2::from_shape_fn((rows, cols), |_| rng.random_range(-limit..limit))
        };

        let w_x = uniform(4 * hidden_size, input_size);
        let w_h = uniform(4 * hidden_size, hidden_size);
        let w_out = uniform(output_size, hidden_size);

        let mut b = Array1::zeros(4 * hidden_size);
        b.slice_mut(s![hidden_size..2 * hidden_size]).fill(1.0);

        Self {
            input_size,
            hidden_size,
            output_size,
            w_x,
            w_h,
            b,
            w_out,
            b_out: Array1::zeros(output_size),
        }
    }

    pub fn input_size(&self) -> usize {
        self.input_size
    }

    pub fn output_size(&self) -> usize {
        self.output_size
    }

    /// Runs the window (time × features) through the network.
    pub fn predict(&self, window: ArrayView2<f64>) -> Array1<f64> {
        self.forward(window).0
    }

    fn forward(&self, window: ArrayView2<f64>) -> (Array1<f64>, Vec<StepCache>) {
        let n = self.hidden_size;
        let mut h = Array1::zeros(n);
        let mut c = Array1::zeros(n);
        let mut caches = Vec::with_capacity(window.nrows());

        for x_t in window.rows() {
            let z = self.w_x.dot(&x_t) + self.w_h.dot(&h) + &self.b;
            let i = z.slice(s![0..n]).mapv(sigmoid);
            let f = z.slice(s![n..2 * n]).mapv(sigmoid);
            let g = z.slice(s![2 * n..3 * n]).mapv(f64::tanh);
            let o = z.slice(s![3 * n..4 * n]).mapv(sigmoid);

            let c_next = &f * &c + &i * &g;
            let h_next = &o * &c_next.mapv(f64::tanh);

            caches.push(StepCache {
                h_prev: std::mem::replace(&mut h, h_next),
                c_prev: std::mem::replace(&mut c, c_next.clone()),
                i,
                f,
                g,
                o,
                c: c_next,
            });
        }

        let output = self.w_out.dot(&h) + &self.b_out;
        (output, caches)
    }

    /// Accumulates the MSE gradient of one sample into `grads`; returns its loss.
    fn backward(
        &self,
        window: ArrayView2<f64>,
        target: ArrayView1<f64>,
        grads: &mut Gradients,
    ) -> f64 {
        let n = self.hidden_size;
        let (output, caches) = self.forward(window);

        let err = &output - &target;
        let loss = err.mapv(|e| e * e).mean().unwrap_or(0.0);
        let dy = err * (2.0 / self.output_size as f64);

        let h_last = match caches.last() {
            Some(step) => &step.o * &step.c.mapv(f64::tanh),
            None => Array1::zeros(n),
        };
        grads.w_out += &outer(&dy, h_last.view());
        grads.b_out += &dy;

        let mut dh = self.w_out.t().dot(&dy);
        let mut dc: Array1<f64> = Array1::zeros(n);

        for (t, step) in caches.iter().enumerate().rev() {
            let tanh_c = step.c.mapv(f64::tanh);
            let d_o = &dh * &tanh_c;
            dc = dc + &dh * &step.o * &tanh_c.mapv(|v| 1.0 - v * v);

            let d_i = &dc * &step.g;
            let d_f = &dc * &step.c_prev;
            let d_g = &dc * &step.i;

            let mut dz = Array1::zeros(4 * n);
            dz.slice_mut(s![0..n])
                .assign(&(d_i * &step.i.mapv(|v| v * (1.0 - v))));
            dz.slice_mut(s![n..2 * n])
                .assign(&(d_f * &step.f.mapv(|v| v * (1.0 - v))));
            dz.slice_mut(s![2 * n..3 * n])
                .assign(&(d_g * &step.g.mapv(|v| 1.0 - v * v)));
            dz.slice_mut(s![3 * n..4 * n])
                .assign(&(d_o * &step.o.mapv(|v| v * (1.0 - v))));

            grads.w_x += &outer(&dz, window.row(t));
            grads.w_h += &outer(&dz, step.h_prev.view());
            grads.b += &dz;

            dh = self.w_h.t().dot(&dz);
            dc = dc * &step.f;
        }

        loss
    }

    /// Mini-batch training over windows of `matrix` (rows × features).
    /// Sample order is reshuffled each epoch from `rng`. Returns the mean loss
    /// of every epoch.
    pub fn fit_windows(
        &mut self,
        matrix: &Array2<f64>,
        samples: &[WindowSample],
        schedule: &TrainingSchedule,
        rng: &mut StdRng,
    ) -> Vec<f64> {
        let mut adam = Adam::new(self, schedule.learning_rate);
        let mut order: Vec<usize> = (0..samples.len()).collect();
        let mut history = Vec::with_capacity(schedule.epochs);
        let batch_size = schedule.batch_size.max(1);

        for epoch in 0..schedule.epochs {
            order.shuffle(rng);
            let mut epoch_loss = 0.0;

            for batch in order.chunks(batch_size) {
                let mut grads = Gradients::zeros_like(self);
                for &idx in batch {
                    let sample = &samples[idx];
                    let window = matrix.slice(s![sample.start..sample.start + schedule.window, ..]);
                    epoch_loss += self.backward(window, ArrayView1::from(&sample.target[..]), &mut grads);
                }

                grads.scale(1.0 / batch.len() as f64);
                let norm = grads.squared_norm().sqrt();
                if schedule.clip_norm > 0.0 && norm > schedule.clip_norm {
                    grads.scale(schedule.clip_norm / norm);
                }
                adam.apply(self, &grads);
            }

            let mean_loss = epoch_loss / samples.len().max(1) as f64;
            debug!("Sequence epoch {}/{} loss {:.6}", epoch + 1, schedule.epochs, mean_loss);
            history.push(mean_loss);
        }

        history
    }
}
