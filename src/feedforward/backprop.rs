//! Error backpropagation and the weight update rules shared by all trainers.
//!
//! Slopes follow the descent sign: a positive slope means the weight should grow.

use rand::Rng;
use std::ops::Range;

use super::net::{Activations, Net};
use super::params::{ErrorFunc, TrainingAlgorithm, TrainingConfig};

/// Weights never leave `[-MAX_WEIGHT, MAX_WEIGHT]` under RPROP, Quickprop and SARPROP.
const MAX_WEIGHT: f64 = 1500.0;
/// Smallest RPROP step a connection can restart from.
const RPROP_MIN_STEP: f64 = 0.0001;
/// Fixed lower step bound of SARPROP.
const SARPROP_DELTA_MIN: f64 = 0.000001;
/// Quickprop treats previous steps inside `(-QUICKPROP_DEAD_ZONE, QUICKPROP_DEAD_ZONE)` as zero.
const QUICKPROP_DEAD_ZONE: f64 = 0.001;

/// Per-connection adaptive state and per-neuron errors of one network, plus the error
/// statistics of the current epoch.
#[derive(Clone, Debug, Default)]
pub(crate) struct GradientState {
    /// Algorithm the arrays were last prepared for; `None` forces a clear.
    pub(crate) algorithm: Option<TrainingAlgorithm>,
    /// Accumulated slopes of the running epoch, parallel to `Net::weights`.
    pub(crate) slopes: Vec<f64>,
    pub(crate) prev_slopes: Vec<f64>,
    /// Previous step of every connection (RPROP step size, quickprop step, momentum delta).
    pub(crate) prev_steps: Vec<f64>,
    /// Error of every neuron for the current pattern, indexed like the neuron arena.
    pub(crate) errors: Vec<f64>,
    pub(crate) sse: f64,
    pub(crate) patterns: usize,
    pub(crate) bit_fail: usize,
}

impl GradientState {
    /// Sizes all arrays for `net` and puts them into their initial state for the
    /// configured algorithm.
    pub(crate) fn clear(&mut self, net: &Net, config: &TrainingConfig) {
        let connections = net.total_connections();
        let initial_step = if config.algorithm == TrainingAlgorithm::Rprop {
            config.rprop_delta_zero
        } else {
            0.0
        };

        self.slopes.clear();
        self.slopes.resize(connections, 0.0);
        self.prev_slopes.clear();
        self.prev_slopes.resize(connections, 0.0);
        self.prev_steps.clear();
        self.prev_steps.resize(connections, initial_step);
        self.errors.clear();
        self.errors.resize(net.total_neurons(), 0.0);
        self.algorithm = Some(config.algorithm);
    }

    /// Clears the arrays if they don't fit `net` or were prepared for another algorithm.
    pub(crate) fn prepare(&mut self, net: &Net, config: &TrainingConfig) {
        if self.algorithm != Some(config.algorithm)
            || self.slopes.len() != net.total_connections()
            || self.errors.len() != net.total_neurons()
        {
            self.clear(net, config);
        }
    }

    pub(crate) fn reset_stats(&mut self) {
        self.sse = 0.0;
        self.patterns = 0;
        self.bit_fail = 0;
    }

    /// Mean square error of the patterns seen since the last `reset_stats`.
    pub(crate) fn mse(&self, num_output: usize) -> f64 {
        if self.patterns == 0 || num_output == 0 {
            0.0
        } else {
            self.sse / (self.patterns * num_output) as f64
        }
    }

    /// Compares the outputs in `activations` with `desired`, updating the error statistics
    /// and storing the error of every output neuron.
    /// Errors of all other neurons are zeroed, ready for `backpropagate`.
    pub(crate) fn compute_output_errors(
        &mut self,
        net: &Net,
        activations: &Activations,
        desired: &[f64],
        config: &TrainingConfig,
    ) {
        let output = net.output_layer();
        for e in &mut self.errors[..output.first] {
            *e = 0.0;
        }

        for (n, &target) in output.neurons().zip(desired) {
            let neuron = &net.neurons[n];
            let value = activations.values[n];
            let mut diff = target - value;
            if neuron.activation.is_symmetric() {
                diff /= 2.0;
            }

            self.sse += diff * diff;
            if diff.abs() > config.bit_fail_limit {
                self.bit_fail += 1;
            }

            if config.error_function == ErrorFunc::Tanh {
                diff = if diff < -0.9999999 {
                    -17.0
                } else if diff > 0.9999999 {
                    17.0
                } else {
                    ((1.0 + diff) / (1.0 - diff)).ln()
                };
            }

            self.errors[n] =
                neuron
                    .activation
                    .derivative(neuron.steepness, value, activations.sums[n])
                    * diff;
        }
        self.patterns += 1;
    }

    /// Propagates output errors back through all hidden layers.
    pub(crate) fn backpropagate(&mut self, net: &Net, activations: &Activations) {
        for l in (2..net.layers.len()).rev() {
            for n in net.layers[l].neurons() {
                let error = self.errors[n];
                for c in net.neurons[n].connections() {
                    self.errors[net.sources[c]] += error * net.weights[c];
                }
            }

            // Layer l - 1 has received everything it will get
            for n in net.layers[l - 1].neurons() {
                let neuron = &net.neurons[n];
                self.errors[n] *= neuron.activation.derivative(
                    neuron.steepness,
                    activations.values[n],
                    activations.sums[n],
                );
            }
        }
    }

    /// Adds the slopes of the current pattern for all connections ending in layers
    /// `first_layer..`.
    pub(crate) fn accumulate_slopes(
        &mut self,
        net: &Net,
        activations: &Activations,
        first_layer: usize,
    ) {
        for layer in &net.layers[first_layer..] {
            for n in layer.neurons() {
                let error = self.errors[n];
                for c in net.neurons[n].connections() {
                    self.slopes[c] += error * activations.values[net.sources[c]];
                }
            }
        }
    }

    /// Applies the current pattern's errors right away, with momentum.
    pub(crate) fn update_incremental(
        &mut self,
        net: &mut Net,
        activations: &Activations,
        first_layer: usize,
        config: &TrainingConfig,
    ) {
        for l in first_layer..net.layers.len() {
            for n in net.layers[l].neurons() {
                let error = config.learning_rate * self.errors[n];
                for c in net.neurons[n].connections() {
                    let delta = error * activations.values[net.sources[c]]
                        + config.learning_momentum * self.prev_steps[c];
                    net.weights[c] += delta;
                    self.prev_steps[c] = delta;
                }
            }
        }
    }

    /// Applies the slopes accumulated over an epoch to the connections in `range`, using
    /// the configured epoch-wise algorithm.
    ///
    /// # Arguments
    /// * `num_data` - number of patterns in the epoch;
    /// * `epoch` - SARPROP annealing counter;
    /// * `mse` - error of the epoch, used by SARPROP.
    pub(crate) fn apply<R: Rng + ?Sized>(
        &mut self,
        net: &mut Net,
        range: Range<usize>,
        config: &TrainingConfig,
        num_data: usize,
        epoch: usize,
        mse: f64,
        rng: &mut R,
    ) {
        let weights = &mut net.weights[range.clone()];
        let slopes = &mut self.slopes[range.clone()];
        let prev_steps = &mut self.prev_steps[range.clone()];
        let prev_slopes = &mut self.prev_slopes[range];

        match config.algorithm {
            // Already applied pattern by pattern
            TrainingAlgorithm::Incremental => {}
            TrainingAlgorithm::Batch => batch(weights, slopes, num_data, config),
            TrainingAlgorithm::Rprop => rprop(weights, slopes, prev_steps, prev_slopes, config),
            TrainingAlgorithm::Quickprop => {
                quickprop(weights, slopes, prev_steps, prev_slopes, num_data, config)
            }
            TrainingAlgorithm::Sarprop => sarprop(
                weights,
                slopes,
                prev_steps,
                prev_slopes,
                config,
                epoch,
                mse,
                rng,
            ),
        }
    }
}

fn clamp_weight(w: f64) -> f64 {
    w.max(-MAX_WEIGHT).min(MAX_WEIGHT)
}

/// Plain gradient descent on the mean slope of an epoch.
pub(crate) fn batch(weights: &mut [f64], slopes: &mut [f64], num_data: usize, config: &TrainingConfig) {
    let epsilon = config.learning_rate / num_data.max(1) as f64;
    for (w, slope) in weights.iter_mut().zip(slopes.iter_mut()) {
        *w += *slope * epsilon;
        *slope = 0.0;
    }
}

/// iRPROP-: steps grow while the slope keeps its sign and shrink on a sign flip, in which
/// case the connection sits out one epoch.
pub(crate) fn rprop(
    weights: &mut [f64],
    slopes: &mut [f64],
    prev_steps: &mut [f64],
    prev_slopes: &mut [f64],
    config: &TrainingConfig,
) {
    for i in 0..weights.len() {
        let prev_step = prev_steps[i].max(RPROP_MIN_STEP);
        let mut slope = slopes[i];

        let next_step = if slope * prev_slopes[i] >= 0.0 {
            (prev_step * config.rprop_increase_factor).min(config.rprop_delta_max)
        } else {
            slope = 0.0;
            (prev_step * config.rprop_decrease_factor).max(config.rprop_delta_min)
        };

        if slope < 0.0 {
            weights[i] = clamp_weight(weights[i] - next_step);
        } else if slope > 0.0 {
            weights[i] = clamp_weight(weights[i] + next_step);
        }

        prev_steps[i] = next_step;
        prev_slopes[i] = slope;
        slopes[i] = 0.0;
    }
}

/// Fahlman's quickprop: jumps towards the minimum of a parabola fitted through the current
/// and previous slope, limited to `mu` times the previous step.
pub(crate) fn quickprop(
    weights: &mut [f64],
    slopes: &mut [f64],
    prev_steps: &mut [f64],
    prev_slopes: &mut [f64],
    num_data: usize,
    config: &TrainingConfig,
) {
    let epsilon = config.learning_rate / num_data.max(1) as f64;
    let mu = config.quickprop_mu;
    let shrink_factor = mu / (1.0 + mu);

    for i in 0..weights.len() {
        let prev_step = prev_steps[i];
        let prev_slope = prev_slopes[i];
        let slope = slopes[i] + config.quickprop_decay * weights[i];
        let mut next_step = 0.0;

        if prev_step > QUICKPROP_DEAD_ZONE {
            if slope > 0.0 {
                next_step += epsilon * slope;
            }
            if slope > shrink_factor * prev_slope {
                next_step += mu * prev_step;
            } else {
                next_step += prev_step * slope / (prev_slope - slope);
            }
        } else if prev_step < -QUICKPROP_DEAD_ZONE {
            if slope < 0.0 {
                next_step += epsilon * slope;
            }
            if slope < shrink_factor * prev_slope {
                next_step += mu * prev_step;
            } else {
                next_step += prev_step * slope / (prev_slope - slope);
            }
        } else {
            next_step += epsilon * slope;
        }

        prev_steps[i] = next_step;
        weights[i] = clamp_weight(weights[i] + next_step);
        prev_slopes[i] = slope;
        slopes[i] = 0.0;
    }
}

/// SARPROP: RPROP with weight decay and noise added to shrinking steps, both annealed
/// by the epoch counter.
pub(crate) fn sarprop<R: Rng + ?Sized>(
    weights: &mut [f64],
    slopes: &mut [f64],
    prev_steps: &mut [f64],
    prev_slopes: &mut [f64],
    config: &TrainingConfig,
    epoch: usize,
    mse: f64,
    rng: &mut R,
) {
    let temperature = -config.sarprop_temperature * epoch as f64;
    let decay = (temperature + config.sarprop_weight_decay_shift).exp2();
    let noise = mse.sqrt() * (temperature + config.sarprop_step_error_shift).exp2();
    let threshold = config.sarprop_step_error_threshold_factor * mse;

    for i in 0..weights.len() {
        let prev_step = prev_steps[i].max(SARPROP_DELTA_MIN);
        // Gradient sign from here on
        let mut slope = -slopes[i] - weights[i] * decay;
        let same_sign = prev_slopes[i] * slope;

        let next_step = if same_sign > 0.0 {
            let step = (prev_step * config.rprop_increase_factor).min(config.rprop_delta_max);
            if slope < 0.0 {
                weights[i] += step;
            } else {
                weights[i] -= step;
            }
            step
        } else if same_sign < 0.0 {
            slope = 0.0;
            if prev_step < threshold {
                prev_step * config.rprop_decrease_factor + rng.gen::<f64>() * noise
            } else {
                (prev_step * config.rprop_decrease_factor).max(SARPROP_DELTA_MIN)
            }
        } else {
            if slope < 0.0 {
                weights[i] += prev_step;
            } else {
                weights[i] -= prev_step;
            }
            prev_step
        };

        weights[i] = clamp_weight(weights[i]);
        prev_steps[i] = next_step;
        prev_slopes[i] = slope;
        slopes[i] = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedforward::Activation;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn linear_net() -> Net {
        let mut net = Net::new(&[1, 1], Some(Box::new([0.5, 0.0]))).unwrap();
        net.set_activation_function_output(Activation::Linear);
        net.set_activation_steepness_output(1.0);
        net
    }

    fn linear_config() -> TrainingConfig {
        TrainingConfig {
            error_function: ErrorFunc::Linear,
            ..TrainingConfig::default()
        }
    }

    #[test]
    fn output_error_and_slopes() {
        let net = linear_net();
        let config = linear_config();
        let mut state = GradientState::default();
        state.clear(&net, &config);

        let mut activations = Activations::new(&net);
        net.propagate(&[2.0], &mut activations).unwrap();
        // output 1.0, desired 3.0
        state.compute_output_errors(&net, &activations, &[3.0], &config);
        state.accumulate_slopes(&net, &activations, 1);

        assert_relative_eq!(state.sse, 4.0);
        assert_eq!(state.bit_fail, 1);
        assert_relative_eq!(state.errors[2], 2.0);
        assert_relative_eq!(state.slopes[0], 4.0);
        assert_relative_eq!(state.slopes[1], 2.0);
        assert_relative_eq!(state.mse(1), 4.0);
    }

    #[test]
    fn exact_match_has_no_bit_fail() {
        let net = linear_net();
        let config = TrainingConfig::default();
        let mut state = GradientState::default();
        state.clear(&net, &config);
        let mut activations = Activations::new(&net);
        net.propagate(&[2.0], &mut activations).unwrap();
        state.compute_output_errors(&net, &activations, &[1.0], &config);
        assert_eq!(state.bit_fail, 0);
        assert_eq!(state.sse, 0.0);
    }

    #[test]
    fn tanh_error_function_remaps_the_difference() {
        let net = linear_net();
        let config = TrainingConfig::default();
        assert_eq!(config.error_function, ErrorFunc::Tanh);
        let mut state = GradientState::default();
        state.clear(&net, &config);
        let mut activations = Activations::new(&net);
        // output 1.0
        net.propagate(&[2.0], &mut activations).unwrap();

        state.compute_output_errors(&net, &activations, &[1.5], &config);
        assert_relative_eq!(state.errors[2], 3.0f64.ln(), epsilon = 1e-12);
        // sse keeps the plain difference
        assert_relative_eq!(state.sse, 0.25);

        state.compute_output_errors(&net, &activations, &[3.0], &config);
        assert_eq!(state.errors[2], 17.0);
        state.compute_output_errors(&net, &activations, &[-1.0], &config);
        assert_eq!(state.errors[2], -17.0);
    }

    #[test]
    fn symmetric_outputs_halve_the_difference() {
        let mut net = linear_net();
        net.set_activation_function_output(Activation::LinearPieceSymmetric);
        let config = linear_config();
        let mut state = GradientState::default();
        state.clear(&net, &config);
        let mut activations = Activations::new(&net);
        // 0.5 * 0.4 = 0.2
        net.propagate(&[0.4], &mut activations).unwrap();
        state.compute_output_errors(&net, &activations, &[-0.6], &config);
        assert_relative_eq!(state.sse, 0.16, epsilon = 1e-12);
        assert_eq!(state.bit_fail, 1);
    }

    #[test]
    fn hidden_errors_follow_weights() {
        let mut net = Net::new(&[1, 1, 1], Some(Box::new([1.0, 0.0, 2.0, 0.0]))).unwrap();
        net.set_activation_function_hidden(Activation::Linear);
        net.set_activation_function_output(Activation::Linear);
        net.set_activation_steepness(1.0, 1, None).unwrap();
        net.set_activation_steepness(1.0, 2, None).unwrap();
        let config = linear_config();
        let mut state = GradientState::default();
        state.clear(&net, &config);

        let mut activations = Activations::new(&net);
        net.propagate(&[1.0], &mut activations).unwrap();
        state.compute_output_errors(&net, &activations, &[3.0], &config);
        state.backpropagate(&net, &activations);
        // output error 1.0, hidden error 1.0 * 2.0
        assert_relative_eq!(state.errors[4], 1.0);
        assert_relative_eq!(state.errors[2], 2.0);
    }

    #[test]
    fn rprop_steps() {
        let config = TrainingConfig::default();
        let mut weights = [0.0, 0.0, 0.0];
        let mut slopes = [1.0, -1.0, 1.0];
        let mut prev_steps = [0.1, 0.1, 0.1];
        let mut prev_slopes = [1.0, 0.0, -1.0];
        rprop(&mut weights, &mut slopes, &mut prev_steps, &mut prev_slopes, &config);

        assert_relative_eq!(weights[0], 0.12);
        assert_relative_eq!(weights[1], -0.12);
        // Sign flip: shrink and stay
        assert_eq!(weights[2], 0.0);
        assert_relative_eq!(prev_steps[2], 0.05);
        assert_eq!(prev_slopes[2], 0.0);
        assert_eq!(slopes, [0.0; 3]);
    }

    #[test]
    fn rprop_clamps_weights() {
        let config = TrainingConfig::default();
        let mut weights = [1499.99];
        rprop(&mut weights, &mut [1.0], &mut [40.0], &mut [1.0], &config);
        assert_eq!(weights[0], MAX_WEIGHT);
    }

    #[test]
    fn quickprop_first_step_is_gradient_descent() {
        let config = TrainingConfig {
            quickprop_decay: 0.0,
            ..TrainingConfig::default()
        };
        let mut weights = [0.0];
        let mut prev_steps = [0.0];
        quickprop(&mut weights, &mut [2.0], &mut prev_steps, &mut [0.0], 4, &config);
        assert_relative_eq!(weights[0], 0.7 / 4.0 * 2.0);
        assert_relative_eq!(prev_steps[0], weights[0]);
    }

    #[test]
    fn sarprop_moves_against_gradient() {
        let config = TrainingConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut weights = [0.0];
        // Positive slope is a negative gradient, so the weight grows
        sarprop(
            &mut weights,
            &mut [1.0],
            &mut [0.1],
            &mut [0.0],
            &config,
            0,
            0.5,
            &mut rng,
        );
        assert_relative_eq!(weights[0], 0.1);
    }
}
