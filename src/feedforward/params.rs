//! Training parameters and the closed enumerations selecting algorithms and criteria.

use serde::{Deserialize, Serialize};
use std::convert::TryFrom;

use super::activation::Activation;

/// Weight update algorithm.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrainingAlgorithm {
    /// Backpropagation updating the weights after every pattern.
    Incremental = 0,
    /// Backpropagation updating the weights once per epoch.
    Batch = 1,
    /// iRPROP-: adaptive per-connection step sizes driven by the gradient sign only.
    Rprop = 2,
    /// Fahlman's quickprop.
    Quickprop = 3,
    /// RPROP with weight decay and annealed step noise.
    Sarprop = 4,
}

impl TrainingAlgorithm {
    pub fn code(self) -> u32 {
        self as u32
    }

    /// Whether the algorithm may drive cascade training.
    pub fn is_cascade_capable(self) -> bool {
        matches!(self, TrainingAlgorithm::Rprop | TrainingAlgorithm::Quickprop)
    }
}

impl TryFrom<u32> for TrainingAlgorithm {
    type Error = u32;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(TrainingAlgorithm::Incremental),
            1 => Ok(TrainingAlgorithm::Batch),
            2 => Ok(TrainingAlgorithm::Rprop),
            3 => Ok(TrainingAlgorithm::Quickprop),
            4 => Ok(TrainingAlgorithm::Sarprop),
            _ => Err(code),
        }
    }
}

/// Error function applied to output differences before backpropagation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorFunc {
    /// Plain difference between actual and desired output.
    Linear = 0,
    /// Stretches large differences, leaves small ones almost as they are.
    /// Not recommended for cascade and incremental training.
    Tanh = 1,
}

impl ErrorFunc {
    pub fn code(self) -> u32 {
        self as u32
    }
}

impl TryFrom<u32> for ErrorFunc {
    type Error = u32;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(ErrorFunc::Linear),
            1 => Ok(ErrorFunc::Tanh),
            _ => Err(code),
        }
    }
}

/// Stop criterion of `Trainer::train_for`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StopFunc {
    /// Stop once the mean square error is at or below the desired error.
    Mse = 0,
    /// Stop once the number of failed output bits, counted over the whole dataset,
    /// is at or below the desired error.
    Bit = 1,
}

impl StopFunc {
    pub fn code(self) -> u32 {
        self as u32
    }
}

impl TryFrom<u32> for StopFunc {
    type Error = u32;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(StopFunc::Mse),
            1 => Ok(StopFunc::Bit),
            _ => Err(code),
        }
    }
}

/// Connection pattern of a network.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NetType {
    /// Each layer is only connected to the next one.
    Layer = 0,
    /// Each layer is connected to all following layers.
    Shortcut = 1,
}

impl NetType {
    pub fn code(self) -> u32 {
        self as u32
    }
}

impl TryFrom<u32> for NetType {
    type Error = u32;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(NetType::Layer),
            1 => Ok(NetType::Shortcut),
            _ => Err(code),
        }
    }
}

/// Hyperparameters of the standard trainer.
///
/// Trainers take a snapshot of these values at the start of every call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub algorithm: TrainingAlgorithm,
    /// Used by `Incremental`, `Batch` and `Quickprop`.
    pub learning_rate: f64,
    /// Used by `Incremental` only.
    pub learning_momentum: f64,
    pub error_function: ErrorFunc,
    pub stop_function: StopFunc,
    /// Maximum accepted difference between actual and desired output.
    pub bit_fail_limit: f64,
    /// Small negative factor shrinking weights every quickprop step.
    pub quickprop_decay: f64,
    /// Maximum growth of a quickprop step relative to the previous one.
    pub quickprop_mu: f64,
    pub rprop_increase_factor: f64,
    pub rprop_decrease_factor: f64,
    pub rprop_delta_min: f64,
    pub rprop_delta_max: f64,
    /// Initial RPROP step size.
    pub rprop_delta_zero: f64,
    pub sarprop_weight_decay_shift: f64,
    pub sarprop_step_error_threshold_factor: f64,
    pub sarprop_step_error_shift: f64,
    pub sarprop_temperature: f64,
    /// Seed of the trainer's random generator. `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        TrainingConfig {
            algorithm: TrainingAlgorithm::Rprop,
            learning_rate: 0.7,
            learning_momentum: 0.0,
            error_function: ErrorFunc::Tanh,
            stop_function: StopFunc::Mse,
            bit_fail_limit: 0.35,
            quickprop_decay: -0.0001,
            quickprop_mu: 1.75,
            rprop_increase_factor: 1.2,
            rprop_decrease_factor: 0.5,
            rprop_delta_min: 0.0,
            rprop_delta_max: 50.0,
            rprop_delta_zero: 0.1,
            sarprop_weight_decay_shift: -6.644,
            sarprop_step_error_threshold_factor: 0.1,
            sarprop_step_error_shift: 1.385,
            sarprop_temperature: 0.015,
            seed: None,
        }
    }
}

/// Hyperparameters of candidate generation and of the two cascade training phases.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CascadeConfig {
    /// Fraction by which the output error must improve to postpone stagnation.
    pub output_change_fraction: f64,
    pub output_stagnation_epochs: usize,
    /// Fraction by which the best candidate score must improve to postpone stagnation.
    pub candidate_change_fraction: f64,
    pub candidate_stagnation_epochs: usize,
    /// Scale of candidate weights and of the output weights of an installed candidate.
    /// Candidate weights are drawn from `[-|weight_multiplier|, |weight_multiplier|]`, so it must
    /// be finite.
    pub weight_multiplier: f64,
    /// Caps the candidate count, and the ratio between best score and sum squared error.
    pub candidate_limit: f64,
    pub max_out_epochs: usize,
    pub min_out_epochs: usize,
    pub max_cand_epochs: usize,
    pub min_cand_epochs: usize,
    pub activation_functions: Vec<Activation>,
    pub activation_steepnesses: Vec<f64>,
    /// Number of candidates per (activation function, steepness) pair.
    pub num_candidate_groups: usize,
}

impl CascadeConfig {
    /// Number of candidates trained in every cascade round.
    ///
    /// # Examples
    /// ```
    /// # use ccnnet::feedforward::CascadeConfig;
    /// let config = CascadeConfig::default();
    /// assert_eq!(config.num_candidates(), 80);
    /// ```
    pub fn num_candidates(&self) -> usize {
        let requested = self.num_candidate_groups
            * self.activation_functions.len()
            * self.activation_steepnesses.len();
        let limit = if self.candidate_limit.is_finite() && self.candidate_limit >= 0.0 {
            self.candidate_limit.floor() as usize
        } else {
            usize::MAX
        };
        requested.min(limit)
    }
}

impl Default for CascadeConfig {
    fn default() -> Self {
        CascadeConfig {
            output_change_fraction: 0.01,
            output_stagnation_epochs: 12,
            candidate_change_fraction: 0.01,
            candidate_stagnation_epochs: 12,
            weight_multiplier: 0.4,
            candidate_limit: 1000.0,
            max_out_epochs: 150,
            min_out_epochs: 50,
            max_cand_epochs: 150,
            min_cand_epochs: 50,
            activation_functions: vec![
                Activation::Sigmoid,
                Activation::SigmoidSymmetric,
                Activation::Gaussian,
                Activation::GaussianSymmetric,
                Activation::Elliot,
                Activation::ElliotSymmetric,
                Activation::SinSymmetric,
                Activation::CosSymmetric,
                Activation::Sin,
                Activation::Cos,
            ],
            activation_steepnesses: vec![0.25, 0.5, 0.75, 1.0],
            num_candidate_groups: 2,
        }
    }
}
