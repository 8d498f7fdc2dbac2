use serde::{Deserialize, Serialize};
use std::convert::TryFrom;

/// Largest magnitude of `steepness * sum` fed into an activation function.
pub(crate) const MAX_SUM: f64 = 150.0;

/// Breakpoints of the stepwise sigmoid approximations.
const STEPWISE_X: [f64; 6] = [
    -2.64665246009826,
    -1.47221459373951,
    -0.549306144334055,
    0.549306144334055,
    1.47221459373951,
    2.64665246009826,
];
const SIGMOID_STEPS: [f64; 6] = [0.005, 0.05, 0.25, 0.75, 0.95, 0.995];
const SIGMOID_SYMMETRIC_STEPS: [f64; 6] = [-0.99, -0.9, -0.5, 0.5, 0.9, 0.99];

/// Activation functions a neuron can use.
///
/// Every function is evaluated on `x = steepness * sum`, where `sum` is the weighted sum
/// of the neuron's inputs. The discriminants are the stable codes used by the file format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Activation {
    /// `x`, unbounded.
    Linear = 0,
    /// `0` for `x < 0`, `1` otherwise. Cannot be trained.
    Threshold = 1,
    /// `-1` for `x < 0`, `1` otherwise. Cannot be trained.
    ThresholdSymmetric = 2,
    /// `1 / (1 + exp(-2x))`, range (0, 1).
    Sigmoid = 3,
    /// Piecewise linear approximation of `Sigmoid`.
    SigmoidStepwise = 4,
    /// `2 / (1 + exp(-2x)) - 1`, range (-1, 1).
    SigmoidSymmetric = 5,
    /// Piecewise linear approximation of `SigmoidSymmetric`.
    SigmoidSymmetricStepwise = 6,
    /// `exp(-x^2)`, range (0, 1].
    Gaussian = 7,
    /// `2 exp(-x^2) - 1`, range (-1, 1].
    GaussianSymmetric = 8,
    /// Evaluated exactly like `Gaussian`.
    GaussianStepwise = 9,
    /// `(x / 2) / (1 + |x|) + 0.5`, range (0, 1).
    Elliot = 10,
    /// `x / (1 + |x|)`, range (-1, 1).
    ElliotSymmetric = 11,
    /// `x` clamped to [0, 1].
    LinearPiece = 12,
    /// `x` clamped to [-1, 1].
    LinearPieceSymmetric = 13,
    /// `sin(x)`, range [-1, 1].
    SinSymmetric = 14,
    /// `cos(x)`, range [-1, 1].
    CosSymmetric = 15,
    /// `sin(x) / 2 + 0.5`, range [0, 1].
    Sin = 16,
    /// `cos(x) / 2 + 0.5`, range [0, 1].
    Cos = 17,
}

impl Activation {
    /// All activation functions, ordered by code.
    pub const ALL: [Activation; 18] = [
        Activation::Linear,
        Activation::Threshold,
        Activation::ThresholdSymmetric,
        Activation::Sigmoid,
        Activation::SigmoidStepwise,
        Activation::SigmoidSymmetric,
        Activation::SigmoidSymmetricStepwise,
        Activation::Gaussian,
        Activation::GaussianSymmetric,
        Activation::GaussianStepwise,
        Activation::Elliot,
        Activation::ElliotSymmetric,
        Activation::LinearPiece,
        Activation::LinearPieceSymmetric,
        Activation::SinSymmetric,
        Activation::CosSymmetric,
        Activation::Sin,
        Activation::Cos,
    ];

    /// Stable integer code of the function.
    pub fn code(self) -> u32 {
        self as u32
    }

    /// Whether the function's range is centered on zero (roughly -1..1).
    ///
    /// Errors of symmetric outputs are halved, so that both kinds of outputs can share
    /// one bit fail limit.
    pub fn is_symmetric(self) -> bool {
        matches!(
            self,
            Activation::ThresholdSymmetric
                | Activation::SigmoidSymmetric
                | Activation::SigmoidSymmetricStepwise
                | Activation::GaussianSymmetric
                | Activation::ElliotSymmetric
                | Activation::LinearPieceSymmetric
                | Activation::SinSymmetric
                | Activation::CosSymmetric
        )
    }

    /// Whether the function has a usable derivative.
    pub fn is_trainable(self) -> bool {
        !matches!(self, Activation::Threshold | Activation::ThresholdSymmetric)
    }

    /// Scales and clamps a raw weighted sum into the argument of the function.
    pub(crate) fn scaled_sum(steepness: f64, sum: f64) -> f64 {
        (steepness * sum).max(-MAX_SUM).min(MAX_SUM)
    }

    /// Evaluates the function.
    ///
    /// # Arguments
    /// * `x` - the steepness-scaled sum (see `Activation::scaled_sum`).
    pub fn eval(self, x: f64) -> f64 {
        match self {
            Activation::Linear => x,
            Activation::Threshold => {
                if x < 0.0 {
                    0.0
                } else {
                    1.0
                }
            }
            Activation::ThresholdSymmetric => {
                if x < 0.0 {
                    -1.0
                } else {
                    1.0
                }
            }
            Activation::Sigmoid => 1.0 / (1.0 + (-2.0 * x).exp()),
            Activation::SigmoidStepwise => stepwise(x, &SIGMOID_STEPS, 0.0, 1.0),
            Activation::SigmoidSymmetric => 2.0 / (1.0 + (-2.0 * x).exp()) - 1.0,
            Activation::SigmoidSymmetricStepwise => {
                stepwise(x, &SIGMOID_SYMMETRIC_STEPS, -1.0, 1.0)
            }
            Activation::Gaussian | Activation::GaussianStepwise => (-x * x).exp(),
            Activation::GaussianSymmetric => 2.0 * (-x * x).exp() - 1.0,
            Activation::Elliot => (x / 2.0) / (1.0 + x.abs()) + 0.5,
            Activation::ElliotSymmetric => x / (1.0 + x.abs()),
            Activation::LinearPiece => x.max(0.0).min(1.0),
            Activation::LinearPieceSymmetric => x.max(-1.0).min(1.0),
            Activation::SinSymmetric => x.sin(),
            Activation::CosSymmetric => x.cos(),
            Activation::Sin => x.sin() / 2.0 + 0.5,
            Activation::Cos => x.cos() / 2.0 + 0.5,
        }
    }

    /// Derivative of the neuron output with respect to its raw weighted sum.
    ///
    /// # Arguments
    /// * `steepness` - neuron steepness;
    /// * `value` - neuron output, as returned by `Activation::eval(x)`;
    /// * `x` - the steepness-scaled sum.
    pub fn derivative(self, steepness: f64, value: f64, x: f64) -> f64 {
        match self {
            Activation::Linear | Activation::LinearPiece | Activation::LinearPieceSymmetric => {
                steepness
            }
            Activation::Threshold | Activation::ThresholdSymmetric => 0.0,
            Activation::Sigmoid | Activation::SigmoidStepwise => {
                // Clipped, so that saturated neurons still learn
                let v = value.max(0.01).min(0.99);
                2.0 * steepness * v * (1.0 - v)
            }
            Activation::SigmoidSymmetric | Activation::SigmoidSymmetricStepwise => {
                let v = value.max(-0.98).min(0.98);
                steepness * (1.0 - v * v)
            }
            Activation::Gaussian | Activation::GaussianStepwise => -2.0 * x * value * steepness,
            Activation::GaussianSymmetric => -2.0 * x * (value + 1.0) * steepness,
            Activation::Elliot => {
                let d = 1.0 + x.abs();
                steepness / (2.0 * d * d)
            }
            Activation::ElliotSymmetric => {
                let d = 1.0 + x.abs();
                steepness / (d * d)
            }
            Activation::SinSymmetric => steepness * x.cos(),
            Activation::CosSymmetric => -steepness * x.sin(),
            Activation::Sin => steepness * x.cos() / 2.0,
            Activation::Cos => -steepness * x.sin() / 2.0,
        }
    }
}

impl TryFrom<u32> for Activation {
    type Error = u32;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        Activation::ALL.get(code as usize).copied().ok_or(code)
    }
}

/// Linear interpolation between the stepwise breakpoints, saturating at `min` and `max`.
fn stepwise(x: f64, steps: &[f64; 6], min: f64, max: f64) -> f64 {
    if x < STEPWISE_X[0] {
        return min;
    }
    for i in 1..STEPWISE_X.len() {
        if x < STEPWISE_X[i] {
            let t = (x - STEPWISE_X[i - 1]) / (STEPWISE_X[i] - STEPWISE_X[i - 1]);
            return steps[i - 1] + t * (steps[i] - steps[i - 1]);
        }
    }
    max
}
