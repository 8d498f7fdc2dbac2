use log::{debug, info, warn};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::error::Error as StdError;
use thiserror::Error;

use super::activation::Activation;
use super::backprop::GradientState;
use super::data::TrainData;
use super::net::{Activations, Net, NetError, SizeMismatch};
use super::params::{StopFunc, TrainingAlgorithm, TrainingConfig};

/// Progress snapshot handed to the report callback.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Report {
    /// Epoch (or, for cascade training, installed neuron count) the report belongs to.
    pub epoch: usize,
    pub mse: f64,
    pub bit_fail: usize,
    pub hidden_neurons: usize,
}

/// Observer of training progress. Errors it returns are logged and otherwise ignored.
pub type ReportCallback = Box<dyn FnMut(&Report) -> Result<(), Box<dyn StdError>>>;

/// Outcome of `Trainer::train_for`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrainSummary {
    /// Number of epochs run.
    pub epochs: usize,
    /// Error of the last epoch.
    pub mse: f64,
    pub bit_fail: usize,
    /// Whether the desired error was reached.
    pub reached: bool,
}

/// Net trainer structure.
///
/// To train Net, additional buffers are needed. We will contain them in this structure.
/// Training procedure will look like this:
/// * One allocates additional buffers by calling `Net::build_trainer` (or `Trainer::new`),
/// which will consume `Net` and return `Trainer` object.
/// (Consuming `Net` is needed to prevent one from building another concurrent `Trainer`s.)
/// * Training data is processed via `Trainer::train` (one epoch) or `Trainer::train_for`.
/// At any time one can call `Trainer::net_ref` to get access to `Net::run`.
/// * Error estimation without training is possible via `Trainer::test`.
/// * Once finished training, one can use `Trainer::teardown` to free all the additional
/// buffers and get `Net` object back.
pub struct Trainer {
    /// The network object trainer posesses.
    pub(crate) net: Net,

    pub(crate) config: TrainingConfig,

    /// Sums and outputs of all neurons for the pattern being trained on.
    pub(crate) activations: Activations,

    /// Slopes, adaptive steps and neuron errors.
    pub(crate) gradient: GradientState,

    /// Source of SARPROP noise.
    pub(crate) rng: ChaCha8Rng,

    /// Number of epoch-wise weight updates so far, SARPROP anneals with it.
    pub(crate) epoch: usize,

    mse: f64,
    bit_fail: usize,
    report_callback: Option<ReportCallback>,
}

impl Trainer {
    /// Consumes `Net` and builds `Trainer` object containing it.
    ///
    /// # Examples
    /// ```
    /// # use ccnnet::feedforward::{Net, Trainer, TrainingAlgorithm, TrainingConfig};
    /// let config = TrainingConfig {
    ///     algorithm: TrainingAlgorithm::Quickprop,
    ///     ..TrainingConfig::default()
    /// };
    /// let trainer = Trainer::new(Net::new(&[2, 3, 1], None).unwrap(), config);
    /// assert_eq!(trainer.config().algorithm, TrainingAlgorithm::Quickprop);
    /// ```
    pub fn new(net: Net, config: TrainingConfig) -> Trainer {
        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        let mut gradient = GradientState::default();
        gradient.clear(&net, &config);

        Trainer {
            activations: Activations::new(&net),
            net,
            config,
            gradient,
            rng,
            epoch: 0,
            mse: 0.0,
            bit_fail: 0,
            report_callback: None,
        }
    }

    /// Returns reference to contained `Net`, allowing the use of `Net::run`.
    pub fn net_ref(&self) -> &Net {
        &self.net
    }

    /// Returns mutable reference to contained `Net`.
    /// Changing the topology is not possible through it, so the training buffers stay valid.
    pub fn net_mut(&mut self) -> &mut Net {
        &mut self.net
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Gives access to the parameters. A changed algorithm resets the adaptive state before
    /// the next epoch.
    pub fn config_mut(&mut self) -> &mut TrainingConfig {
        &mut self.config
    }

    pub fn set_config(&mut self, config: TrainingConfig) {
        self.config = config;
    }

    /// Installs the observer of `Trainer::train_for` reports.
    /// Without one, reports are logged at info level.
    pub fn set_report_callback(&mut self, callback: ReportCallback) {
        self.report_callback = Some(callback);
    }

    /// Mean square error of the last epoch or test.
    pub fn mse(&self) -> f64 {
        self.mse
    }

    /// Number of failed output bits in the last epoch or test.
    pub fn bit_fail(&self) -> usize {
        self.bit_fail
    }

    /// Frees training buffers, consuming `Trainer` object, and returns contained `Net` back.
    pub fn teardown(self) -> Net {
        self.net
    }

    /// Checks that `data` fits the network and that every neuron can be trained.
    pub(crate) fn check(&self, data: &TrainData) -> Result<(), TrainError> {
        data.check_fits(&self.net)
            .map_err(TrainError::DimensionMismatch)?;
        for layer in &self.net.layers[1..] {
            for n in layer.neurons() {
                let activation = self.net.neurons[n].activation;
                if !activation.is_trainable() {
                    return Err(TrainError::UntrainableActivation(activation));
                }
            }
        }
        Ok(())
    }

    /// Forgets slopes and adaptive steps.
    pub(crate) fn clear_training(&mut self) {
        self.gradient.clear(&self.net, &self.config);
    }

    /// Fits the buffers to the network after its topology changed.
    pub(crate) fn refit(&mut self) {
        self.activations.fit(&self.net);
        self.gradient.clear(&self.net, &self.config);
    }

    /// Runs one epoch over `data`, updating the connections that end in layers
    /// `first_layer..` only. `data` must have been checked.
    ///
    /// # Returns
    /// * The mean square error, accumulated while training.
    pub(crate) fn epoch_from_layer(
        &mut self,
        data: &TrainData,
        first_layer: usize,
    ) -> Result<f64, TrainError> {
        self.gradient.prepare(&self.net, &self.config);
        self.gradient.reset_stats();
        let algorithm = self.config.algorithm;
        let output_layer = self.net.layers.len() - 1;

        for (inputs, desired) in data.iter() {
            self.net.propagate(inputs, &mut self.activations)?;
            self.gradient
                .compute_output_errors(&self.net, &self.activations, desired, &self.config);
            if first_layer < output_layer {
                self.gradient.backpropagate(&self.net, &self.activations);
            }
            if algorithm == TrainingAlgorithm::Incremental {
                self.gradient.update_incremental(
                    &mut self.net,
                    &self.activations,
                    first_layer,
                    &self.config,
                );
            } else {
                self.gradient
                    .accumulate_slopes(&self.net, &self.activations, first_layer);
            }
        }

        let mse = self.gradient.mse(self.net.num_output());
        if algorithm != TrainingAlgorithm::Incremental {
            let first_con = self.net.neurons[self.net.layers[first_layer].first].first_con;
            let range = first_con..self.net.total_connections();
            self.gradient.apply(
                &mut self.net,
                range,
                &self.config,
                data.len(),
                self.epoch,
                mse,
                &mut self.rng,
            );
            self.epoch += 1;
        }

        self.mse = mse;
        self.bit_fail = self.gradient.bit_fail;
        Ok(mse)
    }

    /// Whether the last computed error satisfies the stop criterion.
    pub(crate) fn desired_reached(&self, desired_error: f64) -> bool {
        match self.config.stop_function {
            StopFunc::Mse => self.mse <= desired_error,
            StopFunc::Bit => self.bit_fail as f64 <= desired_error,
        }
    }

    /// Hands `report` to the callback, or logs it if there is none.
    pub(crate) fn report(&mut self, report: &Report) {
        match self.report_callback.as_mut() {
            Some(callback) => {
                if let Err(e) = callback(report) {
                    warn!("Report callback failed at epoch {}: {}", report.epoch, e);
                }
            }
            None => info!(
                "Epochs {:8}. Current error: {:.10}. Bit fail {}.",
                report.epoch, report.mse, report.bit_fail
            ),
        }
    }

    /// Trains one epoch over the whole dataset.
    ///
    /// # Returns
    /// * The mean square error of the epoch, accumulated while training.
    ///
    /// # Examples
    /// ```
    /// # use ccnnet::feedforward::{Net, TrainData};
    /// let data = TrainData::from_pairs(vec![
    ///     (vec![0.0, 0.0], vec![0.0]),
    ///     (vec![1.0, 1.0], vec![1.0]),
    /// ])
    /// .unwrap();
    /// let mut trainer = Net::new(&[2, 3, 1], None).unwrap().build_trainer();
    /// let mse = trainer.train(&data).unwrap();
    /// assert_eq!(mse, trainer.mse());
    /// ```
    pub fn train(&mut self, data: &TrainData) -> Result<f64, TrainError> {
        self.check(data)?;
        self.epoch_from_layer(data, 1)
    }

    /// Trains until the stop criterion reaches `desired_error` or `max_epochs` epochs pass.
    ///
    /// # Arguments
    /// * `epochs_between_reports` - a report is made on the first and last epoch, every
    /// `epochs_between_reports` epochs and on success. 0 disables reports.
    ///
    /// # Examples
    /// ```
    /// # use ccnnet::feedforward::{Net, TrainData};
    /// let data = TrainData::from_pairs(vec![
    ///     (vec![0.0, 0.0], vec![0.0]),
    ///     (vec![1.0, 1.0], vec![1.0]),
    /// ])
    /// .unwrap();
    /// let mut trainer = Net::new(&[2, 3, 1], None).unwrap().build_trainer();
    /// let summary = trainer.train_for(&data, 20, 0, 0.0).unwrap();
    /// assert!(summary.epochs <= 20);
    /// ```
    pub fn train_for(
        &mut self,
        data: &TrainData,
        max_epochs: usize,
        epochs_between_reports: usize,
        desired_error: f64,
    ) -> Result<TrainSummary, TrainError> {
        self.check(data)?;

        let mut summary = TrainSummary {
            epochs: 0,
            mse: self.mse,
            bit_fail: self.bit_fail,
            reached: false,
        };

        for epoch in 1..=max_epochs {
            let mse = self.epoch_from_layer(data, 1)?;
            let reached = self.desired_reached(desired_error);

            if epochs_between_reports > 0
                && (epoch == 1
                    || epoch % epochs_between_reports == 0
                    || epoch == max_epochs
                    || reached)
            {
                let report = Report {
                    epoch,
                    mse,
                    bit_fail: self.bit_fail,
                    hidden_neurons: self.net.num_hidden(),
                };
                self.report(&report);
            }

            summary = TrainSummary {
                epochs: epoch,
                mse,
                bit_fail: self.bit_fail,
                reached,
            };
            if reached {
                break;
            }
        }

        debug!(
            "Training stopped after {} epoch(s) with error {} ({} bit fail)",
            summary.epochs, summary.mse, summary.bit_fail
        );
        Ok(summary)
    }

    /// Computes the error of the network on `data` without training.
    ///
    /// # Returns
    /// * The mean square error; `Trainer::bit_fail` is updated as well.
    pub fn test(&mut self, data: &TrainData) -> Result<f64, TrainError> {
        data.check_fits(&self.net)
            .map_err(TrainError::DimensionMismatch)?;
        self.gradient.prepare(&self.net, &self.config);
        self.gradient.reset_stats();

        for (inputs, desired) in data.iter() {
            self.net.propagate(inputs, &mut self.activations)?;
            self.gradient
                .compute_output_errors(&self.net, &self.activations, desired, &self.config);
        }

        self.mse = self.gradient.mse(self.net.num_output());
        self.bit_fail = self.gradient.bit_fail;
        Ok(self.mse)
    }
}

/// Error structure for training.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrainError {
    #[error("Training data doesn't fit the network: expected {} values per pattern side, but got {}!", .0.expected, .0.got)]
    DimensionMismatch(SizeMismatch),
    #[error("Training algorithm {0:?} can't be used here!")]
    InvalidTrainingAlgorithm(TrainingAlgorithm),
    #[error("Activation function {0:?} has no usable derivative!")]
    UntrainableActivation(Activation),
    #[error("Cascade training needs a shortcut network!")]
    CascadeNeedsShortcut,
    #[error(transparent)]
    Net(#[from] NetError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedforward::ErrorFunc;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn and_gate() -> TrainData {
        TrainData::from_pairs(vec![
            (vec![0.0, 0.0], vec![0.0]),
            (vec![0.0, 1.0], vec![0.0]),
            (vec![1.0, 0.0], vec![0.0]),
            (vec![1.0, 1.0], vec![1.0]),
        ])
        .unwrap()
    }

    fn seeded(algorithm: TrainingAlgorithm) -> TrainingConfig {
        TrainingConfig {
            algorithm,
            seed: Some(42),
            ..TrainingConfig::default()
        }
    }

    #[test]
    fn wrong_arity_is_rejected() {
        let mut trainer = Net::new(&[3, 1], None).unwrap().build_trainer();
        let before = trainer.net_ref().weights().to_vec();
        assert_eq!(
            trainer.train(&and_gate()),
            Err(TrainError::DimensionMismatch(SizeMismatch {
                expected: 3,
                got: 2
            }))
        );
        assert_eq!(trainer.net_ref().weights(), before.as_slice());
    }

    #[test]
    fn threshold_is_untrainable() {
        let mut net = Net::new(&[2, 1], None).unwrap();
        net.set_activation_function_output(Activation::Threshold);
        let mut trainer = net.build_trainer();
        assert_eq!(
            trainer.train(&and_gate()),
            Err(TrainError::UntrainableActivation(Activation::Threshold))
        );
        // Running is still fine
        assert!(trainer.test(&and_gate()).is_ok());
    }

    #[test]
    fn test_does_not_train() {
        let mut trainer = Net::new(&[2, 2, 1], None).unwrap().build_trainer();
        let before = trainer.net_ref().weights().to_vec();
        let first = trainer.test(&and_gate()).unwrap();
        let second = trainer.test(&and_gate()).unwrap();
        assert_eq!(first, second);
        assert_eq!(trainer.net_ref().weights(), before.as_slice());
    }

    #[test]
    fn reports_follow_schedule() {
        let epochs = Rc::new(RefCell::new(Vec::new()));
        let seen = Rc::clone(&epochs);

        let net = Net::new(&[2, 2, 1], None).unwrap();
        let mut trainer = Trainer::new(net, seeded(TrainingAlgorithm::Rprop));
        trainer.set_report_callback(Box::new(
            move |report: &Report| -> Result<(), Box<dyn StdError>> {
                seen.borrow_mut().push(report.epoch);
                Ok(())
            },
        ));
        // Unreachable error, so every epoch runs
        let summary = trainer.train_for(&and_gate(), 10, 4, -1.0).unwrap();

        assert_eq!(summary.epochs, 10);
        assert!(!summary.reached);
        assert_eq!(*epochs.borrow(), vec![1, 4, 8, 10]);
    }

    #[test]
    fn failing_callback_is_ignored() {
        let mut trainer = Net::new(&[2, 1], None).unwrap().build_trainer();
        trainer.set_report_callback(Box::new(
            |_: &Report| -> Result<(), Box<dyn StdError>> { Err("observer is gone".into()) },
        ));
        let summary = trainer.train_for(&and_gate(), 3, 1, -1.0).unwrap();
        assert_eq!(summary.epochs, 3);
    }

    #[test]
    fn stops_on_bit_fail() {
        let mut config = seeded(TrainingAlgorithm::Rprop);
        config.stop_function = StopFunc::Bit;
        let mut trainer = Trainer::new(Net::new(&[2, 3, 1], None).unwrap(), config);
        // Any bit fail count satisfies a huge limit right away
        let summary = trainer.train_for(&and_gate(), 100, 0, 4.0).unwrap();
        assert_eq!(summary.epochs, 1);
        assert!(summary.reached);
    }

    #[test]
    fn changing_algorithm_resets_state() {
        let net = Net::new(&[2, 2, 1], None).unwrap();
        let mut trainer = Trainer::new(net, seeded(TrainingAlgorithm::Rprop));
        trainer.train(&and_gate()).unwrap();
        trainer.config_mut().algorithm = TrainingAlgorithm::Batch;
        trainer.config_mut().error_function = ErrorFunc::Linear;
        trainer.train(&and_gate()).unwrap();
        assert_eq!(trainer.gradient.algorithm, Some(TrainingAlgorithm::Batch));
        assert!(trainer.gradient.prev_steps.iter().all(|&s| s == 0.0));
    }
}
