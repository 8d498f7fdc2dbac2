//! Cascade-correlation: grows a shortcut network one hidden neuron at a time.
//!
//! Every round trains the output connections until they stagnate, then trains a pool of
//! candidate neurons (in parallel) to correlate with the remaining output error, and
//! installs the best one with its input weights frozen.

use log::{debug, warn};
use rand::Rng;
use rayon::prelude::*;

use super::activation::Activation;
use super::backprop;
use super::data::TrainData;
use super::net::Net;
use super::params::{CascadeConfig, NetType, TrainingAlgorithm, TrainingConfig};
use super::trainer::{Report, ReportCallback, TrainError, Trainer};

/// Variance below which an installed neuron gets zero output weights.
const MIN_VARIANCE: f64 = 1e-12;

/// Where a `CascadeTrainer` currently is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CascadePhase {
    /// Ready to start (or continue) a round.
    Growing,
    OutputTraining,
    CandidateTraining,
    /// The last `train_for` call has finished.
    Done,
}

/// Outcome of `CascadeTrainer::train_for`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CascadeSummary {
    pub neurons_added: usize,
    /// Output and candidate epochs, summed over all rounds.
    pub epochs: usize,
    pub mse: f64,
    pub bit_fail: usize,
    pub reached: bool,
}

/// Outputs of the frozen network over the whole dataset, shared read-only by all
/// candidates of a round.
struct Snapshot {
    patterns: usize,
    /// Number of neurons feeding a candidate: everything before the output layer.
    num_sources: usize,
    num_output: usize,
    /// `patterns * num_sources` source values.
    sources: Vec<f64>,
    /// `patterns * num_output` residual errors.
    residuals: Vec<f64>,
    /// Mean residual of every output.
    means: Vec<f64>,
    /// Sum of squared residuals.
    sse: f64,
}

impl Snapshot {
    fn sources(&self, p: usize) -> &[f64] {
        &self.sources[p * self.num_sources..(p + 1) * self.num_sources]
    }

    fn residuals(&self, p: usize) -> &[f64] {
        &self.residuals[p * self.num_output..(p + 1) * self.num_output]
    }
}

/// A neuron in training, not yet part of the network.
struct Candidate {
    activation: Activation,
    steepness: f64,
    weights: Vec<f64>,
    slopes: Vec<f64>,
    prev_steps: Vec<f64>,
    prev_slopes: Vec<f64>,
    /// Per-pattern scaled sums and outputs.
    sums: Vec<f64>,
    values: Vec<f64>,
    covariances: Vec<f64>,
}

impl Candidate {
    fn new<R: Rng + ?Sized>(
        activation: Activation,
        steepness: f64,
        snapshot: &Snapshot,
        training: &TrainingConfig,
        weight_multiplier: f64,
        rng: &mut R,
    ) -> Candidate {
        let initial_step = if training.algorithm == TrainingAlgorithm::Rprop {
            training.rprop_delta_zero
        } else {
            0.0
        };
        let n = snapshot.num_sources;
        let weight_multiplier = weight_multiplier.abs();
        Candidate {
            activation,
            steepness,
            weights: (0..n)
                .map(|_| rng.gen_range(-weight_multiplier..=weight_multiplier))
                .collect(),
            slopes: vec![0.0; n],
            prev_steps: vec![initial_step; n],
            prev_slopes: vec![0.0; n],
            sums: vec![0.0; snapshot.patterns],
            values: vec![0.0; snapshot.patterns],
            covariances: vec![0.0; snapshot.num_output],
        }
    }

    fn forward(&mut self, snapshot: &Snapshot) {
        for p in 0..snapshot.patterns {
            let sum: f64 = self
                .weights
                .iter()
                .zip(snapshot.sources(p))
                .map(|(w, s)| w * s)
                .sum();
            let x = Activation::scaled_sum(self.steepness, sum);
            self.sums[p] = x;
            self.values[p] = self.activation.eval(x);
        }
    }

    /// Trains one epoch, maximizing `sum_o |sum_p v_p (E_po - mean_o)|`.
    ///
    /// # Returns
    /// * The score of the weights the epoch started with.
    fn epoch(&mut self, snapshot: &Snapshot, training: &TrainingConfig) -> f64 {
        self.forward(snapshot);

        for c in &mut self.covariances {
            *c = 0.0;
        }
        for p in 0..snapshot.patterns {
            let v = self.values[p];
            for ((c, e), mean) in self
                .covariances
                .iter_mut()
                .zip(snapshot.residuals(p))
                .zip(&snapshot.means)
            {
                *c += v * (e - mean);
            }
        }
        let score = self.covariances.iter().map(|c| c.abs()).sum();

        for p in 0..snapshot.patterns {
            let direction: f64 = self
                .covariances
                .iter()
                .zip(snapshot.residuals(p))
                .zip(&snapshot.means)
                .map(|((c, e), mean)| sign(*c) * (e - mean))
                .sum();
            let delta = direction
                * self
                    .activation
                    .derivative(self.steepness, self.values[p], self.sums[p]);
            for (slope, s) in self.slopes.iter_mut().zip(snapshot.sources(p)) {
                *slope += delta * s;
            }
        }

        match training.algorithm {
            TrainingAlgorithm::Quickprop => backprop::quickprop(
                &mut self.weights,
                &mut self.slopes,
                &mut self.prev_steps,
                &mut self.prev_slopes,
                snapshot.patterns,
                training,
            ),
            _ => backprop::rprop(
                &mut self.weights,
                &mut self.slopes,
                &mut self.prev_steps,
                &mut self.prev_slopes,
                training,
            ),
        }

        score
    }

    /// Output weights that best map this candidate's output onto the residuals,
    /// scaled by `weight_multiplier`.
    fn output_weights(&mut self, snapshot: &Snapshot, weight_multiplier: f64) -> Vec<f64> {
        self.forward(snapshot);

        let patterns = snapshot.patterns.max(1) as f64;
        let mean = self.values.iter().sum::<f64>() / patterns;
        let variance: f64 = self.values.iter().map(|v| (v - mean) * (v - mean)).sum();
        if variance < MIN_VARIANCE {
            return vec![0.0; snapshot.num_output];
        }

        (0..snapshot.num_output)
            .map(|o| {
                let covariance: f64 = (0..snapshot.patterns)
                    .map(|p| {
                        (self.values[p] - mean) * (snapshot.residuals(p)[o] - snapshot.means[o])
                    })
                    .sum();
                weight_multiplier * covariance / variance
            })
            .collect()
    }
}

fn sign(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Tracks whether a monotonically wanted quantity still changes significantly.
///
/// A change beyond `target` or below `backslide` moves both bounds around the new value and
/// pushes the stagnation horizon `patience` epochs further.
struct Stagnation {
    target: f64,
    backslide: f64,
    horizon: usize,
    fraction: f64,
    patience: usize,
}

impl Stagnation {
    fn new(fraction: f64, patience: usize, max_epochs: usize) -> Stagnation {
        Stagnation {
            target: 0.0,
            backslide: -1e20,
            horizon: max_epochs,
            fraction,
            patience,
        }
    }

    /// Records `value` at `epoch`, returning whether training has stagnated.
    fn update(&mut self, epoch: usize, value: f64, min_epochs: usize) -> bool {
        if value > self.target || value < self.backslide {
            self.target = value * (1.0 + self.fraction);
            self.backslide = value * (1.0 - self.fraction);
            self.horizon = epoch + self.patience;
        }
        epoch >= self.horizon && epoch >= min_epochs
    }
}

/// Trainer growing a shortcut network with cascade-correlation.
///
/// Only RPROP and Quickprop can drive it, both for the output connections and for the
/// candidates.
///
/// # Examples
/// ```
/// # use ccnnet::feedforward::{CascadeConfig, CascadePhase, CascadeTrainer, Net, TrainingConfig};
/// let net = Net::shortcut(&[2, 1], None).unwrap();
/// let trainer =
///     CascadeTrainer::new(net, TrainingConfig::default(), CascadeConfig::default()).unwrap();
/// assert_eq!(trainer.phase(), CascadePhase::Growing);
/// ```
pub struct CascadeTrainer {
    trainer: Trainer,
    cascade: CascadeConfig,
    phase: CascadePhase,
}

impl CascadeTrainer {
    /// Consumes `Net` and builds the trainer.
    ///
    /// # Returns
    /// * `Err(TrainError::CascadeNeedsShortcut)` if `net` is not a shortcut network;
    /// * `Err(TrainError::InvalidTrainingAlgorithm)` for anything but RPROP and Quickprop.
    pub fn new(
        net: Net,
        training: TrainingConfig,
        cascade: CascadeConfig,
    ) -> Result<CascadeTrainer, TrainError> {
        if net.net_type() != NetType::Shortcut {
            return Err(TrainError::CascadeNeedsShortcut);
        }
        if !training.algorithm.is_cascade_capable() {
            return Err(TrainError::InvalidTrainingAlgorithm(training.algorithm));
        }
        Ok(CascadeTrainer {
            trainer: Trainer::new(net, training),
            cascade,
            phase: CascadePhase::Growing,
        })
    }

    pub fn phase(&self) -> CascadePhase {
        self.phase
    }

    pub fn net_ref(&self) -> &Net {
        self.trainer.net_ref()
    }

    /// Frees training buffers and returns the grown network.
    pub fn teardown(self) -> Net {
        self.trainer.teardown()
    }

    pub fn training_config(&self) -> &TrainingConfig {
        self.trainer.config()
    }

    pub fn cascade_config(&self) -> &CascadeConfig {
        &self.cascade
    }

    pub fn cascade_config_mut(&mut self) -> &mut CascadeConfig {
        &mut self.cascade
    }

    /// Selects the algorithm for output and candidate training.
    pub fn set_training_algorithm(&mut self, algorithm: TrainingAlgorithm) -> Result<(), TrainError> {
        if !algorithm.is_cascade_capable() {
            return Err(TrainError::InvalidTrainingAlgorithm(algorithm));
        }
        self.trainer.config_mut().algorithm = algorithm;
        Ok(())
    }

    pub fn set_report_callback(&mut self, callback: ReportCallback) {
        self.trainer.set_report_callback(callback);
    }

    /// Mean square error after the last output training epoch.
    pub fn mse(&self) -> f64 {
        self.trainer.mse()
    }

    pub fn bit_fail(&self) -> usize {
        self.trainer.bit_fail()
    }

    /// Computes the error of the network on `data` without training.
    pub fn test(&mut self, data: &TrainData) -> Result<f64, TrainError> {
        self.trainer.test(data)
    }

    /// Grows the network until the stop criterion reaches `desired_error` or `max_neurons`
    /// rounds pass. Every round adds at most one hidden neuron.
    ///
    /// # Arguments
    /// * `neurons_between_reports` - a report is made on the first and last round, every
    /// `neurons_between_reports` rounds and on success. 0 disables reports.
    pub fn train_for(
        &mut self,
        data: &TrainData,
        max_neurons: usize,
        neurons_between_reports: usize,
        desired_error: f64,
    ) -> Result<CascadeSummary, TrainError> {
        let algorithm = self.trainer.config().algorithm;
        if !algorithm.is_cascade_capable() {
            return Err(TrainError::InvalidTrainingAlgorithm(algorithm));
        }
        self.trainer.check(data)?;
        if let Some(&activation) = self
            .cascade
            .activation_functions
            .iter()
            .find(|a| !a.is_trainable())
        {
            return Err(TrainError::UntrainableActivation(activation));
        }

        let mut summary = CascadeSummary {
            neurons_added: 0,
            epochs: 0,
            mse: self.trainer.mse(),
            bit_fail: self.trainer.bit_fail(),
            reached: false,
        };
        let mut installed_last = false;

        for round in 1..=max_neurons {
            summary.epochs += self.train_outputs(data, desired_error)?;
            summary.reached = self.trainer.desired_reached(desired_error);
            installed_last = false;

            if neurons_between_reports > 0
                && (round == 1
                    || round % neurons_between_reports == 0
                    || round == max_neurons
                    || summary.reached)
            {
                let report = Report {
                    epoch: round,
                    mse: self.trainer.mse(),
                    bit_fail: self.trainer.bit_fail(),
                    hidden_neurons: self.trainer.net_ref().num_hidden(),
                };
                self.trainer.report(&report);
            }
            if summary.reached {
                break;
            }

            self.phase = CascadePhase::CandidateTraining;
            match self.train_candidates(data)? {
                Some(epochs) => {
                    summary.epochs += epochs;
                    summary.neurons_added += 1;
                    installed_last = true;
                }
                None => {
                    warn!("No candidate neurons are configured, cascade training stops");
                    break;
                }
            }
            self.phase = CascadePhase::Growing;
        }

        if installed_last {
            summary.epochs += self.train_outputs(data, 0.0)?;
            summary.reached = self.trainer.desired_reached(desired_error);
        }

        summary.mse = self.trainer.mse();
        summary.bit_fail = self.trainer.bit_fail();
        self.phase = CascadePhase::Done;
        debug!(
            "Cascade training added {} neuron(s) in {} epoch(s), error {}",
            summary.neurons_added, summary.epochs, summary.mse
        );
        Ok(summary)
    }

    /// Trains the output connections only, until the error stagnates or is reached.
    ///
    /// # Returns
    /// * The number of epochs run.
    fn train_outputs(&mut self, data: &TrainData, desired_error: f64) -> Result<usize, TrainError> {
        self.phase = CascadePhase::OutputTraining;
        let output_layer = self.trainer.net_ref().num_layers() - 1;
        let max_epochs = self.cascade.max_out_epochs;

        self.trainer.clear_training();
        let initial_error = self.trainer.epoch_from_layer(data, output_layer)?;
        if self.trainer.desired_reached(desired_error) {
            return Ok(1);
        }

        let mut stagnation = Stagnation::new(
            self.cascade.output_change_fraction,
            self.cascade.output_stagnation_epochs,
            max_epochs,
        );
        for epoch in 1..max_epochs {
            let error = self.trainer.epoch_from_layer(data, output_layer)?;
            if self.trainer.desired_reached(desired_error) {
                return Ok(epoch + 1);
            }
            if stagnation.update(epoch, initial_error - error, self.cascade.min_out_epochs) {
                return Ok(epoch + 1);
            }
        }
        Ok(max_epochs.max(1))
    }

    /// Runs the frozen network over `data`, keeping what candidates need.
    fn snapshot(&mut self, data: &TrainData) -> Result<Snapshot, TrainError> {
        let net = &self.trainer.net;
        let output = net.output_layer();
        let num_sources = output.first;
        let num_output = output.len();
        let symmetric: Vec<bool> = output
            .neurons()
            .map(|n| net.neurons[n].activation.is_symmetric())
            .collect();

        let mut sources = Vec::with_capacity(data.len() * num_sources);
        let mut residuals = Vec::with_capacity(data.len() * num_output);
        let mut means = vec![0.0; num_output];
        let mut sse = 0.0;

        for (inputs, desired) in data.iter() {
            let outputs = net.propagate(inputs, &mut self.trainer.activations)?;
            for (o, (&value, &target)) in outputs.iter().zip(desired).enumerate() {
                let mut residual = target - value;
                if symmetric[o] {
                    residual /= 2.0;
                }
                sse += residual * residual;
                means[o] += residual;
                residuals.push(residual);
            }
            sources.extend_from_slice(&self.trainer.activations.values[..num_sources]);
        }

        let patterns = data.len();
        for mean in &mut means {
            *mean /= patterns.max(1) as f64;
        }

        Ok(Snapshot {
            patterns,
            num_sources,
            num_output,
            sources,
            residuals,
            means,
            sse,
        })
    }

    /// Trains a pool of candidates and installs the best one.
    ///
    /// # Returns
    /// * `Some(epochs)` once a neuron is installed;
    /// * `None` if no candidates are configured.
    fn train_candidates(&mut self, data: &TrainData) -> Result<Option<usize>, TrainError> {
        let count = self.cascade.num_candidates();
        if count == 0 {
            return Ok(None);
        }
        let snapshot = self.snapshot(data)?;
        let cascade = &self.cascade;
        let training = &self.trainer.config;
        let rng = &mut self.trainer.rng;

        let per_group = cascade.activation_functions.len() * cascade.activation_steepnesses.len();
        let steepnesses = cascade.activation_steepnesses.len();
        let mut candidates: Vec<Candidate> = (0..count)
            .map(|i| {
                let k = i % per_group;
                Candidate::new(
                    cascade.activation_functions[k / steepnesses],
                    cascade.activation_steepnesses[k % steepnesses],
                    &snapshot,
                    training,
                    cascade.weight_multiplier,
                    rng,
                )
            })
            .collect();

        let max_epochs = cascade.max_cand_epochs.max(1);
        let mut stagnation = Stagnation::new(
            cascade.candidate_change_fraction,
            cascade.candidate_stagnation_epochs,
            max_epochs,
        );
        let mut best = 0;
        let mut epochs = max_epochs;

        for epoch in 0..max_epochs {
            let scores: Vec<f64> = candidates
                .par_iter_mut()
                .map(|candidate| candidate.epoch(&snapshot, training))
                .collect();

            // Strictly greater, so ties go to the lowest index
            best = (1..scores.len()).fold(0, |best, i| {
                if scores[i] > scores[best] {
                    i
                } else {
                    best
                }
            });
            let best_score = scores[best];

            if snapshot.sse > 0.0 && best_score / snapshot.sse > cascade.candidate_limit {
                epochs = epoch + 1;
                break;
            }
            if stagnation.update(epoch, best_score, cascade.min_cand_epochs) {
                epochs = epoch + 1;
                break;
            }
        }

        let weight_multiplier = cascade.weight_multiplier;
        let mut winner = candidates.swap_remove(best);
        let out_weights = winner.output_weights(&snapshot, weight_multiplier);
        let index = self.trainer.net.insert_hidden_neuron(
            winner.activation,
            winner.steepness,
            &winner.weights,
            &out_weights,
        )?;
        self.trainer.refit();

        debug!(
            "Installed neuron {} ({:?}, steepness {}) after {} candidate epoch(s)",
            index, winner.activation, winner.steepness, epochs
        );
        Ok(Some(epochs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn xor() -> TrainData {
        TrainData::from_pairs(vec![
            (vec![-1.0, -1.0], vec![-1.0]),
            (vec![-1.0, 1.0], vec![1.0]),
            (vec![1.0, -1.0], vec![1.0]),
            (vec![1.0, 1.0], vec![-1.0]),
        ])
        .unwrap()
    }

    fn seeded() -> TrainingConfig {
        TrainingConfig {
            seed: Some(5),
            ..TrainingConfig::default()
        }
    }

    fn small_cascade() -> CascadeConfig {
        CascadeConfig {
            max_out_epochs: 60,
            min_out_epochs: 10,
            max_cand_epochs: 60,
            min_cand_epochs: 10,
            num_candidate_groups: 1,
            ..CascadeConfig::default()
        }
    }

    #[test]
    fn rejects_layered_nets() {
        let net = Net::new(&[2, 1], None).unwrap();
        assert!(matches!(
            CascadeTrainer::new(net, seeded(), CascadeConfig::default()),
            Err(TrainError::CascadeNeedsShortcut)
        ));
    }

    #[test]
    fn rejects_epoch_free_algorithms() {
        let net = Net::shortcut(&[2, 1], None).unwrap();
        let config = TrainingConfig {
            algorithm: TrainingAlgorithm::Sarprop,
            ..seeded()
        };
        assert!(matches!(
            CascadeTrainer::new(net.clone(), config, CascadeConfig::default()),
            Err(TrainError::InvalidTrainingAlgorithm(TrainingAlgorithm::Sarprop))
        ));

        let mut trainer = CascadeTrainer::new(net, seeded(), CascadeConfig::default()).unwrap();
        assert_eq!(
            trainer.set_training_algorithm(TrainingAlgorithm::Incremental),
            Err(TrainError::InvalidTrainingAlgorithm(TrainingAlgorithm::Incremental))
        );
        assert_eq!(trainer.training_config().algorithm, TrainingAlgorithm::Rprop);
        assert!(trainer.set_training_algorithm(TrainingAlgorithm::Quickprop).is_ok());
    }

    #[test]
    fn stagnation_policy() {
        let mut stagnation = Stagnation::new(0.01, 3, 100);
        assert!(!stagnation.update(1, 0.5, 0));
        // Less than 1% better is no change
        assert!(!stagnation.update(2, 0.502, 0));
        assert!(!stagnation.update(3, 0.503, 0));
        assert!(stagnation.update(4, 0.504, 0));
        // Minimum epochs still apply
        let mut stagnation = Stagnation::new(0.01, 1, 100);
        stagnation.update(1, 0.5, 0);
        assert!(!stagnation.update(2, 0.5, 5));
    }

    #[test]
    fn candidate_score_is_correlation() {
        let snapshot = Snapshot {
            patterns: 2,
            num_sources: 1,
            num_output: 1,
            sources: vec![1.0, -1.0],
            residuals: vec![0.5, -0.5],
            means: vec![0.0],
            sse: 0.5,
        };
        let training = TrainingConfig::default();
        let mut candidate = Candidate::new(
            Activation::Linear,
            1.0,
            &snapshot,
            &training,
            0.4,
            &mut rand::thread_rng(),
        );
        candidate.weights = vec![1.0];
        // v = [1, -1], S = 1 * 0.5 + (-1) * (-0.5)
        let score = candidate.epoch(&snapshot, &training);
        assert_relative_eq!(score, 1.0);
        // Positive correlation, so the weight grows
        assert!(candidate.weights[0] > 1.0);

        let weights = candidate.output_weights(&snapshot, 0.4);
        assert!(weights[0] > 0.0);
    }

    #[test]
    fn negative_multiplier_is_a_magnitude() {
        let snapshot = Snapshot {
            patterns: 1,
            num_sources: 8,
            num_output: 1,
            sources: vec![0.0; 8],
            residuals: vec![0.0],
            means: vec![0.0],
            sse: 0.0,
        };
        let candidate = Candidate::new(
            Activation::SigmoidSymmetric,
            0.5,
            &snapshot,
            &TrainingConfig::default(),
            -0.3,
            &mut rand::thread_rng(),
        );
        assert_eq!(candidate.weights.len(), 8);
        assert!(candidate.weights.iter().all(|w| (-0.3..=0.3).contains(w)));
    }

    #[test]
    fn grows_one_neuron_per_round() {
        let data = xor();
        let mut net = Net::shortcut(&[2, 1], None).unwrap();
        net.set_activation_function_output(Activation::SigmoidSymmetric);
        let mut trainer = CascadeTrainer::new(net, seeded(), small_cascade()).unwrap();

        let before = trainer.net_ref().total_neurons();
        let summary = trainer.train_for(&data, 3, 0, -1.0).unwrap();

        assert_eq!(summary.neurons_added, 3);
        assert_eq!(trainer.net_ref().total_neurons(), before + 3);
        assert_eq!(trainer.net_ref().geometry(), vec![2, 1, 1, 1, 1]);
        assert_eq!(trainer.phase(), CascadePhase::Done);
        assert!(!summary.reached);
    }

    #[test]
    fn stops_when_error_reached() {
        let data = xor();
        let net = Net::shortcut(&[2, 1], None).unwrap();
        let mut trainer = CascadeTrainer::new(net, seeded(), small_cascade()).unwrap();
        // Any error is good enough, no neuron is needed
        let summary = trainer.train_for(&data, 5, 1, 10.0).unwrap();
        assert!(summary.reached);
        assert_eq!(summary.neurons_added, 0);
        assert_eq!(trainer.net_ref().num_hidden(), 0);
    }

    #[test]
    fn candidate_limit_ends_candidate_training() {
        // Tiny residuals, so any correlated candidate scores far above the sse
        let data = TrainData::from_pairs(vec![
            (vec![-1.0], vec![-1e-4]),
            (vec![1.0], vec![1e-4]),
        ])
        .unwrap();
        let mut net = Net::shortcut(&[1, 1], Some(Box::new([0.0, 0.0]))).unwrap();
        net.set_activation_function_output(Activation::Linear);
        let cascade = CascadeConfig {
            candidate_limit: 2.0,
            min_cand_epochs: 60,
            ..small_cascade()
        };
        let mut trainer = CascadeTrainer::new(net, seeded(), cascade).unwrap();

        assert_eq!(trainer.train_candidates(&data).unwrap(), Some(1));
        assert_eq!(trainer.net_ref().num_hidden(), 1);
    }

    #[test]
    fn untrainable_candidates_are_rejected() {
        let net = Net::shortcut(&[2, 1], None).unwrap();
        let mut cascade = small_cascade();
        cascade.activation_functions.push(Activation::ThresholdSymmetric);
        let mut trainer = CascadeTrainer::new(net, seeded(), cascade).unwrap();
        assert_eq!(
            trainer.train_for(&xor(), 2, 0, 0.0),
            Err(TrainError::UntrainableActivation(Activation::ThresholdSymmetric))
        );
        assert_eq!(trainer.phase(), CascadePhase::Growing);
    }
}
