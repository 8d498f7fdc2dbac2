use ccnnet::feedforward::{
    Activation, CascadeConfig, CascadePhase, CascadeTrainer, Net, NetType, Report, TrainData,
    TrainError, TrainingAlgorithm, TrainingConfig,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::cell::RefCell;
use std::error::Error;
use std::rc::Rc;

fn xor() -> TrainData {
    TrainData::from_pairs(vec![
        (vec![-1.0, -1.0], vec![-1.0]),
        (vec![-1.0, 1.0], vec![1.0]),
        (vec![1.0, -1.0], vec![1.0]),
        (vec![1.0, 1.0], vec![-1.0]),
    ])
    .unwrap()
}

fn shortcut_net() -> Net {
    let mut net = Net::shortcut(&[2, 1], None).unwrap();
    net.set_activation_function_output(Activation::SigmoidSymmetric);
    net.randomize_weights(&mut ChaCha8Rng::seed_from_u64(21), -0.1, 0.1);
    net
}

fn quick_cascade() -> CascadeConfig {
    CascadeConfig {
        max_out_epochs: 80,
        min_out_epochs: 20,
        max_cand_epochs: 80,
        min_cand_epochs: 20,
        num_candidate_groups: 1,
        ..CascadeConfig::default()
    }
}

fn config(algorithm: TrainingAlgorithm) -> TrainingConfig {
    TrainingConfig {
        algorithm,
        seed: Some(8),
        ..TrainingConfig::default()
    }
}

#[test]
fn neurons_grow_one_at_a_time() {
    let data = xor();
    let mut trainer =
        CascadeTrainer::new(shortcut_net(), config(TrainingAlgorithm::Rprop), quick_cascade())
            .unwrap();

    let hidden = Rc::new(RefCell::new(Vec::new()));
    let seen = Rc::clone(&hidden);
    trainer.set_report_callback(Box::new(
        move |report: &Report| -> Result<(), Box<dyn Error>> {
            seen.borrow_mut().push(report.hidden_neurons);
            Ok(())
        },
    ));

    let before = trainer.net_ref().total_neurons();
    let summary = trainer.train_for(&data, 4, 1, 0.0).unwrap();

    let net = trainer.teardown();
    assert_eq!(net.total_neurons(), before + summary.neurons_added);
    assert_eq!(net.num_hidden(), summary.neurons_added);
    assert_eq!(net.net_type(), NetType::Shortcut);

    let hidden = hidden.borrow();
    assert!(!hidden.is_empty());
    for pair in hidden.windows(2) {
        assert_eq!(pair[1], pair[0] + 1);
    }
}

#[test]
fn cascade_reduces_error() {
    let data = xor();
    let mut trainer = CascadeTrainer::new(
        shortcut_net(),
        config(TrainingAlgorithm::Quickprop),
        quick_cascade(),
    )
    .unwrap();
    let initial = trainer.test(&data).unwrap();
    let summary = trainer.train_for(&data, 3, 0, 0.0).unwrap();

    assert_eq!(trainer.phase(), CascadePhase::Done);
    assert!(summary.mse < initial);
    assert!(summary.epochs > 0);
}

#[test]
fn batch_is_rejected_before_training() {
    assert!(matches!(
        CascadeTrainer::new(
            shortcut_net(),
            config(TrainingAlgorithm::Batch),
            CascadeConfig::default()
        ),
        Err(TrainError::InvalidTrainingAlgorithm(TrainingAlgorithm::Batch))
    ));

    let net = shortcut_net();
    let weights = net.weights().to_vec();
    let mut trainer =
        CascadeTrainer::new(net, config(TrainingAlgorithm::Rprop), CascadeConfig::default())
            .unwrap();
    assert_eq!(
        trainer.set_training_algorithm(TrainingAlgorithm::Batch),
        Err(TrainError::InvalidTrainingAlgorithm(TrainingAlgorithm::Batch))
    );
    assert_eq!(trainer.net_ref().weights(), weights.as_slice());
    assert_eq!(trainer.phase(), CascadePhase::Growing);
}

#[test]
fn layered_nets_cannot_grow() {
    let net = Net::new(&[2, 1], None).unwrap();
    assert!(matches!(
        CascadeTrainer::new(net, config(TrainingAlgorithm::Rprop), quick_cascade()),
        Err(TrainError::CascadeNeedsShortcut)
    ));
}
